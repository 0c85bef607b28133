/*!
 * Adapter for text extracted from PDF files.
 *
 * Pages are separated by form feeds and paragraphs by blank lines. The exact
 * separators are kept so that an untouched document encodes back to the same bytes.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::FormatAdapter;
use crate::document::{FormatKind, Segment, SegmentLocation, SegmentStatus};
use crate::errors::{ExtractionError, ReassemblyError};

/// Page break in extracted text
pub const PAGE_BREAK: char = '\x0C';

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n\s*").unwrap());

/// One page: paragraphs interleaved with the separators found between them
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub paragraphs: Vec<String>,
    /// `separators[i]` sits between `paragraphs[i]` and `paragraphs[i + 1]`
    pub separators: Vec<String>,
}

impl Page {
    fn parse(text: &str) -> Self {
        let mut page = Page::default();
        let mut last = 0;
        for found in PARAGRAPH_BREAK.find_iter(text) {
            page.paragraphs.push(text[last..found.start()].to_string());
            page.separators.push(found.as_str().to_string());
            last = found.end();
        }
        page.paragraphs.push(text[last..].to_string());
        page
    }

    fn render(&self, out: &mut String) {
        for (i, paragraph) in self.paragraphs.iter().enumerate() {
            out.push_str(paragraph);
            if let Some(separator) = self.separators.get(i) {
                out.push_str(separator);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PdfTextBody {
    pub pages: Vec<Page>,
}

impl PdfTextBody {
    pub fn parse(text: &str) -> Self {
        Self {
            pages: text.split(PAGE_BREAK).map(Page::parse).collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            if i > 0 {
                out.push(PAGE_BREAK);
            }
            page.render(&mut out);
        }
        out
    }
}

/// Adapter for PDF-extracted text
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextAdapter;

impl FormatAdapter for PdfTextAdapter {
    type Body = PdfTextBody;

    fn kind(&self) -> FormatKind {
        FormatKind::PdfText
    }

    fn decode(&self, bytes: &[u8]) -> Result<PdfTextBody, ExtractionError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ExtractionError::Corrupt {
            kind: self.kind().to_string(),
            message: format!("not valid UTF-8: {}", e),
        })?;
        Ok(PdfTextBody::parse(text))
    }

    fn encode(&self, body: &PdfTextBody) -> Result<Vec<u8>, ReassemblyError> {
        Ok(body.render().into_bytes())
    }

    fn extract(&self, body: &PdfTextBody) -> Vec<Segment> {
        let mut segments = Vec::new();
        for (page_index, page) in body.pages.iter().enumerate() {
            for (paragraph_index, paragraph) in page.paragraphs.iter().enumerate() {
                if paragraph.trim().is_empty() {
                    continue;
                }
                let location = SegmentLocation::PageText {
                    page: page_index,
                    paragraph: paragraph_index,
                };
                segments.push(Segment::pending(segments.len(), location, paragraph.clone()));
            }
        }
        segments
    }

    fn apply(&self, body: &PdfTextBody, segments: &[Segment]) -> Result<PdfTextBody, ReassemblyError> {
        let mut output = body.clone();

        for segment in segments.iter().filter(|s| s.status() != SegmentStatus::Skipped) {
            let target = match segment.location {
                SegmentLocation::PageText { page, paragraph } => {
                    output.pages.get_mut(page).and_then(|p| p.paragraphs.get_mut(paragraph))
                }
                _ => None,
            };
            let target = target.ok_or_else(|| ReassemblyError::MissingPosition {
                index: segment.index,
                location: segment.location.to_string(),
            })?;
            *target = segment.output_text();
        }

        Ok(output)
    }
}
