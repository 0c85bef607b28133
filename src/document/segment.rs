/*!
 * Translatable units extracted from a document.
 *
 * A segment's status only ever moves out of `Pending`; every other
 * transition is rejected with `IllegalStatusTransition`.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle of a segment within one job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Pending,
    Translated,
    Failed,
    Skipped,
}

impl SegmentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Position of a segment inside its document container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SegmentLocation {
    /// Spreadsheet cell (1-based row and column)
    Cell { sheet: String, row: u32, column: u32 },
    /// Top-level block of a word-processor body (paragraph or image)
    Block { block: usize },
    /// Cell of a table block
    TableCell { block: usize, row: usize, cell: usize },
    /// Paragraph in a slide shape's text frame
    SlideText { slide: usize, shape: usize, paragraph: usize },
    /// Picture shape on a slide
    SlidePicture { slide: usize, shape: usize },
    /// Paragraph on a page of extracted PDF text
    PageText { page: usize, paragraph: usize },
}

impl fmt::Display for SegmentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cell { sheet, row, column } => write!(f, "{}!{}{}", sheet, column_letters(*column), row),
            Self::Block { block } => write!(f, "block {}", block + 1),
            Self::TableCell { block, row, cell } => write!(f, "block {} r{}c{}", block + 1, row + 1, cell + 1),
            Self::SlideText { slide, shape, paragraph } => {
                write!(f, "slide {} / shape {} / paragraph {}", slide + 1, shape + 1, paragraph + 1)
            }
            Self::SlidePicture { slide, shape } => write!(f, "slide {} / shape {}", slide + 1, shape + 1),
            Self::PageText { page, paragraph } => write!(f, "page {} / paragraph {}", page + 1, paragraph + 1),
        }
    }
}

/// Spreadsheet column letters for a 1-based column number (1 -> A, 28 -> AB)
pub fn column_letters(column: u32) -> String {
    let mut n = column.max(1);
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push((b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Rejected status change
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Segment {index} cannot move from {from:?} to {to:?}")]
pub struct IllegalStatusTransition {
    pub index: usize,
    pub from: SegmentStatus,
    pub to: SegmentStatus,
}

/// One translatable unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in extraction order
    pub index: usize,
    pub location: SegmentLocation,
    /// Source text exactly as found in the document
    pub original: String,
    translated: Option<String>,
    status: SegmentStatus,
    failure: Option<String>,
}

impl Segment {
    /// A unit that will be sent to the provider
    pub fn pending(index: usize, location: SegmentLocation, original: impl Into<String>) -> Self {
        Self {
            index,
            location,
            original: original.into(),
            translated: None,
            status: SegmentStatus::Pending,
            failure: None,
        }
    }

    /// Non-translatable content carried through unchanged
    pub fn skipped(index: usize, location: SegmentLocation, original: impl Into<String>) -> Self {
        Self {
            status: SegmentStatus::Skipped,
            ..Self::pending(index, location, original)
        }
    }

    pub fn status(&self) -> SegmentStatus {
        self.status
    }

    pub fn translated(&self) -> Option<&str> {
        self.translated.as_deref()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Text sent to the provider: surrounding whitespace stays in the document
    pub fn source_text(&self) -> &str {
        self.original.trim()
    }

    /// Number of characters counted against a chunk budget
    pub fn char_count(&self) -> usize {
        self.source_text().chars().count()
    }

    pub fn mark_translated(&mut self, text: impl Into<String>) -> Result<(), IllegalStatusTransition> {
        self.transition(SegmentStatus::Translated)?;
        self.translated = Some(text.into());
        Ok(())
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), IllegalStatusTransition> {
        self.transition(SegmentStatus::Failed)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    pub fn mark_skipped(&mut self) -> Result<(), IllegalStatusTransition> {
        self.transition(SegmentStatus::Skipped)
    }

    fn transition(&mut self, to: SegmentStatus) -> Result<(), IllegalStatusTransition> {
        if self.status != SegmentStatus::Pending {
            return Err(IllegalStatusTransition {
                index: self.index,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Text written back on reassembly.
    ///
    /// Translated segments get the original leading/trailing whitespace around the
    /// translation; everything else keeps its original text verbatim.
    pub fn output_text(&self) -> String {
        match (&self.status, &self.translated) {
            (SegmentStatus::Translated, Some(text)) => restore_padding(&self.original, text),
            _ => self.original.clone(),
        }
    }
}

fn restore_padding(original: &str, translated: &str) -> String {
    let leading_len = original.len() - original.trim_start().len();
    let trailing_start = original.trim_end().len();
    let core = translated.trim();
    if core.is_empty() {
        return original.to_string();
    }
    format!("{}{}{}", &original[..leading_len], core, &original[trailing_start.max(leading_len)..])
}
