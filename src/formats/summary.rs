/*!
 * Renderers for the output modes that do not keep the source container.
 */

use serde_json::json;

use super::spreadsheet::{Cell, CellValue, Sheet, Workbook};
use super::text::{Paragraph, Run};
use super::word::{Block, WordDocument};
use crate::document::{Segment, SegmentStatus};

/// Column width of the paginated text rendering
pub const PDF_LINE_WIDTH: usize = 90;

/// Lines per page of the paginated text rendering
pub const PDF_LINES_PER_PAGE: usize = 50;

const SEPARATOR_WIDTH: usize = 40;

fn rendered(segments: &[Segment]) -> impl Iterator<Item = &Segment> {
    segments.iter().filter(|s| s.status() != SegmentStatus::Skipped)
}

/// Paginated text: title, then each segment's final text wrapped and separated by a blank line
pub fn render_pdf(title: &str, segments: &[Segment]) -> String {
    let mut lines: Vec<String> = wrap(title.trim(), PDF_LINE_WIDTH);
    lines.push(String::new());

    for segment in rendered(segments) {
        for paragraph_line in segment.output_text().trim().lines() {
            if paragraph_line.trim().is_empty() {
                lines.push(String::new());
            } else {
                lines.extend(wrap(paragraph_line, PDF_LINE_WIDTH));
            }
        }
        lines.push(String::new());
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let page_break = super::pdf_text::PAGE_BREAK.to_string();
    lines
        .chunks(PDF_LINES_PER_PAGE)
        .map(|page| page.join("\n"))
        .collect::<Vec<_>>()
        .join(page_break.as_str())
}

/// Greedy word wrap; words longer than `width` are hard-split
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// One sheet listing every translated unit: No. / Location / Source / Translation
pub fn render_spreadsheet_summary(segments: &[Segment]) -> Workbook {
    let header_style = json!({"bold": true, "fill": "#D9E1F2"});
    let headers = ["No.", "Location", "Source", "Translation"];

    let mut cells: Vec<Cell> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| Cell {
            row: 1,
            column: i as u32 + 1,
            value: CellValue::Text(header.to_string()),
            style: Some(header_style.clone()),
        })
        .collect();

    for (n, segment) in rendered(segments).enumerate() {
        let row = n as u32 + 2;
        cells.push(Cell {
            row,
            column: 1,
            value: CellValue::Number((n + 1) as f64),
            style: None,
        });
        cells.push(Cell::text(row, 2, segment.location.to_string()));
        cells.push(Cell::text(row, 3, segment.source_text()));
        cells.push(Cell::text(row, 4, segment.output_text().trim()));
    }

    Workbook {
        encrypted: false,
        sheets: vec![Sheet {
            name: "Translation".to_string(),
            layout: Some(json!({"column_widths": [6, 24, 60, 60]})),
            cells,
        }],
    }
}

/// A word-processor document: heading, then location, translation and a separator per unit
pub fn render_document_summary(title: &str, segments: &[Segment]) -> WordDocument {
    let mut body = vec![Block::Paragraph(Paragraph::styled("Heading1", title.trim()))];

    for segment in rendered(segments) {
        body.push(Block::Paragraph(Paragraph::from_runs(vec![Run::bold(
            segment.location.to_string(),
        )])));
        body.push(Block::Paragraph(Paragraph::from_runs(vec![Run::plain(
            segment.output_text().trim(),
        )])));
        body.push(Block::Paragraph(Paragraph::from_runs(vec![Run::plain(
            "-".repeat(SEPARATOR_WIDTH),
        )])));
    }

    WordDocument {
        encrypted: false,
        properties: None,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SegmentLocation;

    fn segments() -> Vec<Segment> {
        let mut hello = Segment::pending(0, SegmentLocation::Block { block: 0 }, "Hello");
        hello.mark_translated("안녕").unwrap();
        let image = Segment::skipped(1, SegmentLocation::Block { block: 1 }, "logo.png");
        let mut world = Segment::pending(2, SegmentLocation::Block { block: 2 }, "World");
        world.mark_failed("permanent").unwrap();
        vec![hello, image, world]
    }

    #[test]
    fn test_wrap_shouldRespectWidth() {
        let lines = wrap("aaa bbb ccc ddd", 7);
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);

        let long = wrap("abcdefghij", 4);
        assert_eq!(long, vec!["abcd", "efgh", "ij"]);
        assert!(wrap(&"word ".repeat(100), PDF_LINE_WIDTH).iter().all(|l| l.chars().count() <= PDF_LINE_WIDTH));
    }

    #[test]
    fn test_renderPdf_shouldPaginate() {
        let many: Vec<Segment> = (0..60)
            .map(|i| Segment::pending(i, SegmentLocation::Block { block: i }, format!("line {}", i)))
            .collect();
        let text = render_pdf("Title", &many);

        let pages: Vec<&str> = text.split('\x0C').collect();
        assert!(pages.len() > 1);
        assert!(pages.iter().all(|p| p.lines().count() <= PDF_LINES_PER_PAGE));
        assert!(text.starts_with("Title\n\nline 0"));
    }

    #[test]
    fn test_renderSpreadsheetSummary_shouldListNonSkippedSegments() {
        let book = render_spreadsheet_summary(&segments());
        let cells = &book.sheets[0].cells;

        // header + 2 rows of 4 cells
        assert_eq!(cells.len(), 12);
        assert_eq!(cells[6].value, CellValue::Text("Hello".to_string()));
        assert_eq!(cells[7].value, CellValue::Text("안녕".to_string()));
        assert_eq!(cells[11].value, CellValue::Text("World".to_string()));
    }

    #[test]
    fn test_renderDocumentSummary_shouldStartWithHeading() {
        let doc = render_document_summary("report", &segments());
        assert_eq!(doc.body.len(), 1 + 2 * 3);
        match &doc.body[0] {
            Block::Paragraph(p) => assert_eq!(p.style.as_deref(), Some("Heading1")),
            other => panic!("unexpected block {:?}", other),
        }
    }
}
