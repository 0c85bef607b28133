/*!
 * Word-processor adapter.
 *
 * Body paragraphs are extracted first, in document order, followed by the
 * cells of every table (table, row, cell). Inline images are carried through
 * as skipped segments.
 */

use serde::{Deserialize, Serialize};

use super::text::{Paragraph, Run, runs_text, write_runs};
use super::{FormatAdapter, decode_json, encode_json};
use crate::document::{FormatKind, Segment, SegmentLocation, SegmentStatus};
use crate::errors::{ExtractionError, ReassemblyError};

/// Logical word-processor snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WordDocument {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub encrypted: bool,

    /// Page setup, headers and other document properties, carried unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,

    #[serde(default)]
    pub body: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Image(Image),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,

    #[serde(default)]
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TableRow {
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TableCell {
    #[serde(default)]
    pub runs: Vec<Run>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Adapter for word-processor documents
#[derive(Debug, Clone, Copy, Default)]
pub struct WordAdapter;

impl FormatAdapter for WordAdapter {
    type Body = WordDocument;

    fn kind(&self) -> FormatKind {
        FormatKind::WordProcessor
    }

    fn decode(&self, bytes: &[u8]) -> Result<WordDocument, ExtractionError> {
        decode_json(self.kind(), bytes)
    }

    fn encode(&self, body: &WordDocument) -> Result<Vec<u8>, ReassemblyError> {
        encode_json(body)
    }

    fn extract(&self, body: &WordDocument) -> Vec<Segment> {
        let mut segments = Vec::new();

        for (block_index, block) in body.body.iter().enumerate() {
            let location = SegmentLocation::Block { block: block_index };
            match block {
                Block::Paragraph(paragraph) => {
                    let text = paragraph.text();
                    if !text.trim().is_empty() {
                        segments.push(Segment::pending(segments.len(), location, text));
                    }
                }
                Block::Image(image) => {
                    segments.push(Segment::skipped(segments.len(), location, image.name.clone()));
                }
                Block::Table(_) => {}
            }
        }

        for (block_index, block) in body.body.iter().enumerate() {
            let Block::Table(table) = block else {
                continue;
            };
            for (row_index, row) in table.rows.iter().enumerate() {
                for (cell_index, cell) in row.cells.iter().enumerate() {
                    let text = runs_text(&cell.runs);
                    if text.trim().is_empty() {
                        continue;
                    }
                    let location = SegmentLocation::TableCell {
                        block: block_index,
                        row: row_index,
                        cell: cell_index,
                    };
                    segments.push(Segment::pending(segments.len(), location, text));
                }
            }
        }

        segments
    }

    fn apply(&self, body: &WordDocument, segments: &[Segment]) -> Result<WordDocument, ReassemblyError> {
        let mut output = body.clone();

        // Failed segments keep their original runs, which already hold the original text
        for segment in segments.iter().filter(|s| s.status() == SegmentStatus::Translated) {
            let missing = || ReassemblyError::MissingPosition {
                index: segment.index,
                location: segment.location.to_string(),
            };
            let text = segment.output_text();

            match segment.location {
                SegmentLocation::Block { block } => match output.body.get_mut(block) {
                    Some(Block::Paragraph(paragraph)) => paragraph.set_text(&text),
                    _ => return Err(missing()),
                },
                SegmentLocation::TableCell { block, row, cell } => {
                    let target = match output.body.get_mut(block) {
                        Some(Block::Table(table)) => table.rows.get_mut(row).and_then(|r| r.cells.get_mut(cell)),
                        _ => None,
                    };
                    let target = target.ok_or_else(missing)?;
                    write_runs(&mut target.runs, &text);
                }
                _ => return Err(missing()),
            }
        }

        Ok(output)
    }
}
