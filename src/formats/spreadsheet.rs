/*!
 * Spreadsheet adapter.
 *
 * Cells are visited sheet by sheet in row-major order. Text cells become
 * translatable segments; formulas (and text that looks like one) are carried
 * through as skipped segments. Numbers, booleans and empty cells never become
 * segments.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{FormatAdapter, decode_json, encode_json};
use crate::document::{FormatKind, Segment, SegmentLocation, SegmentStatus};
use crate::errors::{ExtractionError, ReassemblyError};

/// Logical workbook snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Workbook {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub encrypted: bool,

    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Sheet {
    pub name: String,

    /// Column widths and other sheet-level layout, carried unchanged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<serde_json::Value>,

    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// 1-based row
    pub row: u32,
    /// 1-based column
    pub column: u32,
    pub value: CellValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<serde_json::Value>,
}

impl Cell {
    pub fn text(row: u32, column: u32, text: impl Into<String>) -> Self {
        Self {
            row,
            column,
            value: CellValue::Text(text.into()),
            style: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Formula(String),
    Empty,
}

/// Adapter for spreadsheets
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetAdapter;

impl SpreadsheetAdapter {
    /// Cell indices of a sheet in row-major order
    fn row_major(sheet: &Sheet) -> Vec<usize> {
        let mut order: Vec<usize> = (0..sheet.cells.len()).collect();
        order.sort_by_key(|&i| (sheet.cells[i].row, sheet.cells[i].column));
        order
    }

    /// Cells are addressed by sheet name and coordinates, so both must be unique
    fn check_addresses(book: &Workbook) -> Result<(), ExtractionError> {
        let corrupt = |message: String| ExtractionError::Corrupt {
            kind: FormatKind::Spreadsheet.to_string(),
            message,
        };

        let mut names = HashSet::new();
        for sheet in &book.sheets {
            if !names.insert(sheet.name.as_str()) {
                return Err(corrupt(format!("duplicate sheet name {:?}", sheet.name)));
            }
            let mut coordinates = HashSet::new();
            for cell in &sheet.cells {
                if !coordinates.insert((cell.row, cell.column)) {
                    return Err(corrupt(format!(
                        "duplicate cell at row {}, column {} in sheet {:?}",
                        cell.row, cell.column, sheet.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl FormatAdapter for SpreadsheetAdapter {
    type Body = Workbook;

    fn kind(&self) -> FormatKind {
        FormatKind::Spreadsheet
    }

    fn decode(&self, bytes: &[u8]) -> Result<Workbook, ExtractionError> {
        let book = decode_json(self.kind(), bytes)?;
        Self::check_addresses(&book)?;
        Ok(book)
    }

    fn encode(&self, body: &Workbook) -> Result<Vec<u8>, ReassemblyError> {
        encode_json(body)
    }

    fn extract(&self, body: &Workbook) -> Vec<Segment> {
        let mut segments = Vec::new();

        for sheet in &body.sheets {
            for i in Self::row_major(sheet) {
                let cell = &sheet.cells[i];
                let location = SegmentLocation::Cell {
                    sheet: sheet.name.clone(),
                    row: cell.row,
                    column: cell.column,
                };
                let index = segments.len();

                match &cell.value {
                    CellValue::Text(text) if text.trim().is_empty() => {}
                    CellValue::Text(text) if text.trim_start().starts_with('=') => {
                        segments.push(Segment::skipped(index, location, text.clone()));
                    }
                    CellValue::Text(text) => segments.push(Segment::pending(index, location, text.clone())),
                    CellValue::Formula(formula) => {
                        segments.push(Segment::skipped(index, location, formula.clone()));
                    }
                    CellValue::Number(_) | CellValue::Bool(_) | CellValue::Empty => {}
                }
            }
        }

        segments
    }

    fn apply(&self, body: &Workbook, segments: &[Segment]) -> Result<Workbook, ReassemblyError> {
        let mut output = body.clone();

        for segment in segments.iter().filter(|s| s.status() != SegmentStatus::Skipped) {
            let missing = || ReassemblyError::MissingPosition {
                index: segment.index,
                location: segment.location.to_string(),
            };

            let SegmentLocation::Cell { sheet, row, column } = &segment.location else {
                return Err(missing());
            };

            let cell = output
                .sheets
                .iter_mut()
                .find(|s| &s.name == sheet)
                .and_then(|s| s.cells.iter_mut().find(|c| c.row == *row && c.column == *column))
                .ok_or_else(missing)?;

            match &mut cell.value {
                CellValue::Text(text) => *text = segment.output_text(),
                _ => return Err(missing()),
            }
        }

        Ok(output)
    }
}
