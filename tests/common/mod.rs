/*!
 * Common test utilities for the doctrans test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use doctrans::app_config::{Config, ProviderKind};
use doctrans::document::{DomainProfile, OutputMode, SourceDocument};
use doctrans::formats::spreadsheet::{Cell, CellValue, Sheet, Workbook};
use doctrans::pipeline::BatchOptions;
use doctrans::providers::MockProvider;

/// Route crate logs through the test harness; set RUST_LOG to see them
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes a one-sheet workbook snapshot whose cells fill column A from row 1
pub fn create_test_workbook(dir: &Path, filename: &str, values: Vec<CellValue>) -> Result<PathBuf> {
    let cells = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| Cell {
            row: i as u32 + 1,
            column: 1,
            value,
            style: None,
        })
        .collect();
    let workbook = Workbook {
        encrypted: false,
        sheets: vec![Sheet {
            name: "Sheet1".to_string(),
            layout: None,
            cells,
        }],
    };
    create_test_file(dir, filename, &serde_json::to_string_pretty(&workbook)?)
}

/// Writes a PDF-text file with one paragraph per entry
pub fn create_test_pdf_text(dir: &Path, filename: &str, paragraphs: &[&str]) -> Result<PathBuf> {
    create_test_file(dir, filename, &paragraphs.join("\n\n"))
}

/// Reads back the text cells of the first sheet of a workbook snapshot, in row order
pub fn read_workbook_values(path: &Path) -> Result<Vec<String>> {
    let workbook: Workbook = serde_json::from_str(&fs::read_to_string(path)?)?;
    let mut cells = workbook.sheets[0].cells.clone();
    cells.sort_by_key(|c| (c.row, c.column));
    Ok(cells
        .into_iter()
        .map(|cell| match cell.value {
            CellValue::Text(text) | CellValue::Formula(text) => text,
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Empty => String::new(),
        })
        .collect())
}

/// Configuration for offline runs: mock provider and millisecond backoff
pub fn test_config(source_language: &str, target_language: &str) -> Config {
    let mut config = Config::default();
    config.source_language = source_language.to_string();
    config.target_language = target_language.to_string();
    config.translation.provider = ProviderKind::Mock;
    config.translation.common.retry_backoff_ms = 1;
    config
}

/// Source documents with the given source language
pub fn sources(paths: &[PathBuf], source_language: &str) -> Vec<SourceDocument> {
    paths
        .iter()
        .map(|path| {
            SourceDocument::from_path(path)
                .expect("supported test document")
                .with_source_language(source_language)
        })
        .collect()
}

/// Batch options that keep the output next to the sources
pub fn options_for(provider: &MockProvider, target_language: &str) -> BatchOptions {
    BatchOptions::new(
        target_language,
        DomainProfile::General,
        Arc::new(provider.clone()),
        OutputMode::KeepOriginal,
    )
}
