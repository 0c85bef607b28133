/*!
 * Tests for input discovery and output writing
 */

use std::fs;

use doctrans::document::FormatKind;
use doctrans::file_utils::FileManager;

use crate::common;

#[test]
fn test_collectInputs_withFilesAndDirectories_shouldExpandDirectories() {
    let dir = common::create_temp_dir().unwrap();
    let nested = dir.path().join("nested");
    fs::create_dir_all(&nested).unwrap();

    let single = common::create_test_file(dir.path(), "single.pdf.txt", "Hello").unwrap();
    common::create_test_file(&nested, "b.docx.json", "{}").unwrap();
    common::create_test_file(&nested, "a.xlsx.json", "{}").unwrap();
    common::create_test_file(&nested, "notes.md", "ignored").unwrap();

    let files = FileManager::collect_inputs(&[single.clone(), nested.clone()]).unwrap();

    assert_eq!(files, vec![single, nested.join("a.xlsx.json"), nested.join("b.docx.json")]);
}

#[test]
fn test_collectInputs_withMissingPath_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    assert!(FileManager::collect_inputs(&[dir.path().join("missing.xlsx.json")]).is_err());
}

#[test]
fn test_generateOutputPath_withOutputDir_shouldUseIt() {
    let dir = common::create_temp_dir().unwrap();
    let path = FileManager::generate_output_path(
        "/docs/deck.pptx.json",
        Some(dir.path()),
        "{name}.{lang}",
        "de",
        FormatKind::Presentation,
    );
    assert_eq!(path, dir.path().join("deck.de.pptx.json"));
}

#[test]
fn test_appendToLogFile_shouldKeepPreviousLines() {
    let dir = common::create_temp_dir().unwrap();
    let log = dir.path().join("logs").join("issues.log");

    FileManager::append_to_log_file(&log, "first").unwrap();
    FileManager::append_to_log_file(&log, "second").unwrap();

    let content = fs::read_to_string(&log).unwrap();
    let lines: Vec<_> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("first"));
    assert!(lines[1].ends_with("second"));
}
