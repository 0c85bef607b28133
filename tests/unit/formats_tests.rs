/*!
 * Tests for extraction and reassembly across document kinds
 */

use doctrans::document::{FormatKind, OutputMode, Segment, SegmentStatus};
use doctrans::formats::LoadedDocument;
use doctrans::formats::presentation::{PresentationBody, Shape};
use doctrans::formats::word::{Block, WordDocument};

const WORD_SNAPSHOT: &str = r#"{
    "properties": { "page": "A4" },
    "body": [
        { "type": "paragraph", "style": "Heading1", "runs": [{ "text": "Quarterly " , "bold": true }, { "text": "report" }] },
        { "type": "image", "name": "chart.png" },
        { "type": "table", "rows": [ { "cells": [ { "runs": [{ "text": "Revenue" }] }, { "runs": [] } ] } ] },
        { "type": "paragraph", "runs": [{ "text": "Thanks for reading" }] }
    ]
}"#;

const PRESENTATION_SNAPSHOT: &str = r#"{
    "slides": [
        { "shapes": [
            { "type": "text", "name": "Title", "paragraphs": [ { "runs": [{ "text": "Welcome" }] } ] },
            { "type": "picture", "name": "Logo" }
        ] },
        { "shapes": [
            { "type": "text", "name": "Body", "paragraphs": [ { "runs": [{ "text": "Agenda" }] }, { "runs": [{ "text": "Questions" }] } ] }
        ] }
    ]
}"#;

/// Translate every pending segment by upper-casing it
fn translate_all(segments: &mut [Segment]) {
    for segment in segments.iter_mut().filter(|s| s.status() == SegmentStatus::Pending) {
        let upper = segment.source_text().to_uppercase();
        segment.mark_translated(upper).unwrap();
    }
}

#[test]
fn test_wordExtract_shouldPutBodyBeforeTableCells() {
    let document = LoadedDocument::decode(FormatKind::WordProcessor, WORD_SNAPSHOT.as_bytes()).unwrap();
    let segments = document.extract();

    let texts: Vec<_> = segments.iter().map(|s| s.source_text().to_string()).collect();
    assert_eq!(texts, vec!["Quarterly report", "chart.png", "Thanks for reading", "Revenue"]);
    assert_eq!(segments[1].status(), SegmentStatus::Skipped);
    assert!(segments.iter().enumerate().all(|(i, s)| s.index == i));
}

#[test]
fn test_wordReassemble_shouldKeepImagesAndProperties() {
    let document = LoadedDocument::decode(FormatKind::WordProcessor, WORD_SNAPSHOT.as_bytes()).unwrap();
    let mut segments = document.extract();
    translate_all(&mut segments);

    let artifact = document.reassemble(&segments, OutputMode::KeepOriginal, "report").unwrap();
    let output: WordDocument = serde_json::from_slice(&artifact.bytes).unwrap();

    assert_eq!(output.properties, serde_json::from_str(r#"{ "page": "A4" }"#).unwrap());
    assert!(matches!(&output.body[1], Block::Image(image) if image.name == "chart.png"));
    let text = String::from_utf8(artifact.bytes).unwrap();
    assert!(text.contains("THANKS FOR READING"));
    assert!(text.contains("REVENUE"));
}

#[test]
fn test_presentationReassemble_shouldLeavePicturesUntouched() {
    let document = LoadedDocument::decode(FormatKind::Presentation, PRESENTATION_SNAPSHOT.as_bytes()).unwrap();
    let mut segments = document.extract();
    assert_eq!(segments.len(), 4);
    translate_all(&mut segments);

    let artifact = document.reassemble(&segments, OutputMode::KeepOriginal, "deck").unwrap();
    let output: PresentationBody = serde_json::from_slice(&artifact.bytes).unwrap();

    assert!(matches!(&output.slides[0].shapes[1], Shape::Picture { name, .. } if name == "Logo"));
    let text = String::from_utf8(artifact.bytes).unwrap();
    assert!(text.contains("WELCOME"));
    assert!(text.contains("QUESTIONS"));
}

#[test]
fn test_reassemble_calledTwice_shouldProduceIdenticalBytes() {
    let inputs = [
        (FormatKind::WordProcessor, WORD_SNAPSHOT.as_bytes().to_vec()),
        (FormatKind::Presentation, PRESENTATION_SNAPSHOT.as_bytes().to_vec()),
        (FormatKind::PdfText, b"One\n\nTwo\x0CThree".to_vec()),
    ];

    for (kind, bytes) in inputs {
        let document = LoadedDocument::decode(kind, &bytes).unwrap();
        let mut segments = document.extract();
        translate_all(&mut segments);

        for mode in [OutputMode::KeepOriginal, OutputMode::Pdf, OutputMode::SpreadsheetSummary] {
            let first = document.reassemble(&segments, mode, "doc").unwrap();
            let second = document.reassemble(&segments, mode, "doc").unwrap();
            assert_eq!(first, second, "{:?} in {:?} mode", kind, mode);
        }
    }
}

#[test]
fn test_reassemble_withFailedSegment_shouldKeepSourceText() {
    let document = LoadedDocument::decode(FormatKind::PdfText, b"Keep me\n\nTranslate me").unwrap();
    let mut segments = document.extract();
    segments[0].mark_failed("provider refused").unwrap();
    segments[1].mark_translated("Traduis-moi").unwrap();

    let artifact = document.reassemble(&segments, OutputMode::KeepOriginal, "notes").unwrap();
    assert_eq!(String::from_utf8(artifact.bytes).unwrap(), "Keep me\n\nTraduis-moi");
}

#[test]
fn test_reassemble_withSegmentsOfOtherDocument_shouldFail() {
    let document = LoadedDocument::decode(FormatKind::PdfText, b"A\n\nB").unwrap();
    let other = LoadedDocument::decode(FormatKind::PdfText, b"A").unwrap();

    assert!(document.reassemble(&other.extract(), OutputMode::KeepOriginal, "x").is_err());
}
