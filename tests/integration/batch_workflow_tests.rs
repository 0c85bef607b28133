/*!
 * End-to-end tests for batch translation.
 *
 * Documents are written to a temporary directory, translated through the
 * offline mock provider and read back from their output files.
 */

use std::collections::HashMap;
use std::fs;

use doctrans::document::{DomainProfile, SegmentStatus};
use doctrans::errors::{ConfigurationError, ProviderError};
use doctrans::formats::spreadsheet::CellValue;
use doctrans::pipeline::{BatchOrchestrator, BatchState, JobState};
use doctrans::providers::MockProvider;

use crate::common;

fn text(value: &str) -> CellValue {
    CellValue::Text(value.to_string())
}

#[tokio::test]
async fn test_runBatch_helloWorldWorkbookScenario_shouldTranslateTextAndKeepFormula() {
    common::init_test_logging();
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_workbook(
        dir.path(),
        "report.xlsx.json",
        vec![text("Hello"), CellValue::Formula("=SUM(A1:A2)".to_string()), text("World")],
    )
    .unwrap();

    let provider = MockProvider::dictionary([("Hello", "안녕"), ("World", "세계")]);
    let orchestrator = BatchOrchestrator::new(common::test_config("en", "ko"));
    let result = orchestrator
        .run_batch(common::sources(&[path], "en"), common::options_for(&provider, "ko"))
        .await
        .unwrap();

    assert_eq!(result.state, BatchState::Completed);
    let document = &result.documents[0];
    assert_eq!(document.state, JobState::Completed);
    assert_eq!((document.translated, document.skipped, document.failed), (2, 1, 0));

    let output = document.output_path.clone().unwrap();
    assert_eq!(output, dir.path().join("report_translated_ko.xlsx.json"));
    assert_eq!(
        common::read_workbook_values(&output).unwrap(),
        vec!["안녕", "=SUM(A1:A2)", "세계"]
    );
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_runBatch_withNoTranslatableText_shouldCompleteAndWriteOutput() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_workbook(dir.path(), "numbers.xlsx.json", vec![CellValue::Number(42.0)]).unwrap();
    let provider = MockProvider::echo();

    let handle = BatchOrchestrator::new(common::test_config("en", "ko"))
        .submit_batch(common::sources(&[path], "en"), common::options_for(&provider, "ko"))
        .unwrap();
    let mut subscription = handle.subscribe();
    let mut states = Vec::new();
    while let Some(event) = subscription.next().await {
        if states.last() != Some(&event.state) {
            states.push(event.state);
        }
    }
    let result = handle.wait().await.unwrap();

    assert_eq!(
        states,
        vec![
            JobState::Created,
            JobState::Extracting,
            JobState::Translating,
            JobState::Reassembling,
            JobState::Completed
        ]
    );
    let document = &result.documents[0];
    assert_eq!(document.state, JobState::Completed);
    assert_eq!(document.total, 0);
    assert_eq!(provider.call_count(), 0);

    let output = document.output_path.clone().unwrap();
    assert_eq!(common::read_workbook_values(&output).unwrap(), vec!["42"]);
}

#[tokio::test]
async fn test_runBatch_withUnwritableOutputDir_shouldFailInReassembly() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_pdf_text(dir.path(), "memo.pdf.txt", &["Hello"]).unwrap();
    let blocker = common::create_test_file(dir.path(), "not_a_directory", "plain file").unwrap();

    let provider = MockProvider::echo();
    let options = common::options_for(&provider, "fr").with_output_dir(&blocker);
    let result = BatchOrchestrator::new(common::test_config("en", "fr"))
        .run_batch(common::sources(&[path], "en"), options)
        .await
        .unwrap();

    let document = &result.documents[0];
    assert_eq!(result.state, BatchState::Failed);
    assert_eq!(document.state, JobState::Failed);
    assert_eq!(document.translated, 1);
    assert!(document.output_path.is_none());
    assert!(document.error.as_deref().unwrap().contains("Failed to write output"));
}

#[tokio::test]
async fn test_runBatch_withSameFileNameInTwoFolders_shouldWriteBothOutputs() {
    let dir = common::create_temp_dir().unwrap();
    let first_dir = dir.path().join("a");
    let second_dir = dir.path().join("b");
    fs::create_dir_all(&first_dir).unwrap();
    fs::create_dir_all(&second_dir).unwrap();
    let paths = vec![
        common::create_test_pdf_text(&first_dir, "report.pdf.txt", &["Alpha"]).unwrap(),
        common::create_test_pdf_text(&second_dir, "report.pdf.txt", &["Beta"]).unwrap(),
    ];

    let provider = MockProvider::echo();
    let options = common::options_for(&provider, "fr").with_output_dir(dir.path().join("out"));
    let result = BatchOrchestrator::new(common::test_config("en", "fr"))
        .run_batch(common::sources(&paths, "en"), options)
        .await
        .unwrap();

    assert_eq!(result.state, BatchState::Completed);
    let outputs: Vec<_> = result.documents.iter().map(|d| d.output_path.clone().unwrap()).collect();
    assert_ne!(outputs[0], outputs[1]);

    let mut contents: Vec<String> = outputs.iter().map(|p| fs::read_to_string(p).unwrap()).collect();
    contents.sort();
    assert_eq!(contents, vec!["[fr] Alpha", "[fr] Beta"]);

    let mut names: Vec<String> = outputs
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["report_translated_fr.pdf.txt", "report_translated_fr_2.pdf.txt"]);
}

#[tokio::test]
async fn test_runBatch_withNamingRuleMatchingSource_shouldKeepSourceIntact() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_pdf_text(dir.path(), "memo.pdf.txt", &["Hello"]).unwrap();

    let mut config = common::test_config("en", "fr");
    config.output.naming_rule = "{name}".to_string();
    let provider = MockProvider::echo();

    let result = BatchOrchestrator::new(config)
        .run_batch(common::sources(&[path.clone()], "en"), common::options_for(&provider, "fr"))
        .await
        .unwrap();

    let output = result.documents[0].output_path.clone().unwrap();
    assert_eq!(output, dir.path().join("memo_2.pdf.txt"));
    assert_eq!(fs::read_to_string(&path).unwrap(), "Hello");
    assert_eq!(fs::read_to_string(&output).unwrap(), "[fr] Hello");
}

#[tokio::test]
async fn test_runBatch_withPermanentFailure_shouldCompleteWithErrors() {
    let dir = common::create_temp_dir().unwrap();
    let flaky = common::create_test_pdf_text(dir.path(), "flaky.pdf.txt", &["Good", "Broken", "Fine"]).unwrap();
    let clean = common::create_test_pdf_text(dir.path(), "clean.pdf.txt", &["Alpha", "Beta"]).unwrap();

    let mut config = common::test_config("en", "fr");
    config.pipeline.max_segments_per_chunk = 1;
    let provider = MockProvider::echo().failing_for("Broken", ProviderError::Permanent("rejected".to_string()));

    let result = BatchOrchestrator::new(config)
        .run_batch(common::sources(&[flaky, clean], "en"), common::options_for(&provider, "fr"))
        .await
        .unwrap();

    assert_eq!(result.state, BatchState::CompletedWithErrors);
    assert_eq!(result.documents[0].state, JobState::CompletedWithErrors);
    assert_eq!(result.documents[1].state, JobState::Completed);

    let failed: Vec<_> = result.failed_segments().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].1.index, 1);

    // Permanent errors are not retried: one call per segment
    assert_eq!(provider.call_count(), 5);

    let output = fs::read_to_string(result.documents[0].output_path.as_ref().unwrap()).unwrap();
    assert_eq!(output, "[fr] Good\n\nBroken\n\n[fr] Fine");
}

#[tokio::test]
async fn test_runBatch_withCorruptDocument_shouldFailOnlyThatDocument() {
    let dir = common::create_temp_dir().unwrap();
    let corrupt = common::create_test_file(dir.path(), "broken.xlsx.json", "{ not a workbook").unwrap();
    let good = common::create_test_pdf_text(dir.path(), "good.pdf.txt", &["Hello"]).unwrap();

    let provider = MockProvider::echo();
    let result = BatchOrchestrator::new(common::test_config("en", "de"))
        .run_batch(common::sources(&[corrupt, good], "en"), common::options_for(&provider, "de"))
        .await
        .unwrap();

    assert_eq!(result.state, BatchState::Failed);
    assert_eq!(result.documents[0].state, JobState::Failed);
    assert!(result.documents[0].error.is_some());
    assert!(result.documents[0].output_path.is_none());
    assert_eq!(result.documents[1].state, JobState::Completed);
    assert_eq!(result.failed_documents().count(), 1);
}

#[tokio::test]
async fn test_runBatch_withConcurrentChunks_shouldPreserveSegmentOrder() {
    let dir = common::create_temp_dir().unwrap();
    let paragraphs: Vec<String> = (1..=12).map(|i| format!("Paragraph {}", i)).collect();
    let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
    let paths = vec![
        common::create_test_pdf_text(dir.path(), "a.pdf.txt", &refs).unwrap(),
        common::create_test_pdf_text(dir.path(), "b.pdf.txt", &refs[..3]).unwrap(),
        common::create_test_pdf_text(dir.path(), "c.pdf.txt", &refs[..6]).unwrap(),
    ];

    let mut config = common::test_config("en", "es");
    config.pipeline.max_segments_per_chunk = 2;
    config.pipeline.max_concurrent_chunks = 4;
    config.pipeline.max_concurrent_documents = 3;
    let provider = MockProvider::echo().with_delay(std::time::Duration::from_millis(5));

    let result = BatchOrchestrator::new(config)
        .run_batch(common::sources(&paths, "en"), common::options_for(&provider, "es"))
        .await
        .unwrap();

    let result_paths: Vec<_> = result.documents.iter().map(|d| d.source_path.clone()).collect();
    assert_eq!(result_paths, paths);

    let expected: Vec<String> = paragraphs.iter().map(|p| format!("[es] {}", p)).collect();
    let output = fs::read_to_string(result.documents[0].output_path.as_ref().unwrap()).unwrap();
    assert_eq!(output, expected.join("\n\n"));

    let segments = &result.documents[0].segments;
    assert!(segments.iter().enumerate().all(|(i, s)| s.index == i));
    assert!(segments.iter().all(|s| s.status() == SegmentStatus::Translated));
}

#[tokio::test]
async fn test_runBatch_twice_shouldServeSecondRunFromCache() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_pdf_text(dir.path(), "memo.pdf.txt", &["Good morning", "See you soon"]).unwrap();

    let provider = MockProvider::echo();
    let orchestrator = BatchOrchestrator::new(common::test_config("en", "it"));

    let first = orchestrator
        .run_batch(common::sources(&[path.clone()], "en"), common::options_for(&provider, "it"))
        .await
        .unwrap();
    let calls_after_first = provider.call_count();
    let second = orchestrator
        .run_batch(common::sources(&[path.clone()], "en"), common::options_for(&provider, "it"))
        .await
        .unwrap();

    assert_eq!(first.documents[0].cache_hits, 0);
    assert_eq!(second.documents[0].cache_hits, 2);
    assert_eq!(provider.call_count(), calls_after_first);
    assert_eq!(
        fs::read(first.documents[0].output_path.as_ref().unwrap()).unwrap(),
        fs::read(second.documents[0].output_path.as_ref().unwrap()).unwrap()
    );

    // A different domain is a different cache key
    let mut options = common::options_for(&provider, "it");
    options.domain = DomainProfile::Sports;
    let third = orchestrator
        .run_batch(common::sources(&[path], "en"), options)
        .await
        .unwrap();
    assert_eq!(third.documents[0].cache_hits, 0);
    assert!(provider.call_count() > calls_after_first);
}

#[tokio::test]
async fn test_submitBatch_shouldEmitOrderedProgressEndingInTerminalStates() {
    let dir = common::create_temp_dir().unwrap();
    let paths = vec![
        common::create_test_pdf_text(dir.path(), "one.pdf.txt", &["A", "B", "C", "D"]).unwrap(),
        common::create_test_pdf_text(dir.path(), "two.pdf.txt", &["E", "F"]).unwrap(),
    ];

    let mut config = common::test_config("en", "pt");
    config.pipeline.max_segments_per_chunk = 1;
    let provider = MockProvider::echo();

    let handle = BatchOrchestrator::new(config)
        .submit_batch(common::sources(&paths, "en"), common::options_for(&provider, "pt"))
        .unwrap();
    let mut subscription = handle.subscribe();

    let mut events = Vec::new();
    while let Some(event) = subscription.next().await {
        events.push(event);
    }
    let result = handle.wait().await.unwrap();

    assert!(!events.is_empty());
    for (position, event) in events.iter().enumerate() {
        assert_eq!(event.sequence, position as u64 + 1);
    }

    let mut last_done: HashMap<_, usize> = HashMap::new();
    let mut last_state = HashMap::new();
    for event in &events {
        let done = event.translated + event.failed + event.skipped;
        let previous = last_done.insert(event.document_id, done).unwrap_or(0);
        assert!(done >= previous, "progress went backwards for {}", event.document_name);
        last_state.insert(event.document_id, event.state);
    }

    assert_eq!(last_state.len(), 2);
    assert!(last_state.values().all(|state| *state == JobState::Completed));

    let last = events.last().unwrap();
    assert_eq!(last.batch.documents_finished, 2);
    assert_eq!(last.batch.segments.translated, 6);
    assert_eq!(result.progress.segments.translated, 6);
}

#[tokio::test]
async fn test_submitBatch_withZeroRequestTimeout_shouldBeRejected() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_pdf_text(dir.path(), "memo.pdf.txt", &["Hello"]).unwrap();
    let mut config = common::test_config("en", "fr");
    config.translation.common.request_timeout_secs = 0;
    let provider = MockProvider::echo();

    let submitted = BatchOrchestrator::new(config).submit_batch(common::sources(&[path], "en"), common::options_for(&provider, "fr"));

    assert!(matches!(
        submitted,
        Err(ConfigurationError::InvalidSetting { name, .. }) if name == "translation.common.request_timeout_secs"
    ));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_submitBatch_withSameSourceAndTarget_shouldBeRejected() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_pdf_text(dir.path(), "same.pdf.txt", &["Hello"]).unwrap();
    let provider = MockProvider::echo();

    let submitted = BatchOrchestrator::new(common::test_config("en", "fr"))
        .submit_batch(common::sources(&[path], "en"), common::options_for(&provider, "en"));

    assert!(submitted.is_err());
    assert_eq!(provider.call_count(), 0);
}
