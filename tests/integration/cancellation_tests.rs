/*!
 * Tests for batch cancellation and provider quota handling
 */

use std::time::Duration;

use doctrans::app_config::QuotaPolicy;
use doctrans::document::SegmentStatus;
use doctrans::errors::ProviderError;
use doctrans::pipeline::{BatchOrchestrator, BatchState, JobState};
use doctrans::providers::MockProvider;

use crate::common;

fn quota_error() -> ProviderError {
    ProviderError::QuotaExhausted("monthly character quota used up".to_string())
}

#[tokio::test]
async fn test_cancel_beforeJobsStart_shouldNotCallProvider() {
    let dir = common::create_temp_dir().unwrap();
    let paths = vec![
        common::create_test_pdf_text(dir.path(), "a.pdf.txt", &["One", "Two"]).unwrap(),
        common::create_test_pdf_text(dir.path(), "b.pdf.txt", &["Three"]).unwrap(),
    ];
    let provider = MockProvider::echo();

    let handle = BatchOrchestrator::new(common::test_config("en", "ja"))
        .submit_batch(common::sources(&paths, "en"), common::options_for(&provider, "ja"))
        .unwrap();
    handle.cancel();
    let result = handle.wait().await.unwrap();

    assert_eq!(result.state, BatchState::Cancelled);
    assert!(result.documents.iter().all(|d| d.state == JobState::Cancelled));
    assert!(result.documents.iter().all(|d| d.output_path.is_none()));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_cancel_duringTranslation_shouldStopDispatchingChunks() {
    let dir = common::create_temp_dir().unwrap();
    let paragraphs: Vec<String> = (1..=10).map(|i| format!("Line {}", i)).collect();
    let refs: Vec<&str> = paragraphs.iter().map(String::as_str).collect();
    let path = common::create_test_pdf_text(dir.path(), "long.pdf.txt", &refs).unwrap();

    let mut config = common::test_config("en", "ja");
    config.pipeline.max_segments_per_chunk = 1;
    config.pipeline.max_concurrent_chunks = 1;
    let provider = MockProvider::echo().with_delay(Duration::from_millis(50));

    let handle = BatchOrchestrator::new(config)
        .submit_batch(common::sources(&[path], "en"), common::options_for(&provider, "ja"))
        .unwrap();
    let mut subscription = handle.subscribe();

    while let Some(event) = subscription.next().await {
        if event.translated >= 1 {
            handle.cancel();
            break;
        }
    }
    let result = handle.wait().await.unwrap();

    let document = &result.documents[0];
    assert_eq!(document.state, JobState::Cancelled);
    assert!(document.output_path.is_none());
    assert!(document.translated >= 1);
    assert!(provider.call_count() < 10);
    assert!(document.segments.iter().any(|s| s.status() == SegmentStatus::Pending));
}

#[tokio::test]
async fn test_quotaExhausted_withAbortPolicy_shouldCancelRemainingDocuments() {
    let dir = common::create_temp_dir().unwrap();
    let paths = vec![
        common::create_test_pdf_text(dir.path(), "first.pdf.txt", &["Alpha", "Beta"]).unwrap(),
        common::create_test_pdf_text(dir.path(), "second.pdf.txt", &["Gamma"]).unwrap(),
    ];

    let mut config = common::test_config("en", "ko");
    config.pipeline.max_concurrent_documents = 1;
    config.pipeline.quota_policy = QuotaPolicy::AbortBatch;
    let provider = MockProvider::echo().failing(quota_error());

    let result = BatchOrchestrator::new(config)
        .run_batch(common::sources(&paths, "en"), common::options_for(&provider, "ko"))
        .await
        .unwrap();

    let first = &result.documents[0];
    assert_eq!(first.state, JobState::CompletedWithErrors);
    assert!(first.quota_exhausted);
    assert_eq!(first.failed, 2);
    assert!(first.output_path.is_some());

    assert_eq!(result.documents[1].state, JobState::Cancelled);
    assert_eq!(result.state, BatchState::Cancelled);

    // Quota errors are not retried
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_quotaExhausted_withContinuePolicy_shouldRunEveryDocument() {
    let dir = common::create_temp_dir().unwrap();
    let paths = vec![
        common::create_test_pdf_text(dir.path(), "first.pdf.txt", &["Alpha"]).unwrap(),
        common::create_test_pdf_text(dir.path(), "second.pdf.txt", &["Gamma"]).unwrap(),
    ];

    let mut config = common::test_config("en", "ko");
    config.pipeline.max_concurrent_documents = 1;
    config.pipeline.quota_policy = QuotaPolicy::Continue;
    let provider = MockProvider::echo().failing(quota_error());

    let result = BatchOrchestrator::new(config)
        .run_batch(common::sources(&paths, "en"), common::options_for(&provider, "ko"))
        .await
        .unwrap();

    assert_eq!(result.state, BatchState::CompletedWithErrors);
    assert!(result.documents.iter().all(|d| d.state == JobState::CompletedWithErrors));
    assert!(result.documents.iter().all(|d| d.quota_exhausted));
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_transientFailure_shouldRecoverWithinRetryBudget() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_pdf_text(dir.path(), "retry.pdf.txt", &["Hello"]).unwrap();

    let provider = MockProvider::echo().failing_first(2, ProviderError::Transient("503".to_string()));
    let result = BatchOrchestrator::new(common::test_config("en", "ko"))
        .run_batch(common::sources(&[path], "en"), common::options_for(&provider, "ko"))
        .await
        .unwrap();

    assert_eq!(result.state, BatchState::Completed);
    assert_eq!(provider.call_count(), 3);
}
