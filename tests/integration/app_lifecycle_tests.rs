/*!
 * Full app lifecycle tests: configuration, controller run and issue reporting
 */

use std::fs;
use std::sync::Arc;

use doctrans::app_config::Config;
use doctrans::app_controller::{Controller, ISSUES_LOG_FILE};
use doctrans::errors::{ConfigurationError, ProviderError};
use doctrans::pipeline::BatchState;
use doctrans::providers::MockProvider;

use crate::common;

#[tokio::test]
async fn test_controllerRun_withDirectory_shouldTranslateEveryDocument() {
    common::init_test_logging();
    let input = common::create_temp_dir().unwrap();
    let output = common::create_temp_dir().unwrap();
    common::create_test_pdf_text(input.path(), "a.pdf.txt", &["First"]).unwrap();
    common::create_test_pdf_text(input.path(), "b.pdf.txt", &["Second"]).unwrap();

    let mut config = common::test_config("en", "fr");
    config.output.directory = Some(output.path().to_path_buf());
    config.output.naming_rule = "{name}.{lang}".to_string();

    let controller = Controller::with_config(config).unwrap();
    let result = controller.run(&[input.path().to_path_buf()]).await.unwrap();

    assert_eq!(result.state, BatchState::Completed);
    assert_eq!(result.documents.len(), 2);
    assert_eq!(fs::read_to_string(output.path().join("a.fr.pdf.txt")).unwrap(), "[fr] First");
    assert_eq!(fs::read_to_string(output.path().join("b.fr.pdf.txt")).unwrap(), "[fr] Second");
    assert!(!output.path().join(ISSUES_LOG_FILE).exists());
}

#[tokio::test]
async fn test_controllerRun_withFailedSegments_shouldWriteIssuesLog() {
    common::init_test_logging();
    let input = common::create_temp_dir().unwrap();
    let path = common::create_test_pdf_text(input.path(), "memo.pdf.txt", &["Fine", "Refused"]).unwrap();

    let mut config = common::test_config("en", "de");
    config.pipeline.max_segments_per_chunk = 1;
    let provider = MockProvider::echo().failing_for("Refused", ProviderError::Permanent("blocked".to_string()));

    let controller = Controller::with_config(config).unwrap();
    let result = controller
        .run_with_provider(&[path], Arc::new(provider))
        .await
        .unwrap();

    assert_eq!(result.state, BatchState::CompletedWithErrors);
    let log = fs::read_to_string(input.path().join(ISSUES_LOG_FILE)).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains("memo.pdf.txt #1"));
    assert!(log.contains("blocked"));
}

#[tokio::test]
async fn test_controllerRun_withPersistentCache_shouldReuseTranslationsAcrossRuns() {
    let input = common::create_temp_dir().unwrap();
    let path = common::create_test_pdf_text(input.path(), "memo.pdf.txt", &["Cached text"]).unwrap();

    let mut config = common::test_config("en", "nl");
    config.cache.persistent = true;
    config.cache.path = Some(input.path().join("cache.db"));

    let first_provider = MockProvider::echo();
    let controller = Controller::with_config(config.clone()).unwrap();
    controller
        .run_with_provider(&[path.clone()], Arc::new(first_provider.clone()))
        .await
        .unwrap();
    assert_eq!(first_provider.call_count(), 1);

    // A new controller opens the same cache file
    let second_provider = MockProvider::echo();
    let controller = Controller::with_config(config).unwrap();
    let result = controller
        .run_with_provider(&[path], Arc::new(second_provider.clone()))
        .await
        .unwrap();

    assert_eq!(second_provider.call_count(), 0);
    assert_eq!(result.documents[0].cache_hits, 1);
}

#[test]
fn test_checkProvider_withRejectedCredentials_shouldBeConfigurationError() {
    let controller = Controller::with_config(common::test_config("en", "ko")).unwrap();
    let provider = MockProvider::echo().failing(ProviderError::Permanent("401 invalid api key".to_string()));

    let result = tokio_test::block_on(controller.check_provider(&provider));

    match result {
        Err(ConfigurationError::InvalidCredentials { message, .. }) => assert!(message.contains("invalid api key")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_controller_withInvalidLanguagePair_shouldBeRejected() {
    let config: Config = common::test_config("fr", "fr");
    assert!(Controller::with_config(config).is_err());
}
