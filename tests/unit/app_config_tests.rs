/*!
 * Tests for configuration loading and provider resolution
 */

use doctrans::app_config::{Config, ProviderKind, QuotaPolicy};
use doctrans::document::{DomainProfile, OutputMode};

use crate::common;

#[test]
fn test_loadOrCreate_withExistingFile_shouldReadSettings() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "doctrans.json",
        r#"{
            "source_language": "en",
            "target_language": "ko",
            "domain": "technical",
            "translation": {
                "provider": "anthropic",
                "available_providers": [
                    { "type": "anthropic", "api_key": "sk-test", "concurrent_requests": 2 }
                ]
            },
            "pipeline": { "quota_policy": "continue" },
            "output": { "mode": "spreadsheet_summary" }
        }"#,
    )
    .unwrap();

    let (config, created) = Config::load_or_create(&path).unwrap();

    assert!(!created);
    assert_eq!(config.target_language, "ko");
    assert_eq!(config.domain, DomainProfile::Technical);
    assert_eq!(config.translation.provider, ProviderKind::Anthropic);
    assert_eq!(config.pipeline.quota_policy, QuotaPolicy::Continue);
    assert_eq!(config.output.mode, OutputMode::SpreadsheetSummary);
    assert!(config.validate().is_ok());

    let resolved = config.translation.resolved_provider();
    assert_eq!(resolved.concurrent_requests, 2);
    assert!(!resolved.model.is_empty());
}

#[test]
fn test_loadOrCreate_withMalformedFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "doctrans.json", "{ not json").unwrap();

    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_activeProviderConfigMut_withMissingEntry_shouldCreateIt() {
    let mut config = common::test_config("en", "fr");
    config.translation.available_providers.clear();
    config.translation.provider = ProviderKind::Google;

    config.translation.active_provider_config_mut().api_key = "key".to_string();

    assert_eq!(config.translation.available_providers.len(), 1);
    assert_eq!(config.translation.get_api_key(), "key");
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withAutoTarget_shouldFail() {
    let config = common::test_config("en", "auto");
    assert!(config.validate().is_err());
}
