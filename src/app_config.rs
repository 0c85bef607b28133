use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::document::{DomainProfile, OutputMode};
use crate::errors::ConfigurationError;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO), or `auto`
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Default domain profile
    #[serde(default)]
    pub domain: DomainProfile,

    /// Translation config
    pub translation: TranslationConfig,

    /// Pipeline limits
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Translation cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    // @provider: OpenAI-compatible chat completions
    #[default]
    OpenAI,
    // @provider: Anthropic messages API
    Anthropic,
    // @provider: Google Cloud Translation v2
    Google,
    // @provider: Offline demo provider
    Mock,
}

impl ProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Google => "Google Translate",
            Self::Mock => "Demo",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Google => "google".to_string(),
            Self::Mock => "mock".to_string(),
        }
    }

    /// Whether the provider needs an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Mock)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "google" => Ok(Self::Google),
            "mock" | "demo" => Ok(Self::Mock),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name (unused by classical MT)
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests to this provider across the batch
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: ProviderKind) -> Self {
        let (model, endpoint, concurrent_requests, rate_limit) = match provider_type {
            ProviderKind::OpenAI => (default_openai_model(), default_openai_endpoint(), 10, Some(60)),
            ProviderKind::Anthropic => (default_anthropic_model(), default_anthropic_endpoint(), 5, Some(45)),
            ProviderKind::Google => (String::new(), default_google_endpoint(), 8, Some(300)),
            ProviderKind::Mock => (String::new(), String::new(), default_concurrent_requests(), None),
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            concurrent_requests,
            rate_limit,
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: ProviderKind,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// System prompt template for LLM providers
    /// Placeholders: {source_language}, {target_language}, {domain_instructions}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Maximum attempts per provider call, the first one included
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Delay before the first retry, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Multiplier applied to the delay after each retry
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,

    /// Timeout of a single provider call, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            backoff_factor: default_backoff_factor(),
            request_timeout_secs: default_request_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

/// What a batch does once a provider reports exhausted quota
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuotaPolicy {
    /// Cancel the documents that have not finished yet
    #[default]
    AbortBatch,
    /// Only the affected document stops translating
    Continue,
}

/// Concurrency and chunking limits
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_max_concurrent_documents")]
    pub max_concurrent_documents: usize,

    /// In-flight chunk requests per document
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,

    #[serde(default = "default_max_chars_per_chunk")]
    pub max_chars_per_chunk: usize,

    #[serde(default = "default_max_segments_per_chunk")]
    pub max_segments_per_chunk: usize,

    #[serde(default)]
    pub max_tokens_per_chunk: Option<usize>,

    #[serde(default)]
    pub quota_policy: QuotaPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_documents: default_max_concurrent_documents(),
            max_concurrent_chunks: default_max_concurrent_chunks(),
            max_chars_per_chunk: default_max_chars_per_chunk(),
            max_segments_per_chunk: default_max_segments_per_chunk(),
            max_tokens_per_chunk: None,
            quota_policy: QuotaPolicy::default(),
        }
    }
}

/// Translation cache settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Keep entries in a SQLite file across runs
    #[serde(default)]
    pub persistent: bool,

    /// Database path; the user data directory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persistent: false,
            path: None,
        }
    }
}

/// Where and how translated documents are written
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default)]
    pub mode: OutputMode,

    /// Output directory; next to each source file when unset
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// File name template: {name}, {lang}, {date}, {time}
    #[serde(default = "default_naming_rule")]
    pub naming_rule: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputMode::default(),
            directory: None,
            naming_rule: default_naming_rule(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "auto".to_string()
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, multiplied on each retry
}

fn default_backoff_factor() -> u32 {
    2
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_documents() -> usize {
    4
}

fn default_max_concurrent_chunks() -> usize {
    2
}

fn default_max_chars_per_chunk() -> usize {
    crate::translation::chunker::DEFAULT_MAX_CHARS
}

fn default_max_segments_per_chunk() -> usize {
    crate::translation::chunker::DEFAULT_MAX_SEGMENTS
}

fn default_naming_rule() -> String {
    "{name}_translated_{lang}".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_google_endpoint() -> String {
    "https://translation.googleapis.com/language/translate/v2".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_system_prompt() -> String {
    "You are a professional translator. Translate the following text from {source_language} to {target_language}. {domain_instructions} Preserve the original meaning and tone, and output only the translation.".to_string()
}

impl Config {
    /// Load the configuration from `path`, writing a default file first when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
            let config: Config =
                serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok((config, false));
        }

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json).with_context(|| format!("Failed to write default config to file: {:?}", path))?;
        Ok((config, true))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        crate::language_utils::check_language_pair(&self.source_language, &self.target_language)?;

        if self.translation.provider.requires_api_key() && self.translation.get_api_key().is_empty() {
            return Err(ConfigurationError::InvalidCredentials {
                provider: self.translation.provider.display_name().to_string(),
                message: "an API key is required".to_string(),
            });
        }

        self.validate_settings()
    }

    /// Limits and output settings; everything except languages and credentials
    pub fn validate_settings(&self) -> Result<(), ConfigurationError> {
        let limits = [
            ("pipeline.max_concurrent_documents", self.pipeline.max_concurrent_documents),
            ("pipeline.max_concurrent_chunks", self.pipeline.max_concurrent_chunks),
            ("pipeline.max_chars_per_chunk", self.pipeline.max_chars_per_chunk),
            ("pipeline.max_segments_per_chunk", self.pipeline.max_segments_per_chunk),
            ("translation.common.retry_count", self.translation.common.retry_count as usize),
            ("translation.common.request_timeout_secs", self.translation.common.request_timeout_secs as usize),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigurationError::InvalidSetting {
                name: name.to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.pipeline.max_tokens_per_chunk == Some(0) {
            return Err(ConfigurationError::InvalidSetting {
                name: "pipeline.max_tokens_per_chunk".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if !self.output.naming_rule.contains("{name}") {
            return Err(ConfigurationError::InvalidSetting {
                name: "output.naming_rule".to_string(),
                message: "must contain the {name} placeholder".to_string(),
            });
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: "en".to_string(),
            domain: DomainProfile::default(),
            translation: TranslationConfig::default(),
            pipeline: PipelineConfig::default(),
            cache: CacheConfig::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &ProviderKind) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter().find(|p| p.provider_type == provider_str)
    }

    /// Mutable configuration of the active provider, created with defaults when absent
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(position) => position,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Settings of the active provider with the defaults filled in
    pub fn resolved_provider(&self) -> ProviderConfig {
        let defaults = ProviderConfig::new(self.provider);
        match self.get_active_provider_config() {
            Some(config) => ProviderConfig {
                provider_type: defaults.provider_type,
                model: non_empty_or(&config.model, defaults.model),
                api_key: config.api_key.clone(),
                endpoint: non_empty_or(&config.endpoint, defaults.endpoint),
                concurrent_requests: if config.concurrent_requests > 0 {
                    config.concurrent_requests
                } else {
                    defaults.concurrent_requests
                },
                rate_limit: config.rate_limit.filter(|r| *r > 0),
            },
            None => defaults,
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.resolved_provider().model
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.resolved_provider().endpoint
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        self.resolved_provider().rate_limit
    }
}

fn non_empty_or(value: &str, fallback: String) -> String {
    if value.is_empty() { fallback } else { value.to_string() }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            available_providers: vec![
                ProviderConfig::new(ProviderKind::OpenAI),
                ProviderConfig::new(ProviderKind::Anthropic),
                ProviderConfig::new(ProviderKind::Google),
                ProviderConfig::new(ProviderKind::Mock),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.source_language = "ko".to_string();
        config.target_language = "en".to_string();
        config.translation.provider = ProviderKind::Mock;
        config
    }

    #[test]
    fn test_default_shouldUseDocumentedValues() {
        let config = Config::default();
        assert_eq!(config.translation.common.retry_count, 3);
        assert_eq!(config.translation.common.retry_backoff_ms, 1000);
        assert_eq!(config.translation.common.backoff_factor, 2);
        assert_eq!(config.pipeline.max_concurrent_documents, 4);
        assert_eq!(config.pipeline.max_chars_per_chunk, 4000);
        assert_eq!(config.pipeline.max_segments_per_chunk, 50);
        assert_eq!(config.pipeline.quota_policy, QuotaPolicy::AbortBatch);
        assert_eq!(config.output.naming_rule, "{name}_translated_{lang}");
    }

    #[test]
    fn test_validate_withMockProvider_shouldPass() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_withMissingApiKey_shouldFail() {
        let mut config = valid_config();
        config.translation.provider = ProviderKind::OpenAI;
        assert!(matches!(config.validate(), Err(ConfigurationError::InvalidCredentials { .. })));

        config.translation.active_provider_config_mut().api_key = "sk-test".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_withZeroLimit_shouldFail() {
        let mut config = valid_config();
        config.pipeline.max_concurrent_documents = 0;
        match config.validate() {
            Err(ConfigurationError::InvalidSetting { name, .. }) => {
                assert_eq!(name, "pipeline.max_concurrent_documents")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_validate_withSameLanguages_shouldFail() {
        let mut config = valid_config();
        config.source_language = "en".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::UnsupportedLanguagePair { .. })
        ));
    }

    #[test]
    fn test_deserialize_partialFile_shouldFillDefaults() {
        let json = r#"{
            "target_language": "ko",
            "domain": "technical",
            "translation": { "provider": "google", "available_providers": [
                { "type": "google", "api_key": "key" }
            ]},
            "output": { "mode": "spreadsheet_summary" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.source_language, "auto");
        assert_eq!(config.domain, DomainProfile::Technical);
        assert_eq!(config.output.mode, OutputMode::SpreadsheetSummary);
        assert_eq!(config.translation.get_endpoint(), default_google_endpoint());
        assert_eq!(config.translation.get_api_key(), "key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_providerKind_fromStr_shouldRoundTrip() {
        for kind in [ProviderKind::OpenAI, ProviderKind::Anthropic, ProviderKind::Google, ProviderKind::Mock] {
            assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_loadOrCreate_withMissingFile_shouldWriteDefault() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doctrans.json");

        let (_, created) = Config::load_or_create(&path).unwrap();
        assert!(created);
        assert!(path.exists());

        let (config, created) = Config::load_or_create(&path).unwrap();
        assert!(!created);
        assert_eq!(config.target_language, "en");
    }
}
