/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported backends:
 * - OpenAI: OpenAI-compatible chat completions
 * - Anthropic: Anthropic messages API
 * - Google: Google Cloud Translation v2 (classical MT)
 * - Mock: deterministic offline provider for demos and tests
 */

use async_trait::async_trait;
use log::debug;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, ProviderKind};
use crate::document::DomainProfile;
use crate::errors::{ConfigurationError, ProviderError};

pub mod anthropic;
pub mod google;
pub mod mock;
pub mod openai;

pub use anthropic::Anthropic;
pub use google::GoogleTranslate;
pub use mock::{MockBehavior, MockProvider};
pub use openai::OpenAi;

/// Per-call translation parameters shared by every text of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// ISO code, or `auto`
    pub source_language: String,
    pub target_language: String,
    pub domain: DomainProfile,
}

impl TranslationRequest {
    pub fn new(source_language: impl Into<String>, target_language: impl Into<String>, domain: DomainProfile) -> Self {
        Self {
            source_language: source_language.into(),
            target_language: target_language.into(),
            domain,
        }
    }
}

/// Common trait for all translation providers
///
/// Providers are stateless per call: retries, caching and rate limiting are
/// handled by `RetryingClient`. Errors must already be classified.
#[async_trait]
pub trait TranslationProvider: Send + Sync + Debug {
    /// Stable identifier used in cache keys, e.g. `openai:gpt-4o-mini`
    fn id(&self) -> String;

    /// Translate a single text
    async fn translate(&self, text: &str, request: &TranslationRequest) -> Result<String, ProviderError>;

    /// Translate several texts in one round trip.
    ///
    /// The default implementation issues one call per text. The result must
    /// hold exactly one translation per input, in input order.
    async fn translate_batch(&self, texts: &[String], request: &TranslationRequest) -> Result<Vec<String>, ProviderError> {
        let mut translations = Vec::with_capacity(texts.len());
        for text in texts {
            translations.push(self.translate(text, request).await?);
        }
        Ok(translations)
    }

    /// Test the connection and credentials
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

/// HTTP client shared by the remote providers
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Permanent(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success HTTP response into a classified error
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    let error = ProviderError::from_status(status.as_u16(), &body);
    debug!("Provider returned {} ({})", status, error.class_name());
    Err(error)
}

/// Decode a JSON body, treating malformed payloads as transient
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Transient(format!("Failed to parse provider response: {}", e)))
}

/// Build the provider selected in the configuration
pub fn build_provider(config: &Config) -> Result<Arc<dyn TranslationProvider>, ConfigurationError> {
    let translation = &config.translation;
    let settings = translation.resolved_provider();
    let timeout = Duration::from_secs(translation.common.request_timeout_secs);
    let to_config_error = |e: ProviderError| ConfigurationError::InvalidCredentials {
        provider: translation.provider.display_name().to_string(),
        message: e.to_string(),
    };

    let provider: Arc<dyn TranslationProvider> = match translation.provider {
        ProviderKind::OpenAI => Arc::new(
            OpenAi::new(&settings.api_key, &settings.endpoint, &settings.model, timeout)
                .map_err(to_config_error)?
                .with_system_prompt(&translation.common.system_prompt)
                .with_temperature(translation.common.temperature),
        ),
        ProviderKind::Anthropic => Arc::new(
            Anthropic::new(&settings.api_key, &settings.endpoint, &settings.model, timeout)
                .map_err(to_config_error)?
                .with_system_prompt(&translation.common.system_prompt)
                .with_temperature(translation.common.temperature),
        ),
        ProviderKind::Google => {
            Arc::new(GoogleTranslate::new(&settings.api_key, &settings.endpoint, timeout).map_err(to_config_error)?)
        }
        ProviderKind::Mock => Arc::new(MockProvider::echo()),
    };

    Ok(provider)
}
