/*!
 * Google Cloud Translation (v2, basic edition).
 *
 * Classical MT: the domain profile has no effect on the request, and the
 * service batches natively through repeated `q` values.
 */

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::{TranslationProvider, TranslationRequest, check_status, http_client, read_json};
use crate::errors::ProviderError;
use crate::language_utils;

#[derive(Debug)]
pub struct GoogleTranslate {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct TranslateBody<'a> {
    q: &'a [String],
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

impl GoogleTranslate {
    pub fn new(api_key: &str, endpoint: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.to_string(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        let base = if path.is_empty() {
            self.endpoint.clone()
        } else {
            format!("{}/{}", self.endpoint, path)
        };
        Url::parse_with_params(&base, &[("key", self.api_key.as_str())])
            .map_err(|e| ProviderError::Permanent(format!("Invalid Google endpoint {}: {}", self.endpoint, e)))
    }

    fn body<'a>(texts: &'a [String], request: &TranslationRequest) -> TranslateBody<'a> {
        let to_code = |code: &str| language_utils::normalize_to_part1_or_part2t(code).unwrap_or_else(|_| code.to_string());
        TranslateBody {
            q: texts,
            target: to_code(&request.target_language),
            source: if language_utils::is_auto_detect(&request.source_language) {
                None
            } else {
                Some(to_code(&request.source_language))
            },
            format: "text",
        }
    }
}

#[async_trait]
impl TranslationProvider for GoogleTranslate {
    fn id(&self) -> String {
        "google".to_string()
    }

    async fn translate(&self, text: &str, request: &TranslationRequest) -> Result<String, ProviderError> {
        let mut translations = self.translate_batch(&[text.to_string()], request).await?;
        translations
            .pop()
            .ok_or_else(|| ProviderError::Transient("Empty translation list".to_string()))
    }

    async fn translate_batch(&self, texts: &[String], request: &TranslationRequest) -> Result<Vec<String>, ProviderError> {
        let response = self
            .client
            .post(self.url("")?)
            .json(&Self::body(texts, request))
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        let parsed: TranslateResponse = read_json(check_status(response).await?).await?;
        let translations: Vec<String> = parsed
            .data
            .translations
            .into_iter()
            .map(|t| t.translated_text)
            .collect();

        if translations.len() != texts.len() {
            return Err(ProviderError::Transient(format!(
                "Expected {} translations, got {}",
                texts.len(),
                translations.len()
            )));
        }
        Ok(translations)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(self.url("languages")?)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;
        check_status(response).await.map(|_| ())
    }
}
