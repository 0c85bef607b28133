use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{TranslationProvider, TranslationRequest, check_status, http_client, read_json};
use crate::errors::ProviderError;
use crate::translation::prompts;

const API_VERSION: &str = "2023-06-01";

/// Anthropic client for interacting with Anthropic API
#[derive(Debug)]
pub struct Anthropic {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (optional, defaults to public API)
    endpoint: String,
    model: String,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<AnthropicMessage>,

    /// System prompt to guide the AI
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,
}

/// Anthropic message format
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicResponse {
    /// The content of the response
    pub content: Vec<AnthropicContent>,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    /// The type of content
    #[serde(rename = "type")]
    pub content_type: String,

    /// The actual text content
    #[serde(default)]
    pub text: String,
}

impl AnthropicRequest {
    /// Create a new Anthropic request
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            system: None,
            temperature: None,
            max_tokens,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(AnthropicMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Anthropic {
    /// Create a new Anthropic client
    pub fn new(api_key: &str, endpoint: &str, model: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            system_prompt: String::new(),
            temperature: 0.3,
            max_tokens: 4096,
        })
    }

    pub fn with_system_prompt(mut self, template: &str) -> Self {
        self.system_prompt = template.to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn api_url(&self) -> String {
        if self.endpoint.is_empty() {
            "https://api.anthropic.com/v1/messages".to_string()
        } else {
            format!("{}/v1/messages", self.endpoint.trim_end_matches('/'))
        }
    }

    /// Complete a messages request
    pub async fn complete(&self, request: AnthropicRequest) -> Result<AnthropicResponse, ProviderError> {
        let response = self
            .client
            .post(self.api_url())
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        read_json(check_status(response).await?).await
    }

    /// Extract text from Anthropic response
    pub fn extract_text_from_response(response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text.as_str())
            .collect()
    }

    async fn ask(&self, prompt: String, request: &TranslationRequest) -> Result<String, ProviderError> {
        let system = prompts::render_system_prompt(
            &self.system_prompt,
            &request.source_language,
            &request.target_language,
            request.domain,
        );
        let message = AnthropicRequest::new(&self.model, self.max_tokens)
            .system(system)
            .temperature(self.temperature)
            .add_message("user", prompt);

        let response = self.complete(message).await?;
        Ok(Self::extract_text_from_response(&response))
    }
}

#[async_trait]
impl TranslationProvider for Anthropic {
    fn id(&self) -> String {
        format!("anthropic:{}", self.model)
    }

    async fn translate(&self, text: &str, request: &TranslationRequest) -> Result<String, ProviderError> {
        let answer = self.ask(text.to_string(), request).await?;
        Ok(prompts::clean_response(&answer))
    }

    async fn translate_batch(&self, texts: &[String], request: &TranslationRequest) -> Result<Vec<String>, ProviderError> {
        if texts.len() == 1 {
            return Ok(vec![self.translate(&texts[0], request).await?]);
        }

        let prompt = format!("{}\n\n{}", prompts::batch_instructions(texts.len()), prompts::encode_batch(texts));
        let answer = self.ask(prompt, request).await?;
        debug!("Anthropic answered {} chars for {} entries", answer.len(), texts.len());

        prompts::decode_batch(&answer, texts.len())
            .ok_or_else(|| ProviderError::Transient("Batch response is missing entry markers".to_string()))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let request = AnthropicRequest::new(&self.model, 10).add_message("user", "Hello");
        self.complete(request).await.map(|_| ())
    }
}
