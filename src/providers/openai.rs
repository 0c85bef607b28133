use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{TranslationProvider, TranslationRequest, check_status, http_client, read_json};
use crate::errors::ProviderError;
use crate::translation::prompts;

/// Client for OpenAI-compatible chat completion endpoints
#[derive(Debug)]
pub struct OpenAi {
    client: Client,
    api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    endpoint: String,
    model: String,
    system_prompt: String,
    temperature: f32,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
        }
    }

    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl OpenAi {
    pub fn new(api_key: &str, endpoint: &str, model: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            system_prompt: String::new(),
            temperature: 0.3,
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

    fn api_url(&self, path: &str) -> String {
        let base = if self.endpoint.is_empty() {
            "https://api.openai.com/v1"
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/{}", base, path)
    }

    /// Send a chat completion request
    pub async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let response = self
            .client
            .post(self.api_url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;

        read_json(check_status(response).await?).await
    }

    /// Content of the first choice
    pub fn extract_text_from_response(response: &ChatResponse) -> Result<String, ProviderError> {
        response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| ProviderError::Transient("Response contains no choices".to_string()))
    }

    async fn ask(&self, prompt: String, request: &TranslationRequest) -> Result<String, ProviderError> {
        let system = prompts::render_system_prompt(
            &self.system_prompt,
            &request.source_language,
            &request.target_language,
            request.domain,
        );
        let chat = ChatRequest::new(&self.model)
            .temperature(self.temperature)
            .add_message("system", system)
            .add_message("user", prompt);

        let response = self.complete(chat).await?;
        Self::extract_text_from_response(&response)
    }
}

#[async_trait]
impl TranslationProvider for OpenAi {
    fn id(&self) -> String {
        format!("openai:{}", self.model)
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
        debug!("OpenAI answered {} chars for {} entries", answer.len(), texts.len());

        prompts::decode_batch(&answer, texts.len())
            .ok_or_else(|| ProviderError::Transient("Batch response is missing entry markers".to_string()))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(self.api_url("models"))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(&e))?;
        check_status(response).await.map(|_| ())
    }
}
