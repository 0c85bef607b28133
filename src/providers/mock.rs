/*!
 * Mock provider implementations for testing and demos.
 *
 * This module provides a deterministic provider that never touches the network:
 * - `MockProvider::echo()` - Prefixes every text with the target language
 * - `MockProvider::dictionary(..)` - Looks texts up in a fixed table
 * - `.failing(..)`, `.failing_first(..)`, `.failing_for(..)` - Scripted errors
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{TranslationProvider, TranslationRequest};
use crate::errors::ProviderError;

/// How the mock produces translations
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// `[ko] Hello` for target `ko`
    Echo,
    /// Fixed source → target table; unknown texts fall back to `Echo`
    Dictionary(HashMap<String, String>),
}

/// Error returned instead of a translation
#[derive(Debug, Clone)]
struct ScriptedFailure {
    error: ProviderError,
    /// Number of calls that fail; every call when unset
    times: Option<usize>,
    /// Only calls containing this text fail
    only_for: Option<String>,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    failure: Option<ScriptedFailure>,
    delay: Option<Duration>,
    /// Round trips made, shared between clones
    calls: Arc<AtomicUsize>,
    /// Every text sent to the provider, in call order
    received: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            failure: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn dictionary<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new(MockBehavior::Dictionary(
            entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ))
    }

    /// Every call fails with `error`
    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(ScriptedFailure {
            error,
            times: None,
            only_for: None,
        });
        self
    }

    /// The first `times` calls fail with `error`, later calls succeed
    pub fn failing_first(mut self, times: usize, error: ProviderError) -> Self {
        self.failure = Some(ScriptedFailure {
            error,
            times: Some(times),
            only_for: None,
        });
        self
    }

    /// Calls that include `text` fail with `error`
    pub fn failing_for(mut self, text: impl Into<String>, error: ProviderError) -> Self {
        self.failure = Some(ScriptedFailure {
            error,
            times: None,
            only_for: Some(text.into()),
        });
        self
    }

    /// Simulates slow responses
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of provider round trips so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts received so far
    pub fn received_texts(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    fn translate_one(&self, text: &str, request: &TranslationRequest) -> String {
        if let MockBehavior::Dictionary(table) = &self.behavior {
            if let Some(translated) = table.get(text.trim()) {
                return translated.clone();
            }
        }
        format!("[{}] {}", request.target_language, text)
    }

    async fn call(&self, texts: &[String], request: &TranslationRequest) -> Result<Vec<String>, ProviderError> {
        let call_index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().extend(texts.iter().cloned());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(failure) = &self.failure {
            let matches_text = failure
                .only_for
                .as_ref()
                .is_none_or(|needle| texts.iter().any(|t| t.contains(needle.as_str())));
            let within_budget = failure.times.is_none_or(|times| call_index < times);
            if matches_text && within_budget {
                return Err(failure.error.clone());
            }
        }

        Ok(texts.iter().map(|t| self.translate_one(t, request)).collect())
    }
}

#[async_trait]
impl TranslationProvider for MockProvider {
    fn id(&self) -> String {
        "mock".to_string()
    }

    async fn translate(&self, text: &str, request: &TranslationRequest) -> Result<String, ProviderError> {
        let mut result = self.call(&[text.to_string()], request).await?;
        result
            .pop()
            .ok_or_else(|| ProviderError::Transient("Empty mock response".to_string()))
    }

    async fn translate_batch(&self, texts: &[String], request: &TranslationRequest) -> Result<Vec<String>, ProviderError> {
        self.call(texts, request).await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.failure {
            Some(failure) if failure.times.is_none() && failure.only_for.is_none() => Err(failure.error.clone()),
            _ => Ok(()),
        }
    }
}
