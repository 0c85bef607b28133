/*!
 * Provider calls with caching, rate limiting and bounded retries.
 *
 * Cache lookups are per segment: a chunk only sends its cache misses to the
 * provider, as one batched call. That call is the unit of retry. The retry
 * state (attempt count and next delay) is carried explicitly and advanced after
 * every failed attempt; backoff sleeps end early when the batch is cancelled.
 */

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::TranslationCommonConfig;
use crate::document::DomainProfile;
use crate::errors::ProviderError;
use crate::providers::{TranslationProvider, TranslationRequest};
use crate::translation::cache::{CacheContext, TranslationCache, truncate_text};
use crate::translation::chunker::ChunkRequest;
use crate::translation::rate_limit::RateLimiter;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per call, the first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: u32,
    /// Applies to each provider call on its own
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(common: &TranslationCommonConfig) -> Self {
        Self {
            max_attempts: common.retry_count.max(1),
            base_delay: Duration::from_millis(common.retry_backoff_ms),
            factor: common.backoff_factor.max(1),
            call_timeout: Duration::from_secs(common.request_timeout_secs),
        }
    }
}

/// Retry progress of one provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    attempt: u32,
    next_delay: Duration,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            next_delay: policy.base_delay,
        }
    }

    /// Attempts started so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn begin_attempt(&mut self) {
        self.attempt += 1;
    }

    /// Record a failed attempt.
    ///
    /// Returns the delay before the next attempt, or `None` when the error is
    /// not retryable or the attempts are used up.
    pub fn advance(&mut self, policy: &RetryPolicy, error: &ProviderError) -> Option<Duration> {
        if !error.is_retryable() || self.attempt >= policy.max_attempts {
            return None;
        }
        let delay = self.next_delay;
        self.next_delay = delay.saturating_mul(policy.factor);
        Some(delay)
    }
}

/// Final outcome of one segment of a chunk
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentOutcome {
    Translated(String),
    Failed(ProviderError),
    /// Cancelled before a translation was obtained
    Cancelled,
}

/// Result of one chunk, by segment index
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub chunk_id: usize,
    pub segments: Vec<(usize, SegmentOutcome)>,
    pub cache_hits: usize,
    /// Provider round trips made for this chunk
    pub provider_calls: u32,
}

impl ChunkOutcome {
    pub fn quota_exhausted(&self) -> bool {
        self.segments
            .iter()
            .any(|(_, outcome)| matches!(outcome, SegmentOutcome::Failed(e) if e.is_quota_exhausted()))
    }

    pub fn was_cancelled(&self) -> bool {
        self.segments.iter().any(|(_, outcome)| matches!(outcome, SegmentOutcome::Cancelled))
    }
}

enum CallError {
    Provider(ProviderError),
    Cancelled,
}

/// Translation client shared by all jobs of a batch
#[derive(Debug, Clone)]
pub struct RetryingClient {
    provider: Arc<dyn TranslationProvider>,
    provider_id: String,
    cache: TranslationCache,
    limiter: RateLimiter,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(
        provider: Arc<dyn TranslationProvider>,
        cache: TranslationCache,
        limiter: RateLimiter,
        policy: RetryPolicy,
    ) -> Self {
        let provider_id = provider.id();
        Self {
            provider,
            provider_id,
            cache,
            limiter,
            policy,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn cache_context<'a>(
        &'a self,
        source_text: &'a str,
        source_language: &'a str,
        target_language: &'a str,
        domain: DomainProfile,
    ) -> CacheContext<'a> {
        CacheContext {
            source_text,
            source_language,
            target_language,
            domain,
            provider_id: &self.provider_id,
        }
    }

    /// Translate one text, answering from the cache when possible
    pub async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        domain: DomainProfile,
    ) -> Result<String, ProviderError> {
        let context = self.cache_context(text, source_language, target_language, domain);
        if let Some(entry) = self.cache.get(&context.key()) {
            return Ok(entry.translated);
        }

        let request = TranslationRequest::new(source_language, target_language, domain);
        let texts = [text.trim().to_string()];
        let (result, _) = self.call_with_retry(&texts, &request, &CancellationToken::new()).await;

        match result {
            Ok(mut translations) => {
                let translated = translations.pop().unwrap_or_default();
                Ok(self.cache.insert(context, &translated).await)
            }
            Err(CallError::Provider(error)) => Err(error),
            Err(CallError::Cancelled) => Err(ProviderError::Transient("Call cancelled".to_string())),
        }
    }

    /// Translate every segment of a chunk; only cache misses reach the provider
    pub async fn translate_chunk(
        &self,
        chunk: &ChunkRequest,
        source_language: &str,
        target_language: &str,
        domain: DomainProfile,
        cancel: &CancellationToken,
    ) -> ChunkOutcome {
        let mut outcomes: Vec<Option<SegmentOutcome>> = vec![None; chunk.len()];
        let mut misses = Vec::new();
        for (pos, text) in chunk.texts.iter().enumerate() {
            match self.cache.get(&self.cache_context(text, source_language, target_language, domain).key()) {
                Some(entry) => outcomes[pos] = Some(SegmentOutcome::Translated(entry.translated)),
                None => misses.push(pos),
            }
        }
        let cache_hits = chunk.len() - misses.len();

        let mut provider_calls = 0;
        if !misses.is_empty() {
            if chunk.oversized {
                debug!(
                    "Chunk {} is oversized ({} chars), sending it on its own",
                    chunk.id, chunk.char_count
                );
            }

            let texts: Vec<String> = misses.iter().map(|pos| chunk.texts[*pos].clone()).collect();
            let request = TranslationRequest::new(source_language, target_language, domain);
            debug!(
                "Chunk {}: {} cache hits, sending {} segments to {}",
                chunk.id,
                cache_hits,
                texts.len(),
                self.provider_id
            );

            let (result, attempts) = self.call_with_retry(&texts, &request, cancel).await;
            provider_calls = attempts;

            match result {
                Ok(translations) => {
                    for (pos, translated) in misses.iter().zip(translations) {
                        let context = self.cache_context(&chunk.texts[*pos], source_language, target_language, domain);
                        let stored = self.cache.insert(context, &translated).await;
                        outcomes[*pos] = Some(SegmentOutcome::Translated(stored));
                    }
                }
                Err(CallError::Provider(error)) => {
                    for pos in &misses {
                        outcomes[*pos] = Some(SegmentOutcome::Failed(error.clone()));
                    }
                }
                Err(CallError::Cancelled) => {
                    for pos in &misses {
                        outcomes[*pos] = Some(SegmentOutcome::Cancelled);
                    }
                }
            }
        }

        let segments = chunk
            .segment_indices
            .iter()
            .zip(outcomes)
            .map(|(index, outcome)| (*index, outcome.unwrap_or(SegmentOutcome::Cancelled)))
            .collect();

        ChunkOutcome {
            chunk_id: chunk.id,
            segments,
            cache_hits,
            provider_calls,
        }
    }

    async fn call_with_retry(
        &self,
        texts: &[String],
        request: &TranslationRequest,
        cancel: &CancellationToken,
    ) -> (Result<Vec<String>, CallError>, u32) {
        let mut state = RetryState::new(&self.policy);

        loop {
            state.begin_attempt();
            let error = match self.call_once(texts, request).await {
                Ok(translations) => return (Ok(translations), state.attempt()),
                Err(error) => error,
            };

            let Some(delay) = state.advance(&self.policy, &error) else {
                warn!(
                    "Provider call failed after {} attempt(s) ({}): {}",
                    state.attempt(),
                    error.class_name(),
                    error
                );
                return (Err(CallError::Provider(error)), state.attempt());
            };

            warn!(
                "Attempt {}/{} failed ({}), retrying in {:?}: {}",
                state.attempt(),
                self.policy.max_attempts,
                error.class_name(),
                delay,
                truncate_text(&error.to_string(), 120)
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Backoff interrupted by cancellation");
                    return (Err(CallError::Cancelled), state.attempt());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn call_once(&self, texts: &[String], request: &TranslationRequest) -> Result<Vec<String>, ProviderError> {
        let _permit = self.limiter.acquire().await?;

        let translations = tokio::time::timeout(self.policy.call_timeout, self.provider.translate_batch(texts, request))
            .await
            .map_err(|_| {
                ProviderError::Transient(format!("Provider call timed out after {:?}", self.policy.call_timeout))
            })??;

        if translations.len() != texts.len() {
            return Err(ProviderError::Transient(format!(
                "Expected {} translations, got {}",
                texts.len(),
                translations.len()
            )));
        }
        if let Some(pos) = texts
            .iter()
            .zip(&translations)
            .position(|(text, translated)| !text.trim().is_empty() && translated.trim().is_empty())
        {
            return Err(ProviderError::Transient(format!("Empty translation for entry {}", pos + 1)));
        }
        Ok(translations)
    }
}
