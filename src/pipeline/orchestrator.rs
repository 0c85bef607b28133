/*!
 * Batch orchestration.
 *
 * A batch runs one `DocumentJob` per submitted document on a bounded pool of
 * tasks. The jobs share one `RetryingClient` (and with it the cache and the
 * provider rate limiter), one progress tracker and one cancellation token.
 * Document failures stay local to their document; the batch state is the
 * worst state reached by any of its documents.
 */

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::app_config::{Config, QuotaPolicy};
use crate::document::{Document, DomainProfile, OutputMode, SourceDocument};
use crate::errors::{AppError, ConfigurationError};
use crate::language_utils;
use crate::pipeline::job::{DocumentJob, DocumentResult, FailedSegment, JobContext, JobSettings, JobState, OutputPaths};
use crate::pipeline::progress::{BatchProgress, ProgressSubscription, ProgressTracker, SegmentCounts};
use crate::providers::TranslationProvider;
use crate::translation::{CacheStats, Chunker, ProviderProfile, RateLimiter, RetryPolicy, RetryingClient, TranslationCache};

/// Identifier of a submitted batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BatchId(Uuid);

impl BatchId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal state of a whole batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Completed,
    CompletedWithErrors,
    Cancelled,
    Failed,
}

impl BatchState {
    /// Worst state among the documents; an empty batch is `Completed`
    pub fn worst_of<I: IntoIterator<Item = JobState>>(states: I) -> Self {
        states
            .into_iter()
            .max_by_key(|s| s.severity())
            .map(Self::from)
            .unwrap_or(Self::Completed)
    }
}

impl From<JobState> for BatchState {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Completed => Self::Completed,
            JobState::CompletedWithErrors => Self::CompletedWithErrors,
            JobState::Cancelled => Self::Cancelled,
            _ => Self::Failed,
        }
    }
}

/// Settings shared by every document of one batch
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub target_language: String,
    pub domain: DomainProfile,
    pub provider: Arc<dyn TranslationProvider>,
    /// Concurrency and request budget of the provider
    pub provider_profile: ProviderProfile,
    pub output_mode: OutputMode,
    /// Next to each source file when unset
    pub output_dir: Option<PathBuf>,
}

impl BatchOptions {
    pub fn new(
        target_language: impl Into<String>,
        domain: DomainProfile,
        provider: Arc<dyn TranslationProvider>,
        output_mode: OutputMode,
    ) -> Self {
        Self {
            target_language: target_language.into(),
            domain,
            provider,
            provider_profile: ProviderProfile {
                max_concurrent_requests: 4,
                target_rpm: None,
            },
            output_mode,
            output_dir: None,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_provider_profile(mut self, profile: ProviderProfile) -> Self {
        self.provider_profile = profile;
        self
    }
}

/// Final record of a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub batch_id: BatchId,
    pub state: BatchState,
    /// One result per submitted document, in submission order
    pub documents: Vec<DocumentResult>,
    pub progress: BatchProgress,
    pub cache: CacheStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    /// Every failed segment of every document
    pub fn failed_segments(&self) -> impl Iterator<Item = (&DocumentResult, &FailedSegment)> {
        self.documents
            .iter()
            .flat_map(|doc| doc.failed_segments.iter().map(move |segment| (doc, segment)))
    }

    pub fn failed_documents(&self) -> impl Iterator<Item = &DocumentResult> {
        self.documents.iter().filter(|doc| doc.state == JobState::Failed)
    }
}

/// Caller-side handle of a running batch
#[derive(Debug)]
pub struct BatchHandle {
    id: BatchId,
    cancel: CancellationToken,
    tracker: ProgressTracker,
    /// Subscribed before the batch started, so the first subscriber sees every event
    first_subscription: Mutex<Option<ProgressSubscription>>,
    task: JoinHandle<BatchResult>,
}

impl BatchHandle {
    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Stream of progress events of this batch
    pub fn subscribe(&self) -> ProgressSubscription {
        self.first_subscription
            .lock()
            .take()
            .unwrap_or_else(|| self.tracker.subscribe())
    }

    /// Stop dispatching new chunks; finished documents are kept
    pub fn cancel(&self) {
        info!("Cancelling batch {}", self.id);
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn progress(&self) -> BatchProgress {
        self.tracker.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until every document reached a terminal state
    pub async fn wait(self) -> Result<BatchResult, AppError> {
        self.task
            .await
            .map_err(|e| AppError::Unknown(format!("Batch task failed: {}", e)))
    }
}

/// Runs batches of document jobs
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    config: Config,
    cache: TranslationCache,
}

impl BatchOrchestrator {
    /// Orchestrator with an in-memory cache
    pub fn new(config: Config) -> Self {
        let cache = TranslationCache::new(config.cache.enabled);
        Self { config, cache }
    }

    /// Use a prepared cache, e.g. a persistent one
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn validate(&self, documents: &[SourceDocument], options: &BatchOptions) -> Result<(), ConfigurationError> {
        for document in documents {
            language_utils::check_language_pair(&document.source_language, &options.target_language)?;
        }

        self.config.validate_settings()
    }

    /// Validate and start a batch; returns as soon as the jobs are scheduled
    pub fn submit_batch(&self, documents: Vec<SourceDocument>, options: BatchOptions) -> Result<BatchHandle, ConfigurationError> {
        self.validate(&documents, &options)?;

        let id = BatchId::new();
        let pipeline = &self.config.pipeline;
        let tracker = ProgressTracker::new(documents.len());
        let first_subscription = tracker.subscribe();
        let cancel = CancellationToken::new();

        let client = RetryingClient::new(
            options.provider.clone(),
            self.cache.clone(),
            RateLimiter::new(&options.provider_profile),
            RetryPolicy::from_config(&self.config.translation.common),
        );
        let settings = Arc::new(JobSettings {
            chunker: Chunker::new(pipeline.max_chars_per_chunk, pipeline.max_segments_per_chunk)
                .with_token_limit(pipeline.max_tokens_per_chunk),
            max_concurrent_chunks: pipeline.max_concurrent_chunks,
            output_mode: options.output_mode,
            output_dir: options.output_dir.clone().or_else(|| self.config.output.directory.clone()),
            naming_rule: self.config.output.naming_rule.clone(),
        });

        let documents: Vec<Document> = documents
            .into_iter()
            .map(|source| Document::new(source, options.target_language.clone(), options.domain))
            .collect();
        let context = JobContext {
            client,
            progress: tracker.clone(),
            cancel: cancel.clone(),
            quota_abort: match pipeline.quota_policy {
                QuotaPolicy::AbortBatch => Some(cancel.clone()),
                QuotaPolicy::Continue => None,
            },
            settings,
            outputs: OutputPaths::new(documents.iter().map(Document::source_path)),
        };

        for document in &documents {
            tracker.update(document.id(), &document.display_name(), JobState::Created, SegmentCounts::default());
        }

        info!(
            "Batch {}: {} documents -> {} ({}, {})",
            id,
            documents.len(),
            options.target_language,
            options.domain,
            options.provider.id()
        );

        let task = tokio::spawn(run_batch(
            id,
            documents,
            context,
            pipeline.max_concurrent_documents,
            self.cache.clone(),
        ));

        Ok(BatchHandle {
            id,
            cancel,
            tracker,
            first_subscription: Mutex::new(Some(first_subscription)),
            task,
        })
    }

    /// Submit a batch and wait for its result
    pub async fn run_batch(&self, documents: Vec<SourceDocument>, options: BatchOptions) -> Result<BatchResult, AppError> {
        let handle = self.submit_batch(documents, options)?;
        handle.wait().await
    }
}

async fn run_batch(
    id: BatchId,
    documents: Vec<Document>,
    context: JobContext,
    max_concurrent_documents: usize,
    cache: TranslationCache,
) -> BatchResult {
    let started_at = Utc::now();
    let tracker = context.progress.clone();

    let mut results: Vec<(usize, DocumentResult)> = stream::iter(documents.into_iter().enumerate())
        .map(|(position, document)| {
            let context = context.clone();
            async move {
                let fallback = document.clone();
                let progress = context.progress.clone();
                let joined = tokio::spawn(async move { DocumentJob::new(document).run(&context).await }).await;
                let result = match joined {
                    Ok(result) => result,
                    Err(e) => {
                        error!("Job for {} aborted: {}", fallback.display_name(), e);
                        aborted_result(&fallback, &progress, e.to_string())
                    }
                };
                (position, result)
            }
        })
        .buffer_unordered(max_concurrent_documents.max(1))
        .collect()
        .await;

    results.sort_by_key(|(position, _)| *position);
    let documents: Vec<DocumentResult> = results.into_iter().map(|(_, result)| result).collect();

    let state = BatchState::worst_of(documents.iter().map(|d| d.state));
    let progress = tracker.snapshot();
    tracker.close();

    let cache_stats = cache.stats();
    match state {
        BatchState::Completed => info!("Batch {} completed", id),
        _ => warn!(
            "Batch {} finished as {:?}: {} failed segments, {} failed documents",
            id,
            state,
            progress.segments.failed,
            documents.iter().filter(|d| d.state == JobState::Failed).count()
        ),
    }

    BatchResult {
        batch_id: id,
        state,
        documents,
        progress,
        cache: cache_stats,
        started_at,
        finished_at: Utc::now(),
    }
}

fn aborted_result(document: &Document, progress: &ProgressTracker, reason: String) -> DocumentResult {
    progress.update(document.id(), &document.display_name(), JobState::Failed, SegmentCounts::default());
    DocumentResult {
        document_id: document.id(),
        source_path: document.source_path().to_path_buf(),
        kind: document.kind(),
        state: JobState::Failed,
        translated: 0,
        failed: 0,
        skipped: 0,
        total: 0,
        cache_hits: 0,
        quota_exhausted: false,
        output_path: None,
        error: Some(reason),
        failed_segments: Vec::new(),
        segments: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worstOf_shouldPickMostSevereState() {
        assert_eq!(BatchState::worst_of(Vec::<JobState>::new()), BatchState::Completed);
        assert_eq!(
            BatchState::worst_of([JobState::Completed, JobState::CompletedWithErrors]),
            BatchState::CompletedWithErrors
        );
        assert_eq!(
            BatchState::worst_of([JobState::Failed, JobState::Cancelled, JobState::Completed]),
            BatchState::Failed
        );
        assert_eq!(
            BatchState::worst_of([JobState::Cancelled, JobState::CompletedWithErrors]),
            BatchState::Cancelled
        );
    }
}
