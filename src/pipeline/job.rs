/*!
 * One document through extraction, chunk translation and reassembly.
 *
 * ```text
 * Created → Extracting → Translating → Reassembling → Completed
 *              │              │              ├──────→ CompletedWithErrors
 *              └─→ Failed     └─→ Cancelled  └──────→ Failed
 * ```
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

use crate::document::{Document, DocumentId, FormatKind, OutputMode, Segment, SegmentStatus};
use crate::errors::{ExtractionError, JobError, ReassemblyError};
use crate::file_utils::FileManager;
use crate::formats::LoadedDocument;
use crate::pipeline::progress::{ProgressTracker, SegmentCounts};
use crate::translation::{ChunkOutcome, Chunker, RetryingClient, SegmentOutcome};

const QUOTA_FAILURE_REASON: &str = "Not translated: provider quota exhausted";

/// Lifecycle state of a document job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    Extracting,
    Translating,
    Reassembling,
    Completed,
    CompletedWithErrors,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithErrors | Self::Failed | Self::Cancelled
        )
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Created, Extracting)
                | (Created, Cancelled)
                | (Extracting, Translating)
                | (Extracting, Failed)
                | (Extracting, Cancelled)
                | (Translating, Reassembling)
                | (Translating, Cancelled)
                | (Reassembling, Completed)
                | (Reassembling, CompletedWithErrors)
                | (Reassembling, Failed)
        )
    }

    /// Rank of a terminal state in the batch worst case; higher is worse
    pub fn severity(&self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::CompletedWithErrors => 1,
            Self::Cancelled => 2,
            Self::Failed => 3,
            // Non-terminal states never reach the batch result
            _ => 4,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Extracting => "extracting",
            Self::Translating => "translating",
            Self::Reassembling => "reassembling",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed with errors",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// Output and chunking settings shared by the jobs of a batch
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub chunker: Chunker,
    pub max_concurrent_chunks: usize,
    pub output_mode: OutputMode,
    /// Next to the source file when unset
    pub output_dir: Option<PathBuf>,
    pub naming_rule: String,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            chunker: Chunker::default(),
            max_concurrent_chunks: 2,
            output_mode: OutputMode::default(),
            output_dir: None,
            naming_rule: "{name}_translated_{lang}".to_string(),
        }
    }
}

/// Output files claimed by the documents of one batch.
///
/// Two documents never write the same file and no document overwrites a
/// source of the batch. A taken path is replaced by its first free
/// `_2`, `_3`, ... variant.
#[derive(Debug, Clone, Default)]
pub struct OutputPaths {
    taken: Arc<Mutex<HashSet<PathBuf>>>,
}

impl OutputPaths {
    pub fn new<'a, I: IntoIterator<Item = &'a Path>>(sources: I) -> Self {
        let taken = sources.into_iter().map(Self::key).collect();
        Self {
            taken: Arc::new(Mutex::new(taken)),
        }
    }

    fn key(path: &Path) -> PathBuf {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    }

    /// Claim `planned`, or the first free numbered variant of it
    pub fn claim(&self, planned: &Path, kind: FormatKind) -> PathBuf {
        let mut taken = self.taken.lock();
        let mut candidate = planned.to_path_buf();
        let mut number = 2;
        while !taken.insert(Self::key(&candidate)) {
            candidate = FileManager::numbered_path(planned, kind, number);
            number += 1;
        }
        candidate
    }
}

/// Batch-scoped collaborators injected into every job
#[derive(Debug, Clone)]
pub struct JobContext {
    pub client: RetryingClient,
    pub progress: ProgressTracker,
    pub cancel: CancellationToken,
    /// Cancelled when this job runs out of provider quota
    pub quota_abort: Option<CancellationToken>,
    pub settings: Arc<JobSettings>,
    pub outputs: OutputPaths,
}

/// A segment that ended Failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSegment {
    pub index: usize,
    pub location: String,
    pub reason: String,
}

/// Terminal record of one document
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    pub document_id: DocumentId,
    pub source_path: PathBuf,
    pub kind: FormatKind,
    pub state: JobState,
    pub translated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
    pub cache_hits: usize,
    pub quota_exhausted: bool,
    pub output_path: Option<PathBuf>,
    pub error: Option<String>,
    pub failed_segments: Vec<FailedSegment>,
    /// Final segment list, in extraction order
    #[serde(skip)]
    pub segments: Vec<Segment>,
}

impl DocumentResult {
    pub fn is_success(&self) -> bool {
        self.state == JobState::Completed
    }
}

/// Runtime state of one document
#[derive(Debug)]
pub struct DocumentJob {
    document: Document,
    state: JobState,
    segments: Vec<Segment>,
    cache_hits: usize,
    quota_exhausted: bool,
    output_path: Option<PathBuf>,
    error: Option<String>,
}

impl DocumentJob {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            state: JobState::Created,
            segments: Vec::new(),
            cache_hits: 0,
            quota_exhausted: false,
            output_path: None,
            error: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn counts(&self) -> SegmentCounts {
        SegmentCounts::from_segments(&self.segments)
    }

    fn transition(&mut self, next: JobState, progress: &ProgressTracker) -> Result<(), JobError> {
        if !self.state.can_transition_to(next) {
            return Err(JobError::IllegalTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!("{}: {} -> {}", self.document.display_name(), self.state, next);
        self.state = next;
        progress.update(self.document.id(), &self.document.display_name(), next, self.counts());
        Ok(())
    }

    /// Drive the job to a terminal state
    pub async fn run(mut self, context: &JobContext) -> DocumentResult {
        if let Err(e) = self.execute(context).await {
            error!("{} failed: {}", self.document.display_name(), e);
            self.error = Some(e.to_string());
            if !self.state.is_terminal() {
                if self.state.can_transition_to(JobState::Failed) {
                    let _ = self.transition(JobState::Failed, &context.progress);
                } else {
                    self.state = JobState::Failed;
                    context.progress.update(
                        self.document.id(),
                        &self.document.display_name(),
                        JobState::Failed,
                        self.counts(),
                    );
                }
            }
        }
        self.into_result()
    }

    async fn execute(&mut self, context: &JobContext) -> Result<(), JobError> {
        if context.cancel.is_cancelled() {
            return self.transition(JobState::Cancelled, &context.progress);
        }

        self.transition(JobState::Extracting, &context.progress)?;
        let loaded = self.extract().await?;
        info!(
            "{}: extracted {} segments ({} skipped)",
            self.document.display_name(),
            self.segments.len(),
            self.counts().skipped
        );

        self.transition(JobState::Translating, &context.progress)?;
        let completed = self.translate(context).await;

        if !completed {
            info!("{}: cancelled", self.document.display_name());
            return self.transition(JobState::Cancelled, &context.progress);
        }

        self.transition(JobState::Reassembling, &context.progress)?;
        self.output_path = Some(self.reassemble(&loaded, context).await?);

        let counts = self.counts();
        let terminal = if counts.failed > 0 {
            JobState::CompletedWithErrors
        } else {
            JobState::Completed
        };
        info!(
            "{}: {} ({} translated, {} failed, {} skipped)",
            self.document.display_name(),
            terminal,
            counts.translated,
            counts.failed,
            counts.skipped
        );
        self.transition(terminal, &context.progress)
    }

    async fn extract(&mut self) -> Result<LoadedDocument, ExtractionError> {
        let path = self.document.source_path().to_path_buf();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| ExtractionError::Unreadable { path, source })?;

        let loaded = LoadedDocument::decode(self.document.kind(), &bytes)?;
        self.segments = loaded.extract();
        Ok(loaded)
    }

    /// Translate every pending segment; returns `false` when the job was cancelled
    async fn translate(&mut self, context: &JobContext) -> bool {
        let settings = &context.settings;
        let chunks = settings.chunker.chunk(&self.segments);
        if chunks.is_empty() {
            return true;
        }
        debug!(
            "{}: {} chunks, up to {} in flight",
            self.document.display_name(),
            chunks.len(),
            settings.max_concurrent_chunks
        );

        let quota_hit = AtomicBool::new(false);
        let source_language = self.document.source_language().to_string();
        let target_language = self.document.target_language().to_string();
        let domain = self.document.domain();

        let mut outcomes = stream::iter(chunks)
            .map(|chunk| {
                let quota_hit = &quota_hit;
                let source_language = source_language.as_str();
                let target_language = target_language.as_str();
                async move {
                    // Checked when the chunk is about to be dispatched
                    if context.cancel.is_cancelled() || quota_hit.load(Ordering::SeqCst) {
                        return None;
                    }
                    Some(
                        context
                            .client
                            .translate_chunk(&chunk, source_language, target_language, domain, &context.cancel)
                            .await,
                    )
                }
            })
            .buffer_unordered(settings.max_concurrent_chunks.max(1));

        while let Some(outcome) = outcomes.next().await {
            let Some(outcome) = outcome else {
                continue;
            };
            if outcome.quota_exhausted() && !quota_hit.swap(true, Ordering::SeqCst) {
                warn!(
                    "{}: provider quota exhausted, remaining chunks will not be sent",
                    self.document.display_name()
                );
                if let Some(abort) = &context.quota_abort {
                    abort.cancel();
                }
            }
            self.apply_outcome(&outcome);
            context.progress.update(
                self.document.id(),
                &self.document.display_name(),
                self.state,
                self.counts(),
            );
        }

        if quota_hit.load(Ordering::SeqCst) {
            self.quota_exhausted = true;
            for segment in self.segments.iter_mut().filter(|s| s.status() == SegmentStatus::Pending) {
                let _ = segment.mark_failed(QUOTA_FAILURE_REASON);
            }
            return true;
        }

        !self.segments.iter().any(|s| s.status() == SegmentStatus::Pending)
    }

    fn apply_outcome(&mut self, outcome: &ChunkOutcome) {
        self.cache_hits += outcome.cache_hits;

        for (index, result) in &outcome.segments {
            let Some(segment) = self.segments.get_mut(*index) else {
                warn!("Chunk {} refers to unknown segment {}", outcome.chunk_id, index);
                continue;
            };
            let applied = match result {
                SegmentOutcome::Translated(text) => segment.mark_translated(text.clone()),
                SegmentOutcome::Failed(e) => {
                    warn!("Segment {} ({}) failed: {}", index, segment.location, e);
                    segment.mark_failed(e.to_string())
                }
                SegmentOutcome::Cancelled => Ok(()),
            };
            if let Err(e) = applied {
                warn!("{}", e);
            }
        }
    }

    async fn reassemble(&self, loaded: &LoadedDocument, context: &JobContext) -> Result<PathBuf, ReassemblyError> {
        let settings = &context.settings;
        let artifact = loaded.reassemble(&self.segments, settings.output_mode, &self.document.display_name())?;
        let planned = FileManager::generate_output_path(
            self.document.source_path(),
            settings.output_dir.as_deref(),
            &settings.naming_rule,
            self.document.target_language(),
            artifact.kind,
        );
        let output_path = context.outputs.claim(&planned, artifact.kind);
        if output_path != planned {
            warn!(
                "{}: {:?} is already used in this batch, writing {:?}",
                self.document.display_name(),
                planned,
                output_path
            );
        }

        let path = output_path.clone();
        tokio::task::spawn_blocking(move || FileManager::write_atomic(&path, &artifact.bytes))
            .await
            .map_err(|e| ReassemblyError::Write {
                path: output_path.clone(),
                source: std::io::Error::other(e.to_string()),
            })?
            .map_err(|source| ReassemblyError::Write {
                path: output_path.clone(),
                source,
            })?;

        debug!("Wrote {:?}", output_path);
        Ok(output_path)
    }

    fn into_result(self) -> DocumentResult {
        let counts = self.counts();
        let failed_segments = self
            .segments
            .iter()
            .filter(|s| s.status() == SegmentStatus::Failed)
            .map(|s| FailedSegment {
                index: s.index,
                location: s.location.to_string(),
                reason: s.failure().unwrap_or_default().to_string(),
            })
            .collect();

        DocumentResult {
            document_id: self.document.id(),
            source_path: self.document.source_path().to_path_buf(),
            kind: self.document.kind(),
            state: self.state,
            translated: counts.translated,
            failed: counts.failed,
            skipped: counts.skipped,
            total: counts.total,
            cache_hits: self.cache_hits,
            quota_exhausted: self.quota_exhausted,
            output_path: self.output_path,
            error: self.error,
            failed_segments,
            segments: self.segments,
        }
    }
}
