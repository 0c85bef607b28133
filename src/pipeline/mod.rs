/*!
 * Document pipeline: per-document jobs, batch orchestration and progress.
 */

pub mod job;
pub mod orchestrator;
pub mod progress;

pub use self::job::{DocumentJob, DocumentResult, FailedSegment, JobContext, JobSettings, JobState, OutputPaths};
pub use self::orchestrator::{BatchHandle, BatchId, BatchOptions, BatchOrchestrator, BatchResult, BatchState};
pub use self::progress::{BatchProgress, ProgressEvent, ProgressSubscription, ProgressTracker, SegmentCounts};
