/*!
 * Batch progress events.
 *
 * Every state change and every finished chunk of every job goes through one
 * `ProgressTracker`. Events carry a sequence number that increases by one per
 * event, together with the document's counters and the aggregate counters of
 * the whole batch. Consumers subscribe to a broadcast channel; the stream ends
 * once the tracker is closed at the end of the batch.
 */

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::document::{DocumentId, Segment, SegmentStatus};
use crate::pipeline::job::JobState;

const CHANNEL_CAPACITY: usize = 1024;

/// Segment counters of one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct SegmentCounts {
    pub translated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
}

impl SegmentCounts {
    pub fn from_segments(segments: &[Segment]) -> Self {
        let mut counts = Self {
            total: segments.len(),
            ..Self::default()
        };
        for segment in segments {
            match segment.status() {
                SegmentStatus::Translated => counts.translated += 1,
                SegmentStatus::Failed => counts.failed += 1,
                SegmentStatus::Skipped => counts.skipped += 1,
                SegmentStatus::Pending => {}
            }
        }
        counts
    }

    /// Segments with a final status
    pub fn done(&self) -> usize {
        self.translated + self.failed + self.skipped
    }

    fn add(&mut self, other: &SegmentCounts) {
        self.translated += other.translated;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.total += other.total;
    }
}

/// Aggregate progress of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct BatchProgress {
    pub documents_total: usize,
    pub documents_finished: usize,
    pub segments: SegmentCounts,
}

/// One progress notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub sequence: u64,
    pub document_id: DocumentId,
    pub document_name: String,
    pub state: JobState,
    pub translated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
    pub batch: BatchProgress,
}

#[derive(Debug)]
struct TrackerState {
    sequence: u64,
    documents_total: usize,
    documents: HashMap<DocumentId, (JobState, SegmentCounts)>,
    sender: Option<broadcast::Sender<ProgressEvent>>,
}

impl TrackerState {
    fn aggregate(&self) -> BatchProgress {
        let mut progress = BatchProgress {
            documents_total: self.documents_total,
            ..BatchProgress::default()
        };
        for (state, counts) in self.documents.values() {
            if state.is_terminal() {
                progress.documents_finished += 1;
            }
            progress.segments.add(counts);
        }
        progress
    }
}

/// Shared progress sink of a batch
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl ProgressTracker {
    pub fn new(documents_total: usize) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(TrackerState {
                sequence: 0,
                documents_total,
                documents: HashMap::new(),
                sender: Some(sender),
            })),
        }
    }

    /// Record the state of a document and publish an event
    pub fn update(&self, document_id: DocumentId, document_name: &str, job_state: JobState, counts: SegmentCounts) {
        let mut state = self.state.lock();
        state.documents.insert(document_id, (job_state, counts));
        state.sequence += 1;

        let event = ProgressEvent {
            sequence: state.sequence,
            document_id,
            document_name: document_name.to_string(),
            state: job_state,
            translated: counts.translated,
            failed: counts.failed,
            skipped: counts.skipped,
            total: counts.total,
            batch: state.aggregate(),
        };

        // Sent under the lock so that channel order matches sequence order
        if let Some(sender) = &state.sender {
            let _ = sender.send(event);
        }
    }

    /// Current aggregate counters
    pub fn snapshot(&self) -> BatchProgress {
        self.state.lock().aggregate()
    }

    /// Number of events published so far
    pub fn sequence(&self) -> u64 {
        self.state.lock().sequence
    }

    pub fn subscribe(&self) -> ProgressSubscription {
        ProgressSubscription {
            receiver: self.state.lock().sender.as_ref().map(|s| s.subscribe()),
        }
    }

    /// End every subscription once buffered events are read
    pub fn close(&self) {
        self.state.lock().sender = None;
    }
}

/// Receiving end of the progress stream
#[derive(Debug)]
pub struct ProgressSubscription {
    receiver: Option<broadcast::Receiver<ProgressEvent>>,
}

impl ProgressSubscription {
    /// Next event, or `None` once the batch is over.
    ///
    /// A consumer that falls too far behind skips the events it missed.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::debug!("Progress subscriber lagged, skipped {} events", missed);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
