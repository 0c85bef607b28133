/*!
 * Packing of pending segments into provider-sized requests.
 *
 * Chunks are filled greedily in segment order until the next segment would
 * exceed the character, token or segment-count budget. A segment is never
 * split; one that is larger than the budget on its own becomes a single
 * oversized chunk.
 */

use crate::document::{Segment, SegmentStatus};

/// Default character budget per request
pub const DEFAULT_MAX_CHARS: usize = 4000;

/// Default number of segments per request
pub const DEFAULT_MAX_SEGMENTS: usize = 50;

/// An ordered group of segments sent in one provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    /// Position of the chunk within its document
    pub id: usize,

    /// Indices of the segments in the document's segment list, ascending
    pub segment_indices: Vec<usize>,

    /// Text sent for each segment, same order as `segment_indices`
    pub texts: Vec<String>,

    /// Total characters of `texts`
    pub char_count: usize,

    /// A single segment larger than the character or token budget
    pub oversized: bool,
}

impl ChunkRequest {
    pub fn len(&self) -> usize {
        self.segment_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segment_indices.is_empty()
    }
}

/// Greedy chunk packer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_chars: usize,
    max_segments: usize,
    max_tokens: Option<usize>,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS, DEFAULT_MAX_SEGMENTS)
    }
}

impl Chunker {
    pub fn new(max_chars: usize, max_segments: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
            max_segments: max_segments.max(1),
            max_tokens: None,
        }
    }

    /// Also bound each chunk by an estimated token count
    pub fn with_token_limit(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens.map(|t| t.max(1));
        self
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn max_segments(&self) -> usize {
        self.max_segments
    }

    /// Rough token estimate, four characters per token
    pub fn estimate_tokens(chars: usize) -> usize {
        chars.div_ceil(4)
    }

    fn exceeds(&self, chars: usize) -> bool {
        chars > self.max_chars || self.max_tokens.is_some_and(|max| Self::estimate_tokens(chars) > max)
    }

    /// Pack the Pending segments of `segments` into chunks
    pub fn chunk(&self, segments: &[Segment]) -> Vec<ChunkRequest> {
        let mut chunks = Vec::new();
        let mut current = PendingChunk::default();

        for segment in segments.iter().filter(|s| s.status() == SegmentStatus::Pending) {
            let chars = segment.char_count();

            if self.exceeds(chars) {
                current.flush_into(&mut chunks, false);
                let mut single = PendingChunk::default();
                single.push(segment);
                single.flush_into(&mut chunks, true);
                continue;
            }

            if !current.is_empty()
                && (self.exceeds(current.chars + chars) || current.indices.len() + 1 > self.max_segments)
            {
                current.flush_into(&mut chunks, false);
            }
            current.push(segment);
        }
        current.flush_into(&mut chunks, false);

        chunks
    }
}

#[derive(Default)]
struct PendingChunk {
    indices: Vec<usize>,
    texts: Vec<String>,
    chars: usize,
}

impl PendingChunk {
    fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    fn push(&mut self, segment: &Segment) {
        self.indices.push(segment.index);
        self.texts.push(segment.source_text().to_string());
        self.chars += segment.char_count();
    }

    fn flush_into(&mut self, chunks: &mut Vec<ChunkRequest>, oversized: bool) {
        if self.is_empty() {
            return;
        }
        let taken = std::mem::take(self);
        chunks.push(ChunkRequest {
            id: chunks.len(),
            segment_indices: taken.indices,
            texts: taken.texts,
            char_count: taken.chars,
            oversized,
        });
    }
}
