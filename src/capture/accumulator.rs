//! In-memory copy of a streamed body.

use bytes::{Bytes, BytesMut};

/// Ordered chunks of one in-flight stream plus a running byte count.
///
/// Chunks are refcounted `Bytes` handles to the same buffers that are
/// forwarded, so appending does not copy payload data. With a cap, only the
/// first `cap` bytes are retained; `total_bytes` always counts everything.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    chunks: Vec<Bytes>,
    total_bytes: usize,
    retained_bytes: usize,
    cap: Option<usize>,
}

/// Result of draining an accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedBody {
    /// Retained bytes, in arrival order.
    pub bytes: Bytes,
    /// Size of the whole stream.
    pub total_bytes: usize,
    /// True if bytes beyond the cap were not retained.
    pub truncated: bool,
}

impl StreamAccumulator {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            cap,
            ..Self::default()
        }
    }

    /// Append a chunk in arrival order.
    pub fn push(&mut self, chunk: &Bytes) {
        self.total_bytes += chunk.len();

        let room = match self.cap {
            Some(cap) => cap.saturating_sub(self.retained_bytes),
            None => chunk.len(),
        };
        let keep = room.min(chunk.len());
        if keep > 0 {
            self.chunks.push(chunk.slice(..keep));
            self.retained_bytes += keep;
        }
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Concatenate the retained chunks, releasing them.
    pub fn finish(self) -> CapturedBody {
        let mut buf = BytesMut::with_capacity(self.retained_bytes);
        for chunk in &self.chunks {
            buf.extend_from_slice(chunk);
        }
        CapturedBody {
            bytes: buf.freeze(),
            total_bytes: self.total_bytes,
            truncated: self.retained_bytes < self.total_bytes,
        }
    }
}
