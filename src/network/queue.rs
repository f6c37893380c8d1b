//! Bounded FIFO of raw network chunks
//!
//! Decouples irregular network arrival from the fixed cadence of the
//! processing loop. Overflow always drops the oldest entries: stale
//! audio is worth less than fresh audio, and the producer must never
//! block.

use bytes::Bytes;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::warn;

/// An opaque byte chunk as it arrived off the wire
///
/// Immutable once enqueued; owned by the queue until dequeued, then the
/// conversion step takes ownership.
#[derive(Debug, Clone)]
pub struct RawChunk {
    pub payload: Bytes,
    pub arrival: Instant,
    /// Monotonically increasing arrival sequence number
    pub sequence: u64,
}

/// Queue statistics
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    /// Chunks evicted by the capacity limits
    pub dropped_chunks: u64,
    /// Chunks removed by age-based relief
    pub expired_chunks: u64,
    /// Chunks accepted since construction
    pub enqueued_chunks: u64,
}

/// Bounded FIFO of [`RawChunk`] with drop-oldest overflow
pub struct ChunkQueue {
    entries: VecDeque<RawChunk>,
    /// Maximum entries (0 = unbounded)
    max_entries: usize,
    /// Maximum total payload bytes (0 = unbounded)
    max_bytes: usize,
    current_bytes: usize,
    next_sequence: u64,
    stats: QueueStats,
}

impl ChunkQueue {
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            max_bytes,
            current_bytes: 0,
            next_sequence: 0,
            stats: QueueStats::default(),
        }
    }

    /// Append a chunk, evicting the oldest entries first until both
    /// capacity limits hold again.
    pub fn enqueue(&mut self, payload: Bytes) {
        let incoming = payload.len();

        while self.over_limit(incoming) {
            match self.entries.pop_front() {
                Some(dropped) => {
                    self.current_bytes -= dropped.payload.len();
                    self.stats.dropped_chunks += 1;
                    warn!(sequence = dropped.sequence, "chunk queue full, dropped oldest");
                }
                None => break,
            }
        }

        let chunk = RawChunk {
            payload,
            arrival: Instant::now(),
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.current_bytes += incoming;
        self.stats.enqueued_chunks += 1;
        self.entries.push_back(chunk);
    }

    /// Remove and return the oldest chunk. Never blocks.
    pub fn dequeue(&mut self) -> Option<RawChunk> {
        let chunk = self.entries.pop_front()?;
        self.current_bytes -= chunk.payload.len();
        Some(chunk)
    }

    /// Drop every chunk older than `max_age`. Returns how many were
    /// removed. Wall-clock backpressure relief, distinct from the
    /// capacity-based eviction in `enqueue`.
    pub fn remove_older_than(&mut self, max_age: Duration) -> usize {
        let cutoff = match Instant::now().checked_sub(max_age) {
            Some(cutoff) => cutoff,
            None => return 0,
        };
        let mut removed = 0;
        loop {
            match self.entries.front() {
                Some(front) if front.arrival < cutoff => {}
                _ => break,
            }
            if let Some(chunk) = self.entries.pop_front() {
                self.current_bytes -= chunk.payload.len();
                removed += 1;
            }
        }
        if removed > 0 {
            self.stats.expired_chunks += removed as u64;
            warn!(removed, "expired stale chunks from queue");
        }
        removed
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_bytes = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total payload bytes currently queued
    pub fn bytes(&self) -> usize {
        self.current_bytes
    }

    /// Get statistics
    pub fn stats(&self) -> QueueStats {
        self.stats.clone()
    }

    fn over_limit(&self, incoming: usize) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let entries_over = self.max_entries != 0 && self.entries.len() + 1 > self.max_entries;
        let bytes_over = self.max_bytes != 0 && self.current_bytes + incoming > self.max_bytes;
        entries_over || bytes_over
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Bytes {
        Bytes::from(vec![0u8; len])
    }

    #[test]
    fn test_fifo_order_and_sequences() {
        let mut queue = ChunkQueue::new(0, 0);
        queue.enqueue(payload(10));
        queue.enqueue(payload(20));

        let first = queue.dequeue().unwrap();
        let second = queue.dequeue().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(first.payload.len(), 10);
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_drop_oldest_on_entry_overflow() {
        // N+1 items into maxEntries=N leaves exactly N, oldest evicted,
        // dropped counter incremented by 1.
        let n = 4;
        let mut queue = ChunkQueue::new(n, 0);
        for _ in 0..=n {
            queue.enqueue(payload(8));
        }
        assert_eq!(queue.len(), n);
        assert_eq!(queue.stats().dropped_chunks, 1);
        // Oldest (sequence 0) is gone.
        assert_eq!(queue.dequeue().unwrap().sequence, 1);
    }

    #[test]
    fn test_drop_oldest_on_byte_overflow() {
        let mut queue = ChunkQueue::new(0, 100);
        queue.enqueue(payload(60));
        queue.enqueue(payload(60)); // evicts the first
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.bytes(), 60);
        assert_eq!(queue.stats().dropped_chunks, 1);
    }

    #[test]
    fn test_oversize_single_chunk_still_accepted() {
        // A chunk larger than max_bytes empties the queue but is kept;
        // dropping fresh audio entirely would be worse.
        let mut queue = ChunkQueue::new(0, 50);
        queue.enqueue(payload(30));
        queue.enqueue(payload(80));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.bytes(), 80);
    }

    #[test]
    fn test_unbounded_when_zero() {
        let mut queue = ChunkQueue::new(0, 0);
        for _ in 0..1000 {
            queue.enqueue(payload(4));
        }
        assert_eq!(queue.len(), 1000);
        assert_eq!(queue.stats().dropped_chunks, 0);
    }

    #[test]
    fn test_remove_older_than() {
        let mut queue = ChunkQueue::new(0, 0);
        queue.enqueue(payload(4));
        queue.enqueue(payload(4));
        std::thread::sleep(Duration::from_millis(30));
        queue.enqueue(payload(4));

        let removed = queue.remove_older_than(Duration::from_millis(15));
        assert_eq!(removed, 2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.stats().expired_chunks, 2);
        // Age relief is not a capacity drop.
        assert_eq!(queue.stats().dropped_chunks, 0);
    }

    #[test]
    fn test_clear() {
        let mut queue = ChunkQueue::new(0, 0);
        queue.enqueue(payload(4));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.bytes(), 0);
    }
}
