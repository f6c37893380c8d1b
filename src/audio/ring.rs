//! Fixed-capacity ring buffer for decoded audio samples
//!
//! The buffer is a lossy shock absorber, not a queue with backpressure:
//! a write that exceeds free space overwrites the oldest buffered samples
//! so the producer never blocks. Audio continuity favors dropping stale
//! audio over stalling the network side.
//!
//! Single producer, single consumer. The buffer itself is not
//! synchronized; callers on a multi-threaded runtime must wrap it in a
//! lock so the producer and consumer never touch it concurrently.

use crate::error::AudioError;

/// Result of a destructive read
#[derive(Debug, Clone)]
pub struct ReadResult {
    /// Samples read, oldest first
    pub samples: Vec<f32>,
    /// Number of samples actually read
    pub samples_read: usize,
    /// True when fewer samples than requested were available
    pub partial: bool,
}

/// Circular store of f32 samples with O(1) wrap-around write/read
pub struct RingBuffer {
    data: Vec<f32>,
    capacity: usize,
    write_pos: usize,
    read_pos: usize,
    available: usize,
    /// Samples lost to overwrite since construction
    overwritten: u64,
}

impl RingBuffer {
    /// Create a ring buffer holding `capacity` samples.
    pub fn new(capacity: usize) -> Result<Self, AudioError> {
        if capacity == 0 {
            return Err(AudioError::InvalidCapacity(capacity));
        }
        Ok(Self {
            data: vec![0.0; capacity],
            capacity,
            write_pos: 0,
            read_pos: 0,
            available: 0,
            overwritten: 0,
        })
    }

    /// Append samples, overwriting the oldest buffered samples if free
    /// space runs out. Always accepts the entire input; returns the
    /// number of samples written (always `samples.len()`).
    pub fn write(&mut self, samples: &[f32]) -> usize {
        let total = samples.len();
        if total == 0 {
            return 0;
        }

        // Only the most recent `capacity` samples can survive anyway.
        let skipped = total.saturating_sub(self.capacity);
        let src = &samples[skipped..];

        let free = self.capacity - self.available;
        let overwriting = src.len().saturating_sub(free);

        // Copy in at most two contiguous runs around the wrap point.
        let first = src.len().min(self.capacity - self.write_pos);
        self.data[self.write_pos..self.write_pos + first].copy_from_slice(&src[..first]);
        let rest = src.len() - first;
        if rest > 0 {
            self.data[..rest].copy_from_slice(&src[first..]);
        }
        self.write_pos = (self.write_pos + src.len()) % self.capacity;

        if overwriting > 0 {
            self.read_pos = (self.read_pos + overwriting) % self.capacity;
            self.available = self.capacity;
        } else {
            self.available += src.len();
        }
        self.overwritten += (skipped + overwriting) as u64;

        total
    }

    /// Read up to `n` samples destructively. Returns fewer than `n`
    /// (with `partial == true`) when the buffer holds fewer; never waits.
    pub fn read(&mut self, n: usize) -> ReadResult {
        let count = n.min(self.available);
        let samples = self.copy_out(count);
        self.read_pos = (self.read_pos + count) % self.capacity;
        self.available -= count;
        ReadResult {
            samples,
            samples_read: count,
            partial: count < n,
        }
    }

    /// Copy up to `n` samples without consuming them.
    pub fn peek(&self, n: usize) -> Vec<f32> {
        self.copy_out(n.min(self.available))
    }

    fn copy_out(&self, count: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(count);
        let first = count.min(self.capacity - self.read_pos);
        out.extend_from_slice(&self.data[self.read_pos..self.read_pos + first]);
        if count > first {
            out.extend_from_slice(&self.data[..count - first]);
        }
        out
    }

    /// Discard all buffered samples.
    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.read_pos = 0;
        self.available = 0;
    }

    /// Samples currently buffered
    pub fn available(&self) -> usize {
        self.available
    }

    /// Total sample capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free space in samples
    pub fn free(&self) -> usize {
        self.capacity - self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn is_full(&self) -> bool {
        self.available == self.capacity
    }

    /// Fill level as a fraction of capacity
    pub fn fill_level(&self) -> f32 {
        self.available as f32 / self.capacity as f32
    }

    /// Samples lost to overwrite since construction
    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(RingBuffer::new(0).is_err());
    }

    #[test]
    fn test_write_then_read() {
        let mut ring = RingBuffer::new(8).unwrap();
        assert_eq!(ring.write(&[1.0, 2.0, 3.0]), 3);
        assert_eq!(ring.available(), 3);

        let result = ring.read(3);
        assert_eq!(result.samples, vec![1.0, 2.0, 3.0]);
        assert!(!result.partial);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_partial_read() {
        let mut ring = RingBuffer::new(8).unwrap();
        ring.write(&[1.0, 2.0]);

        let result = ring.read(5);
        assert_eq!(result.samples_read, 2);
        assert!(result.partial);
        assert_eq!(result.samples, vec![1.0, 2.0]);
    }

    #[test]
    fn test_read_from_empty() {
        let mut ring = RingBuffer::new(4).unwrap();
        let result = ring.read(4);
        assert_eq!(result.samples_read, 0);
        assert!(result.partial);
        assert!(result.samples.is_empty());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut ring = RingBuffer::new(4).unwrap();
        ring.write(&[1.0, 2.0]);
        assert_eq!(ring.peek(2), vec![1.0, 2.0]);
        assert_eq!(ring.available(), 2);
        assert_eq!(ring.read(2).samples, vec![1.0, 2.0]);
    }

    #[test]
    fn test_wrap_around() {
        let mut ring = RingBuffer::new(4).unwrap();
        ring.write(&[1.0, 2.0, 3.0]);
        ring.read(2);
        ring.write(&[4.0, 5.0, 6.0]); // crosses the wrap point
        let result = ring.read(4);
        assert_eq!(result.samples, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_overwrite_oldest_when_full() {
        // Capacity 10 written with 12 samples in one call retains only
        // the most recent 10.
        let mut ring = RingBuffer::new(10).unwrap();
        let input: Vec<f32> = (0..12).map(|i| i as f32).collect();
        assert_eq!(ring.write(&input), 12);
        assert_eq!(ring.available(), 10);
        assert_eq!(ring.overwritten(), 2);

        let result = ring.read(10);
        let expected: Vec<f32> = (2..12).map(|i| i as f32).collect();
        assert_eq!(result.samples, expected);
    }

    #[test]
    fn test_overwrite_across_calls() {
        let mut ring = RingBuffer::new(4).unwrap();
        ring.write(&[1.0, 2.0, 3.0]);
        ring.write(&[4.0, 5.0]); // 5 total, oldest one evicted
        assert_eq!(ring.available(), 4);
        assert_eq!(ring.overwritten(), 1);
        assert_eq!(ring.read(4).samples, vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_clear() {
        let mut ring = RingBuffer::new(4).unwrap();
        ring.write(&[1.0, 2.0, 3.0]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.read(1).samples_read, 0);
    }

    proptest! {
        /// availableSamples never exceeds capacity and never goes
        /// negative across arbitrary write/read interleavings.
        #[test]
        fn prop_ring_invariant(
            capacity in 1usize..256,
            ops in prop::collection::vec((any::<bool>(), 0usize..300), 0..64),
        ) {
            let mut ring = RingBuffer::new(capacity).unwrap();
            let mut modeled: usize = 0;

            for (is_write, n) in ops {
                if is_write {
                    let samples = vec![0.25f32; n];
                    ring.write(&samples);
                    modeled = (modeled + n).min(capacity);
                } else {
                    let result = ring.read(n);
                    prop_assert_eq!(result.samples_read, n.min(modeled));
                    prop_assert_eq!(result.partial, n > modeled);
                    modeled -= n.min(modeled);
                }
                prop_assert!(ring.available() <= ring.capacity());
                prop_assert_eq!(ring.available(), modeled);
            }
        }
    }
}
