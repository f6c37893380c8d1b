//! Jitter buffer: pre-buffering and underrun policy over a ring buffer
//!
//! The shock absorber between irregular network arrival and the steady
//! pull of the playback loop. Playback is gated until a minimum duration
//! has accumulated; once playing, a starved read is filled according to
//! the configured [`UnderrunStrategy`] and reported as a single underrun
//! episode until the buffer recovers above threshold.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::ring::RingBuffer;
use crate::error::AudioError;

/// How a starved read is satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnderrunStrategy {
    /// Fill the shortfall with zero-valued samples
    Silence,
    /// Cycle the most recently emitted block to fill the shortfall
    RepeatLast,
    /// Return only what is available; the caller skips a cycle
    Stall,
}

/// Buffer health states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Nothing buffered yet
    Empty,
    /// Accumulating toward the pre-buffer threshold
    Buffering,
    /// At or above threshold; playback may proceed
    Ready,
    /// Starved while playing; recovers once back above threshold
    Underrun,
}

/// Point-in-time buffer health snapshot
#[derive(Debug, Clone)]
pub struct BufferHealth {
    pub state: BufferState,
    /// Currently buffered duration in milliseconds
    pub buffered_ms: u64,
    /// Pre-buffer threshold in milliseconds
    pub threshold_ms: u32,
    /// Fill level as a percentage of total capacity
    pub percent_full: f32,
    /// Samples currently queued
    pub samples_queued: usize,
    /// Underrun episodes since construction
    pub underruns: u64,
    /// Samples lost to ring overwrite since construction
    pub overwritten_samples: u64,
}

/// Result of pulling a chunk for playback
#[derive(Debug, Clone)]
pub struct PulledChunk {
    /// Samples to play; may include strategy fill
    pub samples: Vec<f32>,
    /// Samples that actually came from the buffer
    pub samples_read: usize,
}

/// Ring buffer wrapped with pre-buffering and underrun handling
pub struct JitterBuffer {
    ring: RingBuffer,
    sample_rate: u32,
    channels: u16,
    threshold_ms: u32,
    strategy: UnderrunStrategy,
    state: BufferState,
    underruns: u64,
    /// Most recently emitted block, kept for `RepeatLast`
    last_block: Vec<f32>,
}

impl JitterBuffer {
    /// Create a jitter buffer holding up to `max_buffer_secs` of audio.
    pub fn new(
        sample_rate: u32,
        channels: u16,
        threshold_ms: u32,
        max_buffer_secs: f32,
        strategy: UnderrunStrategy,
    ) -> Result<Self, AudioError> {
        let capacity = (max_buffer_secs * sample_rate as f32) as usize * channels as usize;
        Ok(Self {
            ring: RingBuffer::new(capacity)?,
            sample_rate,
            channels,
            threshold_ms,
            strategy,
            state: BufferState::Empty,
            underruns: 0,
            last_block: Vec::new(),
        })
    }

    /// Append decoded samples. Ring overwrite semantics apply: when the
    /// buffer is full the oldest audio is silently dropped.
    pub fn add_chunk(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let before = self.ring.overwritten();
        self.ring.write(samples);
        let lost = self.ring.overwritten() - before;
        if lost > 0 {
            warn!(lost, "jitter buffer full, overwrote oldest samples");
        }

        match self.state {
            BufferState::Empty => {
                self.state = BufferState::Buffering;
                if self.above_threshold() {
                    self.state = BufferState::Ready;
                }
            }
            BufferState::Buffering | BufferState::Underrun => {
                if self.above_threshold() {
                    debug!(buffered_ms = self.buffered_ms(), "buffer recovered to ready");
                    self.state = BufferState::Ready;
                }
            }
            BufferState::Ready => {}
        }
    }

    /// True iff buffered duration has reached the pre-buffer threshold
    /// (boundary-inclusive).
    pub fn can_start_playback(&self) -> bool {
        self.above_threshold()
    }

    /// Pull up to `n` samples for playback. A shortfall is filled per the
    /// configured strategy and moves the buffer into `Underrun` until it
    /// refills above threshold. Never blocks.
    pub fn get_next_chunk(&mut self, n: usize) -> PulledChunk {
        let result = self.ring.read(n);
        let samples_read = result.samples_read;
        let mut samples = result.samples;

        if result.partial {
            if self.state != BufferState::Underrun {
                self.underruns += 1;
                warn!(
                    requested = n,
                    got = samples_read,
                    episode = self.underruns,
                    "buffer underrun"
                );
            }
            self.state = BufferState::Underrun;

            match self.strategy {
                UnderrunStrategy::Silence => {
                    samples.resize(n, 0.0);
                }
                UnderrunStrategy::RepeatLast => {
                    if self.last_block.is_empty() {
                        samples.resize(n, 0.0);
                    } else {
                        let mut i = 0;
                        while samples.len() < n {
                            samples.push(self.last_block[i % self.last_block.len()]);
                            i += 1;
                        }
                    }
                }
                UnderrunStrategy::Stall => {
                    // Emit only what we have; the playback loop skips a cycle.
                }
            }
        } else if self.state == BufferState::Underrun && self.above_threshold() {
            self.state = BufferState::Ready;
        }

        if !samples.is_empty() {
            self.last_block = samples.clone();
        }
        PulledChunk {
            samples,
            samples_read,
        }
    }

    /// Canonical health snapshot for player metrics
    pub fn health(&self) -> BufferHealth {
        BufferHealth {
            state: self.state,
            buffered_ms: self.buffered_ms(),
            threshold_ms: self.threshold_ms,
            percent_full: self.ring.fill_level() * 100.0,
            samples_queued: self.ring.available(),
            underruns: self.underruns,
            overwritten_samples: self.ring.overwritten(),
        }
    }

    /// Current buffer health state
    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Currently buffered duration in milliseconds
    pub fn buffered_ms(&self) -> u64 {
        self.ring.available() as u64 * 1000 / (self.sample_rate as u64 * self.channels as u64)
    }

    /// Underrun episodes since construction
    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    /// Drop all buffered audio and return to `Empty`.
    pub fn clear(&mut self) {
        self.ring.clear();
        self.last_block.clear();
        self.state = BufferState::Empty;
    }

    fn above_threshold(&self) -> bool {
        self.buffered_ms() >= u64::from(self.threshold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20 ms of audio at 16 kHz mono
    const CHUNK: usize = 320;

    fn make_buffer(strategy: UnderrunStrategy) -> JitterBuffer {
        JitterBuffer::new(16_000, 1, 300, 5.0, strategy).unwrap()
    }

    #[test]
    fn test_threshold_gating_boundary_inclusive() {
        // 16 kHz stream, 300 ms threshold, 20 ms chunks: playback becomes
        // allowed on the 15th chunk, not before.
        let mut jitter = make_buffer(UnderrunStrategy::Silence);
        let chunk = vec![0.1f32; CHUNK];

        for i in 1..=14 {
            jitter.add_chunk(&chunk);
            assert!(!jitter.can_start_playback(), "started early at chunk {}", i);
        }
        jitter.add_chunk(&chunk);
        assert!(jitter.can_start_playback());
        assert_eq!(jitter.buffered_ms(), 300);
        assert_eq!(jitter.state(), BufferState::Ready);
    }

    #[test]
    fn test_state_progression() {
        let mut jitter = make_buffer(UnderrunStrategy::Silence);
        assert_eq!(jitter.state(), BufferState::Empty);

        jitter.add_chunk(&[0.1; CHUNK]);
        assert_eq!(jitter.state(), BufferState::Buffering);

        jitter.add_chunk(&vec![0.1f32; CHUNK * 14]);
        assert_eq!(jitter.state(), BufferState::Ready);
    }

    #[test]
    fn test_underrun_counted_once_per_episode() {
        let mut jitter = make_buffer(UnderrunStrategy::Silence);
        jitter.add_chunk(&vec![0.1f32; CHUNK * 15]);
        assert_eq!(jitter.state(), BufferState::Ready);

        // Drain everything, then keep starving it.
        jitter.get_next_chunk(CHUNK * 15);
        let pulled = jitter.get_next_chunk(CHUNK);
        assert_eq!(pulled.samples_read, 0);
        assert_eq!(jitter.state(), BufferState::Underrun);
        assert_eq!(jitter.underruns(), 1);

        // Repeated starved reads are the same episode.
        jitter.get_next_chunk(CHUNK);
        jitter.get_next_chunk(CHUNK);
        assert_eq!(jitter.underruns(), 1);

        // Refill above threshold: recovers to Ready.
        jitter.add_chunk(&vec![0.1f32; CHUNK * 15]);
        assert_eq!(jitter.state(), BufferState::Ready);

        // A new starvation is a new episode.
        jitter.get_next_chunk(CHUNK * 15);
        jitter.get_next_chunk(CHUNK);
        assert_eq!(jitter.underruns(), 2);
    }

    #[test]
    fn test_silence_strategy_zero_fills() {
        let mut jitter = make_buffer(UnderrunStrategy::Silence);
        jitter.add_chunk(&[0.5; 100]);

        let pulled = jitter.get_next_chunk(200);
        assert_eq!(pulled.samples.len(), 200);
        assert_eq!(pulled.samples_read, 100);
        assert!(pulled.samples[100..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_repeat_last_strategy_cycles_previous_block() {
        let mut jitter = make_buffer(UnderrunStrategy::RepeatLast);
        jitter.add_chunk(&[0.25; 100]);
        jitter.get_next_chunk(100); // full read, remembered as last block

        let pulled = jitter.get_next_chunk(50);
        assert_eq!(pulled.samples.len(), 50);
        assert_eq!(pulled.samples_read, 0);
        assert!(pulled.samples.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn test_repeat_last_with_no_history_emits_silence() {
        let mut jitter = make_buffer(UnderrunStrategy::RepeatLast);
        let pulled = jitter.get_next_chunk(10);
        assert_eq!(pulled.samples.len(), 10);
        assert!(pulled.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_stall_strategy_returns_short() {
        let mut jitter = make_buffer(UnderrunStrategy::Stall);
        jitter.add_chunk(&[0.5; 30]);

        let pulled = jitter.get_next_chunk(100);
        assert_eq!(pulled.samples.len(), 30);
        assert_eq!(pulled.samples_read, 30);
        assert_eq!(jitter.state(), BufferState::Underrun);
    }

    #[test]
    fn test_health_snapshot() {
        let mut jitter = make_buffer(UnderrunStrategy::Silence);
        jitter.add_chunk(&vec![0.1f32; CHUNK * 5]);

        let health = jitter.health();
        assert_eq!(health.buffered_ms, 100);
        assert_eq!(health.threshold_ms, 300);
        assert_eq!(health.samples_queued, CHUNK * 5);
        assert_eq!(health.underruns, 0);
        assert!(health.percent_full > 0.0);
    }

    #[test]
    fn test_clear_resets_to_empty() {
        let mut jitter = make_buffer(UnderrunStrategy::Silence);
        jitter.add_chunk(&vec![0.1f32; CHUNK * 15]);
        jitter.clear();
        assert_eq!(jitter.state(), BufferState::Empty);
        assert_eq!(jitter.buffered_ms(), 0);
        assert!(!jitter.can_start_playback());
    }
}
