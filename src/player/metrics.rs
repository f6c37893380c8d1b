//! Player metrics
//!
//! A point-in-time snapshot derived from the jitter buffer, chunk queue,
//! converter, and device counters. Never stored; recomputed on demand.

use crate::audio::device::DeviceMetrics;
use crate::audio::jitter::BufferHealth;
use crate::codec::pcm::ConverterStats;
use crate::network::queue::QueueStats;
use crate::player::state::PlayerState;

/// Snapshot of player health and throughput
#[derive(Debug, Clone)]
pub struct PlayerMetrics {
    pub state: PlayerState,
    /// Decoded audio buffered ahead of playback, in milliseconds
    pub buffered_ms: u64,
    /// Pre-buffer threshold in milliseconds
    pub threshold_ms: u32,
    /// Jitter buffer fill as a percentage of capacity
    pub buffer_percent_full: f32,
    /// Samples queued in the jitter buffer
    pub samples_queued: usize,
    /// Audio emitted to the hardware so far, in seconds
    pub playback_position_secs: f64,
    /// Estimated end-to-end latency: buffered plus scheduled audio, ms
    pub latency_estimate_ms: u64,
    /// Chunks evicted by queue capacity limits
    pub dropped_chunks: u64,
    /// Chunks removed by age-based relief
    pub expired_chunks: u64,
    /// Odd-length chunks seen by the converter
    pub malformed_chunks: u64,
    /// Chunks rejected by converter validation
    pub rejected_chunks: u64,
    /// Underrun episodes
    pub underruns: u64,
    /// Current output gain
    pub gain: f32,
}

impl PlayerMetrics {
    pub fn compute(
        state: PlayerState,
        health: &BufferHealth,
        queue: &QueueStats,
        converter: &ConverterStats,
        device: &DeviceMetrics,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        let rate = u64::from(sample_rate) * u64::from(channels.max(1));
        let scheduled_ms = device.scheduled_samples as u64 * 1000 / rate;
        Self {
            state,
            buffered_ms: health.buffered_ms,
            threshold_ms: health.threshold_ms,
            buffer_percent_full: health.percent_full,
            samples_queued: health.samples_queued,
            playback_position_secs: device.samples_played as f64 / rate as f64,
            latency_estimate_ms: health.buffered_ms + scheduled_ms,
            dropped_chunks: queue.dropped_chunks,
            expired_chunks: queue.expired_chunks,
            malformed_chunks: converter.malformed_chunks,
            rejected_chunks: converter.rejected_chunks,
            underruns: health.underruns,
            gain: device.gain,
        }
    }
}
