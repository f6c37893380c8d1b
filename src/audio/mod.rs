//! Audio subsystem module

pub mod align;
pub mod device;
pub mod jitter;
pub mod ring;

pub use align::{AlignMode, BoundaryAligner};
pub use device::{CpalOutput, DeviceMetrics, OutputConfig, OutputDevice};
pub use jitter::{BufferHealth, BufferState, JitterBuffer, UnderrunStrategy};
pub use ring::RingBuffer;

/// Block of decoded, normalized audio samples
///
/// Produced by the sample converter, consumed by the jitter buffer and
/// the output device. Ownership transfers on every hop; blocks are never
/// aliased.
#[derive(Debug, Clone)]
pub struct SampleBlock {
    /// Interleaved f32 samples in `[-1.0, 1.0]`
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
}

impl SampleBlock {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration of this block in seconds
    pub fn duration_secs(&self) -> f64 {
        let frames = self.samples.len() / self.channels.max(1) as usize;
        frames as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_duration() {
        let block = SampleBlock::new(vec![0.0; 320], 16_000, 1);
        assert!((block.duration_secs() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_stereo_block_duration() {
        let block = SampleBlock::new(vec![0.0; 640], 16_000, 2);
        assert!((block.duration_secs() - 0.02).abs() < 1e-9);
    }
}
