//! PCM sample conversion
//!
//! Converts wire-format little-endian signed 16-bit PCM into normalized
//! 32-bit float sample blocks. Pure per-call: no state is shared between
//! inputs beyond counters, so one converter may be used from several
//! call sites concurrently for distinct inputs.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use crate::audio::SampleBlock;

/// Normalization divisor: i16 full scale
const SCALE: f32 = 32768.0;

/// Converter statistics
#[derive(Debug, Clone)]
pub struct ConverterStats {
    /// Chunks whose byte length was not a multiple of 2
    pub malformed_chunks: u64,
    /// Chunks rejected outright by validation
    pub rejected_chunks: u64,
    /// Total samples produced
    pub samples_converted: u64,
}

/// Wire PCM to normalized f32 converter
pub struct SampleConverter {
    sample_rate: u32,
    channels: u16,
    /// Reject chunks that decode to non-finite values
    validate: bool,
    /// Clip magnitudes above 1.0 to ±1.0 instead of failing
    clamp: bool,
    malformed_chunks: AtomicU64,
    rejected_chunks: AtomicU64,
    samples_converted: AtomicU64,
}

impl SampleConverter {
    /// Create a converter with both safety policies (validate and clamp)
    /// enabled.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            validate: true,
            clamp: true,
            malformed_chunks: AtomicU64::new(0),
            rejected_chunks: AtomicU64::new(0),
            samples_converted: AtomicU64::new(0),
        }
    }

    /// Disable NaN validation.
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Disable clipping to `[-1.0, 1.0]`.
    pub fn without_clamp(mut self) -> Self {
        self.clamp = false;
        self
    }

    /// Convert a chunk of wire bytes into a sample block.
    ///
    /// A trailing odd byte is dropped and counted as malformed, never an
    /// error. Validation failures produce a zero-length block and bump
    /// the rejected counter; the stream keeps flowing either way.
    pub fn convert(&self, bytes: &[u8]) -> SampleBlock {
        if bytes.len() % 2 != 0 {
            self.malformed_chunks.fetch_add(1, Ordering::Relaxed);
            warn!(len = bytes.len(), "odd-length PCM chunk, dropping trailing byte");
        }
        let even = bytes.len() - bytes.len() % 2;

        let mut samples = Vec::with_capacity(even / 2);
        for pair in bytes[..even].chunks_exact(2) {
            let v = i16::from_le_bytes([pair[0], pair[1]]);
            let mut f = f32::from(v) / SCALE;
            if self.clamp {
                f = f.clamp(-1.0, 1.0);
            }
            samples.push(f);
        }

        if self.validate && samples.iter().any(|s| s.is_nan()) {
            self.rejected_chunks.fetch_add(1, Ordering::Relaxed);
            warn!("decoded chunk contained NaN samples, rejecting");
            return SampleBlock::new(Vec::new(), self.sample_rate, self.channels);
        }

        self.samples_converted
            .fetch_add(samples.len() as u64, Ordering::Relaxed);
        SampleBlock::new(samples, self.sample_rate, self.channels)
    }

    /// Get statistics
    pub fn stats(&self) -> ConverterStats {
        ConverterStats {
            malformed_chunks: self.malformed_chunks.load(Ordering::Relaxed),
            rejected_chunks: self.rejected_chunks.load(Ordering::Relaxed),
            samples_converted: self.samples_converted.load(Ordering::Relaxed),
        }
    }
}
