//! Player configuration
//!
//! All fields have defaults tuned for 16 kHz mono synthesized speech.
//! Configuration is validated once at player construction; invalid values
//! fail fast rather than degrading at runtime.

use serde::{Deserialize, Serialize};

use crate::audio::jitter::UnderrunStrategy;
use crate::constants::*;
use crate::error::Error;

/// Configuration for a [`crate::StreamingPlayer`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Sample rate of the incoming PCM stream in Hz
    pub sample_rate: u32,

    /// Channel count of the incoming PCM stream
    pub channels: u16,

    /// Minimum buffered duration (ms) before playback may start
    pub pre_buffer_ms: u32,

    /// Maximum buffered audio in seconds; fixes ring buffer capacity
    pub max_buffer_secs: f32,

    /// How shortfalls are filled when the buffer is starved
    pub underrun_strategy: UnderrunStrategy,

    /// Crossfade duration in seconds (reserved for future smoothing)
    pub crossfade_secs: f32,

    /// Initial output gain
    pub initial_gain: f32,

    /// Trim the first chunk of a playback session to a zero-crossing
    pub use_zero_crossing: bool,

    /// Maximum entries held in the incoming chunk queue (0 = unbounded)
    pub max_queue_entries: usize,

    /// Maximum bytes held in the incoming chunk queue (0 = unbounded)
    pub max_queue_bytes: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            pre_buffer_ms: DEFAULT_PRE_BUFFER_MS,
            max_buffer_secs: DEFAULT_MAX_BUFFER_SECS,
            underrun_strategy: UnderrunStrategy::Silence,
            crossfade_secs: DEFAULT_CROSSFADE_SECS,
            initial_gain: DEFAULT_INITIAL_GAIN,
            use_zero_crossing: true,
            max_queue_entries: DEFAULT_MAX_QUEUE_ENTRIES,
            max_queue_bytes: DEFAULT_MAX_QUEUE_BYTES,
        }
    }
}

impl PlayerConfig {
    /// Validate the configuration, failing fast on values that would
    /// produce a zero-capacity buffer or nonsense timing.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be non-zero".into()));
        }
        if self.channels == 0 {
            return Err(Error::Config("channels must be non-zero".into()));
        }
        if !(self.max_buffer_secs > 0.0) {
            return Err(Error::Config(format!(
                "max_buffer_secs must be positive, got {}",
                self.max_buffer_secs
            )));
        }
        let max_buffer_ms = (self.max_buffer_secs * 1000.0) as u64;
        if u64::from(self.pre_buffer_ms) >= max_buffer_ms {
            return Err(Error::Config(format!(
                "pre_buffer_ms ({}) must be below max buffer duration ({} ms)",
                self.pre_buffer_ms, max_buffer_ms
            )));
        }
        if !(0.0..=4.0).contains(&self.initial_gain) {
            return Err(Error::Config(format!(
                "initial_gain must be within [0.0, 4.0], got {}",
                self.initial_gain
            )));
        }
        if self.crossfade_secs < 0.0 {
            return Err(Error::Config("crossfade_secs must not be negative".into()));
        }
        Ok(())
    }

    /// Ring buffer capacity in samples implied by this configuration
    pub fn buffer_capacity(&self) -> usize {
        (self.max_buffer_secs * self.sample_rate as f32) as usize * self.channels as usize
    }

    /// Parse a configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.channels, 1);
        assert_eq!(config.pre_buffer_ms, 300);
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let config = PlayerConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = PlayerConfig {
            max_buffer_secs: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threshold_must_fit_in_buffer() {
        let config = PlayerConfig {
            pre_buffer_ms: 6000,
            max_buffer_secs: 5.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_buffer_capacity() {
        let config = PlayerConfig::default();
        // 5 seconds at 16 kHz mono
        assert_eq!(config.buffer_capacity(), 80_000);
    }

    #[test]
    fn test_from_toml_defaults() {
        let config = PlayerConfig::from_toml("sample_rate = 24000").unwrap();
        assert_eq!(config.sample_rate, 24_000);
        assert_eq!(config.pre_buffer_ms, 300);
    }
}
