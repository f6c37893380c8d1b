//! # Speech Stream Player
//!
//! Low-latency playback engine for synthesized speech streamed over the
//! network as raw little-endian 16-bit PCM.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         StreamingPlayer                              │
//! │                                                                      │
//! │  ┌──────────┐    ┌────────────┐    ┌─────────────────┐              │
//! │  │  Byte    │    │   Chunk    │    │ SampleConverter │              │
//! │  │  Source  │───▶│   Queue    │───▶│  (i16 → f32)    │              │
//! │  │ (socket) │    │ (bounded)  │    └────────┬────────┘              │
//! │  └──────────┘    └────────────┘             │                       │
//! │   reader task     processing task ──────────┤                       │
//! │                                             ▼                       │
//! │                                    ┌─────────────────┐              │
//! │                                    │  JitterBuffer   │              │
//! │                                    │  (RingBuffer +  │              │
//! │                                    │   pre-buffer)   │              │
//! │                                    └────────┬────────┘              │
//! │                                             │                       │
//! │   playback task ────────────────────────────┤                       │
//! │                                             ▼                       │
//! │                 ┌──────────────┐   ┌─────────────────┐              │
//! │                 │ OutputDevice │◀──│ BoundaryAligner │              │
//! │                 │ (cpal, gain, │   │ (zero-crossing  │              │
//! │                 │  scheduling) │   │  first chunk)   │              │
//! │                 └──────────────┘   └─────────────────┘              │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Network delivery is irregular; the jitter buffer absorbs that variance
//! so the output device never runs dry. Chunks play strictly in arrival
//! order and device scheduling is strictly append-order, so playback is
//! gapless as long as the buffer stays above its threshold.

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod player;

pub use config::PlayerConfig;
pub use error::{Error, Result};
pub use player::StreamingPlayer;

/// Application-wide constants
pub mod constants {
    /// Default sample rate for synthesized speech streams
    pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

    /// Default channel count (mono speech)
    pub const DEFAULT_CHANNELS: u16 = 1;

    /// Default pre-buffer threshold in milliseconds
    pub const DEFAULT_PRE_BUFFER_MS: u32 = 300;

    /// Default maximum buffered audio in seconds
    pub const DEFAULT_MAX_BUFFER_SECS: f32 = 5.0;

    /// Default crossfade duration in seconds (reserved for future smoothing)
    pub const DEFAULT_CROSSFADE_SECS: f32 = 0.05;

    /// Default output gain
    pub const DEFAULT_INITIAL_GAIN: f32 = 1.0;

    /// Connection handshake timeout in seconds
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Processing loop tick interval in milliseconds
    pub const PROCESS_INTERVAL_MS: u64 = 20;

    /// Duration of each chunk the playback loop pulls, in milliseconds
    pub const PLAYBACK_CHUNK_MS: u32 = 50;

    /// Safety margin subtracted from each playback re-arm delay, in
    /// milliseconds, so the next chunk is scheduled before the device
    /// runs dry
    pub const PLAYBACK_SAFETY_MARGIN_MS: u64 = 5;

    /// Maximum samples the boundary aligner scans for a zero-crossing
    pub const ZERO_CROSSING_SCAN_WINDOW: usize = 1024;

    /// Default cap on queued network chunks awaiting conversion
    pub const DEFAULT_MAX_QUEUE_ENTRIES: usize = 512;

    /// Default cap on queued network bytes awaiting conversion
    pub const DEFAULT_MAX_QUEUE_BYTES: usize = 2 * 1024 * 1024;
}
