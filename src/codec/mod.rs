//! Wire-format decoding
//!
//! The stream carries raw little-endian 16-bit PCM; the only codec work
//! is normalizing it to f32.

pub mod pcm;

pub use pcm::{ConverterStats, SampleConverter};
