//! Error types for the streaming playback engine
//!
//! Expected runtime conditions (empty queue, partial read, malformed
//! chunk) are returned as sentinel or partial values by the components
//! themselves and never surface here. These types cover the genuinely
//! exceptional cases: resource acquisition, connection failures, and
//! invalid configuration.

use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Player error: {0}")]
    Player(#[from] PlayerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid buffer capacity: {0}")]
    InvalidCapacity(usize),

    #[error("Device not initialized")]
    NotInitialized,

    #[error("cpal error: {0}")]
    CpalError(String),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection timed out after {0} seconds")]
    ConnectTimeout(u64),

    #[error("Stream closed unexpectedly")]
    UnexpectedClose,

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// Player orchestration errors
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("Cannot connect while {0}")]
    AlreadyActive(&'static str),

    #[error("Player has been stopped")]
    Stopped,
}

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, Error>;
