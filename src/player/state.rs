//! Player state machine
//!
//! `Idle → Connecting → Buffering → Playing ⇄ Paused`, with `Stopped`
//! and `Error` reachable from any state.

use std::fmt;

/// Lifecycle state of a [`crate::StreamingPlayer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Connecting,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Error,
}

impl PlayerState {
    /// States with a live session: a second `connect` is refused while
    /// in any of these.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            PlayerState::Connecting
                | PlayerState::Buffering
                | PlayerState::Playing
                | PlayerState::Paused
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            PlayerState::Idle => "idle",
            PlayerState::Connecting => "connecting",
            PlayerState::Buffering => "buffering",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Stopped => "stopped",
            PlayerState::Error => "error",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_states() {
        assert!(PlayerState::Connecting.is_active());
        assert!(PlayerState::Buffering.is_active());
        assert!(PlayerState::Playing.is_active());
        assert!(PlayerState::Paused.is_active());
        assert!(!PlayerState::Idle.is_active());
        assert!(!PlayerState::Stopped.is_active());
        assert!(!PlayerState::Error.is_active());
    }
}
