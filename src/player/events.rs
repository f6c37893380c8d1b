//! Player event fan-out
//!
//! Subscribers register per event kind and receive events over their own
//! unbounded channel, so one slow or dropped subscriber never blocks the
//! player or starves the other subscribers.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::audio::jitter::BufferHealth;
use crate::player::metrics::PlayerMetrics;

/// Event kinds a subscriber can register for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connecting,
    Connected,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Underrun,
    Error,
    Metrics,
}

/// Events emitted by the player
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Connecting,
    Connected,
    Buffering,
    Playing,
    Paused,
    Stopped,
    /// Playback was starved; degraded service, not failure
    Underrun { health: BufferHealth },
    /// Terminal failure with a human-readable message
    Error { message: String },
    /// Periodic metrics snapshot
    Metrics(PlayerMetrics),
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlayerEvent::Connecting => EventKind::Connecting,
            PlayerEvent::Connected => EventKind::Connected,
            PlayerEvent::Buffering => EventKind::Buffering,
            PlayerEvent::Playing => EventKind::Playing,
            PlayerEvent::Paused => EventKind::Paused,
            PlayerEvent::Stopped => EventKind::Stopped,
            PlayerEvent::Underrun { .. } => EventKind::Underrun,
            PlayerEvent::Error { .. } => EventKind::Error,
            PlayerEvent::Metrics(_) => EventKind::Metrics,
        }
    }
}

/// Per-kind multi-subscriber event bus
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<EventKind, Vec<Sender<PlayerEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind.
    pub fn subscribe(&self, kind: EventKind) -> Receiver<PlayerEvent> {
        self.subscribe_many(&[kind])
    }

    /// Subscribe one receiver to several event kinds.
    pub fn subscribe_many(&self, kinds: &[EventKind]) -> Receiver<PlayerEvent> {
        let (tx, rx) = unbounded();
        let mut subscribers = self.subscribers.lock();
        for &kind in kinds {
            subscribers.entry(kind).or_default().push(tx.clone());
        }
        rx
    }

    /// Deliver an event to every live subscriber of its kind. Dropped
    /// receivers are pruned; delivery to one subscriber cannot affect
    /// another.
    pub fn emit(&self, event: PlayerEvent) {
        let kind = event.kind();
        let mut subscribers = self.subscribers.lock();
        if let Some(senders) = subscribers.get_mut(&kind) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_to_multiple_subscribers() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe(EventKind::Playing);
        let rx2 = bus.subscribe(EventKind::Playing);

        bus.emit(PlayerEvent::Playing);

        assert!(matches!(rx1.try_recv().unwrap(), PlayerEvent::Playing));
        assert!(matches!(rx2.try_recv().unwrap(), PlayerEvent::Playing));
    }

    #[test]
    fn test_kind_filtering() {
        let bus = EventBus::new();
        let rx = bus.subscribe(EventKind::Paused);

        bus.emit(PlayerEvent::Playing);
        assert!(rx.try_recv().is_err());

        bus.emit(PlayerEvent::Paused);
        assert!(matches!(rx.try_recv().unwrap(), PlayerEvent::Paused));
    }

    #[test]
    fn test_dropped_subscriber_does_not_block_others() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe(EventKind::Stopped);
        let rx2 = bus.subscribe(EventKind::Stopped);
        drop(rx1);

        bus.emit(PlayerEvent::Stopped);
        assert!(matches!(rx2.try_recv().unwrap(), PlayerEvent::Stopped));
    }

    #[test]
    fn test_subscribe_many() {
        let bus = EventBus::new();
        let rx = bus.subscribe_many(&[EventKind::Playing, EventKind::Paused]);

        bus.emit(PlayerEvent::Playing);
        bus.emit(PlayerEvent::Paused);

        assert!(matches!(rx.try_recv().unwrap(), PlayerEvent::Playing));
        assert!(matches!(rx.try_recv().unwrap(), PlayerEvent::Paused));
    }
}
