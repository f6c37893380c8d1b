//! Streaming player orchestration
//!
//! Ties the pipeline together: a reader task feeds socket bytes into the
//! chunk queue, a processing task converts and pushes them into the
//! jitter buffer at a fixed cadence, and a playback task pulls
//! fixed-duration chunks and schedules them on the output device,
//! re-arming itself just before the scheduled audio runs out.
//!
//! The ring buffer inside the jitter buffer is single-producer
//! single-consumer; on this multi-threaded runtime that discipline is
//! enforced with a mutex whose critical sections never span an await.

pub mod events;
pub mod metrics;
pub mod state;

pub use events::{EventBus, EventKind, PlayerEvent};
pub use metrics::PlayerMetrics;
pub use state::PlayerState;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{error, info};

use crate::audio::jitter::BufferState;
use crate::audio::{
    AlignMode, BoundaryAligner, JitterBuffer, OutputDevice, SampleBlock,
};
use crate::codec::SampleConverter;
use crate::config::PlayerConfig;
use crate::constants::{PLAYBACK_CHUNK_MS, PLAYBACK_SAFETY_MARGIN_MS, PROCESS_INTERVAL_MS};
use crate::error::{Error, PlayerError, Result};
use crate::network::{ByteSource, ChunkQueue, TcpByteSource};

/// State shared by the player handle and its session tasks
struct Inner {
    config: PlayerConfig,
    device: Arc<dyn OutputDevice>,
    state: Mutex<PlayerState>,
    queue: Mutex<ChunkQueue>,
    jitter: Mutex<JitterBuffer>,
    converter: SampleConverter,
    aligner: BoundaryAligner,
    events: EventBus,
    /// Latched for the lifetime of one connected session
    session_active: AtomicBool,
    /// Set once the pre-buffer threshold is first reached
    playback_started: AtomicBool,
    /// Suppresses duplicate underrun events within one episode
    underrun_reported: AtomicBool,
    /// Wakes the playback task when buffering completes
    playback_gate: Notify,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
}

impl Inner {
    /// Set the state and emit its lifecycle event.
    fn transition(&self, state: PlayerState) {
        *self.state.lock() = state;
        info!(state = state.name(), "player state changed");
        let event = match state {
            PlayerState::Connecting => PlayerEvent::Connecting,
            PlayerState::Buffering => PlayerEvent::Buffering,
            PlayerState::Playing => PlayerEvent::Playing,
            PlayerState::Paused => PlayerEvent::Paused,
            PlayerState::Stopped => PlayerEvent::Stopped,
            // Error carries a message and is emitted by `finish`; Idle
            // is the initial state and has no event.
            PlayerState::Idle | PlayerState::Error => return,
        };
        self.events.emit(event);
    }

    /// Recompute the metrics snapshot from component counters.
    fn metrics(&self) -> PlayerMetrics {
        let health = self.jitter.lock().health();
        let queue = self.queue.lock().stats();
        PlayerMetrics::compute(
            *self.state.lock(),
            &health,
            &queue,
            &self.converter.stats(),
            &self.device.metrics(),
            self.config.sample_rate,
            self.config.channels,
        )
    }

    /// Tear down the current session exactly once: halt all tasks, clear
    /// every buffer, drop scheduled audio, and settle into `final_state`.
    fn finish(&self, final_state: PlayerState, error_message: Option<String>) {
        if !self.session_active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(true);
        }
        self.queue.lock().clear();
        self.jitter.lock().clear();
        self.device.stop_all();
        self.playback_started.store(false, Ordering::SeqCst);
        self.underrun_reported.store(false, Ordering::SeqCst);

        match error_message {
            Some(message) => {
                error!("player session failed: {}", message);
                *self.state.lock() = PlayerState::Error;
                self.events.emit(PlayerEvent::Error { message });
            }
            None => self.transition(final_state),
        }
    }
}

/// Streaming audio player
///
/// Owns one chunk queue, one jitter buffer, one converter, and one
/// aligner; holds a shared handle to the process-wide output device.
/// All buffers are created at construction and cleared at `stop()`.
pub struct StreamingPlayer {
    inner: Arc<Inner>,
}

impl StreamingPlayer {
    /// Create a player. Fails fast on invalid configuration.
    pub fn new(config: PlayerConfig, device: Arc<dyn OutputDevice>) -> Result<Self> {
        config.validate()?;
        let jitter = JitterBuffer::new(
            config.sample_rate,
            config.channels,
            config.pre_buffer_ms,
            config.max_buffer_secs,
            config.underrun_strategy,
        )?;
        let queue = ChunkQueue::new(config.max_queue_entries, config.max_queue_bytes);
        let converter = SampleConverter::new(config.sample_rate, config.channels);
        let aligner = BoundaryAligner::new(config.channels);

        device.set_gain(config.initial_gain, None);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                device,
                state: Mutex::new(PlayerState::Idle),
                queue: Mutex::new(queue),
                jitter: Mutex::new(jitter),
                converter,
                aligner,
                events: EventBus::new(),
                session_active: AtomicBool::new(false),
                playback_started: AtomicBool::new(false),
                underrun_reported: AtomicBool::new(false),
                playback_gate: Notify::new(),
                shutdown: Mutex::new(None),
            }),
        })
    }

    /// Connect to a TCP PCM stream and start the session. Fails if a
    /// session is already active; the handshake is bounded by the
    /// connect timeout.
    pub async fn connect(&self, addr: &str) -> Result<()> {
        self.begin_connect()?;
        let source = match TcpByteSource::connect(addr).await {
            Ok(source) => source,
            Err(e) => {
                let message = e.to_string();
                // The session never started; report the failure directly.
                *self.inner.state.lock() = PlayerState::Error;
                self.inner.events.emit(PlayerEvent::Error {
                    message: message.clone(),
                });
                return Err(Error::Network(e));
            }
        };
        self.start_session(Box::new(source))
    }

    /// Start a session over an already-established byte source.
    pub async fn connect_source(&self, source: Box<dyn ByteSource>) -> Result<()> {
        self.begin_connect()?;
        self.start_session(source)
    }

    /// Subscribe to one event kind.
    pub fn subscribe(&self, kind: EventKind) -> crossbeam_channel::Receiver<PlayerEvent> {
        self.inner.events.subscribe(kind)
    }

    /// Subscribe one receiver to several event kinds.
    pub fn subscribe_many(
        &self,
        kinds: &[EventKind],
    ) -> crossbeam_channel::Receiver<PlayerEvent> {
        self.inner.events.subscribe_many(kinds)
    }

    /// Current player state
    pub fn state(&self) -> PlayerState {
        *self.inner.state.lock()
    }

    /// Current metrics snapshot
    pub fn metrics(&self) -> PlayerMetrics {
        self.inner.metrics()
    }

    /// Set output gain, optionally ramped.
    pub fn set_gain(&self, level: f32, ramp: Option<Duration>) {
        self.inner.device.set_gain(level, ramp);
    }

    /// Pause playback. Buffering continues; scheduled audio is held.
    pub fn pause(&self) {
        let mut state = self.inner.state.lock();
        if *state != PlayerState::Playing {
            return;
        }
        *state = PlayerState::Paused;
        drop(state);
        self.inner.device.suspend();
        self.inner.events.emit(PlayerEvent::Paused);
        info!("playback paused");
    }

    /// Resume after `pause`.
    pub fn resume(&self) {
        let mut state = self.inner.state.lock();
        if *state != PlayerState::Paused {
            return;
        }
        *state = PlayerState::Playing;
        drop(state);
        self.inner.device.resume();
        self.inner.events.emit(PlayerEvent::Playing);
        info!("playback resumed");
    }

    /// Stop the session: halt all loops, clear every buffer, close the
    /// socket. Safe to call from any state; idempotent. The device stays
    /// initialized for the next session.
    pub fn stop(&self) {
        self.inner.finish(PlayerState::Stopped, None);
    }

    /// Stop and release the output device's hardware resource.
    pub fn dispose(&self) {
        self.stop();
        self.inner.device.dispose();
    }

    fn begin_connect(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.is_active() {
            return Err(Error::Player(PlayerError::AlreadyActive(state.name())));
        }
        *state = PlayerState::Connecting;
        drop(state);
        self.inner.events.emit(PlayerEvent::Connecting);
        info!("player connecting");
        Ok(())
    }

    fn start_session(&self, source: Box<dyn ByteSource>) -> Result<()> {
        if let Err(e) = self.inner.device.initialize() {
            let message = format!("output device unavailable: {}", e);
            *self.inner.state.lock() = PlayerState::Error;
            self.inner.events.emit(PlayerEvent::Error {
                message: message.clone(),
            });
            return Err(Error::Audio(e));
        }

        // Fresh session: no stale audio, counters rearmed.
        self.inner.queue.lock().clear();
        self.inner.jitter.lock().clear();
        self.inner.playback_started.store(false, Ordering::SeqCst);
        self.inner.underrun_reported.store(false, Ordering::SeqCst);
        self.inner.session_active.store(true, Ordering::SeqCst);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        *self.inner.shutdown.lock() = Some(shutdown_tx);

        self.inner.events.emit(PlayerEvent::Connected);
        self.inner.transition(PlayerState::Buffering);

        tokio::spawn(reader_task(
            self.inner.clone(),
            source,
            shutdown_rx.clone(),
        ));
        tokio::spawn(processing_task(self.inner.clone(), shutdown_rx.clone()));
        tokio::spawn(playback_task(self.inner.clone(), shutdown_rx));
        Ok(())
    }
}

impl Drop for StreamingPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pull bytes off the socket into the chunk queue until the stream ends
/// or fails. Dropping the source closes the socket.
async fn reader_task(
    inner: Arc<Inner>,
    mut source: Box<dyn ByteSource>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            result = source.next_chunk() => match result {
                Ok(Some(bytes)) => {
                    inner.queue.lock().enqueue(bytes);
                }
                Ok(None) => {
                    info!("audio stream closed by peer");
                    inner.finish(PlayerState::Stopped, None);
                    break;
                }
                Err(e) => {
                    inner.finish(PlayerState::Error, Some(format!("socket error: {}", e)));
                    break;
                }
            }
        }
    }
}

/// Fixed-cadence loop: drain the queue fully, convert, feed the jitter
/// buffer, publish metrics, gate playback start, and report underrun
/// episodes.
async fn processing_task(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(Duration::from_millis(PROCESS_INTERVAL_MS));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = interval.tick() => {}
        }

        loop {
            let chunk = inner.queue.lock().dequeue();
            let Some(chunk) = chunk else { break };
            let block = inner.converter.convert(&chunk.payload);
            if !block.is_empty() {
                inner.jitter.lock().add_chunk(&block.samples);
            }
        }

        inner.events.emit(PlayerEvent::Metrics(inner.metrics()));

        if !inner.playback_started.load(Ordering::SeqCst) {
            if inner.jitter.lock().can_start_playback() {
                inner.playback_started.store(true, Ordering::SeqCst);
                inner.transition(PlayerState::Playing);
                inner.playback_gate.notify_one();
            }
        } else {
            let health = inner.jitter.lock().health();
            if health.state == BufferState::Underrun {
                if !inner.underrun_reported.swap(true, Ordering::SeqCst) {
                    inner.events.emit(PlayerEvent::Underrun { health });
                }
            } else {
                inner.underrun_reported.store(false, Ordering::SeqCst);
            }
        }
    }
}

/// Self-re-arming playback loop: pull a fixed-duration chunk, align the
/// first one of the session to a zero-crossing, schedule it, then sleep
/// until just before the scheduled audio is predicted to finish.
async fn playback_task(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    tokio::select! {
        _ = shutdown.changed() => return,
        _ = inner.playback_gate.notified() => {}
    }

    let rate = inner.config.sample_rate;
    let channels = inner.config.channels;
    let chunk_samples =
        (rate as usize * PLAYBACK_CHUNK_MS as usize / 1000) * channels as usize;
    let margin = Duration::from_millis(PLAYBACK_SAFETY_MARGIN_MS);
    let mut first_chunk = true;

    loop {
        if *shutdown.borrow() {
            break;
        }

        if *inner.state.lock() == PlayerState::Paused {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(Duration::from_millis(PROCESS_INTERVAL_MS)) => {}
            }
            continue;
        }

        let pulled = inner.jitter.lock().get_next_chunk(chunk_samples);
        if pulled.samples.is_empty() {
            // Stall strategy starved us; skip a cycle and retry.
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(Duration::from_millis(10)) => {}
            }
            continue;
        }

        let samples = if first_chunk && inner.config.use_zero_crossing {
            inner
                .aligner
                .align(&pulled.samples, AlignMode::Start)
                .to_vec()
        } else {
            pulled.samples
        };
        first_chunk = false;

        let block = SampleBlock::new(samples, rate, channels);
        let duration = Duration::from_secs_f64(block.duration_secs());
        inner.device.schedule(block);

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(duration.saturating_sub(margin)) => {}
        }
    }
}
