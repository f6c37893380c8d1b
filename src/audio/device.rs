//! Audio output device management
//!
//! [`OutputDevice`] abstracts the hardware audio session as an explicitly
//! constructed, dependency-injected handle: the application root owns one
//! instance for the lifetime of the process and passes it by reference
//! into each player. Tests swap in a mock.
//!
//! [`CpalOutput`] is the hardware implementation. cpal streams are not
//! `Send` on every platform, so the stream lives on a dedicated thread
//! and the output callback pulls from a shared schedule queue. Buffers
//! play back strictly in the order they were scheduled; the device never
//! reorders.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::audio::SampleBlock;
use crate::error::AudioError;

/// Point-in-time device metrics
#[derive(Debug, Clone)]
pub struct DeviceMetrics {
    /// Current gain applied in the output callback
    pub gain: f32,
    /// Blocks awaiting playback
    pub scheduled_blocks: usize,
    /// Samples awaiting playback
    pub scheduled_samples: usize,
    /// Samples emitted to the hardware since initialization
    pub samples_played: u64,
    /// Whether output is suspended
    pub suspended: bool,
}

/// Hardware audio output session
///
/// `initialize` must be paired with `dispose`; both are idempotent.
pub trait OutputDevice: Send + Sync {
    /// Acquire the hardware audio resource. Idempotent.
    fn initialize(&self) -> Result<(), AudioError>;

    /// Whether the output stream is running
    fn is_ready(&self) -> bool;

    /// Enqueue a block for gapless output immediately after any block
    /// already scheduled. Strict append order.
    fn schedule(&self, block: SampleBlock);

    /// Set output gain, optionally ramped over `ramp` to avoid a
    /// discontinuity click.
    fn set_gain(&self, level: f32, ramp: Option<Duration>);

    /// Pause output without releasing the hardware resource.
    fn suspend(&self);

    /// Resume output after `suspend`.
    fn resume(&self);

    /// Drop all scheduled audio.
    fn stop_all(&self);

    /// Current device metrics
    fn metrics(&self) -> DeviceMetrics;

    /// Release the hardware audio resource. Idempotent.
    fn dispose(&self);
}

/// A scheduled block with a playback cursor
struct ScheduledBlock {
    samples: Vec<f32>,
    pos: usize,
}

/// State shared between the API surface and the output callback
struct Shared {
    queue: Mutex<VecDeque<ScheduledBlock>>,
    scheduled_samples: AtomicUsize,
    samples_played: AtomicU64,
    /// f32 bit patterns; the callback is the only writer of `gain`
    gain: AtomicU32,
    target_gain: AtomicU32,
    gain_step: AtomicU32,
    suspended: AtomicBool,
}

impl Shared {
    fn new(initial_gain: f32) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            scheduled_samples: AtomicUsize::new(0),
            samples_played: AtomicU64::new(0),
            gain: AtomicU32::new(initial_gain.to_bits()),
            target_gain: AtomicU32::new(initial_gain.to_bits()),
            gain_step: AtomicU32::new(0f32.to_bits()),
            suspended: AtomicBool::new(false),
        }
    }

    fn current_gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    /// Advance the gain ramp by one frame and return the gain to apply.
    fn advance_gain(&self) -> f32 {
        let step = f32::from_bits(self.gain_step.load(Ordering::Relaxed));
        let mut gain = self.current_gain();
        if step != 0.0 {
            let target = f32::from_bits(self.target_gain.load(Ordering::Relaxed));
            gain += step;
            let crossed = (step > 0.0 && gain >= target) || (step < 0.0 && gain <= target);
            if crossed {
                gain = target;
                self.gain_step.store(0f32.to_bits(), Ordering::Relaxed);
            }
            self.gain.store(gain.to_bits(), Ordering::Relaxed);
        }
        gain
    }
}

/// Output device configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub initial_gain: f32,
}

/// cpal-backed output device
pub struct CpalOutput {
    config: OutputConfig,
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    ready: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CpalOutput {
    pub fn new(config: OutputConfig) -> Self {
        let initial_gain = config.initial_gain;
        Self {
            config,
            shared: Arc::new(Shared::new(initial_gain)),
            running: Arc::new(AtomicBool::new(false)),
            ready: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }
}

impl OutputDevice for CpalOutput {
    fn initialize(&self) -> Result<(), AudioError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let stream_config = cpal::StreamConfig {
            channels: self.config.channels,
            sample_rate: cpal::SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let channels = self.config.channels as usize;

        let shared = self.shared.clone();
        let running = self.running.clone();
        let ready = self.ready.clone();
        let (init_tx, init_rx) = bounded::<Result<(), AudioError>>(1);

        let handle = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let device = match cpal::default_host().default_output_device() {
                    Some(d) => d,
                    None => {
                        let _ = init_tx.send(Err(AudioError::DeviceNotFound(
                            "no default output device".to_string(),
                        )));
                        return;
                    }
                };

                let callback_shared = shared.clone();
                let stream = device.build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        fill_output(&callback_shared, data, channels);
                    },
                    move |err| {
                        tracing::error!("output stream error: {}", err);
                    },
                    None,
                );

                let stream = match stream {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = init_tx.send(Err(AudioError::CpalError(e.to_string())));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = init_tx.send(Err(AudioError::CpalError(e.to_string())));
                    return;
                }

                ready.store(true, Ordering::SeqCst);
                let _ = init_tx.send(Ok(()));

                // Keep the thread (and the stream it owns) alive.
                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(10));
                }
                ready.store(false, Ordering::SeqCst);
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        *self.thread_handle.lock() = Some(handle);

        match init_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Err(AudioError::StreamError(
                    "output stream startup timed out".to_string(),
                ))
            }
        }
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn schedule(&self, block: SampleBlock) {
        if block.samples.is_empty() {
            return;
        }
        self.shared
            .scheduled_samples
            .fetch_add(block.samples.len(), Ordering::Relaxed);
        self.shared.queue.lock().push_back(ScheduledBlock {
            samples: block.samples,
            pos: 0,
        });
    }

    fn set_gain(&self, level: f32, ramp: Option<Duration>) {
        let level = level.clamp(0.0, 4.0);
        self.shared
            .target_gain
            .store(level.to_bits(), Ordering::Relaxed);

        let ramp_secs = ramp.map(|d| d.as_secs_f32()).unwrap_or(0.0);
        if ramp_secs > 0.0 {
            let frames = ramp_secs * self.config.sample_rate as f32;
            let step = (level - self.shared.current_gain()) / frames.max(1.0);
            self.shared
                .gain_step
                .store(step.to_bits(), Ordering::Relaxed);
        } else {
            self.shared
                .gain_step
                .store(0f32.to_bits(), Ordering::Relaxed);
            self.shared.gain.store(level.to_bits(), Ordering::Relaxed);
        }
    }

    fn suspend(&self) {
        self.shared.suspended.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.shared.suspended.store(false, Ordering::SeqCst);
    }

    fn stop_all(&self) {
        self.shared.queue.lock().clear();
        self.shared.scheduled_samples.store(0, Ordering::Relaxed);
    }

    fn metrics(&self) -> DeviceMetrics {
        let queue = self.shared.queue.lock();
        DeviceMetrics {
            gain: self.shared.current_gain(),
            scheduled_blocks: queue.len(),
            scheduled_samples: self.shared.scheduled_samples.load(Ordering::Relaxed),
            samples_played: self.shared.samples_played.load(Ordering::Relaxed),
            suspended: self.shared.suspended.load(Ordering::SeqCst),
        }
    }

    fn dispose(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
        }
        self.stop_all();
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Fill one output callback buffer from the schedule queue.
///
/// Suspension emits silence without consuming scheduled audio. An empty
/// queue also emits silence; starvation policy lives upstream in the
/// jitter buffer, so by the time the device runs dry the player has
/// already reported an underrun.
fn fill_output(shared: &Shared, data: &mut [f32], channels: usize) {
    let suspended = shared.suspended.load(Ordering::Relaxed);

    // Never block the audio callback on the queue lock.
    let mut queue = match shared.queue.try_lock() {
        Some(q) if !suspended => q,
        _ => {
            data.fill(0.0);
            return;
        }
    };

    let mut consumed = 0usize;
    for frame in data.chunks_mut(channels.max(1)) {
        let gain = shared.advance_gain();
        for out in frame.iter_mut() {
            let sample = loop {
                match queue.front_mut() {
                    Some(block) => {
                        if block.pos < block.samples.len() {
                            let s = block.samples[block.pos];
                            block.pos += 1;
                            consumed += 1;
                            break s;
                        }
                        queue.pop_front();
                    }
                    None => break 0.0,
                }
            };
            *out = sample * gain;
        }
    }

    if consumed > 0 {
        shared
            .samples_played
            .fetch_add(consumed as u64, Ordering::Relaxed);
        let _ = shared
            .scheduled_samples
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(consumed))
            });
    }
}
