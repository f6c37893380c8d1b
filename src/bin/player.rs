//! Speech Stream Playback Application
//!
//! Connects to a TCP endpoint delivering raw 16-bit little-endian PCM
//! (synthesized speech) and plays it through the default output device.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use speech_stream_player::{
    audio::{CpalOutput, OutputConfig, OutputDevice},
    player::{EventKind, PlayerEvent},
    PlayerConfig, StreamingPlayer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9000".to_string());

    let config = PlayerConfig::default();
    tracing::info!(
        "Starting speech stream player ({} Hz, {} ch, {} ms pre-buffer)",
        config.sample_rate,
        config.channels,
        config.pre_buffer_ms
    );

    let device: Arc<dyn OutputDevice> = Arc::new(CpalOutput::new(OutputConfig {
        sample_rate: config.sample_rate,
        channels: config.channels,
        initial_gain: config.initial_gain,
    }));

    let player = StreamingPlayer::new(config, device.clone())?;

    // Print lifecycle and degradation events as they happen.
    let events = player.subscribe_many(&[
        EventKind::Connected,
        EventKind::Buffering,
        EventKind::Playing,
        EventKind::Underrun,
        EventKind::Error,
        EventKind::Stopped,
    ]);
    tokio::task::spawn_blocking(move || {
        while let Ok(event) = events.recv() {
            match event {
                PlayerEvent::Underrun { health } => {
                    tracing::warn!(
                        buffered_ms = health.buffered_ms,
                        episode = health.underruns,
                        "underrun"
                    );
                }
                PlayerEvent::Error { message } => tracing::error!("{}", message),
                other => tracing::info!("event: {:?}", other),
            }
        }
    });

    tracing::info!("Connecting to {}", addr);
    player.connect(&addr).await?;

    // Run until the stream ends or Ctrl-C.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping");
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                if !player.state().is_active() {
                    break;
                }
            }
        }
    }

    let metrics = player.metrics();
    tracing::info!(
        "Session finished: {:.1}s played, {} underruns, {} dropped chunks",
        metrics.playback_position_secs,
        metrics.underruns,
        metrics.dropped_chunks
    );

    player.dispose();
    Ok(())
}
