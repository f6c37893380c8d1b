//! Zero-crossing boundary alignment
//!
//! Starting playback mid-waveform produces an audible click. The aligner
//! trims the leading samples of the first chunk of a playback session up
//! to the first zero-crossing so the waveform starts from (near) zero.
//! Subsequent chunks come from one continuous stream and need no
//! realignment.

use crate::constants::ZERO_CROSSING_SCAN_WINDOW;

/// Which edge of the chunk to align
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    /// Trim leading samples up to the first zero-crossing
    Start,
}

/// Trims chunk edges to zero-crossings
pub struct BoundaryAligner {
    channels: u16,
    scan_window: usize,
}

impl BoundaryAligner {
    pub fn new(channels: u16) -> Self {
        Self {
            channels: channels.max(1),
            scan_window: ZERO_CROSSING_SCAN_WINDOW,
        }
    }

    /// Override the bounded scan window (in frames).
    pub fn with_scan_window(mut self, frames: usize) -> Self {
        self.scan_window = frames;
        self
    }

    /// Align a chunk to a zero-crossing. Returns the trimmed slice, or
    /// the original slice unmodified when no crossing is found within
    /// the scan window (fail-open: a degenerate signal must not block
    /// playback).
    pub fn align<'a>(&self, samples: &'a [f32], mode: AlignMode) -> &'a [f32] {
        match mode {
            AlignMode::Start => self.align_start(samples),
        }
    }

    fn align_start<'a>(&self, samples: &'a [f32]) -> &'a [f32] {
        let step = self.channels as usize;
        let frames = samples.len() / step;
        if frames < 2 {
            return samples;
        }
        let window = frames.min(self.scan_window);

        // Scan the first channel for an exact zero or a sign change
        // between consecutive frames.
        if samples[0] == 0.0 {
            return samples;
        }
        for frame in 1..window {
            let prev = samples[(frame - 1) * step];
            let cur = samples[frame * step];
            if cur == 0.0 || (prev > 0.0) != (cur > 0.0) {
                return &samples[frame * step..];
            }
        }
        samples
    }
}
