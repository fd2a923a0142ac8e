//! Per-frame spectral difference features
//!
//! Each frame is Hann-windowed and transformed with an FFT. Two novelty values
//! are taken from the magnitude spectrum:
//!
//! - **Low band**: sum of half-wave rectified magnitude increases over bins
//!   `1..=low_freq_bins` (roughly the kick/bass register, up to ~550 Hz)
//! - **High bin**: half-wave rectified increase of one bin near 9 kHz, a cheap
//!   broadband-noise (hi-hat, snare) indicator
//!
//! Only increases count, so decays do not register as onsets.
//!
//! # Reference
//!
//! Bello, J. P., Daudet, L., Abdallah, S., Duxbury, C., Davies, M., & Sandler, M. B. (2005).
//! A Tutorial on Onset Detection in Music Signals.
//! *IEEE Transactions on Speech and Audio Processing*, 13(5), 1035-1047.

use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::energy::frame_rms;
use super::framing::FrameLayout;
use crate::config::TempoConfig;

/// Onset features of a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameFeatures {
    /// Low-frequency spectral difference
    pub low_band: f32,
    /// High-frequency bin difference
    pub high_band: f32,
    /// Frame RMS
    pub energy: f32,
}

/// Stateful frame analyzer: remembers the previous frame's magnitudes
pub struct FrameAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    low_bins: usize,
    high_bin: usize,
    prev_low: Vec<f32>,
    prev_high: f32,
}

impl FrameAnalyzer {
    /// Plan the FFT and window for a frame layout
    pub fn new(layout: &FrameLayout, config: &TempoConfig) -> Self {
        let n = layout.block_size;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        let nyquist_bin = n / 2;
        let high_bin = ((config.high_freq_hz * n as f32 / layout.sample_rate as f32).round()
            as usize)
            .min(nyquist_bin);
        let low_bins = config.low_freq_bins.min(nyquist_bin);

        log::debug!(
            "Frame analyzer: block={}, low bins=1..={}, high bin={} (~{:.0} Hz)",
            n,
            low_bins,
            high_bin,
            high_bin as f32 * layout.sample_rate as f32 / n as f32
        );

        Self {
            fft,
            window: hann_window(n),
            buffer: vec![Complex::new(0.0, 0.0); n],
            scratch,
            low_bins,
            high_bin,
            prev_low: vec![0.0; low_bins],
            prev_high: 0.0,
        }
    }

    /// Analyze one frame (must be exactly `block_size` samples)
    pub fn analyze(&mut self, frame: &[f32]) -> FrameFeatures {
        debug_assert_eq!(frame.len(), self.window.len());

        for ((slot, &x), &w) in self.buffer.iter_mut().zip(frame).zip(&self.window) {
            *slot = Complex::new(x * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let mut low_band = 0.0f32;
        for (bin, prev) in self.prev_low.iter_mut().enumerate() {
            let magnitude = self.buffer[bin + 1].norm();
            low_band += (magnitude - *prev).max(0.0);
            *prev = magnitude;
        }

        let high_magnitude = self.buffer[self.high_bin].norm();
        let high_band = (high_magnitude - self.prev_high).max(0.0);
        self.prev_high = high_magnitude;

        FrameFeatures {
            low_band,
            high_band,
            energy: frame_rms(frame),
        }
    }
}

impl fmt::Debug for FrameAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameAnalyzer")
            .field("block_size", &self.window.len())
            .field("low_bins", &self.low_bins)
            .field("high_bin", &self.high_bin)
            .finish()
    }
}

/// Periodic Hann window
fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n as f32).cos())
        .collect()
}
