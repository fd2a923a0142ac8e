//! Streaming onset strength extraction
//!
//! Accepts contiguous sample blocks of any size and accumulates the three
//! onset bands frame by frame. Call [`OnsetStrengthExtractor::finish`] once
//! all samples have been supplied.
//!
//! # Example
//!
//! ```
//! use stratum_tempo::features::onset::OnsetStrengthExtractor;
//! use stratum_tempo::TempoConfig;
//!
//! let mut extractor = OnsetStrengthExtractor::new(44100, &TempoConfig::default())?;
//! extractor.process(&vec![0.0f32; 22050]);
//! extractor.process(&vec![0.0f32; 22050]);
//! let signal = extractor.finish();
//! assert_eq!(signal.len(), 44100 / 240);
//! # Ok::<(), stratum_tempo::AnalysisError>(())
//! ```

use super::framing::{FrameLayout, SampleBuffer};
use super::spectral_difference::FrameAnalyzer;
use super::OnsetStrengthSignal;
use crate::config::TempoConfig;
use crate::error::AnalysisError;

/// Incremental onset strength extractor bound to one sample rate
#[derive(Debug)]
pub struct OnsetStrengthExtractor {
    layout: FrameLayout,
    buffer: SampleBuffer,
    analyzer: FrameAnalyzer,
    low_band: Vec<f32>,
    high_band: Vec<f32>,
    energy: Vec<f32>,
}

impl OnsetStrengthExtractor {
    /// Create an extractor for the given sample rate
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the sample rate cannot support
    /// the configured frame layout.
    pub fn new(sample_rate: u32, config: &TempoConfig) -> Result<Self, AnalysisError> {
        let layout = FrameLayout::for_sample_rate(sample_rate, config)?;
        Ok(Self {
            buffer: SampleBuffer::new(&layout),
            analyzer: FrameAnalyzer::new(&layout, config),
            layout,
            low_band: Vec::new(),
            high_band: Vec::new(),
            energy: Vec::new(),
        })
    }

    /// Frame layout in use
    pub fn layout(&self) -> &FrameLayout {
        &self.layout
    }

    /// Real samples supplied so far
    pub fn samples_processed(&self) -> usize {
        self.buffer.samples_pushed()
    }

    /// Supply a block of samples (contiguous with the previous block)
    pub fn process(&mut self, samples: &[f32]) {
        self.buffer.push(samples);

        let additional = self.layout.frame_count(self.buffer.samples_pushed()) - self.low_band.len();
        self.low_band.reserve(additional);
        self.high_band.reserve(additional);
        self.energy.reserve(additional);

        while let Some(frame) = self.buffer.next_frame() {
            let features = self.analyzer.analyze(frame);
            self.low_band.push(features.low_band);
            self.high_band.push(features.high_band);
            self.energy.push(features.energy);
        }
    }

    /// Finish extraction and return the onset strength signal
    ///
    /// The signal is empty if fewer samples than one analysis frame were
    /// supplied.
    pub fn finish(self) -> OnsetStrengthSignal {
        let samples = self.buffer.samples_pushed();

        if self.buffer.sanitized() > 0 {
            log::warn!(
                "Replaced {} non-finite samples with silence",
                self.buffer.sanitized()
            );
        }

        if samples < self.layout.block_size {
            log::warn!(
                "Clip too short for onset analysis: {} samples < frame size {}",
                samples,
                self.layout.block_size
            );
            return OnsetStrengthSignal::empty(self.layout.frame_rate(), self.layout.hop_size);
        }

        log::debug!(
            "Onset strength: {} samples -> {} frames at {:.2} Hz",
            samples,
            self.low_band.len(),
            self.layout.frame_rate()
        );

        OnsetStrengthSignal::new(
            self.low_band,
            self.high_band,
            self.energy,
            self.layout.frame_rate(),
            self.layout.hop_size,
        )
    }
}

/// Extract the onset strength signal of a whole clip in one call
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an unusable sample rate.
pub fn extract_onset_strength(
    samples: &[f32],
    sample_rate: u32,
    config: &TempoConfig,
) -> Result<OnsetStrengthSignal, AnalysisError> {
    let mut extractor = OnsetStrengthExtractor::new(sample_rate, config)?;
    extractor.process(samples);
    Ok(extractor.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kick_train(bpm: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let sr = sample_rate as f32;
        let len = (seconds * sr) as usize;
        let period = (60.0 / bpm * sr) as usize;
        let kick_len = (0.1 * sr) as usize;
        let mut samples = vec![0.0f32; len];
        let mut pos = 0;
        while pos < len {
            for i in 0..kick_len.min(len - pos) {
                let t = i as f32 / sr;
                samples[pos + i] =
                    0.8 * (-t * 30.0).exp() * (2.0 * std::f32::consts::PI * 100.0 * t).sin();
            }
            pos += period;
        }
        samples
    }

    #[test]
    fn test_signal_length_is_samples_over_hop() {
        let config = TempoConfig::default();
        for &n in &[481usize, 1000, 44100, 44100 * 3 + 17] {
            let signal = extract_onset_strength(&vec![0.1f32; n], 44100, &config).unwrap();
            assert_eq!(signal.len(), n / 240, "length mismatch for {} samples", n);
        }
    }

    #[test]
    fn test_too_short_clip_gives_empty_signal() {
        let config = TempoConfig::default();
        let signal = extract_onset_strength(&vec![0.5f32; 480], 44100, &config).unwrap();
        assert!(signal.is_empty());

        let signal = extract_onset_strength(&[], 44100, &config).unwrap();
        assert!(signal.is_empty());
    }

    #[test]
    fn test_silence_is_all_zero() {
        let config = TempoConfig::default();
        let signal = extract_onset_strength(&vec![0.0f32; 44100 * 2], 44100, &config).unwrap();
        assert!(!signal.is_empty());
        for band in [signal.low_band(), signal.high_band(), signal.energy()] {
            assert!(band.iter().all(|&x| x == 0.0));
        }
    }

    #[test]
    fn test_kicks_produce_periodic_low_band_peaks() {
        let config = TempoConfig::default();
        let samples = kick_train(120.0, 4.0, 44100);
        let signal = extract_onset_strength(&samples, 44100, &config).unwrap();

        let low = signal.low_band();
        let max = low.iter().copied().fold(0.0f32, f32::max);
        assert!(max > 0.0);
        assert!(low.iter().all(|&x| x >= 0.0 && x.is_finite()));

        // Strong frames cluster around beat positions (every 91.875 frames)
        // A kick's rise may be split over two frames, so use a loose threshold
        let strong: Vec<usize> = (0..low.len()).filter(|&i| low[i] > 0.4 * max).collect();
        assert!(strong.len() >= 6, "expected strong frames at beats, got {:?}", strong);
        for &i in &strong {
            let phase = (i as f32 / 91.875).fract();
            assert!(
                phase < 0.1 || phase > 0.9,
                "frame {} is not near a beat (phase {:.2})",
                i,
                phase
            );
        }
    }

    #[test]
    fn test_block_processing_matches_single_call() {
        let config = TempoConfig::default();
        let samples = kick_train(100.0, 3.0, 44100);

        let whole = extract_onset_strength(&samples, 44100, &config).unwrap();

        let mut extractor = OnsetStrengthExtractor::new(44100, &config).unwrap();
        for block in samples.chunks(1024) {
            extractor.process(block);
        }
        let streamed = extractor.finish();

        assert_eq!(whole, streamed);
    }
}
