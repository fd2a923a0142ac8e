//! Analysis frame layout and hop-driven sample buffering
//!
//! Frames are `block_size` samples long and advance by `hop_size`
//! (half a block). Frame `i` ends at sample `(i + 1) * hop_size`, so the first
//! frame is left-padded with zeros and a clip of `n` samples yields exactly
//! `n / hop_size` frames regardless of how the samples were chunked.

use crate::config::TempoConfig;
use crate::error::AnalysisError;

/// Frame and hop sizes derived from the sample rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Analysis frame length in samples
    pub block_size: usize,
    /// Distance between consecutive frames in samples
    pub hop_size: usize,
}

impl FrameLayout {
    /// Derive the frame layout for a sample rate
    ///
    /// The block is sized so that the low-frequency band
    /// (`0..low_freq_cutoff_hz`) spans `low_freq_bins` FFT bins.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the sample rate is zero or too
    /// low to hold the low-frequency bins in one frame.
    pub fn for_sample_rate(sample_rate: u32, config: &TempoConfig) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::invalid_input("Invalid sample rate: 0"));
        }

        let block_size = (sample_rate as f32 * config.low_freq_bins as f32
            / config.low_freq_cutoff_hz)
            .round() as usize;
        let min_block = 2 * (config.low_freq_bins + 1);
        if block_size < min_block {
            return Err(AnalysisError::invalid_input(format!(
                "Sample rate {} Hz too low: frame of {} samples cannot hold {} low-frequency bins",
                sample_rate, block_size, config.low_freq_bins
            )));
        }

        Ok(Self {
            sample_rate,
            block_size,
            hop_size: block_size / 2,
        })
    }

    /// Onset-strength frames per second
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }

    /// Number of frames produced for `num_samples` input samples
    pub fn frame_count(&self, num_samples: usize) -> usize {
        num_samples / self.hop_size
    }
}

/// Buffer that turns arbitrarily sized sample blocks into hop-spaced frames
#[derive(Debug)]
pub struct SampleBuffer {
    /// Buffer data (starts with `block_size - hop_size` zeros of padding)
    data: Vec<f32>,
    /// Start of the next frame
    position: usize,
    block_size: usize,
    hop_size: usize,
    /// Real samples pushed so far
    samples_pushed: usize,
    /// Number of non-finite samples replaced by silence
    sanitized: usize,
}

impl SampleBuffer {
    /// Create an empty buffer for the given layout
    pub fn new(layout: &FrameLayout) -> Self {
        let padding = layout.block_size - layout.hop_size;
        let mut data = Vec::with_capacity(layout.block_size * 4);
        data.resize(padding, 0.0);
        Self {
            data,
            position: 0,
            block_size: layout.block_size,
            hop_size: layout.hop_size,
            samples_pushed: 0,
            sanitized: 0,
        }
    }

    /// Add samples to buffer
    ///
    /// Non-finite samples are stored as silence.
    pub fn push(&mut self, samples: &[f32]) {
        self.compact();
        self.data.reserve(samples.len());
        for &x in samples {
            if x.is_finite() {
                self.data.push(x);
            } else {
                self.sanitized += 1;
                self.data.push(0.0);
            }
        }
        self.samples_pushed += samples.len();
    }

    /// Get next complete frame, advancing by one hop
    pub fn next_frame(&mut self) -> Option<&[f32]> {
        if self.position + self.block_size > self.data.len() {
            return None;
        }

        let start = self.position;
        self.position += self.hop_size;
        Some(&self.data[start..start + self.block_size])
    }

    /// Real samples pushed so far (padding excluded)
    pub fn samples_pushed(&self) -> usize {
        self.samples_pushed
    }

    /// Non-finite samples that were replaced by zeros
    pub fn sanitized(&self) -> usize {
        self.sanitized
    }

    /// Drop samples no future frame can reach
    fn compact(&mut self) {
        if self.position > self.block_size * 8 {
            self.data.drain(..self.position);
            self.position = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout_44k() -> FrameLayout {
        FrameLayout::for_sample_rate(44100, &TempoConfig::default()).unwrap()
    }

    #[test]
    fn test_layout_44100() {
        let layout = layout_44k();
        // 44100 * 6 / 550 = 481.09
        assert_eq!(layout.block_size, 481);
        assert_eq!(layout.hop_size, 240);
        assert!((layout.frame_rate() - 183.75).abs() < 1e-3);
    }

    #[test]
    fn test_layout_invalid_sample_rate() {
        let config = TempoConfig::default();
        assert!(FrameLayout::for_sample_rate(0, &config).is_err());
        assert!(FrameLayout::for_sample_rate(100, &config).is_err());
        assert!(FrameLayout::for_sample_rate(8000, &config).is_ok());
    }

    #[test]
    fn test_frame_count_matches_hops() {
        let layout = layout_44k();
        let mut buffer = SampleBuffer::new(&layout);
        buffer.push(&vec![0.1f32; 10_000]);

        let mut frames = 0;
        while let Some(frame) = buffer.next_frame() {
            assert_eq!(frame.len(), layout.block_size);
            frames += 1;
        }
        assert_eq!(frames, layout.frame_count(10_000));
        assert_eq!(frames, 10_000 / 240);
    }

    #[test]
    fn test_chunking_does_not_change_frames() {
        let layout = layout_44k();
        let samples: Vec<f32> = (0..5000).map(|i| (i as f32 * 0.01).sin()).collect();

        let mut whole = SampleBuffer::new(&layout);
        whole.push(&samples);
        let mut expected = Vec::new();
        while let Some(frame) = whole.next_frame() {
            expected.push(frame.to_vec());
        }

        let mut chunked = SampleBuffer::new(&layout);
        let mut actual = Vec::new();
        for chunk in samples.chunks(37) {
            chunked.push(chunk);
            while let Some(frame) = chunked.next_frame() {
                actual.push(frame.to_vec());
            }
        }

        assert_eq!(expected, actual);
    }

    #[test]
    fn test_first_frame_is_left_padded() {
        let layout = layout_44k();
        let mut buffer = SampleBuffer::new(&layout);
        buffer.push(&vec![1.0f32; layout.hop_size]);

        let frame = buffer.next_frame().unwrap();
        let padding = layout.block_size - layout.hop_size;
        assert!(frame[..padding].iter().all(|&x| x == 0.0));
        assert!(frame[padding..].iter().all(|&x| x == 1.0));
        assert!(buffer.next_frame().is_none());
    }

    #[test]
    fn test_non_finite_samples_become_silence() {
        let layout = layout_44k();
        let mut buffer = SampleBuffer::new(&layout);
        let mut samples = vec![0.5f32; 300];
        samples[10] = f32::NAN;
        samples[20] = f32::INFINITY;
        buffer.push(&samples);

        assert_eq!(buffer.sanitized(), 2);
        assert_eq!(buffer.samples_pushed(), 300);
        let frame = buffer.next_frame().unwrap();
        assert!(frame.iter().all(|x| x.is_finite()));
    }
}
