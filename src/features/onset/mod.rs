//! Onset strength extraction
//!
//! Converts mono samples into a lower-rate, three-band onset strength signal:
//! - Low-frequency spectral difference (main tempo cue)
//! - High-frequency bin difference (broadband noise fallback)
//! - Frame energy (RMS fallback)

pub mod energy;
pub mod extractor;
pub mod framing;
pub mod spectral_difference;

pub use extractor::{extract_onset_strength, OnsetStrengthExtractor};
pub use framing::FrameLayout;

/// Onset strength signal of one clip
///
/// Holds one non-negative value per analysis frame in each band; all bands
/// have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct OnsetStrengthSignal {
    low_band: Vec<f32>,
    high_band: Vec<f32>,
    energy: Vec<f32>,
    frame_rate: f32,
    hop_size: usize,
}

impl OnsetStrengthSignal {
    pub(crate) fn new(
        low_band: Vec<f32>,
        high_band: Vec<f32>,
        energy: Vec<f32>,
        frame_rate: f32,
        hop_size: usize,
    ) -> Self {
        debug_assert!(low_band.len() == high_band.len() && low_band.len() == energy.len());
        Self {
            low_band,
            high_band,
            energy,
            frame_rate,
            hop_size,
        }
    }

    pub(crate) fn empty(frame_rate: f32, hop_size: usize) -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), frame_rate, hop_size)
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.low_band.len()
    }

    /// Whether the clip was too short to produce any frame
    pub fn is_empty(&self) -> bool {
        self.low_band.is_empty()
    }

    /// Low-frequency spectral difference per frame
    pub fn low_band(&self) -> &[f32] {
        &self.low_band
    }

    /// High-frequency bin difference per frame
    pub fn high_band(&self) -> &[f32] {
        &self.high_band
    }

    /// Frame RMS per frame
    pub fn energy(&self) -> &[f32] {
        &self.energy
    }

    /// Frames per second (`sample_rate / hop_size`)
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    /// Hop size in samples
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }
}
