//! Estimation metadata

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_BEATS_PER_BAR, DEFAULT_MAX_BPM, DEFAULT_MIN_BPM};

/// How an estimation was run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationMetadata {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of mono samples analysed
    pub samples_analyzed: usize,

    /// Audio duration in seconds
    pub duration_seconds: f32,

    /// Length of the onset strength signal
    pub onset_frames: usize,

    /// Onset strength frames per second
    pub onset_frame_rate: f32,

    /// Beats-per-bar hint used for octave resolution
    pub beats_per_bar: u32,

    /// Lower bound of the searched tempo range (BPM)
    pub min_bpm: f32,

    /// Upper bound of the searched tempo range (BPM)
    pub max_bpm: f32,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,
}

impl Default for EstimationMetadata {
    fn default() -> Self {
        Self {
            sample_rate: 0,
            samples_analyzed: 0,
            duration_seconds: 0.0,
            onset_frames: 0,
            onset_frame_rate: 0.0,
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
            min_bpm: DEFAULT_MIN_BPM,
            max_bpm: DEFAULT_MAX_BPM,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
