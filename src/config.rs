//! Configuration parameters for tempo estimation

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Default lower bound of the tempo search range (BPM)
pub const DEFAULT_MIN_BPM: f32 = 55.0;

/// Default upper bound of the tempo search range (BPM)
pub const DEFAULT_MAX_BPM: f32 = 190.0;

/// Default beats-per-bar hint
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

/// Range of tempi searched by the periodicity analyzer
///
/// Always satisfies `0 < min < max`, both finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoRange {
    min: f32,
    max: f32,
}

impl TempoRange {
    /// Create a validated tempo range
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfig` unless `0 < min < max` and both
    /// bounds are finite. Values are never clamped.
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_tempo::TempoRange;
    ///
    /// let range = TempoRange::new(70.0, 140.0)?;
    /// assert_eq!(range.min(), 70.0);
    /// assert!(TempoRange::new(140.0, 70.0).is_err());
    /// # Ok::<(), stratum_tempo::AnalysisError>(())
    /// ```
    pub fn new(min: f32, max: f32) -> Result<Self, AnalysisError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(AnalysisError::invalid_config(format!(
                "Tempo range bounds must be finite: [{}, {}]",
                min, max
            )));
        }
        if min <= 0.0 || max <= 0.0 || min >= max {
            return Err(AnalysisError::invalid_config(format!(
                "Invalid tempo range: [{:.2}, {:.2}] (need 0 < min < max)",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Lower bound in BPM
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Upper bound in BPM
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Whether `bpm` lies inside the range (inclusive)
    pub fn contains(&self, bpm: f32) -> bool {
        bpm >= self.min && bpm <= self.max
    }
}

impl Default for TempoRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_BPM,
            max: DEFAULT_MAX_BPM,
        }
    }
}

/// Tempo estimation configuration
///
/// The first three fields are the caller-facing settings; the rest tune the
/// onset, periodicity and candidate stages and rarely need changing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    /// Minimum BPM to consider (default: 55.0)
    pub min_bpm: f32,

    /// Maximum BPM to consider (default: 190.0)
    pub max_bpm: f32,

    /// Beats per bar hint used for octave disambiguation (default: 4)
    pub beats_per_bar: u32,

    // Onset strength
    /// Upper edge of the low-frequency band in Hz (default: 550.0)
    pub low_freq_cutoff_hz: f32,

    /// Number of FFT bins spanning the low-frequency band (default: 6)
    ///
    /// Together with `low_freq_cutoff_hz` this fixes the analysis frame size.
    pub low_freq_bins: usize,

    /// Frequency of the single broadband-noise bin in Hz (default: 9000.0)
    pub high_freq_hz: f32,

    // Periodicity
    /// Weight of the low-frequency band autocorrelation (default: 1.0)
    pub low_band_weight: f32,

    /// Weight of the high-frequency bin autocorrelation (default: 0.4)
    pub high_band_weight: f32,

    /// Weight of the frame energy autocorrelation (default: 0.3)
    pub energy_weight: f32,

    /// Number of lag multiples summed by the comb filter (default: 4)
    pub comb_harmonics: usize,

    /// Periodicity curve points per onset frame of lag (default: 4)
    pub lag_resolution: usize,

    /// Penalty on autocorrelation midway between lag multiples (default: 0.5)
    ///
    /// Keeps half-tempo periods, whose midpoints fall on beats, below the beat.
    pub offbeat_weight: f32,

    // Candidate resolution
    /// Minimum peak height relative to the curve maximum (default: 0.05)
    pub peak_threshold: f32,

    /// Peaks closer than this many BPM are merged (default: 1.5)
    pub merge_tolerance_bpm: f32,

    /// Relative tolerance when testing for 2x/3x/4x tempo relations (default: 0.03)
    pub octave_tolerance: f32,

    /// Weight of bar-length periodicity in octave resolution (default: 0.5)
    pub bar_weight: f32,

    /// Centre of the perceptual tempo preference in BPM (default: 120.0)
    pub preferred_bpm: f32,

    /// Width of the perceptual preference in octaves (default: 1.0)
    pub perceptual_width_octaves: f32,

    /// Strength of the perceptual preference, 0 disables it (default: 0.5)
    pub perceptual_strength: f32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            min_bpm: DEFAULT_MIN_BPM,
            max_bpm: DEFAULT_MAX_BPM,
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
            low_freq_cutoff_hz: 550.0,
            low_freq_bins: 6,
            high_freq_hz: 9000.0,
            low_band_weight: 1.0,
            high_band_weight: 0.4,
            energy_weight: 0.3,
            comb_harmonics: 4,
            lag_resolution: 4,
            offbeat_weight: 0.5,
            peak_threshold: 0.05,
            merge_tolerance_bpm: 1.5,
            octave_tolerance: 0.03,
            bar_weight: 0.5,
            preferred_bpm: 120.0,
            perceptual_width_octaves: 1.0,
            perceptual_strength: 0.5,
        }
    }
}

impl TempoConfig {
    /// Tempo range as a validated value
    pub fn tempo_range(&self) -> Result<TempoRange, AnalysisError> {
        TempoRange::new(self.min_bpm, self.max_bpm)
    }

    /// Check every field, rejecting (never clamping) bad values
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.tempo_range()?;

        if self.beats_per_bar == 0 {
            return Err(AnalysisError::invalid_config("beats_per_bar must be > 0"));
        }
        if self.low_freq_bins == 0 {
            return Err(AnalysisError::invalid_config("low_freq_bins must be > 0"));
        }
        if self.comb_harmonics == 0 {
            return Err(AnalysisError::invalid_config("comb_harmonics must be > 0"));
        }
        if self.lag_resolution == 0 {
            return Err(AnalysisError::invalid_config("lag_resolution must be > 0"));
        }

        positive("low_freq_cutoff_hz", self.low_freq_cutoff_hz)?;
        positive("high_freq_hz", self.high_freq_hz)?;
        positive("preferred_bpm", self.preferred_bpm)?;
        positive("perceptual_width_octaves", self.perceptual_width_octaves)?;
        non_negative("merge_tolerance_bpm", self.merge_tolerance_bpm)?;

        non_negative("low_band_weight", self.low_band_weight)?;
        non_negative("high_band_weight", self.high_band_weight)?;
        non_negative("energy_weight", self.energy_weight)?;
        if self.low_band_weight + self.high_band_weight + self.energy_weight <= 0.0 {
            return Err(AnalysisError::invalid_config(
                "at least one band weight must be > 0",
            ));
        }

        unit_interval("peak_threshold", self.peak_threshold)?;
        unit_interval("bar_weight", self.bar_weight)?;
        unit_interval("offbeat_weight", self.offbeat_weight)?;
        unit_interval("perceptual_strength", self.perceptual_strength)?;
        if !(self.octave_tolerance >= 0.0 && self.octave_tolerance < 0.25) {
            return Err(AnalysisError::invalid_config(format!(
                "octave_tolerance must be in [0, 0.25), got {}",
                self.octave_tolerance
            )));
        }

        Ok(())
    }
}

fn positive(name: &str, value: f32) -> Result<(), AnalysisError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid_config(format!(
            "{} must be finite and > 0, got {}",
            name, value
        )))
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), AnalysisError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::invalid_config(format!(
            "{} must be finite and >= 0, got {}",
            name, value
        )))
    }
}

fn unit_interval(name: &str, value: f32) -> Result<(), AnalysisError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AnalysisError::invalid_config(format!(
            "{} must be in [0, 1], got {}",
            name, value
        )))
    }
}
