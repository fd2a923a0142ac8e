//! Period estimation modules
//!
//! Convert the onset strength signal to ranked BPM candidates using:
//! - Autocorrelation of each onset band
//! - Comb filter over the combined autocorrelation (periodicity score curve)
//! - Peak picking, octave resolution and candidate merging

pub mod analyzer;
pub mod autocorrelation;
pub mod candidate_filter;
pub mod comb_filter;
pub mod octave;
pub mod peak_picking;

pub use analyzer::analyze_periodicity;
pub use candidate_filter::resolve_candidates;

use comb_filter::acf_at;

/// Convert a lag in onset frames to BPM: `60 * frame_rate / lag`
pub fn lag_to_bpm(lag: f32, frame_rate: f32) -> f32 {
    60.0 * frame_rate / lag
}

/// Convert BPM to a lag in onset frames: `60 * frame_rate / bpm`
pub fn bpm_to_lag(bpm: f32, frame_rate: f32) -> f32 {
    60.0 * frame_rate / bpm
}

/// One point of the periodicity score curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorePoint {
    /// Candidate tempo
    pub bpm: f32,
    /// Period in onset frames
    pub lag: f32,
    /// Periodicity strength (finite, non-negative)
    pub score: f32,
}

/// Periodicity score per candidate tempo
///
/// Points are ordered by increasing lag (decreasing BPM) on an even sub-frame
/// grid whose first and last points sit exactly on the range bounds. One
/// guard score just beyond each end (when computable) lets a maximum on the
/// boundary count as a peak. The combined autocorrelation is kept so later
/// stages can query periodicity at other lags (e.g. bar length).
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicityCurve {
    points: Vec<ScorePoint>,
    leading_guard: Option<f32>,
    trailing_guard: Option<f32>,
    lag_step: f32,
    autocorrelation: Vec<f32>,
    frame_rate: f32,
}

impl PeriodicityCurve {
    pub(crate) fn new(
        points: Vec<ScorePoint>,
        autocorrelation: Vec<f32>,
        frame_rate: f32,
        lag_step: f32,
    ) -> Self {
        Self {
            points,
            leading_guard: None,
            trailing_guard: None,
            lag_step,
            autocorrelation,
            frame_rate,
        }
    }

    pub(crate) fn with_guards(mut self, leading: Option<f32>, trailing: Option<f32>) -> Self {
        self.leading_guard = leading;
        self.trailing_guard = trailing;
        self
    }

    pub(crate) fn empty(frame_rate: f32) -> Self {
        Self::new(Vec::new(), Vec::new(), frame_rate, 1.0)
    }

    /// Score points in increasing lag order
    pub fn points(&self) -> &[ScorePoint] {
        &self.points
    }

    /// Whether no tempo in range could be scored
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of scored tempi
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Scores one grid step before the first point and after the last
    ///
    /// `None` where that lag is not positive or lies outside the analysis
    /// window.
    pub fn guard_scores(&self) -> (Option<f32>, Option<f32>) {
        (self.leading_guard, self.trailing_guard)
    }

    /// Lag distance between neighbouring points, in onset frames
    pub fn lag_step(&self) -> f32 {
        self.lag_step
    }

    /// Combined autocorrelation the curve was computed from
    pub fn autocorrelation(&self) -> &[f32] {
        &self.autocorrelation
    }

    /// Autocorrelation at a fractional lag, `None` outside the analysis window
    pub fn autocorrelation_at(&self, lag: f32) -> Option<f32> {
        acf_at(&self.autocorrelation, lag)
    }

    /// Onset frames per second
    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lag_bpm_conversion() {
        // 44.1 kHz, hop 240 -> 183.75 frames/s; 120 BPM = 0.5 s = 91.875 frames
        let frame_rate = 44100.0 / 240.0;
        assert_abs_diff_eq!(bpm_to_lag(120.0, frame_rate), 91.875, epsilon = 1e-3);
        assert_abs_diff_eq!(lag_to_bpm(91.875, frame_rate), 120.0, epsilon = 1e-3);
        assert_abs_diff_eq!(
            lag_to_bpm(bpm_to_lag(87.5, frame_rate), frame_rate),
            87.5,
            epsilon = 1e-3
        );
    }
}
