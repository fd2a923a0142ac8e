//! Confidence scoring module
//!
//! Summarises how trustworthy an estimation is from the shape of its
//! candidate list: a strong best candidate that clearly beats the runner-up
//! is reliable, a weak one or a near tie is not.
//!
//! # Example
//!
//! ```
//! use stratum_tempo::{estimate_tempo, TempoConfig};
//! use stratum_tempo::analysis::confidence::compute_confidence;
//!
//! let samples = vec![0.0f32; 44100 * 5];
//! let result = estimate_tempo(&samples, 44100, &TempoConfig::default())?;
//! let confidence = compute_confidence(&result);
//!
//! assert_eq!(confidence.overall, 0.0);
//! # Ok::<(), stratum_tempo::AnalysisError>(())
//! ```

use serde::{Deserialize, Serialize};

use super::result::EstimationResult;

/// Relative margin below which the best two candidates count as tied
const AMBIGUITY_MARGIN: f32 = 0.1;

/// Peak score below which periodicity counts as weak
const WEAK_PEAK_SCORE: f32 = 0.2;

/// Issues spotted while scoring confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceFlag {
    /// No candidate at all
    NoEstimate,
    /// Runner-up scores almost as high as the best candidate
    AmbiguousTempo,
    /// Best candidate has little periodic support
    WeakPeriodicity,
}

/// Confidence in an estimation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoConfidence {
    /// Score of the best candidate
    pub peak_score: f32,

    /// Score difference between the best candidate and the runner-up
    ///
    /// Equals `peak_score` when there is only one candidate.
    pub margin: f32,

    /// Overall confidence (0.0-1.0)
    pub overall: f32,

    /// Issues found
    pub flags: Vec<ConfidenceFlag>,
}

/// Compute confidence for an estimation result
///
/// `overall = min(peak_score, 1) * (0.5 + 0.5 * margin / peak_score)`, so a
/// unit-strength peak with no competitor scores 1.0 and a tie halves the
/// peak strength. All values are zero for an empty result.
pub fn compute_confidence(result: &EstimationResult) -> TempoConfidence {
    let Some(best) = result.best() else {
        return TempoConfidence {
            peak_score: 0.0,
            margin: 0.0,
            overall: 0.0,
            flags: vec![ConfidenceFlag::NoEstimate],
        };
    };

    let peak_score = best.score.max(0.0);
    let runner_up = result.candidates.get(1).map_or(0.0, |c| c.score.max(0.0));
    let margin = (peak_score - runner_up).max(0.0);

    let relative_margin = if peak_score > 0.0 {
        margin / peak_score
    } else {
        0.0
    };
    let overall = (peak_score.min(1.0) * (0.5 + 0.5 * relative_margin)).clamp(0.0, 1.0);

    let mut flags = Vec::new();
    if result.candidates.len() > 1 && relative_margin < AMBIGUITY_MARGIN {
        flags.push(ConfidenceFlag::AmbiguousTempo);
    }
    if peak_score < WEAK_PEAK_SCORE {
        flags.push(ConfidenceFlag::WeakPeriodicity);
    }

    log::debug!(
        "Tempo confidence: peak={:.3}, margin={:.3}, overall={:.3}",
        peak_score,
        margin,
        overall
    );

    TempoConfidence {
        peak_score,
        margin,
        overall,
        flags,
    }
}

impl TempoConfidence {
    /// Check if overall confidence is high (>= 0.7)
    pub fn is_high_confidence(&self) -> bool {
        self.overall >= 0.7
    }

    /// Check if overall confidence is low (< 0.5)
    pub fn is_low_confidence(&self) -> bool {
        self.overall < 0.5
    }

    /// Human-readable confidence level: "High", "Medium" or "Low"
    pub fn confidence_level(&self) -> &'static str {
        if self.is_high_confidence() {
            "High"
        } else if self.is_low_confidence() {
            "Low"
        } else {
            "Medium"
        }
    }
}
