//! Estimation result types

use serde::{Deserialize, Serialize};

use super::metadata::EstimationMetadata;

/// One hypothesised tempo
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoCandidate {
    /// Tempo in beats per minute
    pub bpm: f32,

    /// Periodicity score (non-negative, higher is better)
    ///
    /// Scores are comparable within one result only.
    pub score: f32,
}

/// Outcome of one estimation
///
/// Candidates are sorted by descending score, so the best estimate is always
/// the first one. An empty candidate list means the tempo could not be
/// estimated (clip too short, silent or without periodic structure).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    /// Ranked candidates, best first
    pub candidates: Vec<TempoCandidate>,

    /// How the estimation was run
    pub metadata: EstimationMetadata,
}

impl EstimationResult {
    /// Create a result from candidates already sorted best first
    pub fn new(candidates: Vec<TempoCandidate>, metadata: EstimationMetadata) -> Self {
        Self {
            candidates,
            metadata,
        }
    }

    /// Best tempo estimate, or 0.0 if the tempo could not be estimated
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_tempo::EstimationResult;
    ///
    /// assert_eq!(EstimationResult::default().bpm(), 0.0);
    /// ```
    pub fn bpm(&self) -> f32 {
        self.best().map_or(0.0, |c| c.bpm)
    }

    /// Highest-scoring candidate
    pub fn best(&self) -> Option<&TempoCandidate> {
        self.candidates.first()
    }

    /// Whether no candidate was found
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
