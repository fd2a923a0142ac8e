//! # Stratum Tempo
//!
//! Fixed-tempo BPM estimation for short mono music clips, returning the best
//! tempo together with a ranked list of alternative candidates.
//!
//! ## Features
//!
//! - **Onset Strength**: Multi-band spectral difference (low band, high band, energy)
//! - **Periodicity**: FFT autocorrelation with a comb filter over the tempo range
//! - **Octave Resolution**: Beats-per-bar hint to pick between half/double tempo
//! - **Streaming Input**: Feed sample blocks of any size before estimating
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratum_tempo::TempoEstimator;
//!
//! // Load audio samples (mono, f32, normalized)
//! let samples: Vec<f32> = vec![]; // Your audio data
//!
//! let mut estimator = TempoEstimator::new(44100)?;
//! estimator.set_beats_per_bar(4)?;
//! let bpm = estimator.estimate(&samples)?;
//!
//! println!("BPM: {:.2}", bpm);
//! for candidate in estimator.candidates() {
//!     println!("  {:.2} BPM (score {:.3})", candidate.bpm, candidate.score);
//! }
//! # Ok::<(), stratum_tempo::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! The estimation pipeline follows this flow:
//!
//! ```text
//! Samples → Onset Strength → Periodicity Curve → Candidate Resolution → Ranked Candidates
//! ```
//!
//! A BPM of 0.0 with no candidates means the tempo could not be estimated
//! (clip shorter than one analysis frame, silence, no periodic structure).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod estimator;
pub mod features;

// Re-export main types
pub use analysis::confidence::{compute_confidence, TempoConfidence};
pub use analysis::metadata::EstimationMetadata;
pub use analysis::result::{EstimationResult, TempoCandidate};
pub use config::{TempoConfig, TempoRange};
pub use error::AnalysisError;
pub use estimator::{SessionState, TempoEstimator};

/// Estimate the tempo of a mono clip in one call
///
/// Runs a fresh [`TempoEstimator`] over `samples` and returns its result.
///
/// # Arguments
///
/// * `samples` - Mono audio samples, normalized to [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz (typically 44100 or 48000)
/// * `config` - Tempo range, beats-per-bar hint and tuning parameters
///
/// # Returns
///
/// `EstimationResult` with candidates sorted best first; empty if the tempo
/// could not be estimated
///
/// # Errors
///
/// Returns `AnalysisError` for an invalid configuration or sample rate
///
/// # Example
///
/// ```no_run
/// use stratum_tempo::{estimate_tempo, TempoConfig};
///
/// let samples = vec![0.0f32; 44100 * 30]; // 30 seconds of silence
/// let result = estimate_tempo(&samples, 44100, &TempoConfig::default())?;
/// assert_eq!(result.bpm(), 0.0);
/// # Ok::<(), stratum_tempo::AnalysisError>(())
/// ```
pub fn estimate_tempo(
    samples: &[f32],
    sample_rate: u32,
    config: &TempoConfig,
) -> Result<EstimationResult, AnalysisError> {
    log::debug!(
        "Starting tempo estimation: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );

    let mut estimator = TempoEstimator::with_config(sample_rate, config.clone())?;
    estimator.estimate(samples)?;

    Ok(estimator.result().cloned().unwrap_or_default())
}
