//! Tempo estimator session
//!
//! [`TempoEstimator`] binds a sample rate and a [`TempoConfig`], runs one
//! estimation and holds its result until [`reset`](TempoEstimator::reset).
//!
//! # States
//!
//! ```text
//!            estimate() / estimate_range()
//!   Idle ───────────────────────────────────────────► Estimated
//!    │                                                  ▲    │
//!    │ process()                   estimate_tempo()     │    │
//!    └──────────► Accumulating ─────────────────────────┘    │
//!                  ▲      │ process()                        │
//!                  └──────┘                                  │
//!   Idle ◄──────────────────────── reset() ◄─────────────────┘ (from any state)
//! ```
//!
//! Estimating again without a reset is rejected with
//! [`AnalysisError::InvalidState`]; the held result is left untouched.

use std::fmt;
use std::time::{Duration, Instant};

use crate::analysis::metadata::EstimationMetadata;
use crate::analysis::result::{EstimationResult, TempoCandidate};
use crate::config::{TempoConfig, TempoRange};
use crate::error::AnalysisError;
use crate::features::onset::{FrameLayout, OnsetStrengthExtractor};
use crate::features::period::{analyze_periodicity, resolve_candidates};

/// Lifecycle state of a [`TempoEstimator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No samples received, no result held
    Idle,
    /// Receiving sample blocks through [`TempoEstimator::process`]
    Accumulating,
    /// Result held and queryable
    Estimated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Accumulating => "accumulating",
            SessionState::Estimated => "estimated",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
enum Session {
    Idle,
    Accumulating {
        extractor: OnsetStrengthExtractor,
        busy: Duration,
    },
    Estimated(EstimationResult),
}

impl Session {
    fn state(&self) -> SessionState {
        match self {
            Session::Idle => SessionState::Idle,
            Session::Accumulating { .. } => SessionState::Accumulating,
            Session::Estimated(_) => SessionState::Estimated,
        }
    }
}

/// Fixed-tempo estimator bound to one sample rate
///
/// # Example
///
/// ```
/// use stratum_tempo::{SessionState, TempoEstimator};
///
/// let mut estimator = TempoEstimator::new(44100)?;
/// estimator.set_tempo_range(70.0, 180.0)?;
/// estimator.set_beats_per_bar(3)?;
///
/// let bpm = estimator.estimate(&vec![0.0f32; 44100 * 4])?;
/// assert_eq!(bpm, 0.0); // silence
/// assert!(estimator.candidates().is_empty());
/// assert_eq!(estimator.state(), SessionState::Estimated);
///
/// estimator.reset();
/// assert_eq!(estimator.state(), SessionState::Idle);
/// # Ok::<(), stratum_tempo::AnalysisError>(())
/// ```
#[derive(Debug)]
pub struct TempoEstimator {
    sample_rate: u32,
    layout: FrameLayout,
    config: TempoConfig,
    session: Session,
}

impl TempoEstimator {
    /// Create an estimator with the default configuration
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the sample rate is zero or too
    /// low for onset analysis.
    pub fn new(sample_rate: u32) -> Result<Self, AnalysisError> {
        Self::with_config(sample_rate, TempoConfig::default())
    }

    /// Create an estimator with a custom configuration
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfig` if `config` fails validation, or
    /// `AnalysisError::InvalidInput` for an unusable sample rate.
    pub fn with_config(sample_rate: u32, config: TempoConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let layout = FrameLayout::for_sample_rate(sample_rate, &config)?;

        log::debug!(
            "Tempo estimator: {} Hz, frame={} hop={} ({:.2} frames/s)",
            sample_rate,
            layout.block_size,
            layout.hop_size,
            layout.frame_rate()
        );

        Ok(Self {
            sample_rate,
            layout,
            config,
            session: Session::Idle,
        })
    }

    /// Restrict the tempo search range
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfig` unless `0 < min < max` (values
    /// are never clamped), or `AnalysisError::InvalidState` unless the
    /// estimator is idle.
    pub fn set_tempo_range(&mut self, min: f32, max: f32) -> Result<(), AnalysisError> {
        self.ensure_idle("set the tempo range")?;
        let range = TempoRange::new(min, max)?;
        self.config.min_bpm = range.min();
        self.config.max_bpm = range.max();
        Ok(())
    }

    /// Current tempo search range
    pub fn tempo_range(&self) -> TempoRange {
        // with_config() and set_tempo_range() only ever store a valid range
        self.config.tempo_range().unwrap_or_default()
    }

    /// Lower bound of the tempo search range in BPM
    pub fn tempo_range_min(&self) -> f32 {
        self.config.min_bpm
    }

    /// Upper bound of the tempo search range in BPM
    pub fn tempo_range_max(&self) -> f32 {
        self.config.max_bpm
    }

    /// Set the beats-per-bar hint used for octave resolution
    ///
    /// Accepted in any state; it applies to the next estimation and never
    /// re-ranks a held result.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfig` if `beats_per_bar` is zero.
    pub fn set_beats_per_bar(&mut self, beats_per_bar: u32) -> Result<(), AnalysisError> {
        if beats_per_bar == 0 {
            return Err(AnalysisError::invalid_config("beats_per_bar must be > 0"));
        }
        self.config.beats_per_bar = beats_per_bar;
        Ok(())
    }

    /// Beats-per-bar hint
    pub fn beats_per_bar(&self) -> u32 {
        self.config.beats_per_bar
    }

    /// Estimate the tempo of a whole mono clip
    ///
    /// # Returns
    ///
    /// The best tempo in BPM, or 0.0 if the tempo could not be estimated
    /// (clip too short, silent or aperiodic).
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidState` unless the estimator is idle.
    pub fn estimate(&mut self, samples: &[f32]) -> Result<f32, AnalysisError> {
        self.ensure_idle("estimate")?;

        let started = Instant::now();
        let mut extractor = OnsetStrengthExtractor::new(self.sample_rate, &self.config)?;
        extractor.process(samples);
        self.complete(extractor, started.elapsed())
    }

    /// Estimate the tempo of `samples[offset..offset + count]`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidState` unless the estimator is idle, or
    /// `AnalysisError::InvalidInput` if the range does not fit the buffer.
    pub fn estimate_range(
        &mut self,
        samples: &[f32],
        offset: usize,
        count: usize,
    ) -> Result<f32, AnalysisError> {
        self.ensure_idle("estimate")?;

        let end = offset
            .checked_add(count)
            .filter(|&end| end <= samples.len())
            .ok_or_else(|| {
                AnalysisError::invalid_input(format!(
                    "Sample range {}+{} exceeds buffer of {} samples",
                    offset,
                    count,
                    samples.len()
                ))
            })?;

        self.estimate(&samples[offset..end])
    }

    /// Feed the next contiguous block of mono samples
    ///
    /// Blocks may have any size; the result only depends on the concatenated
    /// samples. Finish with [`estimate_tempo`](Self::estimate_tempo).
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidState` if a result is already held.
    pub fn process(&mut self, samples: &[f32]) -> Result<(), AnalysisError> {
        let started = Instant::now();

        if let Session::Idle = self.session {
            self.session = Session::Accumulating {
                extractor: OnsetStrengthExtractor::new(self.sample_rate, &self.config)?,
                busy: Duration::ZERO,
            };
        }

        match &mut self.session {
            Session::Accumulating { extractor, busy } => {
                extractor.process(samples);
                *busy += started.elapsed();
                Ok(())
            }
            session => Err(AnalysisError::InvalidState {
                state: session.state(),
                operation: "process samples",
            }),
        }
    }

    /// Finish an incremental estimation started with [`process`](Self::process)
    ///
    /// Without any processed samples this yields an empty result and 0.0.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidState` if a result is already held.
    pub fn estimate_tempo(&mut self) -> Result<f32, AnalysisError> {
        match std::mem::replace(&mut self.session, Session::Idle) {
            Session::Idle => {
                let extractor = OnsetStrengthExtractor::new(self.sample_rate, &self.config)?;
                self.complete(extractor, Duration::ZERO)
            }
            Session::Accumulating { extractor, busy } => self.complete(extractor, busy),
            held @ Session::Estimated(_) => {
                self.session = held;
                Err(AnalysisError::InvalidState {
                    state: SessionState::Estimated,
                    operation: "estimate",
                })
            }
        }
    }

    /// Discard any held result or pending samples and return to idle
    pub fn reset(&mut self) {
        if self.session.state() != SessionState::Idle {
            log::debug!("Resetting tempo estimator ({})", self.session.state());
        }
        self.session = Session::Idle;
    }

    /// Ranked candidates of the held result, best first
    ///
    /// Empty unless a result is held.
    pub fn candidates(&self) -> &[TempoCandidate] {
        match &self.session {
            Session::Estimated(result) => &result.candidates,
            _ => &[],
        }
    }

    /// Held result, if any
    pub fn result(&self) -> Option<&EstimationResult> {
        match &self.session {
            Session::Estimated(result) => Some(result),
            _ => None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Active configuration
    pub fn config(&self) -> &TempoConfig {
        &self.config
    }

    fn ensure_idle(&self, operation: &'static str) -> Result<(), AnalysisError> {
        match self.session.state() {
            SessionState::Idle => Ok(()),
            state => Err(AnalysisError::InvalidState { state, operation }),
        }
    }

    /// Run periodicity analysis and candidate resolution, then hold the result
    ///
    /// Leaves the estimator idle if analysis fails.
    fn complete(
        &mut self,
        extractor: OnsetStrengthExtractor,
        busy: Duration,
    ) -> Result<f32, AnalysisError> {
        let started = Instant::now();
        let samples_analyzed = extractor.samples_processed();

        let signal = extractor.finish();
        let curve = match analyze_periodicity(&signal, &self.config) {
            Ok(curve) => curve,
            Err(err) => {
                self.session = Session::Idle;
                return Err(err);
            }
        };
        let candidates = resolve_candidates(&curve, self.config.beats_per_bar, &self.config);

        let processing_time_ms = (busy + started.elapsed()).as_secs_f32() * 1000.0;
        let metadata = EstimationMetadata {
            sample_rate: self.sample_rate,
            samples_analyzed,
            duration_seconds: samples_analyzed as f32 / self.sample_rate as f32,
            onset_frames: signal.len(),
            onset_frame_rate: self.layout.frame_rate(),
            beats_per_bar: self.config.beats_per_bar,
            min_bpm: self.config.min_bpm,
            max_bpm: self.config.max_bpm,
            processing_time_ms,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        let result = EstimationResult::new(candidates, metadata);
        let bpm = result.bpm();

        if result.is_empty() {
            log::debug!(
                "No tempo estimate for {} samples ({} onset frames)",
                samples_analyzed,
                signal.len()
            );
        } else {
            log::debug!(
                "Estimated {:.2} BPM from {} candidates in {:.2} ms",
                bpm,
                result.candidates.len(),
                processing_time_ms
            );
        }

        self.session = Session::Estimated(result);
        Ok(bpm)
    }
}
