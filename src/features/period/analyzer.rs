//! Periodicity analysis
//!
//! Turns an onset strength signal into a periodicity score curve spanning the
//! tempo range on an even sub-frame lag grid.

use super::autocorrelation::{combined_autocorrelation, BandWeights};
use super::comb_filter::{comb_filter_scores, comb_score};
use super::{bpm_to_lag, lag_to_bpm, PeriodicityCurve, ScorePoint};
use crate::config::{TempoConfig, TempoRange};
use crate::error::AnalysisError;
use crate::features::onset::OnsetStrengthSignal;

/// Lag bounds (in onset frames) for a tempo range
///
/// `min_lag` corresponds to the fastest tempo, `max_lag` to the slowest.
pub fn lag_range(range: &TempoRange, frame_rate: f32) -> (f32, f32) {
    (
        bpm_to_lag(range.max(), frame_rate),
        bpm_to_lag(range.min(), frame_rate),
    )
}

/// Even lag grid from `min_lag` to `max_lag` inclusive, cut at `limit`
///
/// The step is at most `1 / resolution` frames, shrunk so the last point
/// lands exactly on `max_lag`. Points beyond `limit` are not generated.
/// Returns the lags and the step.
pub fn lag_grid(min_lag: f32, max_lag: f32, resolution: usize, limit: f32) -> (Vec<f32>, f32) {
    let span = max_lag - min_lag;
    let intervals = (span * resolution.max(1) as f32).ceil().max(1.0) as usize;
    let step = span / intervals as f32;

    let lags = (0..=intervals)
        .map(|i| {
            if i == intervals {
                max_lag
            } else {
                min_lag + i as f32 * step
            }
        })
        .take_while(|&lag| lag <= limit)
        .collect();

    (lags, step)
}

/// Compute the periodicity score curve of an onset strength signal
///
/// # Returns
///
/// An empty curve if the signal is empty or not longer than the lag of the
/// fastest tempo in range. Lags beyond the signal length are not scored.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidConfig` if the tempo range in `config` is
/// invalid, or `AnalysisError::NumericalError` if a score comes out
/// non-finite.
pub fn analyze_periodicity(
    signal: &OnsetStrengthSignal,
    config: &TempoConfig,
) -> Result<PeriodicityCurve, AnalysisError> {
    let range = config.tempo_range()?;
    let frame_rate = signal.frame_rate();
    let (min_lag, max_lag) = lag_range(&range, frame_rate);

    log::debug!(
        "Periodicity analysis: {} frames at {:.2} Hz, range=[{:.1}, {:.1}] BPM, lags=[{:.2}, {:.2}]",
        signal.len(),
        frame_rate,
        range.min(),
        range.max(),
        min_lag,
        max_lag
    );

    if signal.len() as f32 <= min_lag {
        log::debug!(
            "Onset signal ({} frames) shorter than minimum lag {:.2}, nothing to score",
            signal.len(),
            min_lag
        );
        return Ok(PeriodicityCurve::empty(frame_rate));
    }

    let weights = BandWeights {
        low_band: config.low_band_weight,
        high_band: config.high_band_weight,
        energy: config.energy_weight,
    };
    let acf = combined_autocorrelation(signal, &weights);

    // Only lags inside the window can score
    let (lags, step) = lag_grid(min_lag, max_lag, config.lag_resolution, signal.len() as f32);

    let scored = comb_filter_scores(&acf, &lags, config.comb_harmonics, config.offbeat_weight);
    let mut points = Vec::with_capacity(scored.len());
    for (i, &(lag, score)) in scored.iter().enumerate() {
        if !score.is_finite() {
            return Err(AnalysisError::NumericalError(format!(
                "Non-finite periodicity score at lag {:.2}",
                lag
            )));
        }
        // Pin the end points to the range bounds exactly
        let bpm = if i == 0 {
            range.max()
        } else if lag == max_lag {
            range.min()
        } else {
            lag_to_bpm(lag, frame_rate)
        };
        points.push(ScorePoint {
            bpm,
            lag,
            score: score.max(0.0),
        });
    }

    let complete = points.last().is_some_and(|last| last.lag == max_lag);
    if !complete {
        if let Some(last) = points.last() {
            log::debug!(
                "Clip too short to score slow tempi: stopped at {:.1} BPM (lag {:.2})",
                last.bpm,
                last.lag
            );
        }
    }

    let guard = |lag: f32| {
        comb_score(&acf, lag, config.comb_harmonics, config.offbeat_weight)
            .filter(|score| score.is_finite())
            .map(|score| score.max(0.0))
    };
    let leading_guard = if points.is_empty() {
        None
    } else {
        guard(min_lag - step)
    };
    let trailing_guard = if complete { guard(max_lag + step) } else { None };

    Ok(PeriodicityCurve::new(points, acf, frame_rate, step)
        .with_guards(leading_guard, trailing_guard))
}
