//! BPM candidate filtering and merging
//!
//! Turns the periodicity score curve into the ranked candidate list:
//!
//! 1. Peak picking (end points included when a guard score shows the curve
//!    turning down past the range bound) with parabolic refinement of each
//!    peak lag
//! 2. Perceptual weighting towards moderate tempi
//! 3. Merging of near-duplicate peaks
//! 4. Octave error resolution using the beats-per-bar hint
//! 5. Best-first sort

use super::octave::{resolve_octaves, OctaveCandidate, OctaveSettings};
use super::peak_picking::{find_peaks, refine_peak};
use super::{lag_to_bpm, PeriodicityCurve};
use crate::analysis::result::TempoCandidate;
use crate::config::TempoConfig;

/// Perceptual weight of a tempo
///
/// A log-Gaussian centred on `preferred_bpm`, mixed with a flat floor:
/// `1 - strength * (1 - exp(-0.5 * (log2(bpm / preferred) / width)^2))`.
/// Returns 1.0 at the preferred tempo and never less than `1 - strength`.
pub fn perceptual_weight(bpm: f32, preferred_bpm: f32, width_octaves: f32, strength: f32) -> f32 {
    if bpm <= 0.0 || preferred_bpm <= 0.0 || width_octaves <= 0.0 {
        return 1.0;
    }

    let octaves = (bpm / preferred_bpm).log2() / width_octaves;
    let gaussian = (-0.5 * octaves * octaves).exp();
    1.0 - strength * (1.0 - gaussian)
}

/// Merge candidates closer than `tolerance_bpm`, keeping the higher score
///
/// # Returns
///
/// Surviving candidates, best score first (ties by lower BPM).
pub fn merge_near_duplicates(
    mut candidates: Vec<TempoCandidate>,
    tolerance_bpm: f32,
) -> Vec<TempoCandidate> {
    sort_best_first(&mut candidates);

    let mut merged: Vec<TempoCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let duplicate = merged
            .iter()
            .any(|kept| (kept.bpm - candidate.bpm).abs() <= tolerance_bpm);
        if !duplicate {
            merged.push(candidate);
        }
    }

    merged
}

/// Sort by descending score, ties by ascending BPM
pub(crate) fn sort_best_first(candidates: &mut [TempoCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.bpm
                    .partial_cmp(&b.bpm)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
}

/// Resolve a periodicity curve into ranked tempo candidates
///
/// # Arguments
///
/// * `curve` - Periodicity score curve from [`analyze_periodicity`](super::analyze_periodicity)
/// * `beats_per_bar` - Octave resolution hint
/// * `config` - Resolver tuning (thresholds, tolerances, weights)
///
/// # Returns
///
/// Deduplicated candidates sorted best first. Empty if the curve has no
/// peak inside the tempo range (empty, flat or silent input).
pub fn resolve_candidates(
    curve: &PeriodicityCurve,
    beats_per_bar: u32,
    config: &TempoConfig,
) -> Vec<TempoCandidate> {
    let points = curve.points();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        log::debug!("Empty periodicity curve");
        return Vec::new();
    };
    let frame_rate = curve.frame_rate();
    let step = curve.lag_step();

    // Guard scores let an end point qualify as a local maximum
    let (leading, trailing) = curve.guard_scores();
    let offset = usize::from(leading.is_some());
    let mut scores: Vec<f32> = Vec::with_capacity(points.len() + 2);
    scores.extend(leading);
    scores.extend(points.iter().map(|p| p.score));
    scores.extend(trailing);

    let min_distance = (1.0 / step).round().max(1.0) as usize;
    let peaks: Vec<(usize, f32)> = find_peaks(&scores, config.peak_threshold, min_distance)
        .into_iter()
        .filter(|&(index, _)| index >= offset && index - offset < points.len())
        .collect();
    if peaks.is_empty() {
        log::debug!("No peaks in periodicity curve ({} points)", points.len());
        return Vec::new();
    }

    let raw: Vec<TempoCandidate> = peaks
        .iter()
        .map(|&(index, _)| {
            let (shift, height) = refine_peak(&scores, index);
            let lag = (points[index - offset].lag + shift * step).clamp(first.lag, last.lag);
            let bpm = lag_to_bpm(lag, frame_rate).clamp(last.bpm, first.bpm);
            let weight = perceptual_weight(
                bpm,
                config.preferred_bpm,
                config.perceptual_width_octaves,
                config.perceptual_strength,
            );
            TempoCandidate {
                bpm,
                score: height * weight,
            }
        })
        .collect();

    let merged = merge_near_duplicates(raw, config.merge_tolerance_bpm);
    log::debug!(
        "{} peaks, {} after merging within {:.2} BPM",
        peaks.len(),
        merged.len(),
        config.merge_tolerance_bpm
    );

    let mut octave_candidates: Vec<OctaveCandidate> = merged
        .iter()
        .map(|c| OctaveCandidate {
            bpm: c.bpm,
            lag: 60.0 * frame_rate / c.bpm,
            score: c.score,
        })
        .collect();
    let settings = OctaveSettings {
        beats_per_bar,
        bar_weight: config.bar_weight,
        tolerance: config.octave_tolerance,
        // Each beat of lag error can be up to half a grid step
        bar_spread: 0.5 * step * beats_per_bar as f32,
    };
    resolve_octaves(&mut octave_candidates, curve.autocorrelation(), &settings);

    let mut candidates: Vec<TempoCandidate> = octave_candidates
        .into_iter()
        .map(|c| TempoCandidate {
            bpm: c.bpm,
            score: c.score,
        })
        .collect();
    sort_best_first(&mut candidates);

    if let Some(best) = candidates.first() {
        log::debug!(
            "Best candidate: {:.2} BPM (score {:.3}) of {}",
            best.bpm,
            best.score,
            candidates.len()
        );
    }

    candidates
}
