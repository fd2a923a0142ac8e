//! Comb filter over the autocorrelation
//!
//! Tests each candidate beat period by summing the autocorrelation at the
//! period and its first few multiples. A true beat period repeats at every
//! multiple, so it outscores lags that only line up once.
//!
//! # Algorithm
//!
//! For each lag `L` on the analyzer's sub-frame grid (and inside the signal):
//!
//! ```text
//! on(L)    = Σ_k support(k·L) / k              k = 1..=harmonics, k·L in window
//! off(L)   = Σ_k support((k - ½)·L) / k
//! score(L) = max(0, on(L) - offbeat_weight · off(L)) / Σ_k 1/k
//! ```
//!
//! `support(t)` is the autocorrelation mass within half a frame of `t`, so a
//! peak scores the same whether it sits on an integer lag or is split between
//! two. The off-beat term penalises sub-multiples of the beat: at half tempo
//! the midpoints between multiples land on real beats.
//!
//! Multiples that fall outside the analysis window are skipped rather than
//! extrapolated, and the normalisation only counts the terms that were used.
//!
//! # Reference
//!
//! Gkiokas, A., Katsouros, V., & Carayannis, G. (2012).
//! Dimensionality Reduction for BPM Estimation.
//! *IEEE Transactions on Audio, Speech, and Language Processing*.

/// Midpoints closer than this to lag 0 pick up the lag-0 peak and are skipped
const MIN_OFFBEAT_LAG: f32 = 1.5;

/// Linearly interpolated autocorrelation value at a fractional lag
///
/// Returns `None` if the lag is negative or beyond the last computed lag.
pub fn acf_at(acf: &[f32], lag: f32) -> Option<f32> {
    if acf.is_empty() || !lag.is_finite() || lag < 0.0 {
        return None;
    }

    let last = (acf.len() - 1) as f32;
    if lag > last {
        return None;
    }

    let lower = lag.floor() as usize;
    let frac = lag - lower as f32;
    if frac == 0.0 || lower + 1 >= acf.len() {
        return Some(acf[lower]);
    }

    Some(acf[lower] * (1.0 - frac) + acf[lower + 1] * frac)
}

/// Autocorrelation mass within half a frame of a fractional lag
///
/// `acf(lag - 0.5) + acf(lag + 0.5)`, interpolated. A unit spike on an
/// integer lag and one split evenly over two neighbouring lags both give 1.0
/// at their centre. Returns `None` if either end is outside the window.
pub fn peak_support(acf: &[f32], lag: f32) -> Option<f32> {
    let below = acf_at(acf, lag - 0.5)?;
    let above = acf_at(acf, lag + 0.5)?;
    Some(below + above)
}

/// Strongest [`peak_support`] within `spread` frames of `lag`
///
/// Sampled in half-frame steps. Returns `None` if no sample is inside the
/// window.
pub fn windowed_support(acf: &[f32], lag: f32, spread: f32) -> Option<f32> {
    let steps = if spread > 0.0 {
        (spread / 0.5).ceil() as i32
    } else {
        0
    };

    (-steps..=steps)
        .filter_map(|i| peak_support(acf, lag + 0.5 * i as f32))
        .reduce(f32::max)
}

/// Comb filter score of a single lag
///
/// Returns `None` if the lag itself is outside the window.
pub fn comb_score(acf: &[f32], lag: f32, harmonics: usize, offbeat_weight: f32) -> Option<f32> {
    if !lag.is_finite() || lag <= 0.0 {
        return None;
    }

    let mut on_beat = peak_support(acf, lag)?;
    let mut weight_sum = 1.0f32;
    let mut used = 1;
    for k in 2..=harmonics.max(1) {
        let Some(support) = peak_support(acf, k as f32 * lag) else {
            break;
        };
        let weight = 1.0 / k as f32;
        on_beat += weight * support;
        weight_sum += weight;
        used = k;
    }

    let mut off_beat = 0.0f32;
    for k in 1..=used {
        let midpoint = (k as f32 - 0.5) * lag;
        if midpoint < MIN_OFFBEAT_LAG {
            continue;
        }
        if let Some(support) = peak_support(acf, midpoint) {
            off_beat += support / k as f32;
        }
    }

    Some((on_beat - offbeat_weight * off_beat).max(0.0) / weight_sum)
}

/// Comb filter scores for every lag in `lags`
///
/// # Returns
///
/// `(lag, score)` pairs in the order of `lags`, stopping at the first lag
/// outside the autocorrelation window.
pub fn comb_filter_scores(
    acf: &[f32],
    lags: &[f32],
    harmonics: usize,
    offbeat_weight: f32,
) -> Vec<(f32, f32)> {
    lags.iter()
        .map_while(|&lag| comb_score(acf, lag, harmonics, offbeat_weight).map(|score| (lag, score)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Idealised autocorrelation of a pulse train with the given period
    fn pulse_acf(len: usize, period: usize) -> Vec<f32> {
        (0..len)
            .map(|lag| {
                if lag % period == 0 {
                    1.0 - lag as f32 / len as f32
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Autocorrelation of a pulse train with a fractional period, each peak
    /// shared between the two integer lags around it
    fn fractional_pulse_acf(len: usize, period: f32) -> Vec<f32> {
        let mut acf = vec![0.0f32; len];
        acf[0] = 1.0;
        let mut k = 1.0f32;
        while k * period + 1.0 < len as f32 {
            let centre = k * period;
            let lower = centre.floor() as usize;
            let frac = centre - lower as f32;
            acf[lower] += 1.0 - frac;
            acf[lower + 1] += frac;
            k += 1.0;
        }
        acf
    }

    #[test]
    fn test_acf_at_interpolates() {
        let acf = vec![1.0, 0.5, 0.0, 0.5];
        assert_eq!(acf_at(&acf, 1.0), Some(0.5));
        assert_abs_diff_eq!(acf_at(&acf, 1.5).unwrap(), 0.25, epsilon = 1e-6);
        assert_eq!(acf_at(&acf, 3.0), Some(0.5));
        assert_eq!(acf_at(&acf, 3.5), None);
        assert_eq!(acf_at(&acf, -1.0), None);
        assert_eq!(acf_at(&[], 0.0), None);
    }

    #[test]
    fn test_peak_support_ignores_split() {
        let mut whole = vec![0.0f32; 20];
        whole[10] = 1.0;
        let mut split = vec![0.0f32; 20];
        split[10] = 0.5;
        split[11] = 0.5;

        assert_abs_diff_eq!(peak_support(&whole, 10.0).unwrap(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(peak_support(&split, 10.5).unwrap(), 1.0, epsilon = 1e-6);
        assert_eq!(peak_support(&whole, 19.0), None);
        assert_eq!(peak_support(&whole, 0.2), None);
    }

    #[test]
    fn test_windowed_support_finds_nearby_peak() {
        let mut acf = vec![0.0f32; 50];
        acf[20] = 1.0;
        assert_abs_diff_eq!(windowed_support(&acf, 18.0, 2.0).unwrap(), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(windowed_support(&acf, 18.0, 0.0).unwrap(), 0.0, epsilon = 1e-6);
        assert_eq!(windowed_support(&acf, 60.0, 1.0), None);
    }

    #[test]
    fn test_comb_prefers_true_period_over_multiples() {
        let acf = pulse_acf(1000, 50);
        let true_period = comb_score(&acf, 50.0, 4, 0.5).unwrap();
        let double_period = comb_score(&acf, 100.0, 4, 0.5).unwrap();
        let half_period = comb_score(&acf, 25.0, 4, 0.5).unwrap();

        assert!(true_period > double_period);
        assert!(true_period > half_period);
    }

    #[test]
    fn test_fractional_period_beats_its_exact_double() {
        // 87.5 frames: odd multiples split over two lags, even ones do not
        let acf = fractional_pulse_acf(2200, 87.5);
        let beat = comb_score(&acf, 87.5, 4, 0.5).unwrap();
        let two_beats = comb_score(&acf, 175.0, 4, 0.5).unwrap();
        assert!(beat > 1.5 * two_beats, "beat {} vs two beats {}", beat, two_beats);

        // Without the off-beat term the beat at least ties
        let beat = comb_score(&acf, 87.5, 4, 0.0).unwrap();
        let two_beats = comb_score(&acf, 175.0, 4, 0.0).unwrap();
        assert!(beat >= two_beats);
    }

    #[test]
    fn test_offbeat_weight_penalises_half_tempo_only() {
        let acf = pulse_acf(1000, 50);
        let plain = comb_score(&acf, 50.0, 4, 0.0).unwrap();
        let penalised = comb_score(&acf, 50.0, 4, 0.5).unwrap();
        assert_abs_diff_eq!(plain, penalised, epsilon = 1e-6);

        let plain = comb_score(&acf, 100.0, 4, 0.0).unwrap();
        let penalised = comb_score(&acf, 100.0, 4, 0.5).unwrap();
        assert!(penalised < plain);
        assert!(penalised >= 0.0);
    }

    #[test]
    fn test_comb_skips_harmonics_outside_window() {
        let acf = pulse_acf(120, 50);
        // Only k = 1 and k = 2 fit (50, 100); k = 3 -> 150 is outside
        let score = comb_score(&acf, 50.0, 4, 0.5).unwrap();
        let expected = (acf[50] + acf[100] / 2.0) / 1.5;
        assert_abs_diff_eq!(score, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_comb_filter_scores_range() {
        let acf = pulse_acf(300, 40);
        let lags: Vec<f32> = (20..=500).map(|lag| lag as f32).collect();
        let scores = comb_filter_scores(&acf, &lags, 4, 0.5);

        // Lags stop where half a frame past the lag leaves the window
        assert_eq!(scores.first().map(|s| s.0), Some(20.0));
        assert_eq!(scores.last().map(|s| s.0), Some(298.0));

        let best = scores
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .unwrap();
        assert_eq!(best.0, 40.0);
    }

    #[test]
    fn test_comb_filter_scores_empty_cases() {
        let acf = pulse_acf(50, 10);
        assert!(comb_filter_scores(&acf, &[60.0, 61.0], 4, 0.5).is_empty());
        assert!(comb_filter_scores(&acf, &[], 4, 0.5).is_empty());
        assert!(comb_filter_scores(&[], &[1.0, 2.0], 4, 0.5).is_empty());
        assert!(comb_score(&acf, 0.0, 4, 0.5).is_none());
    }
}
