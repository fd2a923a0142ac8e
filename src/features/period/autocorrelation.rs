//! Autocorrelation of onset strength bands
//!
//! Finds periodicity in each onset band using FFT-accelerated autocorrelation,
//! then combines the bands into a single normalised autocorrelation.
//!
//! # Algorithm
//!
//! 1. Remove the band's mean so the DC level does not dominate every lag
//! 2. Compute autocorrelation using FFT acceleration: `ACF = IFFT(|FFT(signal)|²)`
//! 3. Clamp negative values to zero and normalise to unity at lag 0
//! 4. Combine bands as a weighted mean (the low band carries most weight)
//!
//! # Reference
//!
//! Ellis, D. P. W., & Pikrakis, A. (2006). Real-time Beat Induction.
//! *Proceedings of the International Conference on Music Information Retrieval*.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::features::onset::OnsetStrengthSignal;

const EPSILON: f32 = 1e-10;

/// Weights applied when combining band autocorrelations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandWeights {
    /// Low-frequency band weight
    pub low_band: f32,
    /// High-frequency bin weight
    pub high_band: f32,
    /// Frame energy weight
    pub energy: f32,
}

/// Compute the combined, normalised autocorrelation of all onset bands
///
/// The result has the same length as the signal. Lag 0 equals the share of
/// weight held by bands that carry any energy (1.0 for a normal clip, 0.0 for
/// silence). Every value is finite and in `[0, 1]`.
pub fn combined_autocorrelation(signal: &OnsetStrengthSignal, weights: &BandWeights) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::new();
    let mut combined = vec![0.0f32; n];
    let total_weight = weights.low_band + weights.high_band + weights.energy;
    if total_weight <= EPSILON {
        return combined;
    }

    let bands = [
        (signal.low_band(), weights.low_band),
        (signal.high_band(), weights.high_band),
        (signal.energy(), weights.energy),
    ];

    for (band, weight) in bands {
        if weight <= 0.0 {
            continue;
        }
        let acf = normalized_autocorrelation(band, &mut planner);
        for (c, a) in combined.iter_mut().zip(&acf) {
            *c += weight * a;
        }
    }

    for c in &mut combined {
        *c /= total_weight;
    }

    combined
}

/// Mean-removed autocorrelation normalised to unity at lag 0
///
/// Returns all zeros when the band has no variation.
pub fn normalized_autocorrelation(band: &[f32], planner: &mut FftPlanner<f32>) -> Vec<f32> {
    let n = band.len();
    if n == 0 {
        return Vec::new();
    }

    let mean = band.iter().sum::<f32>() / n as f32;
    let centered: Vec<f32> = band.iter().map(|&x| x - mean).collect();

    let acf = compute_autocorrelation_fft(&centered, planner);
    let zero_lag = acf[0];
    if zero_lag <= EPSILON {
        return vec![0.0; n];
    }

    acf.iter().map(|&x| (x / zero_lag).clamp(0.0, 1.0)).collect()
}

/// Compute autocorrelation using FFT acceleration
///
/// Uses the identity: ACF = IFFT(|FFT(signal)|²), zero-padded to at least
/// twice the signal length so lags do not wrap around.
///
/// # Returns
///
/// Autocorrelation function (same length as input), negative values clamped
/// to zero
pub fn compute_autocorrelation_fft(signal: &[f32], planner: &mut FftPlanner<f32>) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    // FFT size: next power of 2 >= 2*n (for zero-padding)
    let fft_size = (2 * n).next_power_of_two();

    let mut fft_input: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft_input.resize(fft_size, Complex::new(0.0, 0.0));

    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut fft_input);

    // |FFT|²
    for x in &mut fft_input {
        *x = Complex::new(x.norm_sqr(), 0.0);
    }

    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut fft_input);

    let scale = 1.0 / (fft_size as f32);
    fft_input[..n]
        .iter()
        .map(|x| (x.re * scale).max(0.0))
        .collect()
}
