//! Robust peak detection utilities
//!
//! Provides peak detection for finding local maxima in 1D signals (here the
//! periodicity score curve), plus sub-sample refinement of peak positions.

const EPSILON: f32 = 1e-10;

/// Find peaks in a signal
///
/// Detects interior local maxima that exceed a threshold and are separated by
/// a minimum distance. The first and last elements are never peaks: at the
/// edge of the search range there is no evidence the curve turns down.
///
/// # Arguments
///
/// * `signal` - Signal to find peaks in
/// * `threshold` - Minimum peak height (absolute value or relative to max)
/// * `min_distance` - Minimum distance between peaks (in samples)
///
/// # Returns
///
/// Vector of (index, value) pairs for detected peaks, sorted by value (highest first)
///
/// # Algorithm
///
/// 1. Find all local maxima (value > left neighbor && value >= right neighbor)
/// 2. Filter by threshold
/// 3. Enforce minimum distance (keep highest peak when too close)
/// 4. Sort by value
///
/// The `>=` on the right side lets a two-sample plateau report its first
/// sample instead of no peak at all.
///
/// # Example
///
/// ```
/// use stratum_tempo::features::period::peak_picking::find_peaks;
///
/// let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
/// let peaks = find_peaks(&signal, 0.5, 2);
/// assert_eq!(peaks, vec![(2, 1.0), (5, 0.9)]);
/// ```
pub fn find_peaks(signal: &[f32], threshold: f32, min_distance: usize) -> Vec<(usize, f32)> {
    log::debug!(
        "Finding peaks in signal of length {}, threshold={:.3}, min_distance={}",
        signal.len(),
        threshold,
        min_distance
    );

    // Need at least 3 points for local maximum detection
    if signal.len() < 3 {
        return vec![];
    }

    let max_value = signal.iter().copied().fold(0.0f32, f32::max);
    if max_value < EPSILON {
        return vec![];
    }

    // If threshold is in (0, 1) exclusive, treat as relative
    // Otherwise, treat as absolute
    let actual_threshold = if threshold > 0.0 && threshold < 1.0 {
        max_value * threshold
    } else {
        threshold
    };

    let mut peaks = Vec::new();
    for i in 1..(signal.len() - 1) {
        let value = signal[i];
        if value > signal[i - 1] && value >= signal[i + 1] && value >= actual_threshold {
            peaks.push((i, value));
        }
    }

    // Sort by value (highest first), ties by index for determinism
    peaks.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    // Enforce minimum distance, keeping the best peaks
    if min_distance > 0 && peaks.len() > 1 {
        let mut filtered_peaks: Vec<(usize, f32)> = Vec::with_capacity(peaks.len());
        for (idx, value) in peaks {
            let too_close = filtered_peaks
                .iter()
                .any(|(existing_idx, _)| idx.abs_diff(*existing_idx) < min_distance);

            if !too_close {
                filtered_peaks.push((idx, value));
            }
        }
        peaks = filtered_peaks;
    }

    log::debug!("Found {} peaks", peaks.len());

    peaks
}

/// Refine a peak position with parabolic interpolation
///
/// Fits a parabola through `signal[index - 1..=index + 1]` and returns
/// `(offset, height)`, where `offset` in `[-0.5, 0.5]` is the vertex position
/// relative to `index`. Falls back to `(0.0, signal[index])` at the edges or
/// when the three points are collinear.
pub fn refine_peak(signal: &[f32], index: usize) -> (f32, f32) {
    if index == 0 || index + 1 >= signal.len() {
        return (0.0, signal.get(index).copied().unwrap_or(0.0));
    }

    let left = signal[index - 1];
    let centre = signal[index];
    let right = signal[index + 1];

    let denominator = left - 2.0 * centre + right;
    if denominator.abs() < EPSILON {
        return (0.0, centre);
    }

    let offset = (0.5 * (left - right) / denominator).clamp(-0.5, 0.5);
    let height = centre - 0.25 * (left - right) * offset;

    (offset, height.max(centre))
}
