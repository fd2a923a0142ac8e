//! Frame energy feature
//!
//! RMS of the raw (unwindowed) frame. Used as a fallback periodicity cue when
//! the low-frequency band carries little rhythmic information.

/// Compute RMS: sqrt(mean(squared samples))
///
/// Returns 0.0 for an empty frame.
pub fn frame_rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = frame.iter().map(|&x| x * x).sum();
    (sum_sq / frame.len() as f32).sqrt()
}
