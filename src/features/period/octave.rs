//! Tempo octave resolution
//!
//! Tempi related by a factor of 2, 3 or 4 share most of their periodicity
//! evidence: a 120 BPM groove also correlates at 60 BPM, and a 90 BPM one
//! at 180. Candidates linked by such ratios form an *octave family*; within a
//! family the member whose bar length (`lag * beats_per_bar`) also repeats
//! strongly is the most plausible beat level. Bar support is corrected for
//! the shrinking overlap at long lags, so a steady pulse with no bar accent
//! leaves the family ranked by score.
//!
//! Resolution never adds or removes candidates. It reassigns the family's
//! scores so that the most bar-consistent member carries the highest one.

use super::comb_filter::windowed_support;

/// Integer tempo ratios treated as octave-equivalent
const OCTAVE_RATIOS: [f32; 3] = [2.0, 3.0, 4.0];

/// Candidate as seen by octave resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctaveCandidate {
    /// Tempo in BPM
    pub bpm: f32,
    /// Period in onset frames
    pub lag: f32,
    /// Periodicity score
    pub score: f32,
}

/// Whether two tempi differ by a factor of 2, 3 or 4 (either direction)
///
/// `tolerance` is relative, e.g. 0.03 accepts 2.0 ± 3 %.
pub fn is_octave_related(a_bpm: f32, b_bpm: f32, tolerance: f32) -> bool {
    if a_bpm <= 0.0 || b_bpm <= 0.0 {
        return false;
    }

    let ratio = a_bpm.max(b_bpm) / a_bpm.min(b_bpm);
    OCTAVE_RATIOS
        .iter()
        .any(|&r| (ratio - r).abs() <= r * tolerance)
}

/// Group candidates into octave families (transitive closure of the relation)
///
/// # Returns
///
/// Families as lists of candidate indices, each list in increasing index
/// order, families ordered by their first index. Unrelated candidates form
/// single-member families.
pub fn octave_families(bpms: &[f32], tolerance: f32) -> Vec<Vec<usize>> {
    let n = bpms.len();
    let mut family_of: Vec<usize> = (0..n).collect();

    fn root(family_of: &mut [usize], mut i: usize) -> usize {
        while family_of[i] != i {
            family_of[i] = family_of[family_of[i]];
            i = family_of[i];
        }
        i
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if is_octave_related(bpms[i], bpms[j], tolerance) {
                let (ri, rj) = (root(&mut family_of, i), root(&mut family_of, j));
                if ri != rj {
                    family_of[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut families: Vec<Vec<usize>> = Vec::new();
    let mut slot_of_root = vec![usize::MAX; n];
    for i in 0..n {
        let r = root(&mut family_of, i);
        if slot_of_root[r] == usize::MAX {
            slot_of_root[r] = families.len();
            families.push(Vec::new());
        }
        families[slot_of_root[r]].push(i);
    }

    families
}

/// Octave resolution parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctaveSettings {
    /// Beats-per-bar hint
    pub beats_per_bar: u32,
    /// Weight of bar-length periodicity against the candidate's own score
    pub bar_weight: f32,
    /// Relative tolerance of the 2x/3x/4x relation
    pub tolerance: f32,
    /// Frames either side of the bar lag searched for its autocorrelation peak
    pub bar_spread: f32,
}

/// Autocorrelation support for a candidate's bar length
///
/// The strongest peak within `spread` frames of `lag * beats_per_bar`,
/// divided by the overlap fraction `1 - bar_lag / window` so bars of
/// different length compare on equal terms. `None` if the bar lag lies in
/// the second half of the window, where too little overlap is left.
pub fn bar_support(
    candidate: &OctaveCandidate,
    autocorrelation: &[f32],
    beats_per_bar: u32,
    spread: f32,
) -> Option<f32> {
    let window = autocorrelation.len() as f32;
    let bar_lag = candidate.lag * beats_per_bar as f32;
    if !bar_lag.is_finite() || bar_lag > window / 2.0 {
        return None;
    }

    let support = windowed_support(autocorrelation, bar_lag, spread)?;
    Some(support / (1.0 - bar_lag / window))
}

/// Blend of a candidate's own score with its bar support
pub fn bar_consistency(candidate: &OctaveCandidate, bar_support: f32, bar_weight: f32) -> f32 {
    (1.0 - bar_weight) * candidate.score + bar_weight * bar_support
}

/// Reorder scores within each octave family by bar consistency
///
/// The highest family score goes to the most bar-consistent member (ties
/// broken by raw score, then by lower BPM), the second-highest to the next,
/// and so on. A family in which some member's bar lag has no support keeps
/// its scores. BPMs and the multiset of scores are unchanged.
pub fn resolve_octaves(
    candidates: &mut [OctaveCandidate],
    autocorrelation: &[f32],
    settings: &OctaveSettings,
) {
    let bpms: Vec<f32> = candidates.iter().map(|c| c.bpm).collect();

    for family in octave_families(&bpms, settings.tolerance) {
        if family.len() < 2 {
            continue;
        }

        let supports: Option<Vec<f32>> = family
            .iter()
            .map(|&i| {
                bar_support(
                    &candidates[i],
                    autocorrelation,
                    settings.beats_per_bar,
                    settings.bar_spread,
                )
            })
            .collect();
        let Some(supports) = supports else {
            log::debug!(
                "Octave family {:?}: bar lag outside window, scores kept",
                family.iter().map(|&i| candidates[i].bpm).collect::<Vec<_>>()
            );
            continue;
        };

        let mut preference: Vec<(usize, f32)> = family
            .iter()
            .zip(&supports)
            .map(|(&i, &support)| {
                (
                    i,
                    bar_consistency(&candidates[i], support, settings.bar_weight),
                )
            })
            .collect();
        preference.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    candidates[b.0]
                        .score
                        .partial_cmp(&candidates[a.0].score)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(
                    candidates[a.0]
                        .bpm
                        .partial_cmp(&candidates[b.0].bpm)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });

        let mut scores: Vec<f32> = family.iter().map(|&i| candidates[i].score).collect();
        scores.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

        log::debug!(
            "Octave family {:?}: preferred {:.2} BPM",
            family.iter().map(|&i| candidates[i].bpm).collect::<Vec<_>>(),
            candidates[preference[0].0].bpm
        );

        for ((index, _), score) in preference.into_iter().zip(scores) {
            candidates[index].score = score;
        }
    }
}
