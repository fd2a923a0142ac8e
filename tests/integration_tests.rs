//! Integration tests for the tempo estimator

use std::path::PathBuf;

use stratum_tempo::{
    compute_confidence, estimate_tempo, AnalysisError, SessionState, TempoCandidate, TempoConfig,
    TempoEstimator,
};

const SAMPLE_RATE: u32 = 44100;

/// Kick-drum style track: decaying 100 Hz burst on every beat
fn kick_track(bpm: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let len = (seconds * sr) as usize;
    let period = 60.0 / bpm * sr;
    let kick_len = (0.1 * sr) as usize;
    let mut samples = vec![0.0f32; len];

    let mut onset = 0.0f32;
    while (onset as usize) < len {
        let start = onset as usize;
        for (i, sample) in samples[start..].iter_mut().take(kick_len).enumerate() {
            let t = i as f32 / sr;
            *sample += 0.8 * (-t * 30.0).exp() * (2.0 * std::f32::consts::PI * 100.0 * t).sin();
        }
        onset += period;
    }
    samples
}

/// Click track: short decaying 1 kHz blip on every beat
fn click_track(bpm: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let len = (seconds * sr) as usize;
    let period = 60.0 / bpm * sr;
    let click_len = (0.02 * sr) as usize;
    let mut samples = vec![0.0f32; len];

    let mut onset = 0.0f32;
    while (onset as usize) < len {
        let start = onset as usize;
        for (i, sample) in samples[start..].iter_mut().take(click_len).enumerate() {
            let t = i as f32 / sr;
            *sample += 0.9 * (-t * 200.0).exp() * (2.0 * std::f32::consts::PI * 1000.0 * t).sin();
        }
        onset += period;
    }
    samples
}

fn sorted_bpms(candidates: &[TempoCandidate]) -> Vec<u32> {
    let mut bpms: Vec<u32> = candidates.iter().map(|c| c.bpm.to_bits()).collect();
    bpms.sort_unstable();
    bpms
}

fn candidate_bits(candidates: &[TempoCandidate]) -> Vec<(u32, u32)> {
    candidates
        .iter()
        .map(|c| (c.bpm.to_bits(), c.score.to_bits()))
        .collect()
}

/// Write a 16-bit mono WAV file and return its path
fn write_wav(name: &str, samples: &[f32], sample_rate: u32) -> PathBuf {
    let path = std::env::temp_dir().join(format!("stratum_tempo_{}_{}.wav", name, std::process::id()));
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    for &s in samples {
        writer
            .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
    path
}

/// Load a WAV file and return (samples, sample_rate)
fn load_wav(path: &PathBuf) -> Result<(Vec<f32>, u32), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_kick_tracks_at_known_tempi() {
        init_logging();
        for &bpm in &[90.0f32, 120.0, 140.0] {
            let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
            let estimate = estimator.estimate(&kick_track(bpm, 12.0, SAMPLE_RATE)).unwrap();

            assert!(
                (estimate - bpm).abs() < 2.0,
                "expected ~{} BPM, got {:.2}",
                bpm,
                estimate
            );
            assert!(
                estimator
                    .candidates()
                    .iter()
                    .any(|c| (c.bpm - bpm).abs() < 2.0),
                "{} BPM missing from candidates",
                bpm
            );
        }
    }

    #[test]
    fn test_click_track() {
        init_logging();
        let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
        let estimate = estimator.estimate(&click_track(128.0, 12.0, SAMPLE_RATE)).unwrap();
        assert!((estimate - 128.0).abs() < 2.0, "got {:.2}", estimate);
    }

    #[test]
    fn test_tempo_sweep() {
        init_logging();
        let mut misses = Vec::new();
        for bpm in (58..=186).step_by(4).map(|b| b as f32) {
            for (name, clip) in [
                ("kick", kick_track(bpm, 12.0, SAMPLE_RATE)),
                ("click", click_track(bpm, 12.0, SAMPLE_RATE)),
            ] {
                let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
                let estimate = estimator.estimate(&clip).unwrap();
                let listed = estimator
                    .candidates()
                    .iter()
                    .any(|c| (c.bpm - bpm).abs() < 2.0);
                if (estimate - bpm).abs() >= 2.0 || !listed {
                    misses.push(format!("{} {} -> {:.2}", name, bpm, estimate));
                }
            }
        }
        assert!(misses.is_empty(), "missed tempi: {:?}", misses);
    }

    #[test]
    fn test_tempo_on_range_edge() {
        init_logging();
        let clip = kick_track(120.0, 12.0, SAMPLE_RATE);
        for &(min, max) in &[(60.0f32, 121.0f32), (119.5, 190.0), (119.0, 121.0), (60.0, 120.0), (120.0, 190.0)] {
            let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
            estimator.set_tempo_range(min, max).unwrap();
            let estimate = estimator.estimate(&clip).unwrap();
            assert!(
                (estimate - 120.0).abs() < 2.0,
                "range [{}, {}]: got {:.2}",
                min,
                max,
                estimate
            );
            for c in estimator.candidates() {
                assert!(c.bpm >= min && c.bpm <= max, "{} outside [{}, {}]", c.bpm, min, max);
            }
        }

        // Fastest and slowest tempo of the default range
        for &bpm in &[186.0f32, 190.0, 55.0] {
            let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
            let estimate = estimator.estimate(&kick_track(bpm, 12.0, SAMPLE_RATE)).unwrap();
            assert!((estimate - bpm).abs() < 2.0, "expected ~{} BPM, got {:.2}", bpm, estimate);
        }
    }

    #[test]
    fn test_other_sample_rate() {
        let mut estimator = TempoEstimator::new(48000).unwrap();
        let estimate = estimator.estimate(&kick_track(120.0, 12.0, 48000)).unwrap();
        assert!((estimate - 120.0).abs() < 2.0, "got {:.2}", estimate);
    }

    #[test]
    fn test_silence_yields_no_estimate() {
        for &len in &[0usize, 100, 481, 44100, 44100 * 10] {
            let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
            assert_eq!(estimator.estimate(&vec![0.0f32; len]).unwrap(), 0.0);
            assert!(estimator.candidates().is_empty(), "candidates for {} zeros", len);
        }
    }

    #[test]
    fn test_too_short_clip() {
        let clip = kick_track(120.0, 1.0, SAMPLE_RATE);
        for &len in &[0usize, 1, 240, 480] {
            let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
            assert_eq!(estimator.estimate(&clip[..len]).unwrap(), 0.0);
            assert!(estimator.candidates().is_empty());
            assert_eq!(estimator.state(), SessionState::Estimated);
        }
    }

    #[test]
    fn test_candidates_best_first() {
        for (tempo, clip) in [
            (97.0f32, kick_track(97.0, 10.0, SAMPLE_RATE)),
            (150.0, kick_track(150.0, 10.0, SAMPLE_RATE)),
            (110.0, click_track(110.0, 10.0, SAMPLE_RATE)),
        ] {
            let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
            let bpm = estimator.estimate(&clip).unwrap();
            let candidates = estimator.candidates();
            assert!(!candidates.is_empty());
            assert_eq!(candidates[0].bpm, bpm);
            assert!((bpm - tempo).abs() < 2.0, "expected ~{} BPM, got {:.2}", tempo, bpm);
            for pair in candidates.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
            for c in candidates {
                assert!(c.score.is_finite() && c.score >= 0.0);
            }
        }
    }

    #[test]
    fn test_candidates_stay_in_tempo_range() {
        let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
        estimator.set_tempo_range(130.0, 190.0).unwrap();
        estimator.estimate(&kick_track(120.0, 10.0, SAMPLE_RATE)).unwrap();
        for c in estimator.candidates() {
            assert!(c.bpm >= 130.0 && c.bpm <= 190.0, "{} out of range", c.bpm);
        }
    }

    #[test]
    fn test_beats_per_bar_keeps_candidate_set() {
        let clip = kick_track(120.0, 12.0, SAMPLE_RATE);

        let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
        estimator.estimate(&clip).unwrap();
        let in_four = estimator.candidates().to_vec();

        estimator.reset();
        estimator.set_beats_per_bar(3).unwrap();
        estimator.estimate(&clip).unwrap();
        let in_three = estimator.candidates().to_vec();

        assert!(!in_four.is_empty());
        assert_eq!(sorted_bpms(&in_four), sorted_bpms(&in_three));
    }

    #[test]
    fn test_beats_per_bar_does_not_rerank_held_result() {
        let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
        estimator.estimate(&kick_track(120.0, 8.0, SAMPLE_RATE)).unwrap();
        let before = estimator.candidates().to_vec();

        estimator.set_beats_per_bar(3).unwrap();
        assert_eq!(estimator.candidates(), before.as_slice());
        assert_eq!(estimator.result().map(|r| r.metadata.beats_per_bar), Some(4));
    }

    #[test]
    fn test_reset_clears_state() {
        let first = kick_track(90.0, 10.0, SAMPLE_RATE);
        let second = kick_track(140.0, 10.0, SAMPLE_RATE);

        let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
        estimator.estimate(&first).unwrap();
        estimator.reset();
        assert!(estimator.candidates().is_empty());
        estimator.estimate(&second).unwrap();

        let mut fresh = TempoEstimator::new(SAMPLE_RATE).unwrap();
        fresh.estimate(&second).unwrap();

        assert_eq!(
            candidate_bits(estimator.candidates()),
            candidate_bits(fresh.candidates())
        );
    }

    #[test]
    fn test_determinism() {
        let clip = click_track(100.0, 10.0, SAMPLE_RATE);
        let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();

        let first_bpm = estimator.estimate(&clip).unwrap();
        let first = candidate_bits(estimator.candidates());
        estimator.reset();
        let second_bpm = estimator.estimate(&clip).unwrap();
        let second = candidate_bits(estimator.candidates());

        assert_eq!(first_bpm.to_bits(), second_bpm.to_bits());
        assert_eq!(first, second);
    }

    #[test]
    fn test_streaming_matches_single_shot() {
        let clip = kick_track(128.0, 10.0, SAMPLE_RATE);

        let mut single = TempoEstimator::new(SAMPLE_RATE).unwrap();
        let single_bpm = single.estimate(&clip).unwrap();

        for &block in &[1000usize, 4096, 44100] {
            let mut streaming = TempoEstimator::new(SAMPLE_RATE).unwrap();
            for chunk in clip.chunks(block) {
                streaming.process(chunk).unwrap();
            }
            assert_eq!(streaming.state(), SessionState::Accumulating);
            let streamed_bpm = streaming.estimate_tempo().unwrap();

            assert_eq!(streamed_bpm.to_bits(), single_bpm.to_bits());
            assert_eq!(
                candidate_bits(streaming.candidates()),
                candidate_bits(single.candidates())
            );
        }
    }

    #[test]
    fn test_tempo_range_idempotence() {
        let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
        for &(min, max) in &[(55.0f32, 190.0f32), (60.5, 61.0), (1.0e-3, 1.0e4), (100.0, 180.25)] {
            estimator.set_tempo_range(min, max).unwrap();
            assert_eq!(estimator.tempo_range_min(), min);
            assert_eq!(estimator.tempo_range_max(), max);
        }
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        assert!(TempoEstimator::new(0).is_err());

        let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
        assert!(matches!(
            estimator.set_tempo_range(120.0, 60.0),
            Err(AnalysisError::InvalidConfig(_))
        ));
        assert!(matches!(
            estimator.set_beats_per_bar(0),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_protocol_misuse_is_an_error() {
        let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
        let clip = kick_track(120.0, 6.0, SAMPLE_RATE);
        estimator.estimate(&clip).unwrap();
        let held = estimator.candidates().to_vec();

        assert!(matches!(
            estimator.estimate(&clip),
            Err(AnalysisError::InvalidState { .. })
        ));
        assert_eq!(estimator.candidates(), held.as_slice());

        estimator.reset();
        assert!(estimator.estimate(&clip).is_ok());
    }

    #[test]
    fn test_non_finite_samples_do_not_crash() {
        let mut clip = kick_track(120.0, 8.0, SAMPLE_RATE);
        for i in (0..clip.len()).step_by(997) {
            clip[i] = f32::NAN;
        }
        clip[5] = f32::INFINITY;

        let mut estimator = TempoEstimator::new(SAMPLE_RATE).unwrap();
        let bpm = estimator.estimate(&clip).unwrap();
        assert!(bpm.is_finite());
        for c in estimator.candidates() {
            assert!(c.bpm.is_finite() && c.score.is_finite());
        }
    }

    #[test]
    fn test_estimate_tempo_function() {
        let result =
            estimate_tempo(&kick_track(120.0, 10.0, SAMPLE_RATE), SAMPLE_RATE, &TempoConfig::default())
                .unwrap();
        assert!((result.bpm() - 120.0).abs() < 2.0);
        assert!(result.metadata.processing_time_ms >= 0.0);
        assert!((result.metadata.duration_seconds - 10.0).abs() < 1e-3);

        let confidence = compute_confidence(&result);
        assert!(confidence.overall > 0.0 && confidence.overall <= 1.0);
        assert!(confidence.peak_score > 0.0);
    }

    #[test]
    fn test_wav_file_roundtrip() {
        let path = write_wav("kick_120", &kick_track(120.0, 8.0, SAMPLE_RATE), SAMPLE_RATE);
        let (samples, sample_rate) = load_wav(&path).expect("Failed to load WAV");
        let _ = std::fs::remove_file(&path);

        assert_eq!(sample_rate, SAMPLE_RATE);
        let result = estimate_tempo(&samples, sample_rate, &TempoConfig::default()).unwrap();
        assert!((result.bpm() - 120.0).abs() < 2.0, "got {:.2}", result.bpm());
    }
}
