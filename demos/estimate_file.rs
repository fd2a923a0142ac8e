//! Example: Estimate the tempo of a single WAV file
//!
//! Usage:
//!   cargo run --release --example estimate_file -- [--bpb N] [--range MIN MAX] [--json] <file.wav>
//!
//! Multi-channel files are averaged to mono before estimation.

use std::env;

use stratum_tempo::{compute_confidence, TempoEstimator};

/// Load a WAV file as mono f32 samples
fn load_wav_mono(path: &str) -> Result<(Vec<f32>, u32), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mono = if channels == 1 {
        samples
    } else {
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut json = false;
    let mut beats_per_bar: Option<u32> = None;
    let mut range: Option<(f32, f32)> = None;
    let mut path: Option<String> = None;

    while !args.is_empty() {
        let a = args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--bpb" => {
                let v = args.first().ok_or("--bpb requires a value")?.parse::<u32>()?;
                args.remove(0);
                beats_per_bar = Some(v);
            }
            "--range" => {
                if args.len() < 2 {
                    return Err("--range requires MIN and MAX".into());
                }
                let min = args.remove(0).parse::<f32>()?;
                let max = args.remove(0).parse::<f32>()?;
                range = Some((min, max));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: estimate_file [--bpb N] [--range MIN MAX] [--json] <file.wav>\n\
                     \n\
                     --bpb N          Beats-per-bar hint (default: 4)\n\
                     --range MIN MAX  Tempo search range in BPM (default: 55 190)\n\
                     --json           Emit the full result as JSON\n"
                );
                return Ok(());
            }
            _ => path = Some(a),
        }
    }

    let Some(path) = path else {
        eprintln!("ERROR: Provide a WAV file path. Use --help for usage.");
        std::process::exit(2);
    };

    let (samples, sample_rate) = load_wav_mono(&path)?;

    let mut estimator = TempoEstimator::new(sample_rate)?;
    if let Some((min, max)) = range {
        estimator.set_tempo_range(min, max)?;
    }
    if let Some(bpb) = beats_per_bar {
        estimator.set_beats_per_bar(bpb)?;
    }

    let bpm = estimator.estimate(&samples)?;
    let result = estimator.result().cloned().unwrap_or_default();
    let confidence = compute_confidence(&result);

    if json {
        let out = serde_json::json!({
            "file": path,
            "bpm": bpm,
            "result": result,
            "confidence": confidence,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Tempo Estimate:");
    if result.is_empty() {
        println!("  BPM: not estimable (clip too short or no periodic structure)");
    } else {
        println!(
            "  BPM: {:.2} (confidence: {:.2}, {})",
            bpm,
            confidence.overall,
            confidence.confidence_level()
        );
    }
    for (i, c) in result.candidates.iter().enumerate() {
        println!("  #{:<2} {:>7.2} BPM  score={:.4}", i + 1, c.bpm, c.score);
    }
    println!(
        "  Duration: {:.2} s at {} Hz, {} onset frames",
        result.metadata.duration_seconds, result.metadata.sample_rate, result.metadata.onset_frames
    );
    println!("  Processing time: {:.2} ms", result.metadata.processing_time_ms);

    Ok(())
}
