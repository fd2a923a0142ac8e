//! Example: Estimate the tempo of multiple audio files in parallel
//!
//! Usage:
//!   cargo run --release --example estimate_batch -- [--jobs N] [--bpb N] [--json] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files (batch-level). Each estimation is single-threaded.
//! - Each worker thread owns one estimator and resets it between files.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use std::env;
use std::fs::File;
use std::time::Instant;

use rayon::prelude::*;
use stratum_tempo::{compute_confidence, EstimationResult, TempoEstimator};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

/// Decode any supported audio file to mono f32 samples
fn decode_audio_file(path: &str) -> Result<(Vec<f32>, u32), Box<dyn std::error::Error>> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = std::path::Path::new(path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or("No supported audio tracks found")?;

    let track_id = track.id;
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let sample_rate = track.codec_params.sample_rate.ok_or("Unknown sample rate")?;
    let mut mono: Vec<f32> = Vec::new();
    let mut interleaved: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(_) => break,
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channels = spec.channels.count().max(1);

                let buf = interleaved.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
                });
                if buf.capacity() < decoded.capacity() * channels {
                    *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                }
                buf.copy_interleaved_ref(decoded);

                // Downmix to mono
                mono.extend(
                    buf.samples()
                        .chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32),
                );
            }
            Err(SymphoniaError::DecodeError(_)) => {
                // Skip decode errors (can happen with corrupted packets).
                continue;
            }
            Err(e) => return Err(Box::new(e)),
        }
    }

    Ok((mono, sample_rate))
}

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn percentile(mut xs: Vec<f32>, p: f32) -> Option<f32> {
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = ((xs.len() - 1) as f32 * p.clamp(0.0, 1.0)).round() as usize;
    Some(xs[idx.min(xs.len() - 1)])
}

/// Estimate with the worker's estimator, rebuilding it if the sample rate changed
fn estimate_with(
    slot: &mut Option<TempoEstimator>,
    samples: &[f32],
    sample_rate: u32,
    beats_per_bar: u32,
) -> Result<EstimationResult, stratum_tempo::AnalysisError> {
    let estimator = match slot.take() {
        Some(estimator) if estimator.sample_rate() == sample_rate => slot.insert(estimator),
        _ => slot.insert(TempoEstimator::new(sample_rate)?),
    };

    estimator.reset();
    estimator.set_beats_per_bar(beats_per_bar)?;
    estimator.estimate(samples)?;
    Ok(estimator.result().cloned().unwrap_or_default())
}

struct ItemOut {
    path: String,
    outcome: Result<EstimationResult, String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut beats_per_bar = 4u32;
    let mut paths: Vec<String> = Vec::new();

    while !args.is_empty() {
        let a = args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--bpb" => {
                beats_per_bar = args.first().ok_or("--bpb requires a value")?.parse::<u32>()?;
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: estimate_batch [--jobs N] [--bpb N] [--json] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --bpb N    Beats-per-bar hint (default: 4)\n\
                     --json     Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<ItemOut> = pool.install(|| {
        paths
            .par_iter()
            .map_init(
                || None::<TempoEstimator>,
                |slot, path| {
                    let outcome = match decode_audio_file(path) {
                        Ok((samples, sr)) => estimate_with(slot, &samples, sr, beats_per_bar)
                            .map_err(|e| format!("estimation failed: {e}")),
                        Err(e) => Err(format!("decode failed: {e}")),
                    };
                    ItemOut {
                        path: path.clone(),
                        outcome,
                    }
                },
            )
            .collect()
    });

    for (idx, o) in outs.iter().enumerate() {
        match (&o.outcome, json) {
            (Ok(result), true) => {
                let confidence = compute_confidence(result);
                let line = serde_json::json!({
                    "file": o.path,
                    "bpm": result.bpm(),
                    "confidence": confidence.overall,
                    "candidates": result.candidates,
                    "processing_time_ms": result.metadata.processing_time_ms,
                });
                println!("{}", line);
            }
            (Err(e), true) => {
                println!("{}", serde_json::json!({ "file": o.path, "error": e }));
            }
            (Ok(result), false) => {
                let confidence = compute_confidence(result);
                println!(
                    "[{}/{}] {}: BPM={:.2} (conf={:.3}) candidates={} time={:.2}ms",
                    idx + 1,
                    outs.len(),
                    o.path,
                    result.bpm(),
                    confidence.overall,
                    result.candidates.len(),
                    result.metadata.processing_time_ms
                );
            }
            (Err(e), false) => {
                println!("[{}/{}] {}: ERROR: {}", idx + 1, outs.len(), o.path, e);
            }
        }
    }

    let ok_times: Vec<f32> = outs
        .iter()
        .filter_map(|o| o.outcome.as_ref().ok())
        .map(|r| r.metadata.processing_time_ms)
        .collect();
    let wall_ms = t0.elapsed().as_secs_f64() * 1000.0;

    eprintln!(
        "Done: ok={}/{} wall={:.0}ms",
        ok_times.len(),
        outs.len(),
        wall_ms
    );
    if !ok_times.is_empty() {
        let mean = ok_times.iter().sum::<f32>() / ok_times.len() as f32;
        let p50 = percentile(ok_times.clone(), 0.50).unwrap_or(mean);
        let p90 = percentile(ok_times.clone(), 0.90).unwrap_or(mean);
        let min = ok_times.iter().cloned().fold(f32::INFINITY, f32::min);
        let max = ok_times.iter().cloned().fold(0.0, f32::max);
        eprintln!(
            "processing_time_ms: mean={:.2} p50={:.2} p90={:.2} min={:.2} max={:.2}",
            mean, p50, p90, min, max
        );
    }

    Ok(())
}
