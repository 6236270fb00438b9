//! Standalone benchmark binary for profiling the per-block hot path.
//!
//! Usage:
//!   cargo build --release --bin bench-process
//!   samply record target/release/bench-process [OPTIONS]
//!
//! Options:
//!   --seconds N      Duration of simulated audio (default: 120)
//!   --sample-rate N  Sample rate in Hz (default: 48000)
//!   --block N        Frames per block (default: 256)
//!   --max-secs N     Ring duration in seconds (default: 60)

// Benchmark binary: suppress pedantic lints that don't matter here.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::too_many_lines)]

use std::time::{Duration, Instant};

use jamrecord::{AudioPorts, ControlPorts, RecorderConfig, StreamProcessor};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut seconds: usize = 120;
    let mut sample_rate: u32 = 48000;
    let mut block: usize = 256;
    let mut max_secs: u64 = 60;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seconds" => {
                seconds = args[i + 1].parse().expect("invalid --seconds");
                i += 2;
            }
            "--sample-rate" => {
                sample_rate = args[i + 1].parse().expect("invalid --sample-rate");
                i += 2;
            }
            "--block" => {
                block = args[i + 1].parse().expect("invalid --block");
                i += 2;
            }
            "--max-secs" => {
                max_secs = args[i + 1].parse().expect("invalid --max-secs");
                i += 2;
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: bench-process [--seconds N] [--sample-rate N] [--block N] [--max-secs N]"
                );
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            }
        }
    }

    let config = RecorderConfig {
        max_duration_secs: Some(max_secs),
        record_duration_secs: Some(max_secs),
        ..RecorderConfig::default()
    };
    let (processor, _events) =
        StreamProcessor::setup(f64::from(sample_rate), &config).expect("setup failed");
    let mut processor = processor.activate().expect("activation failed");

    let total_frames = sample_rate as usize * seconds;
    let total_blocks = total_frames.div_ceil(block);
    let deadline = Duration::from_secs_f64(block as f64 / f64::from(sample_rate));

    eprintln!(
        "Benchmark: {} seconds at {} Hz, {}-frame blocks ({} blocks), ring of {} s",
        seconds, sample_rate, block, total_blocks, max_secs
    );
    eprintln!("Block deadline: {:.1} us", deadline.as_secs_f64() * 1e6);
    eprintln!();

    let mut input_l = vec![0.0_f32; block];
    let mut input_r = vec![0.0_f32; block];
    for (i, (l, r)) in input_l.iter_mut().zip(input_r.iter_mut()).enumerate() {
        *l = ((i as f32) * 0.01).sin() * 0.5;
        *r = ((i as f32) * 0.013).cos() * 0.5;
    }
    let mut output_l = vec![0.0_f32; block];
    let mut output_r = vec![0.0_f32; block];

    let mut controls = ControlPorts::recording();
    let mut worst = Duration::ZERO;
    let mut late_blocks = 0_u64;

    let start = Instant::now();
    for _ in 0..total_blocks {
        let mut audio = AudioPorts {
            input_l: &input_l,
            input_r: &input_r,
            output_l: &mut output_l,
            output_r: &mut output_r,
        };

        let block_start = Instant::now();
        processor.process_block(block, &mut audio, &mut controls);
        let took = block_start.elapsed();

        worst = worst.max(took);
        if took > deadline {
            late_blocks += 1;
        }
    }
    let elapsed = start.elapsed();

    let frames = total_blocks * block;
    let realtime_multiple = (frames as f64 / f64::from(sample_rate)) / elapsed.as_secs_f64();
    let average = elapsed / u32::try_from(total_blocks.max(1)).unwrap_or(u32::MAX);

    eprintln!("  Elapsed:     {:.1} ms", elapsed.as_secs_f64() * 1000.0);
    eprintln!("  Avg block:   {:.2} us", average.as_secs_f64() * 1e6);
    eprintln!("  Worst block: {:.2} us", worst.as_secs_f64() * 1e6);
    eprintln!("  Late blocks: {late_blocks}");
    eprintln!("  Real-time:   {realtime_multiple:.1}x (need >1.0x)");
    eprintln!(
        "  Overruns:    {} frames (clip {})",
        processor.state().overrun_frames(),
        controls.clip
    );
    eprintln!();
}
