#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

//! Simulated host: feeds a synthetic stereo signal through the recorder in
//! real-time sized blocks, then stops, saves into memory and tears down.
//!
//! Options:
//!   --seconds N      Length of the simulated session (default: 10)
//!   --init-config    Write a sample jamrecord.toml and exit

use std::env;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use jamrecord::{
    AudioPorts, ControlPorts, DEFAULT_BLOCK_FRAMES, DEFAULT_SAMPLE_RATE, DEFAULT_SESSION_SECS,
    EventReceiver, MemorySink, RecorderConfig, SaveRequest, StreamProcessor, export_recording,
    log_event,
};

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut seconds = DEFAULT_SESSION_SECS;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seconds" => {
                let Some(value) = args.get(i + 1).and_then(|s| s.parse().ok()) else {
                    eprintln!("--seconds needs a whole number of seconds");
                    process::exit(1);
                };
                seconds = value;
                i += 2;
            }
            "--init-config" => {
                let config_path = Path::new("jamrecord.toml");
                if config_path.exists() {
                    eprintln!("{} already exists, leaving it alone", config_path.display());
                    process::exit(1);
                }
                if let Err(e) = RecorderConfig::default().create_config_file("jamrecord.toml") {
                    eprintln!("Failed to create configuration file: {e}");
                    process::exit(1);
                }
                println!("Wrote default configuration to jamrecord.toml");
                return;
            }
            "--help" | "-h" => {
                eprintln!("Usage: jamrecord [--seconds N] [--init-config]");
                return;
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
    }

    // Load configuration once at startup
    let config = RecorderConfig::load();
    let default_filter = if config.get_debug() { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    // Set up signal handling for clean shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Could not install Ctrl-C handler: {e}");
    }

    let (processor, mut events) = match StreamProcessor::setup(DEFAULT_SAMPLE_RATE, &config) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Failed to set up recorder: {e}");
            process::exit(1);
        }
    };
    let mut processor = match processor.activate() {
        Ok(active) => active,
        Err(e) => {
            error!("Failed to activate recorder: {e}");
            process::exit(1);
        }
    };

    let block = DEFAULT_BLOCK_FRAMES;
    let block_duration = Duration::from_secs_f64(block as f64 / DEFAULT_SAMPLE_RATE);
    let total_blocks = (seconds as f64 * DEFAULT_SAMPLE_RATE / block as f64).ceil() as u64;

    let mut input_l = vec![0.0_f32; block];
    let mut input_r = vec![0.0_f32; block];
    let mut output_l = vec![0.0_f32; block];
    let mut output_r = vec![0.0_f32; block];
    let mut phase = 0.0_f64;
    let step_l = 2.0 * std::f64::consts::PI * 220.0 / DEFAULT_SAMPLE_RATE;
    let step_r = 2.0 * std::f64::consts::PI * 330.0 / DEFAULT_SAMPLE_RATE;

    info!("Recording a {seconds} second session. Press Ctrl+C to stop early");

    let mut controls = ControlPorts::recording();
    let start = Instant::now();
    let mut blocks_run = 0_u64;
    while running.load(Ordering::SeqCst) && blocks_run < total_blocks {
        for (frame, (l, r)) in input_l.iter_mut().zip(input_r.iter_mut()).enumerate() {
            let t = phase + frame as f64;
            *l = ((step_l * t).sin() * 0.5) as f32;
            *r = ((step_r * t).sin() * 0.5) as f32;
        }
        phase += block as f64;

        let mut audio = AudioPorts {
            input_l: &input_l,
            input_r: &input_r,
            output_l: &mut output_l,
            output_r: &mut output_r,
        };
        processor.process_block(block, &mut audio, &mut controls);
        blocks_run += 1;

        drain_events(&mut events);

        // Pace the loop like a sound card would
        let due = block_duration * u32::try_from(blocks_run).unwrap_or(u32::MAX);
        if let Some(wait) = due.checked_sub(start.elapsed()) {
            thread::sleep(wait);
        }
    }

    // One block to release record and raise save
    let mut stop_and_save = ControlPorts {
        save: 1,
        ..ControlPorts::idle()
    };
    let mut audio = AudioPorts {
        input_l: &input_l,
        input_r: &input_r,
        output_l: &mut output_l,
        output_r: &mut output_r,
    };
    processor.process_block(0, &mut audio, &mut stop_and_save);

    drain_events(&mut events);
    let request = processor
        .state_mut()
        .take_save_request()
        .unwrap_or(SaveRequest { format: 0 });
    let mut sink = MemorySink::new();
    match export_recording(&mut processor, &request, &mut sink) {
        Ok(summary) => info!(
            "Saved {} frames ({:.2} s), peak {:.3}, {} older frames discarded",
            summary.frames_written,
            summary.frames_written as f64 / DEFAULT_SAMPLE_RATE,
            sink.peak(),
            summary.frames_discarded
        ),
        Err(e) => error!("Save failed: {e}"),
    }

    let overruns = processor.state().overrun_frames();
    if overruns > 0 {
        warn!("{overruns} frames were overwritten before they could be saved");
    }

    processor.deactivate().teardown();
    drain_events(&mut events);
    info!("Session finished");
}

/// Log everything the audio path reported.
fn drain_events(events: &mut EventReceiver) {
    while let Some(event) = events.try_recv() {
        log_event(&event);
    }
}
