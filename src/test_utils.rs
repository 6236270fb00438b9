use crate::config::RecorderConfig;
use crate::error::RecorderError;
use crate::export::{ExportSink, SaveRequest};
use crate::ports::{AudioPorts, ControlPorts};
use crate::processor::ActiveProcessor;

/// Config for a ring of `sample_rate * max_duration_secs` frames whose save
/// window covers the whole ring.
pub fn config_with_duration(max_duration_secs: u64) -> RecorderConfig {
    RecorderConfig {
        max_duration_secs: Some(max_duration_secs),
        record_duration_secs: Some(max_duration_secs),
        ..RecorderConfig::default()
    }
}

/// Generate a left/right pair of sine waves at different frequencies.
pub fn generate_stereo_sine(frames: usize, sample_rate: f32) -> (Vec<f32>, Vec<f32>) {
    let left = (0..frames)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate).sin() * 0.5)
        .collect();
    let right = (0..frames)
        .map(|i| (2.0 * std::f32::consts::PI * 550.0 * i as f32 / sample_rate).sin() * 0.5)
        .collect();
    (left, right)
}

/// Left channel counts up from `start`; right is its negation.
pub fn generate_ramp(start: f32, frames: usize) -> (Vec<f32>, Vec<f32>) {
    let left: Vec<f32> = (0..frames).map(|i| start + i as f32).collect();
    let right = left.iter().map(|s| -s).collect();
    (left, right)
}

/// Run one block through `processor`, returning the outputs.
pub fn run_block(
    processor: &mut ActiveProcessor,
    left: &[f32],
    right: &[f32],
    controls: &mut ControlPorts,
) -> (Vec<f32>, Vec<f32>) {
    let mut out_l = vec![0.0; left.len()];
    let mut out_r = vec![0.0; right.len()];
    let mut audio = AudioPorts {
        input_l: left,
        input_r: right,
        output_l: &mut out_l,
        output_r: &mut out_r,
    };
    processor.process_block(left.len(), &mut audio, controls);
    (out_l, out_r)
}

/// Sink that records every call, and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub begun: Option<(SaveRequest, usize)>,
    pub chunks: Vec<(Vec<f32>, Vec<f32>)>,
    pub finished: bool,
    pub fail_after_chunks: Option<usize>,
}

impl ExportSink for RecordingSink {
    fn begin(
        &mut self,
        request: &SaveRequest,
        _sample_rate: f64,
        frames: usize,
    ) -> Result<(), RecorderError> {
        self.begun = Some((*request, frames));
        Ok(())
    }

    fn write_frames(&mut self, left: &[f32], right: &[f32]) -> Result<(), RecorderError> {
        if self
            .fail_after_chunks
            .is_some_and(|limit| self.chunks.len() >= limit)
        {
            return Err(RecorderError::Export("simulated sink failure".to_string()));
        }
        self.chunks.push((left.to_vec(), right.to_vec()));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RecorderError> {
        self.finished = true;
        Ok(())
    }
}

impl RecordingSink {
    pub fn left(&self) -> Vec<f32> {
        self.chunks.iter().flat_map(|(l, _)| l.clone()).collect()
    }

    pub fn right(&self) -> Vec<f32> {
        self.chunks.iter().flat_map(|(_, r)| r.clone()).collect()
    }
}
