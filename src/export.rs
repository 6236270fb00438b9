//! Hand-off of recorded audio to a persistence collaborator.
//!
//! The recorder does not encode or store audio itself. A save drains unread
//! frames, as raw float pairs, into an [`ExportSink`] chosen by the caller;
//! the `format` control value travels with the request so the sink can pick
//! an encoding.

use log::{debug, info};

use crate::error::RecorderError;
use crate::events::ProcessorEvent;
use crate::processor::RecordedAudio;

/// A request to persist the buffered audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveRequest {
    /// Value of the `format` control when the save was triggered.
    pub format: i32,
}

impl SaveRequest {
    /// Extract a save request from a processor event.
    pub fn from_event(event: &ProcessorEvent) -> Option<Self> {
        match event {
            ProcessorEvent::SaveRequested { format, .. } => Some(SaveRequest { format: *format }),
            _ => None,
        }
    }
}

/// Destination for exported audio.
pub trait ExportSink {
    /// Called once before any frames, with the number of frames to follow.
    fn begin(
        &mut self,
        request: &SaveRequest,
        sample_rate: f64,
        frames: usize,
    ) -> Result<(), RecorderError>;

    /// Receive a run of stereo frames. `left` and `right` have equal length.
    fn write_frames(&mut self, left: &[f32], right: &[f32]) -> Result<(), RecorderError>;

    /// Called once after the last frame.
    fn finish(&mut self) -> Result<(), RecorderError>;
}

/// Outcome of [`export_recording`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub frames_written: usize,
    /// Unread frames older than the recording duration, dropped unsaved.
    pub frames_discarded: usize,
}

/// Drain the newest `record_duration_secs` of unread audio into `sink`.
///
/// Fails with [`RecorderError::RecordingActive`] while the record control is
/// still active. If the sink fails part way, frames already handed to it are
/// consumed.
pub fn export_recording<R, S>(
    source: &mut R,
    request: &SaveRequest,
    sink: &mut S,
) -> Result<ExportSummary, RecorderError>
where
    R: RecordedAudio + ?Sized,
    S: ExportSink + ?Sized,
{
    let state = source.processor_state();
    let sample_rate = state.sample_rate();
    let window = state.record_window_frames();
    let chunk_frames = state.export_chunk_frames();

    let store = source.recorded_mut()?;
    let frames_discarded = store.unread().saturating_sub(window);
    let frames = store.unread() - frames_discarded;

    sink.begin(request, sample_rate, frames)?;
    store.skip(frames_discarded);

    let mut frames_written = 0;
    while !store.is_empty() {
        let n = store.drain_chunks(chunk_frames, |left, right| sink.write_frames(left, right))?;
        debug!("Exported chunk of {} frames", n);
        frames_written += n;
    }
    sink.finish()?;

    info!(
        "Exported {} frames (format {}), discarded {} older frames",
        frames_written, request.format, frames_discarded
    );

    Ok(ExportSummary {
        frames_written,
        frames_discarded,
    })
}

/// Sink that keeps exported frames in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub format: Option<i32>,
    pub sample_rate: f64,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    /// Largest absolute sample across both channels.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(&self.right)
            .fold(0.0_f32, |peak, s| peak.max(s.abs()))
    }
}

impl ExportSink for MemorySink {
    fn begin(
        &mut self,
        request: &SaveRequest,
        sample_rate: f64,
        frames: usize,
    ) -> Result<(), RecorderError> {
        self.format = Some(request.format);
        self.sample_rate = sample_rate;
        self.finished = false;
        self.left.clear();
        self.right.clear();
        self.left.reserve(frames);
        self.right.reserve(frames);
        Ok(())
    }

    fn write_frames(&mut self, left: &[f32], right: &[f32]) -> Result<(), RecorderError> {
        self.left.extend_from_slice(left);
        self.right.extend_from_slice(right);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RecorderError> {
        self.finished = true;
        Ok(())
    }
}
