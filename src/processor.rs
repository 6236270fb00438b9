//! The per-block stream processor and its lifecycle.
//!
//! The host lifecycle is encoded in types: [`StreamProcessor`] is a configured
//! (inactive) instance and [`ActiveProcessor`] is an activated one. Only an
//! `ActiveProcessor` can process audio, activation and deactivation consume
//! the previous state, and teardown is only reachable from the inactive state.
//!
//! ```text
//! setup() -> StreamProcessor --activate()--> ActiveProcessor
//!                  ^                               |
//!                  +---------deactivate()----------+
//! StreamProcessor --teardown()--> (dropped)
//! ```

use log::{debug, info, warn};

use crate::config::RecorderConfig;
use crate::constants::{CLIP_OFF, CLIP_ON};
use crate::error::RecorderError;
use crate::events::{EventReceiver, EventSender, ProcessorEvent, event_queue};
use crate::export::SaveRequest;
use crate::ports::{AudioPorts, ControlPorts};
use crate::ring_buffer::{RingBufferStore, capacity_for};

/// Bookkeeping that survives every lifecycle transition of one instance.
pub struct ProcessorState {
    sample_rate: f64,
    max_duration_secs: u64,
    record_duration_secs: u64,
    export_chunk_frames: usize,
    /// Record control as seen on the most recent block.
    recording: bool,
    /// Save control level on the most recent block, for edge detection.
    save_high: bool,
    /// Sticky until the next activation.
    clip: bool,
    overrun_frames: u64,
    /// Latest save edge not yet taken by the control context.
    pending_save: Option<SaveRequest>,
    events: EventSender,
}

impl ProcessorState {
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn max_duration_secs(&self) -> u64 {
        self.max_duration_secs
    }

    pub fn record_duration_secs(&self) -> u64 {
        self.record_duration_secs
    }

    pub fn export_chunk_frames(&self) -> usize {
        self.export_chunk_frames
    }

    /// Frames covered by the configured recording duration.
    pub fn record_window_frames(&self) -> usize {
        (self.sample_rate * self.record_duration_secs as f64).floor() as usize
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn clip(&self) -> bool {
        self.clip
    }

    /// Frames of unread audio lost to overruns since the last activation.
    pub fn overrun_frames(&self) -> u64 {
        self.overrun_frames
    }

    /// Events lost because the control context did not keep up.
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    /// The save request waiting to be handled, if any.
    pub fn pending_save(&self) -> Option<SaveRequest> {
        self.pending_save
    }

    /// Take the latest save request. Unlike the event queue, this never
    /// loses an edge; repeated edges collapse into the newest one.
    pub fn take_save_request(&mut self) -> Option<SaveRequest> {
        self.pending_save.take()
    }
}

/// A configured processor that is not running.
///
/// After a deactivation it still holds the recorded audio, which can be
/// inspected and drained until the next activation or teardown.
pub struct StreamProcessor {
    state: ProcessorState,
    store: Option<RingBufferStore>,
}

impl StreamProcessor {
    /// Configure an instance for `sample_rate`. No ring storage is reserved
    /// until [`StreamProcessor::activate`].
    pub fn setup(
        sample_rate: f64,
        config: &RecorderConfig,
    ) -> Result<(Self, EventReceiver), RecorderError> {
        config.validate()?;
        let max_duration_secs = config.get_max_duration_secs();
        // Fail at setup rather than activation if the rate cannot size a ring.
        let capacity = capacity_for(sample_rate, max_duration_secs)?;

        let (events, receiver) = event_queue(config.get_event_queue_capacity());

        info!(
            "Recorder configured: {} Hz, up to {} seconds ({} frames per channel)",
            sample_rate, max_duration_secs, capacity
        );

        let processor = StreamProcessor {
            state: ProcessorState {
                sample_rate,
                max_duration_secs,
                record_duration_secs: config.get_record_duration_secs(),
                export_chunk_frames: config.get_export_chunk_frames(),
                recording: false,
                save_high: false,
                clip: false,
                overrun_frames: 0,
                pending_save: None,
                events,
            },
            store: None,
        };

        Ok((processor, receiver))
    }

    /// Reserve (or reuse) the ring, rewind it and start a fresh session.
    ///
    /// Allocation failure is fatal: the instance is consumed and the host
    /// must not process with it.
    pub fn activate(self) -> Result<ActiveProcessor, RecorderError> {
        let StreamProcessor { mut state, store } = self;
        let capacity = capacity_for(state.sample_rate, state.max_duration_secs)?;

        let mut store = match store {
            Some(existing) if existing.capacity() == capacity => {
                debug!("Reusing ring storage of {} frames", capacity);
                existing
            }
            _ => {
                debug!(
                    "Allocating ring storage: {} frames x 2 channels ({} bytes)",
                    capacity,
                    capacity.saturating_mul(2 * std::mem::size_of::<f32>())
                );
                RingBufferStore::new(capacity)?
            }
        };
        store.reset();

        state.recording = false;
        state.save_high = false;
        state.clip = false;
        state.overrun_frames = 0;
        state.pending_save = None;

        info!("Recorder activated");
        Ok(ActiveProcessor { state, store })
    }

    /// Release the instance and its storage.
    pub fn teardown(self) {
        if let Some(store) = &self.store
            && !store.is_empty()
        {
            warn!(
                "Tearing down with {} unsaved frames in the ring",
                store.unread()
            );
        }
        info!("Recorder torn down");
    }

    pub fn state(&self) -> &ProcessorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    /// Recorded audio from the last activation, if there was one.
    pub fn store(&self) -> Option<&RingBufferStore> {
        self.store.as_ref()
    }
}

/// An activated processor. The only type that can run audio blocks.
pub struct ActiveProcessor {
    state: ProcessorState,
    store: RingBufferStore,
}

impl ActiveProcessor {
    /// Run one block: copy inputs to outputs and, while the record control
    /// is active, capture every frame into the ring.
    ///
    /// Processes `min(n_frames, audio.frames())` frames. Real-time safe: no
    /// allocation, locking, logging or I/O.
    pub fn process_block(
        &mut self,
        n_frames: usize,
        audio: &mut AudioPorts<'_>,
        controls: &mut ControlPorts,
    ) {
        let n = n_frames.min(audio.frames());
        let recording = self.begin_block(controls);

        let input_l = &audio.input_l[..n];
        let input_r = &audio.input_r[..n];
        audio.output_l[..n].copy_from_slice(input_l);
        audio.output_r[..n].copy_from_slice(input_r);

        if recording {
            for (&left, &right) in input_l.iter().zip(input_r) {
                self.record_frame(left, right);
            }
        }

        self.end_block(controls);
    }

    /// Like [`ActiveProcessor::process_block`] for hosts that bind each
    /// output to the same buffer as its input. The audio is left untouched.
    pub fn process_block_in_place(
        &mut self,
        n_frames: usize,
        left: &mut [f32],
        right: &mut [f32],
        controls: &mut ControlPorts,
    ) {
        let n = n_frames.min(left.len()).min(right.len());
        let recording = self.begin_block(controls);

        if recording {
            for (&l, &r) in left[..n].iter().zip(&right[..n]) {
                self.record_frame(l, r);
            }
        }

        self.end_block(controls);
    }

    /// Latch the record control, reporting transitions.
    #[inline]
    fn begin_block(&mut self, controls: &ControlPorts) -> bool {
        let recording = controls.is_recording();
        if recording != self.state.recording {
            self.state.events.post(if recording {
                ProcessorEvent::RecordingStarted
            } else {
                ProcessorEvent::RecordingStopped
            });
            self.state.recording = recording;
        }
        recording
    }

    #[inline]
    fn record_frame(&mut self, left: f32, right: f32) {
        if self.store.push(left, right) {
            self.state.overrun_frames += 1;
            if !self.state.clip {
                self.state.clip = true;
                self.state.events.post(ProcessorEvent::Overrun);
            }
        }
    }

    /// Detect a save edge and publish the clip output.
    #[inline]
    fn end_block(&mut self, controls: &mut ControlPorts) {
        let save_high = controls.save != 0;
        if save_high && !self.state.save_high {
            self.state.pending_save = Some(SaveRequest {
                format: controls.format,
            });
            self.state.events.post(ProcessorEvent::SaveRequested {
                format: controls.format,
                frames: self.store.unread(),
            });
        }
        self.state.save_high = save_high;

        controls.clip = if self.state.clip { CLIP_ON } else { CLIP_OFF };
    }

    /// Stop processing. Recorded audio stays available on the returned
    /// instance.
    pub fn deactivate(self) -> StreamProcessor {
        let ActiveProcessor { state, store } = self;
        info!(
            "Recorder deactivated with {} frames buffered ({} overrun)",
            store.unread(),
            state.overrun_frames
        );
        StreamProcessor {
            state,
            store: Some(store),
        }
    }

    pub fn state(&self) -> &ProcessorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ProcessorState {
        &mut self.state
    }

    pub fn store(&self) -> &RingBufferStore {
        &self.store
    }

    pub fn clip(&self) -> bool {
        self.state.clip
    }

    pub fn is_recording(&self) -> bool {
        self.state.recording
    }
}

/// Consumer-side access to captured audio.
///
/// Reading races with `push`, so it is refused while the record control is
/// active; pause recording (or deactivate) first.
pub trait RecordedAudio {
    /// The ring, if it may be read right now.
    fn recorded_mut(&mut self) -> Result<&mut RingBufferStore, RecorderError>;

    fn processor_state(&self) -> &ProcessorState;

    /// Read up to `max_frames` of the oldest unread frames.
    fn drain(&mut self, max_frames: usize) -> Result<(Vec<f32>, Vec<f32>), RecorderError> {
        Ok(self.recorded_mut()?.drain(max_frames))
    }

    /// Copy unread frames into caller-provided buffers.
    fn read_into(&mut self, left: &mut [f32], right: &mut [f32]) -> Result<usize, RecorderError> {
        Ok(self.recorded_mut()?.read_into(left, right))
    }
}

impl RecordedAudio for ActiveProcessor {
    fn recorded_mut(&mut self) -> Result<&mut RingBufferStore, RecorderError> {
        if self.state.recording {
            return Err(RecorderError::RecordingActive);
        }
        Ok(&mut self.store)
    }

    fn processor_state(&self) -> &ProcessorState {
        &self.state
    }
}

impl RecordedAudio for StreamProcessor {
    fn recorded_mut(&mut self) -> Result<&mut RingBufferStore, RecorderError> {
        self.store
            .as_mut()
            .ok_or_else(|| RecorderError::Lifecycle("recorder was never activated".to_string()))
    }

    fn processor_state(&self) -> &ProcessorState {
        &self.state
    }
}
