//! Events posted from the audio thread to the control context.
//!
//! The audio thread cannot log or block, so state changes it notices are
//! pushed into a fixed-size `rtrb` queue. The control context pops and
//! reports them.

use log::{info, warn};

/// Something the processor noticed while running a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessorEvent {
    /// The record control switched to active.
    RecordingStarted,
    /// The record control switched away from active.
    RecordingStopped,
    /// The save control had a rising edge. `frames` is the unread frame
    /// count at the end of that block.
    SaveRequested { format: i32, frames: usize },
    /// First overwrite of unread audio since the last reset.
    Overrun,
}

/// Producer half, owned by the processor.
pub struct EventSender {
    producer: rtrb::Producer<ProcessorEvent>,
    dropped: u64,
}

/// Consumer half, owned by whoever drives the control context.
pub struct EventReceiver {
    consumer: rtrb::Consumer<ProcessorEvent>,
}

/// Create a queue holding up to `capacity` undelivered events.
pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (producer, consumer) = rtrb::RingBuffer::new(capacity);
    (
        EventSender {
            producer,
            dropped: 0,
        },
        EventReceiver { consumer },
    )
}

impl EventSender {
    /// Post an event without blocking. A full queue drops it.
    #[inline]
    pub fn post(&mut self, event: ProcessorEvent) {
        if self.producer.push(event).is_err() {
            self.dropped += 1;
        }
    }

    /// Number of events lost to a full queue.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl EventReceiver {
    /// Pop the oldest pending event, if any.
    pub fn try_recv(&mut self) -> Option<ProcessorEvent> {
        self.consumer.pop().ok()
    }

    /// Pop every pending event.
    pub fn drain(&mut self) -> Vec<ProcessorEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    pub fn pending(&self) -> usize {
        self.consumer.slots()
    }

    /// True once the processor that owned the sender is gone.
    pub fn is_abandoned(&self) -> bool {
        self.consumer.is_abandoned()
    }
}

/// Write an event to the log at a level matching its severity.
pub fn log_event(event: &ProcessorEvent) {
    match event {
        ProcessorEvent::RecordingStarted => info!("Recording started"),
        ProcessorEvent::RecordingStopped => info!("Recording stopped"),
        ProcessorEvent::SaveRequested { format, frames } => {
            info!("Save requested: format {}, {} frames buffered", format, frames);
        }
        ProcessorEvent::Overrun => {
            warn!("Ring buffer overrun: oldest unsaved audio is being overwritten");
        }
    }
}
