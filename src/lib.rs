// jamrecord: A real-time stereo jam recorder core in Rust
// Copyright (C) 2023, David Fisher
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// Modular organization of code
mod config;
mod constants;
mod error;
mod events;
mod export;
mod ports;
mod processor;
mod ring_buffer;

#[cfg(feature = "ffi")]
pub mod ffi;

// Only include test_utils in test builds
#[cfg(test)]
pub mod test_utils;

#[cfg(test)]
mod tests;

// Re-exports for public API
pub use config::RecorderConfig;
pub use constants::*;
pub use error::RecorderError;
pub use events::{EventReceiver, ProcessorEvent, log_event};
pub use export::{ExportSink, ExportSummary, MemorySink, SaveRequest, export_recording};
pub use ports::{AudioPorts, ControlPorts, PortIndex};
pub use processor::{ActiveProcessor, ProcessorState, RecordedAudio, StreamProcessor};
pub use ring_buffer::{RingBufferStore, capacity_for};
