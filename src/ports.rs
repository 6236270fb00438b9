//! Port layout shared with the host.

use crate::constants::{CLIP_OFF, RECORD_ACTIVE};
use crate::error::RecorderError;

/// Host-facing port indices.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortIndex {
    Format = 0,
    Record = 1,
    Save = 2,
    Clip = 3,
    InputL = 4,
    OutputL = 5,
    InputR = 6,
    OutputR = 7,
}

impl TryFrom<u32> for PortIndex {
    type Error = RecorderError;

    fn try_from(index: u32) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(PortIndex::Format),
            1 => Ok(PortIndex::Record),
            2 => Ok(PortIndex::Save),
            3 => Ok(PortIndex::Clip),
            4 => Ok(PortIndex::InputL),
            5 => Ok(PortIndex::OutputL),
            6 => Ok(PortIndex::InputR),
            7 => Ok(PortIndex::OutputR),
            other => Err(RecorderError::Config(format!(
                "Unknown port index: {}",
                other
            ))),
        }
    }
}

/// Integer control ports for one processing cycle.
///
/// `format`, `record` and `save` are read by the processor; `clip` is
/// written back after every block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlPorts {
    pub format: i32,
    pub record: i32,
    pub save: i32,
    pub clip: i32,
}

impl ControlPorts {
    /// Controls with recording enabled and no save request.
    pub fn recording() -> Self {
        ControlPorts {
            record: RECORD_ACTIVE,
            clip: CLIP_OFF,
            ..Self::default()
        }
    }

    /// Controls with recording disabled and no save request.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.record == RECORD_ACTIVE
    }
}

/// Stereo sample buffers bound for one processing cycle.
pub struct AudioPorts<'a> {
    pub input_l: &'a [f32],
    pub input_r: &'a [f32],
    pub output_l: &'a mut [f32],
    pub output_r: &'a mut [f32],
}

impl AudioPorts<'_> {
    /// Number of frames every bound buffer can hold.
    pub fn frames(&self) -> usize {
        self.input_l
            .len()
            .min(self.input_r.len())
            .min(self.output_l.len())
            .min(self.output_r.len())
    }
}
