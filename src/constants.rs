/// Value of the `record` control that enables capture.
pub const RECORD_ACTIVE: i32 = 1;

pub const CLIP_ON: i32 = 1;
pub const CLIP_OFF: i32 = 0;

// Defaults for RecorderConfig
pub const DEFAULT_MAX_DURATION_SECS: u64 = 60;
pub const DEFAULT_RECORD_DURATION_SECS: u64 = 50;
pub const DEFAULT_DEBUG: bool = false;
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_EXPORT_CHUNK_FRAMES: usize = 4096;

// Simulated host defaults used by the binaries
pub const DEFAULT_SAMPLE_RATE: f64 = 48_000.0;
pub const DEFAULT_BLOCK_FRAMES: usize = 256;
pub const DEFAULT_SESSION_SECS: u64 = 10;

// Environment variable names
pub const ENV_CONFIG: &str = "JAMRECORD_CONFIG";
pub const ENV_MAX_DURATION: &str = "MAX_RECORDING_DURATION";
pub const ENV_RECORD_DURATION: &str = "RECORD_DURATION";
pub const ENV_DEBUG: &str = "DEBUG";
pub const ENV_EVENT_QUEUE: &str = "EVENT_QUEUE_CAPACITY";
pub const ENV_EXPORT_CHUNK: &str = "EXPORT_CHUNK_FRAMES";
