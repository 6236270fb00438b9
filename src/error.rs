/// Custom error type for the jamrecord recorder core.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Ring buffer allocation failed for {frames} frames per channel")]
    Allocation { frames: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Recording is active; pause recording before draining")]
    RecordingActive,

    #[error("Export error: {0}")]
    Export(String),

    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
