mod processor_tests;

use crate::events::EventReceiver;
use crate::processor::{ActiveProcessor, StreamProcessor};
use crate::test_utils::config_with_duration;

/// Set up and activate a processor whose ring holds
/// `sample_rate * max_duration_secs` frames.
pub fn active_processor(sample_rate: f64, max_duration_secs: u64) -> (ActiveProcessor, EventReceiver) {
    let (processor, events) =
        StreamProcessor::setup(sample_rate, &config_with_duration(max_duration_secs)).unwrap();
    (processor.activate().unwrap(), events)
}

/// Env var overrides that isolate config tests from the caller's shell.
pub fn default_test_env() -> Vec<(&'static str, Option<&'static str>)> {
    vec![
        ("JAMRECORD_CONFIG", None),
        ("JAMRECORD_MAX_DURATION", None),
        ("JAMRECORD_RECORD_DURATION", None),
        ("JAMRECORD_DEBUG", None),
        ("JAMRECORD_EVENT_QUEUE", None),
        ("JAMRECORD_EXPORT_CHUNK", None),
        ("MAX_RECORDING_DURATION", None),
        ("RECORD_DURATION", None),
        ("DEBUG", None),
        ("EVENT_QUEUE_CAPACITY", None),
        ("EXPORT_CHUNK_FRAMES", None),
    ]
}
