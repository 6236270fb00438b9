use log::{error, info};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{
    DEFAULT_DEBUG, DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_EXPORT_CHUNK_FRAMES,
    DEFAULT_MAX_DURATION_SECS, DEFAULT_RECORD_DURATION_SECS, ENV_CONFIG, ENV_DEBUG,
    ENV_EVENT_QUEUE, ENV_EXPORT_CHUNK, ENV_MAX_DURATION, ENV_RECORD_DURATION,
};
use crate::error::RecorderError;

/// Settings for a recorder instance.
///
/// Values are resolved with environment variables having the highest
/// precedence, followed by the config file, and then defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Upper bound on buffered audio, in seconds; sizes the ring
    pub max_duration_secs: Option<u64>,
    /// How much of the newest unread audio a save hands off, in seconds
    pub record_duration_secs: Option<u64>,
    /// Enable debug logging
    pub debug: Option<bool>,
    /// Slots in the real-time event queue
    pub event_queue_capacity: Option<usize>,
    /// Frames handed to an export sink per write
    pub export_chunk_frames: Option<usize>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        RecorderConfig {
            max_duration_secs: Some(DEFAULT_MAX_DURATION_SECS),
            record_duration_secs: Some(DEFAULT_RECORD_DURATION_SECS),
            debug: Some(DEFAULT_DEBUG),
            event_queue_capacity: Some(DEFAULT_EVENT_QUEUE_CAPACITY),
            export_chunk_frames: Some(DEFAULT_EXPORT_CHUNK_FRAMES),
        }
    }
}

impl RecorderConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        RecorderConfig::default()
    }

    /// Find the configuration file path
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(config_path) = env::var(ENV_CONFIG) {
            let path = Path::new(&config_path);
            if path.exists() {
                return Some(path.to_path_buf());
            }
        }

        let current_dir = Path::new("jamrecord.toml");
        if current_dir.exists() {
            return Some(current_dir.to_path_buf());
        }

        if let Ok(home) = env::var("HOME") {
            let home_config = Path::new(&home).join(".config/jamrecord/config.toml");
            if home_config.exists() {
                return Some(home_config);
            }
        }

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            let xdg_config_path = Path::new(&xdg_config).join("jamrecord/config.toml");
            if xdg_config_path.exists() {
                return Some(xdg_config_path);
            }
        }

        let system_config = Path::new("/etc/jamrecord/config.toml");
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration from file, if available, then apply the environment
    pub fn load() -> Self {
        let mut config = RecorderConfig::default();

        if let Some(config_path) = Self::find_config_file() {
            match fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str::<RecorderConfig>(&content) {
                    Ok(file_config) => {
                        info!("Loaded configuration from {}", config_path.display());
                        config.merge(file_config);
                    }
                    Err(e) => {
                        error!("Error parsing config file: {}", e);
                    }
                },
                Err(e) => {
                    error!("Error reading config file: {}", e);
                }
            }
        }

        config.apply_env_vars();

        config
    }

    /// Merge another configuration into this one, only taking values that are Some
    pub fn merge(&mut self, other: RecorderConfig) {
        if other.max_duration_secs.is_some() {
            self.max_duration_secs = other.max_duration_secs;
        }
        if other.record_duration_secs.is_some() {
            self.record_duration_secs = other.record_duration_secs;
        }
        if other.debug.is_some() {
            self.debug = other.debug;
        }
        if other.event_queue_capacity.is_some() {
            self.event_queue_capacity = other.event_queue_capacity;
        }
        if other.export_chunk_frames.is_some() {
            self.export_chunk_frames = other.export_chunk_frames;
        }
    }

    /// Parse a boolean value from a string
    fn parse_bool(val: &str) -> Option<bool> {
        match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        }
    }

    /// Read `JAMRECORD_<name>` first, then the unprefixed fallback.
    fn env_value<T: FromStr>(prefixed: &str, plain: &str) -> Option<T> {
        env::var(prefixed)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .or_else(|| env::var(plain).ok().and_then(|s| s.trim().parse().ok()))
    }

    /// Apply environment variables to override configuration
    fn apply_env_vars(&mut self) {
        if let Some(val) = Self::env_value("JAMRECORD_MAX_DURATION", ENV_MAX_DURATION) {
            self.max_duration_secs = Some(val);
        }

        if let Some(val) = Self::env_value("JAMRECORD_RECORD_DURATION", ENV_RECORD_DURATION) {
            self.record_duration_secs = Some(val);
        }

        let debug = env::var("JAMRECORD_DEBUG")
            .ok()
            .and_then(|s| Self::parse_bool(&s))
            .or_else(|| env::var(ENV_DEBUG).ok().and_then(|s| Self::parse_bool(&s)));
        if let Some(val) = debug {
            self.debug = Some(val);
        }

        if let Some(val) = Self::env_value("JAMRECORD_EVENT_QUEUE", ENV_EVENT_QUEUE) {
            self.event_queue_capacity = Some(val);
        }

        if let Some(val) = Self::env_value("JAMRECORD_EXPORT_CHUNK", ENV_EXPORT_CHUNK) {
            self.export_chunk_frames = Some(val);
        }
    }

    /// Reject values the recorder cannot run with.
    pub fn validate(&self) -> Result<(), RecorderError> {
        if self.get_max_duration_secs() == 0 {
            return Err(RecorderError::Config(
                "max_duration_secs must be greater than zero".to_string(),
            ));
        }
        if self.get_record_duration_secs() == 0 {
            return Err(RecorderError::Config(
                "record_duration_secs must be greater than zero".to_string(),
            ));
        }
        if self.get_event_queue_capacity() == 0 {
            return Err(RecorderError::Config(
                "event_queue_capacity must be greater than zero".to_string(),
            ));
        }
        if self.get_export_chunk_frames() == 0 {
            return Err(RecorderError::Config(
                "export_chunk_frames must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample_config() -> String {
        let default_config = RecorderConfig::default();

        format!(
            r#"# jamrecord configuration
# Values set here can be overridden by environment variables.

# Maximum buffered recording, in seconds. The ring holds
# sample_rate * max_duration_secs frames per channel.
# Default: {}
max_duration_secs = {}

# Seconds of the newest unread audio handed off on save
# (clamped to max_duration_secs)
# Default: {}
record_duration_secs = {}

# Enable debug logging (true/false)
# Default: {}
debug = {}

# Slots in the lock-free queue carrying events out of the audio thread
# Default: {}
event_queue_capacity = {}

# Frames passed to the export sink per write
# Default: {}
export_chunk_frames = {}
"#,
            DEFAULT_MAX_DURATION_SECS,
            default_config.get_max_duration_secs(),
            DEFAULT_RECORD_DURATION_SECS,
            default_config.get_record_duration_secs(),
            DEFAULT_DEBUG,
            default_config.get_debug(),
            DEFAULT_EVENT_QUEUE_CAPACITY,
            default_config.get_event_queue_capacity(),
            DEFAULT_EXPORT_CHUNK_FRAMES,
            default_config.get_export_chunk_frames(),
        )
    }

    /// Create a configuration file in the specified location
    pub fn create_config_file(&self, path: &str) -> Result<(), RecorderError> {
        let config_content = Self::generate_sample_config();

        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, config_content)?;

        Ok(())
    }

    pub fn get_max_duration_secs(&self) -> u64 {
        self.max_duration_secs.unwrap_or(DEFAULT_MAX_DURATION_SECS)
    }

    /// Configured recording duration, never longer than the ring itself.
    pub fn get_record_duration_secs(&self) -> u64 {
        self.record_duration_secs
            .unwrap_or(DEFAULT_RECORD_DURATION_SECS)
            .min(self.get_max_duration_secs())
    }

    pub fn get_debug(&self) -> bool {
        self.debug.unwrap_or(DEFAULT_DEBUG)
    }

    pub fn get_event_queue_capacity(&self) -> usize {
        self.event_queue_capacity
            .unwrap_or(DEFAULT_EVENT_QUEUE_CAPACITY)
    }

    pub fn get_export_chunk_frames(&self) -> usize {
        self.export_chunk_frames
            .unwrap_or(DEFAULT_EXPORT_CHUNK_FRAMES)
    }
}
