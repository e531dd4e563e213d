use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    pub profile: Option<String>,
    pub profiles: HashMap<String, Profile>,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct Profile {
    pub data_dir: String,
    /// Queue database path (defaults to `{{data_dir}}/queue.db`).
    pub queue_db: Option<String>,
    /// Search index database path (defaults to `{{data_dir}}/index.db`).
    pub index_db: Option<String>,
}

/// Worker tuning.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum rows fetched from the store per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// How long the idle worker waits for new events before an optimize pass.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,
    #[serde(default = "default_shutdown_poll_ms")]
    pub shutdown_poll_ms: u64,
    /// Attempts made before a content type is declared not indexable.
    #[serde(default = "default_type_check_attempts")]
    pub type_check_attempts: u32,
    #[serde(default = "default_type_check_retry_ms")]
    pub type_check_retry_ms: u64,
}

impl QueueConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms)
    }

    pub fn shutdown_poll(&self) -> Duration {
        Duration::from_millis(self.shutdown_poll_ms)
    }

    pub fn type_check_retry(&self) -> Duration {
        Duration::from_millis(self.type_check_retry_ms)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            idle_timeout_ms: default_idle_timeout_ms(),
            pause_poll_ms: default_pause_poll_ms(),
            shutdown_poll_ms: default_shutdown_poll_ms(),
            type_check_attempts: default_type_check_attempts(),
            type_check_retry_ms: default_type_check_retry_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_idle_timeout_ms() -> u64 {
    10_000
}

fn default_pause_poll_ms() -> u64 {
    250
}

fn default_shutdown_poll_ms() -> u64 {
    50
}

fn default_type_check_attempts() -> u32 {
    5
}

fn default_type_check_retry_ms() -> u64 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file_level: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file_level: None, file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub active_profile: String,
    pub data_dir: PathBuf,
    pub queue_db: PathBuf,
    pub index_db: PathBuf,
    pub queue: QueueConfig,
    pub logging: LoggingConfig,
}
