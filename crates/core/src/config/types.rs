use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::converter::ConverterConfig;

/// How long a converted artifact stays retrievable: 20 minutes.
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(20 * 60);

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Result cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Lifetime of a durable entry, in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Interval between background sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Whether to open the durable tier at all.
    #[serde(default = "default_durable")]
    pub durable: bool,
    /// SQLite file backing the durable tier.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval(),
            durable: default_durable(),
            database_path: default_database_path(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    DEFAULT_RESULT_TTL.as_secs()
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_durable() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    std::env::temp_dir().join("archlight").join("results.db")
}

/// Input limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Largest accepted input file, in megabytes.
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
}

impl LimitsConfig {
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

fn default_max_upload_mb() -> u64 {
    50
}

/// History ledger configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistoryConfig {
    /// Maximum number of entries kept; the oldest are dropped first.
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_history_capacity(),
        }
    }
}

fn default_history_capacity() -> usize {
    20
}
