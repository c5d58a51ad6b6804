//! Configuration for plcstream
//!
//! All runtime parameters are resolved here before the pipeline starts: the
//! device endpoint, the register window to read, pipeline pacing/capacity
//! knobs, and the storage backend credentials. Configuration is loaded from
//! a TOML file; any missing section or field falls back to its default.
//!
//! # Example
//!
//! ```ignore
//! use plcstream::config::AppConfig;
//!
//! let config = AppConfig::load_or_default("plcstream.toml");
//! config.validate()?;
//! ```

use crate::error::{PollError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Default Modbus TCP endpoint
pub const DEFAULT_DEVICE_ADDRESS: &str = "192.168.1.88:502";

/// Default per-call timeout for register reads in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Modbus limit on holding registers per read request
pub const MAX_REGISTERS_PER_READ: u16 = 125;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Field device connection parameters
    #[serde(default)]
    pub device: DeviceConfig,

    /// Register window to poll
    #[serde(default)]
    pub read: ReadConfig,

    /// Pipeline concurrency and pacing
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Storage backend parameters
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Field device connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Modbus TCP endpoint, `host:port`
    pub address: String,

    /// Modbus unit (slave) identifier
    pub unit_id: u8,

    /// Per-call timeout in milliseconds, fixed at connection time
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_DEVICE_ADDRESS.to_string(),
            unit_id: 1,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl DeviceConfig {
    /// Per-call timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Register window to poll on every job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadConfig {
    /// Start address of the holding-register window
    pub start_address: u16,

    /// Number of registers to read per job
    pub register_count: u16,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            start_address: 0,
            register_count: MAX_REGISTERS_PER_READ,
        }
    }
}

/// Pipeline concurrency and pacing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of pooled device sessions (eagerly connected at startup)
    pub sessions: usize,

    /// Number of worker threads consuming read tokens
    pub workers: usize,

    /// Total number of reads to perform; 0 means unbounded
    pub total_jobs: u64,

    /// Pacing interval between read tokens, in microseconds
    pub pace_interval_us: u64,

    /// Capacity of the token channel. In unbounded mode a tick that finds
    /// this channel full is skipped rather than blocked on.
    pub token_capacity: usize,

    /// Capacity of the result channel between workers and the sink — the
    /// pipeline's single backpressure point
    pub result_capacity: usize,

    /// Emit a statistics report every this many completed jobs
    pub report_every: u64,

    /// Abort at startup if any pool slot failed to connect. When false the
    /// run proceeds with reduced concurrency.
    pub require_full_pool: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sessions: 1,
            workers: 1,
            total_jobs: 100_000,
            pace_interval_us: 1,
            token_capacity: 1000,
            result_capacity: 1000,
            report_every: 10_000,
            require_full_pool: false,
        }
    }
}

impl PipelineConfig {
    /// Pacing interval as a `Duration`
    pub fn pace_interval(&self) -> Duration {
        Duration::from_micros(self.pace_interval_us)
    }
}

/// Storage backend (InfluxDB 2.x) parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the InfluxDB instance
    pub url: String,

    /// Organization name
    pub org: String,

    /// Target bucket
    pub bucket: String,

    /// API token
    pub token: String,

    /// Measurement name for emitted points
    pub measurement: String,

    /// Fixed tag set applied to every point
    pub tags: BTreeMap<String, String>,

    /// Number of points per write batch
    pub batch_size: usize,

    /// Interval after which a partial batch is written anyway, in milliseconds
    pub flush_interval_ms: u64,

    /// Capacity of the writer's command queue. When the backend falls behind
    /// and the queue fills, further points are dropped and the drops are
    /// reported on the error stream.
    pub queue_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("location".to_string(), "tianjin".to_string());
        Self {
            url: "http://localhost:8086".to_string(),
            org: "my-org".to_string(),
            bucket: "my-bucket".to_string(),
            token: String::new(),
            measurement: "experiment".to_string(),
            tags,
            batch_size: 1000,
            flush_interval_ms: 1000,
            queue_capacity: 10_000,
        }
    }
}

impl StorageConfig {
    /// Flush interval as a `Duration`
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Tag set as an ordered list for point templates
    pub fn tag_list(&self) -> Vec<(String, String)> {
        self.tags
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for rotated log files
    pub directory: String,

    /// Log file name prefix
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "plcstream".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PollError::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(PollError::from)
            .with_context(|| format!("invalid config {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// Load configuration, returning defaults if the file is missing or
    /// malformed
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        if !path.as_ref().exists() {
            tracing::info!(
                "No config file at {}, using defaults",
                path.as_ref().display()
            );
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PollError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content).map_err(|e| {
            PollError::Config(format!(
                "Failed to write {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Validate cross-field constraints before the pipeline starts
    pub fn validate(&self) -> Result<()> {
        if self.read.register_count == 0 || self.read.register_count > MAX_REGISTERS_PER_READ {
            return Err(PollError::Config(format!(
                "register_count must be within 1..={}, got {}",
                MAX_REGISTERS_PER_READ, self.read.register_count
            )));
        }
        if self.pipeline.sessions == 0 {
            return Err(PollError::Config("sessions must be at least 1".into()));
        }
        if self.pipeline.workers == 0 {
            return Err(PollError::Config("workers must be at least 1".into()));
        }
        if self.pipeline.token_capacity == 0 {
            return Err(PollError::Config("token_capacity must be at least 1".into()));
        }
        if self.pipeline.result_capacity == 0 {
            return Err(PollError::Config(
                "result_capacity must be at least 1".into(),
            ));
        }
        if self.pipeline.report_every == 0 {
            return Err(PollError::Config("report_every must be at least 1".into()));
        }
        Ok(())
    }
}
