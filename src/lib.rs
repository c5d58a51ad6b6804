//! # plcstream: Modbus register poller with time-series ingestion
//!
//! Continuously polls a window of holding registers from a Modbus TCP field
//! device and streams the decoded samples into InfluxDB, under a fixed or
//! unbounded total-read budget, with throughput and error statistics
//! reported along the way.
//!
//! ## Architecture
//!
//! - **Device**: [`device::RegisterLink`] sessions pooled by [`device::LinkPool`];
//!   real traffic goes through tokio-modbus, tests use a mock link
//! - **Pipeline**: a paced job generator, a pool of read workers, a bounded
//!   result channel (the single backpressure point), and an ingestion sink
//! - **Storage**: points are handed to a [`storage::PointWriter`]; the
//!   InfluxDB implementation batches writes on a dedicated runtime thread
//! - **Communication**: crossbeam channels and atomic counters; no locks
//!   around business state
//!
//! ## Example
//!
//! ```ignore
//! use plcstream::{config::AppConfig, device, pipeline::Pipeline, storage::InfluxWriter};
//! use std::sync::Arc;
//!
//! let config = AppConfig::load_or_default("plcstream.toml");
//! config.validate()?;
//!
//! let (pool, failures) = device::build_modbus_pool(&config.device, config.pipeline.sessions);
//! assert!(failures.is_empty());
//!
//! let writer = Arc::new(InfluxWriter::connect(&config.storage)?);
//! let report = Pipeline::new(config, pool, writer).run()?;
//! println!("{} samples ingested", report.completed);
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod pipeline;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{PollError, Result};
pub use pipeline::{Pipeline, RunReport};
pub use types::{PipelineCounters, Point, PointTemplate, ReadToken, Sample};
