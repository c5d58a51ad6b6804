//! Core data types shared across the polling pipeline
//!
//! This module defines the types that flow through the pipeline:
//!
//! - [`ReadToken`] - A unit of scheduled work ("perform one register read now")
//! - [`Sample`] - A timestamped sequence of decoded register values
//! - [`Point`] / [`PointTemplate`] - The storage-ready representation of a Sample
//! - [`PipelineCounters`] - Shared atomic counters for job/error accounting
//!
//! Register payloads arrive as raw big-endian bytes from the device link and
//! are decoded into signed 16-bit values with [`decode_registers`].

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A unit of work representing one scheduled register read.
///
/// Tokens carry no payload; they exist only to pace the workers. Each token
/// is created by the job generator and consumed by exactly one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadToken;

/// One successful register read: a capture timestamp plus the decoded
/// register values in register order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Wall-clock time at the start of the read
    pub captured_at: DateTime<Utc>,
    /// Decoded signed 16-bit register values, preserving register order
    pub registers: Vec<i16>,
}

impl Sample {
    /// Create a sample from a raw big-endian register payload
    pub fn from_raw(captured_at: DateTime<Utc>, raw: &[u8]) -> Self {
        Self {
            captured_at,
            registers: decode_registers(raw),
        }
    }
}

/// Decode a raw big-endian register payload into signed 16-bit values.
///
/// Register order is preserved. A trailing odd byte (which a well-formed
/// Modbus response never produces) is ignored.
pub fn decode_registers(raw: &[u8]) -> Vec<i16> {
    raw.chunks_exact(2)
        .map(|pair| i16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

/// Process-wide atomic counters mutated concurrently by workers and the sink.
///
/// Passed by `Arc` into each pipeline component; there are no package-level
/// mutable singletons. `completed` counts samples materialized into points,
/// `read_errors` counts failed register reads. Write failures are
/// intentionally excluded from both (they surface only through the storage
/// client's error stream).
#[derive(Debug, Default)]
pub struct PipelineCounters {
    /// Number of samples materialized into storage points
    pub completed: AtomicU64,
    /// Number of failed register reads
    pub read_errors: AtomicU64,
}

impl PipelineCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Current completed-job count
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Current read-error count
    pub fn read_errors(&self) -> u64 {
        self.read_errors.load(Ordering::Relaxed)
    }

    /// Record a failed register read
    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed job and return its strictly increasing sequence
    /// number (1-based)
    pub fn next_sequence(&self) -> u64 {
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// A storage-ready point built 1:1 from a [`Sample`].
///
/// Fields map each register index to its value plus a monotonic `seq` field
/// taken from the completed-job counter at the moment of submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Measurement name
    pub measurement: Arc<str>,
    /// Fixed tag set, shared across all points of a run
    pub tags: Arc<[(String, String)]>,
    /// Field name → integer value, in register order, `seq` last
    pub fields: Vec<(Arc<str>, i64)>,
    /// Capture timestamp of the originating sample
    pub timestamp: DateTime<Utc>,
}

/// Template for building [`Point`]s from samples.
///
/// Field names are constructed once from the known register count rather
/// than formatted per point.
#[derive(Debug, Clone)]
pub struct PointTemplate {
    measurement: Arc<str>,
    tags: Arc<[(String, String)]>,
    field_names: Vec<Arc<str>>,
    seq_field: Arc<str>,
}

impl PointTemplate {
    /// Build a template for `register_count` registers.
    ///
    /// Field names are `sensor0..sensorN` to match the register indices; the
    /// sequence field is named `seq`.
    pub fn new(
        measurement: impl Into<String>,
        tags: Vec<(String, String)>,
        register_count: u16,
    ) -> Self {
        let field_names = (0..register_count)
            .map(|i| Arc::from(format!("sensor{i}").as_str()))
            .collect();
        Self {
            measurement: Arc::from(measurement.into().as_str()),
            tags: tags.into(),
            field_names,
            seq_field: Arc::from("seq"),
        }
    }

    /// Number of register fields this template produces per point
    pub fn register_count(&self) -> usize {
        self.field_names.len()
    }

    /// Materialize one point from a sample and its sequence number.
    ///
    /// Samples shorter than the template produce only the fields they carry;
    /// extra registers beyond the template are dropped.
    pub fn point(&self, sample: &Sample, sequence: u64) -> Point {
        let mut fields: Vec<(Arc<str>, i64)> = self
            .field_names
            .iter()
            .zip(sample.registers.iter())
            .map(|(name, value)| (Arc::clone(name), i64::from(*value)))
            .collect();
        fields.push((Arc::clone(&self.seq_field), sequence as i64));

        Point {
            measurement: Arc::clone(&self.measurement),
            tags: Arc::clone(&self.tags),
            fields,
            timestamp: sample.captured_at,
        }
    }
}
