//! Storage seam: asynchronous point ingestion behind a trait
//!
//! The pipeline hands finished [`Point`]s to a [`PointWriter`] and never
//! waits for storage. Writers own their buffering and retry policy and
//! report write failures on a separate notification channel, which a single
//! long-lived observer drains for logging. Write failures are observational
//! only; they never feed back into the pipeline's counters or backpressure.
//!
//! Implementations:
//!
//! - [`InfluxWriter`] - Batched writes to InfluxDB 2.x on a dedicated runtime thread
//! - [`MemoryWriter`] - Records points in memory for tests

pub mod influx;
pub mod memory;

pub use influx::InfluxWriter;
pub use memory::MemoryWriter;

use crate::error::Result;
use crate::types::Point;
use crossbeam_channel::Receiver;

/// A write failure reported by the storage backend
#[derive(Debug, Clone)]
pub struct WriteFailure {
    /// Backend error description
    pub message: String,
    /// Number of points lost with this failure
    pub points: usize,
}

/// Asynchronous point sink with an error-notification stream.
///
/// `enqueue` must not block the caller; buffering and batching are the
/// writer's concern.
pub trait PointWriter: Send + Sync {
    /// Queue one point for writing
    fn enqueue(&self, point: Point);

    /// Request that buffered points be written out
    fn flush(&self);

    /// The write-failure notification stream.
    ///
    /// Disconnects when the writer is closed, which is how the error
    /// observer learns to exit.
    fn errors(&self) -> Receiver<WriteFailure>;

    /// Check backend reachability, returning a status description
    fn health_check(&self) -> Result<String>;

    /// Write out remaining points and release the writer's resources.
    ///
    /// Idempotent. After `close` returns, the error stream is disconnected
    /// and further `enqueue` calls are dropped.
    fn close(&self);
}
