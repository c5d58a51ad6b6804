//! In-memory [`PointWriter`] for tests
//!
//! Records every enqueued point and counts flushes. Write failures can be
//! injected onto the error stream to exercise the observer path.

use crate::error::{PollError, Result};
use crate::storage::{PointWriter, WriteFailure};
use crate::types::Point;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Recording writer used by unit and integration tests
pub struct MemoryWriter {
    points: Mutex<Vec<Point>>,
    flushes: AtomicU64,
    closed: AtomicBool,
    fail_health: bool,
    err_tx: Mutex<Option<Sender<WriteFailure>>>,
    err_rx: Receiver<WriteFailure>,
}

impl Default for MemoryWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWriter {
    /// Create an empty recording writer
    pub fn new() -> Self {
        let (err_tx, err_rx) = unbounded();
        Self {
            points: Mutex::new(Vec::new()),
            flushes: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            fail_health: false,
            err_tx: Mutex::new(Some(err_tx)),
            err_rx,
        }
    }

    /// Make `health_check` fail
    pub fn with_failing_health(mut self) -> Self {
        self.fail_health = true;
        self
    }

    /// Snapshot of all recorded points
    pub fn points(&self) -> Vec<Point> {
        self.points.lock().expect("points lock").clone()
    }

    /// Number of recorded points
    pub fn len(&self) -> usize {
        self.points.lock().expect("points lock").len()
    }

    /// True if no point was recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of flush requests observed
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// True once `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Push a failure onto the error stream, as a failing backend would
    pub fn inject_write_failure(&self, message: impl Into<String>, points: usize) {
        if let Some(tx) = self.err_tx.lock().expect("err lock").as_ref() {
            let _ = tx.send(WriteFailure {
                message: message.into(),
                points,
            });
        }
    }
}

impl PointWriter for MemoryWriter {
    fn enqueue(&self, point: Point) {
        if self.closed.load(Ordering::Relaxed) {
            return;
        }
        self.points.lock().expect("points lock").push(point);
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    fn errors(&self) -> Receiver<WriteFailure> {
        self.err_rx.clone()
    }

    fn health_check(&self) -> Result<String> {
        if self.fail_health {
            Err(PollError::Health("mock backend unreachable".to_string()))
        } else {
            Ok("pass".to_string())
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        // dropping the sender disconnects the error stream
        self.err_tx.lock().expect("err lock").take();
    }
}
