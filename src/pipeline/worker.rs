//! Worker loop: token in, sample out
//!
//! Each worker borrows one session from the pool for its whole lifetime,
//! then consumes tokens until the token channel closes and drains. Every
//! consumed token ends as exactly one of: a [`Sample`] pushed downstream, or
//! one read-error increment. A failed read never terminates the worker.
//!
//! The send into the result channel blocks when the channel is full; this
//! is the pipeline's single backpressure point.

use crate::config::ReadConfig;
use crate::device::LinkPool;
use crate::types::{PipelineCounters, ReadToken, Sample};
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;

/// Run one worker to completion.
///
/// Returns the number of tokens this worker consumed.
pub(crate) fn run_worker(
    id: usize,
    pool: Arc<LinkPool>,
    read: ReadConfig,
    tokens: Receiver<ReadToken>,
    samples: Sender<Sample>,
    counters: Arc<PipelineCounters>,
) -> u64 {
    let mut link = match pool.acquire() {
        Ok(link) => link,
        Err(e) => {
            tracing::error!("Worker {} could not borrow a session: {}", id, e);
            return 0;
        }
    };
    tracing::debug!("Worker {} started", id);

    let mut consumed = 0;
    for _token in tokens.iter() {
        consumed += 1;
        let captured_at = Utc::now();
        match link.read_registers(read.start_address, read.register_count) {
            Ok(raw) => {
                let sample = Sample::from_raw(captured_at, &raw);
                if samples.send(sample).is_err() {
                    // the sink is gone; nothing downstream can use further reads
                    tracing::error!("Worker {} lost the result channel", id);
                    break;
                }
            }
            Err(e) => {
                counters.record_read_error();
                tracing::warn!("Worker {} read failed: {}", id, e);
            }
        }
    }

    pool.release(link);
    tracing::debug!("Worker {} stopped after {} tokens", id, consumed);
    consumed
}
