//! The polling-and-ingestion pipeline
//!
//! Wires the components together and owns the stop/drain sequencing:
//!
//! ```text
//! JobGenerator -(token)-> workers -(sample)-> IngestionSink -(point)-> PointWriter
//! ```
//!
//! The result channel between workers and sink is the single backpressure
//! point. Shutdown is strictly ordered: the generator exhausts (or is
//! stopped) and the token channel closes; the workers drain remaining
//! tokens, release their sessions, and exit; the worker join completes; the
//! result channel closes; the sink drains buffered samples and issues a
//! final flush; the writer is closed, which disconnects the error stream and
//! lets the observer exit. No sample is dropped and no thread leaks.

pub mod generator;
pub mod sink;
pub mod stats;
pub mod worker;

pub use generator::{GeneratorReport, JobGenerator};
pub use sink::{spawn_error_observer, IngestionSink};
pub use stats::{StatsReporter, StatsSnapshot};

use crate::config::AppConfig;
use crate::device::LinkPool;
use crate::error::{PollError, Result};
use crate::storage::PointWriter;
use crate::types::{PipelineCounters, PointTemplate, ReadToken, Sample};
use crossbeam_channel::bounded;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use worker::run_worker;

/// Final accounting for one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Samples materialized into storage points
    pub completed: u64,
    /// Failed register reads
    pub read_errors: u64,
    /// Tokens delivered by the generator
    pub emitted: u64,
    /// Ticks skipped under backpressure (unbounded mode)
    pub skipped: u64,
    /// Storage write failures observed
    pub write_failures: u64,
    /// Wall time of the run
    pub elapsed: Duration,
}

/// The assembled polling pipeline
pub struct Pipeline {
    config: AppConfig,
    pool: Arc<LinkPool>,
    writer: Arc<dyn PointWriter>,
    counters: Arc<PipelineCounters>,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    /// Assemble a pipeline over an already-built pool and writer
    pub fn new(config: AppConfig, pool: LinkPool, writer: Arc<dyn PointWriter>) -> Self {
        Self {
            config,
            pool: Arc::new(pool),
            writer,
            counters: Arc::new(PipelineCounters::new()),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the generator at its next tick.
    ///
    /// This is the graceful way to end an unbounded run; the drain sequence
    /// then proceeds exactly as for bounded exhaustion.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Shared job/error counters
    pub fn counters(&self) -> Arc<PipelineCounters> {
        Arc::clone(&self.counters)
    }

    /// Run the pipeline to completion and return the final accounting.
    ///
    /// Blocks until every component has drained and joined.
    pub fn run(self) -> Result<RunReport> {
        if self.pool.is_empty() {
            return Err(PollError::Connection(
                "no connected sessions in the pool".to_string(),
            ));
        }

        let started = Instant::now();
        let pipeline_cfg = &self.config.pipeline;
        let (token_tx, token_rx) = bounded::<ReadToken>(pipeline_cfg.token_capacity);
        let (sample_tx, sample_rx) = bounded::<Sample>(pipeline_cfg.result_capacity);

        tracing::info!(
            sessions = self.pool.connected_slots(),
            workers = pipeline_cfg.workers,
            total_jobs = pipeline_cfg.total_jobs,
            "Pipeline starting"
        );

        // one long-lived write-error observer per run
        let observer = spawn_error_observer(self.writer.errors());

        let reporter = StatsReporter::new(pipeline_cfg.report_every);
        let template = PointTemplate::new(
            self.config.storage.measurement.clone(),
            self.config.storage.tag_list(),
            self.config.read.register_count,
        );
        let sink = IngestionSink::new(
            template,
            Arc::clone(&self.writer),
            Arc::clone(&self.counters),
            reporter,
        );
        let sink_handle = thread::spawn(move || sink.run(sample_rx));

        let generator = JobGenerator::new(
            pipeline_cfg.pace_interval(),
            pipeline_cfg.total_jobs,
            Arc::clone(&self.stop),
        );
        let generator_handle = thread::spawn(move || generator.run(token_tx));

        let mut worker_handles = Vec::with_capacity(pipeline_cfg.workers);
        for id in 0..pipeline_cfg.workers {
            let pool = Arc::clone(&self.pool);
            let tokens = token_rx.clone();
            let samples = sample_tx.clone();
            let counters = Arc::clone(&self.counters);
            let read = self.config.read.clone();
            worker_handles
                .push(thread::spawn(move || run_worker(id, pool, read, tokens, samples, counters)));
        }
        // the workers now hold the only result senders and token receivers
        drop(sample_tx);
        drop(token_rx);

        // ordered drain: generator -> workers -> result channel -> sink -> writer
        let generator_report = generator_handle
            .join()
            .map_err(|_| PollError::Channel("job generator panicked".to_string()))?;
        for handle in worker_handles {
            handle
                .join()
                .map_err(|_| PollError::Channel("worker panicked".to_string()))?;
        }
        // every sample sender is gone; the sink drains the channel, flushes, exits
        sink_handle
            .join()
            .map_err(|_| PollError::Channel("ingestion sink panicked".to_string()))?;

        // closing the writer drains its buffers and disconnects the error
        // stream, which ends the observer
        self.writer.close();
        let write_failures = observer
            .join()
            .map_err(|_| PollError::Channel("error observer panicked".to_string()))?;
        self.pool.close_all();

        let report = RunReport {
            completed: self.counters.completed(),
            read_errors: self.counters.read_errors(),
            emitted: generator_report.emitted,
            skipped: generator_report.skipped,
            write_failures,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            completed = report.completed,
            read_errors = report.read_errors,
            emitted = report.emitted,
            skipped = report.skipped,
            write_failures = report.write_failures,
            elapsed_secs = format_args!("{:.2}", report.elapsed.as_secs_f64()),
            "Pipeline finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockLink;
    use crate::storage::MemoryWriter;

    #[test]
    fn test_run_rejects_empty_pool() {
        let (pool, failures) = LinkPool::build(1, |_| {
            Box::new(MockLink::new().with_connect_failure())
        });
        assert_eq!(failures.len(), 1);

        let pipeline = Pipeline::new(
            AppConfig::default(),
            pool,
            Arc::new(MemoryWriter::new()),
        );
        assert!(pipeline.run().is_err());
    }
}
