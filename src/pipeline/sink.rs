//! Ingestion sink: samples in, storage points out
//!
//! The sink is the sole consumer of the result channel. For each sample it
//! takes the next sequence number from the completed-job counter, builds one
//! point from the precomputed template, and enqueues it on the storage
//! writer. When the result channel closes and drains, the sink flushes the
//! writer so the tail batch is not left queued, then returns.
//!
//! Write failures reported by the storage client are drained by a single
//! long-lived observer thread started once per pipeline run. They are logged
//! only; the completed/read-error counters track read-side outcomes and are
//! deliberately untouched by storage failures.

use crate::pipeline::stats::StatsReporter;
use crate::storage::{PointWriter, WriteFailure};
use crate::types::{PipelineCounters, PointTemplate, Sample};
use crossbeam_channel::Receiver;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Consumes samples, materializes points, and reports statistics
pub struct IngestionSink {
    template: PointTemplate,
    writer: Arc<dyn PointWriter>,
    counters: Arc<PipelineCounters>,
    reporter: StatsReporter,
}

impl IngestionSink {
    /// Create a sink writing through `writer`
    pub fn new(
        template: PointTemplate,
        writer: Arc<dyn PointWriter>,
        counters: Arc<PipelineCounters>,
        reporter: StatsReporter,
    ) -> Self {
        Self {
            template,
            writer,
            counters,
            reporter,
        }
    }

    /// Run until the sample channel closes and drains, then flush.
    ///
    /// Returns the number of points submitted to the writer.
    pub fn run(self, samples: Receiver<Sample>) -> u64 {
        let mut submitted = 0;
        for sample in samples.iter() {
            let sequence = self.counters.next_sequence();
            let point = self.template.point(&sample, sequence);
            self.writer.enqueue(point);
            submitted += 1;

            if self.reporter.should_report(sequence) {
                self.reporter.report(sequence, self.counters.read_errors());
            }
        }

        // channel closed and drained; push the tail batch toward the backend
        self.writer.flush();
        tracing::debug!("Ingestion sink drained after {} points", submitted);
        submitted
    }
}

/// Spawn the long-lived write-error observer for one pipeline run.
///
/// The thread exits when the writer closes its error stream and returns the
/// number of failures observed.
pub fn spawn_error_observer(errors: Receiver<WriteFailure>) -> JoinHandle<u64> {
    std::thread::spawn(move || {
        let mut observed = 0;
        for failure in errors.iter() {
            observed += 1;
            tracing::error!(
                "Storage write failure ({} points lost): {}",
                failure.points,
                failure.message
            );
        }
        observed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryWriter;
    use chrono::Utc;
    use crossbeam_channel::bounded;

    fn test_sink(writer: Arc<MemoryWriter>, registers: u16) -> IngestionSink {
        IngestionSink::new(
            PointTemplate::new("experiment", Vec::new(), registers),
            writer,
            Arc::new(PipelineCounters::new()),
            StatsReporter::new(1000),
        )
    }

    fn sample(values: Vec<i16>) -> Sample {
        Sample {
            captured_at: Utc::now(),
            registers: values,
        }
    }

    #[test]
    fn test_every_sample_becomes_one_point() {
        let writer = Arc::new(MemoryWriter::new());
        let sink = test_sink(Arc::clone(&writer), 2);
        let (tx, rx) = bounded(16);

        for i in 0..10 {
            tx.send(sample(vec![i, -i])).expect("sample");
        }
        drop(tx);

        let submitted = sink.run(rx);
        assert_eq!(submitted, 10);
        assert_eq!(writer.len(), 10);
        // the drain ended with a flush
        assert_eq!(writer.flush_count(), 1);
    }

    #[test]
    fn test_sequence_numbers_are_strictly_increasing() {
        let writer = Arc::new(MemoryWriter::new());
        let sink = test_sink(Arc::clone(&writer), 1);
        let (tx, rx) = bounded(8);

        for _ in 0..5 {
            tx.send(sample(vec![0])).expect("sample");
        }
        drop(tx);
        sink.run(rx);

        let sequences: Vec<i64> = writer
            .points()
            .iter()
            .map(|p| p.fields.last().expect("seq field").1)
            .collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_observer_counts_failures_and_exits_on_close() {
        let writer = MemoryWriter::new();
        let observer = spawn_error_observer(writer.errors());

        writer.inject_write_failure("timeout", 100);
        writer.inject_write_failure("timeout", 50);
        writer.close();

        assert_eq!(observer.join().expect("observer"), 2);
    }

    #[test]
    fn test_write_failures_do_not_touch_counters() {
        let writer = Arc::new(MemoryWriter::new());
        let counters = Arc::new(PipelineCounters::new());
        let sink = IngestionSink::new(
            PointTemplate::new("experiment", Vec::new(), 1),
            Arc::clone(&writer) as Arc<dyn PointWriter>,
            Arc::clone(&counters),
            StatsReporter::new(1000),
        );
        let (tx, rx) = bounded(4);

        writer.inject_write_failure("disk full", 1);
        tx.send(sample(vec![1])).expect("sample");
        drop(tx);
        sink.run(rx);

        assert_eq!(counters.completed(), 1);
        assert_eq!(counters.read_errors(), 0);
    }
}
