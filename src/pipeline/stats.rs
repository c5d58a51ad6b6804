//! Throughput and error statistics for the ingestion sink
//!
//! The reporter logs a summary every `report_every` completed jobs: elapsed
//! wall time, average per-job latency, effective throughput, and the current
//! read-error count. The elapsed denominator is guarded so that a report
//! taken immediately after the first sample can never emit an infinite or
//! undefined value.

use std::time::{Duration, Instant};

/// A computed statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    /// Completed jobs so far
    pub completed: u64,
    /// Read errors so far
    pub read_errors: u64,
    /// Wall time since the reporter was created
    pub elapsed: Duration,
    /// Average time per completed job in microseconds
    pub avg_job_micros: f64,
    /// Effective throughput in jobs per second
    pub jobs_per_second: f64,
}

/// Periodic statistics reporter for the sink
#[derive(Debug, Clone, Copy)]
pub struct StatsReporter {
    started: Instant,
    report_every: u64,
}

impl StatsReporter {
    /// Create a reporter; the elapsed clock starts now
    pub fn new(report_every: u64) -> Self {
        Self {
            started: Instant::now(),
            report_every: report_every.max(1),
        }
    }

    /// True when `completed` lands on a report boundary
    pub fn should_report(&self, completed: u64) -> bool {
        completed % self.report_every == 0
    }

    /// Compute a snapshot with guarded division.
    ///
    /// Throughput is reported as zero rather than infinity when no wall time
    /// has elapsed yet.
    pub fn snapshot(&self, completed: u64, read_errors: u64) -> StatsSnapshot {
        let elapsed = self.started.elapsed();
        let secs = elapsed.as_secs_f64();

        let jobs_per_second = if secs > 0.0 {
            completed as f64 / secs
        } else {
            0.0
        };
        let avg_job_micros = if completed > 0 {
            elapsed.as_micros() as f64 / completed as f64
        } else {
            0.0
        };

        StatsSnapshot {
            completed,
            read_errors,
            elapsed,
            avg_job_micros,
            jobs_per_second,
        }
    }

    /// Log a statistics summary
    pub fn report(&self, completed: u64, read_errors: u64) {
        let snapshot = self.snapshot(completed, read_errors);
        tracing::info!(
            completed = snapshot.completed,
            elapsed_secs = format_args!("{:.2}", snapshot.elapsed.as_secs_f64()),
            avg_job_us = format_args!("{:.2}", snapshot.avg_job_micros),
            jobs_per_sec = format_args!("{:.2}", snapshot.jobs_per_second),
            read_errors = snapshot.read_errors,
            "Pipeline statistics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_statistics_are_finite() {
        // completed == 1 with elapsed ~ 0 must not produce Inf or NaN
        let reporter = StatsReporter::new(10);
        let snapshot = reporter.snapshot(1, 0);
        assert!(snapshot.jobs_per_second.is_finite());
        assert!(snapshot.avg_job_micros.is_finite());
    }

    #[test]
    fn test_zero_completed_statistics_are_finite() {
        let reporter = StatsReporter::new(10);
        let snapshot = reporter.snapshot(0, 0);
        assert_eq!(snapshot.avg_job_micros, 0.0);
        assert!(snapshot.jobs_per_second.is_finite());
    }

    #[test]
    fn test_report_boundaries() {
        let reporter = StatsReporter::new(100);
        assert!(!reporter.should_report(1));
        assert!(!reporter.should_report(99));
        assert!(reporter.should_report(100));
        assert!(reporter.should_report(200));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let reporter = StatsReporter::new(0);
        // every count is a boundary rather than a divide-by-zero
        assert!(reporter.should_report(1));
    }

    #[test]
    fn test_throughput_math() {
        let reporter = StatsReporter::new(10);
        std::thread::sleep(Duration::from_millis(10));
        let snapshot = reporter.snapshot(100, 5);
        assert!(snapshot.jobs_per_second > 0.0);
        assert!(snapshot.avg_job_micros > 0.0);
        assert_eq!(snapshot.read_errors, 5);
    }
}
