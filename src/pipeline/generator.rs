//! Paced read-token generation
//!
//! The generator emits one [`ReadToken`] per tick of a fixed-rate timer into
//! the bounded token channel. Closing that channel (by dropping the sender
//! when the generator returns) is the sole termination signal the workers
//! consume.
//!
//! The two modes deliberately differ in how they meet a full channel:
//!
//! - **Bounded** (`target > 0`): emission blocks, so exactly `target` tokens
//!   are eventually delivered and no tick is lost.
//! - **Unbounded** (`target == 0`): emission skips the tick and counts it,
//!   so the timer never builds an unbounded backlog. Effective throughput
//!   under sustained backpressure falls below the nominal tick rate.

use crate::types::ReadToken;
use crossbeam_channel::{tick, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the generator actually did before it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorReport {
    /// Tokens delivered into the channel
    pub emitted: u64,
    /// Ticks skipped because the channel was full (unbounded mode only)
    pub skipped: u64,
}

/// Produces read tokens at a configured pace until the target count is
/// reached, the stop flag is set, or every consumer is gone.
pub struct JobGenerator {
    interval: Duration,
    target: u64,
    stop: Arc<AtomicBool>,
}

impl JobGenerator {
    /// Create a generator. `target == 0` selects unbounded mode.
    pub fn new(interval: Duration, target: u64, stop: Arc<AtomicBool>) -> Self {
        Self {
            interval,
            target,
            stop,
        }
    }

    /// Run to completion, consuming the token sender.
    ///
    /// The sender is dropped on return; once the pipeline holds no other
    /// sender the token channel closes and the workers wind down.
    pub fn run(self, tokens: Sender<ReadToken>) -> GeneratorReport {
        let report = if self.target > 0 {
            self.run_bounded(&tokens)
        } else {
            self.run_unbounded(&tokens)
        };
        tracing::debug!(
            "Job generator stopped: {} emitted, {} skipped",
            report.emitted,
            report.skipped
        );
        report
    }

    fn run_bounded(&self, tokens: &Sender<ReadToken>) -> GeneratorReport {
        let ticker = tick(self.interval);
        let mut emitted = 0;

        while emitted < self.target && !self.stop.load(Ordering::SeqCst) {
            let _ = ticker.recv();
            // a full channel blocks the send; the tick is delayed, never lost
            if tokens.send(ReadToken).is_err() {
                break;
            }
            emitted += 1;
        }

        GeneratorReport { emitted, skipped: 0 }
    }

    fn run_unbounded(&self, tokens: &Sender<ReadToken>) -> GeneratorReport {
        let ticker = tick(self.interval);
        let mut emitted = 0;
        let mut skipped = 0;

        while !self.stop.load(Ordering::SeqCst) {
            let _ = ticker.recv();
            match tokens.try_send(ReadToken) {
                Ok(()) => emitted += 1,
                Err(TrySendError::Full(_)) => skipped += 1,
                Err(TrySendError::Disconnected(_)) => break,
            }
        }

        GeneratorReport { emitted, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::thread;

    fn stop_flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn test_bounded_emits_exact_target() {
        let (tx, rx) = bounded(8);
        let generator = JobGenerator::new(Duration::from_micros(1), 100, stop_flag());

        let consumer = thread::spawn(move || rx.iter().count());
        let report = generator.run(tx);

        assert_eq!(report.emitted, 100);
        assert_eq!(report.skipped, 0);
        assert_eq!(consumer.join().expect("consumer"), 100);
    }

    #[test]
    fn test_bounded_blocks_on_full_channel_without_losing_tokens() {
        // channel smaller than the target forces the generator to block
        let (tx, rx) = bounded(2);
        let generator = JobGenerator::new(Duration::from_micros(1), 50, stop_flag());

        let handle = thread::spawn(move || generator.run(tx));

        // slow consumer
        let mut received = 0;
        for _ in rx.iter() {
            received += 1;
            thread::sleep(Duration::from_micros(200));
        }

        let report = handle.join().expect("generator");
        assert_eq!(report.emitted, 50);
        assert_eq!(received, 50);
    }

    #[test]
    fn test_unbounded_skips_when_full() {
        let (tx, rx) = bounded(1);
        let stop = stop_flag();
        let generator = JobGenerator::new(Duration::from_micros(1), 0, stop.clone());

        // no consumer: the first token fills the channel, the rest skip
        let handle = thread::spawn(move || generator.run(tx));
        thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::SeqCst);

        let report = handle.join().expect("generator");
        assert_eq!(report.emitted, 1);
        assert!(report.skipped > 0, "full-channel ticks must be skipped");
        drop(rx);
    }

    #[test]
    fn test_unbounded_stops_when_consumers_are_gone() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let generator = JobGenerator::new(Duration::from_micros(1), 0, stop_flag());
        let report = generator.run(tx);
        assert_eq!(report.emitted, 0);
    }

    #[test]
    fn test_bounded_honors_stop_flag() {
        let (tx, rx) = bounded(1);
        let stop = stop_flag();
        stop.store(true, Ordering::SeqCst);
        let generator = JobGenerator::new(Duration::from_micros(1), 1000, stop);
        let report = generator.run(tx);
        assert_eq!(report.emitted, 0);
        drop(rx);
    }
}
