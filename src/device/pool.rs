//! Fixed-size connection pool for device links
//!
//! The pool owns a fixed number of long-lived sessions and lends them to
//! workers. Slots live in a bounded channel: [`LinkPool::acquire`] blocks
//! until a session is available, [`LinkPool::release`] returns one. The
//! lend/return discipline is what guarantees no two workers ever hold the
//! same session.
//!
//! Construction eagerly connects every slot. A slot that fails to connect
//! does not abort the remaining slots; instead the failure is reported back
//! to the caller, which decides whether to proceed with reduced concurrency
//! or abort.

use crate::device::link::RegisterLink;
use crate::error::{PollError, Result, ResultExt};
use crossbeam_channel::{bounded, Receiver, Sender};

/// A pool slot that failed to connect during construction
#[derive(Debug)]
pub struct SlotFailure {
    /// Zero-based slot index
    pub slot: usize,
    /// The connection error
    pub error: PollError,
}

/// Fixed-size lend/return pool of connected device links
pub struct LinkPool {
    tx: Sender<Box<dyn RegisterLink>>,
    rx: Receiver<Box<dyn RegisterLink>>,
    connected: usize,
}

impl LinkPool {
    /// Build a pool of `size` slots, eagerly connecting each link produced
    /// by `make_link`.
    ///
    /// Returns the pool together with the list of slots that failed to
    /// connect. The pool holds only the successfully connected links; the
    /// caller inspects the failures and decides whether a degraded start is
    /// acceptable.
    pub fn build<F>(size: usize, mut make_link: F) -> (Self, Vec<SlotFailure>)
    where
        F: FnMut(usize) -> Box<dyn RegisterLink>,
    {
        let (tx, rx) = bounded(size.max(1));
        let mut failures = Vec::new();
        let mut connected = 0;

        for slot in 0..size {
            let mut link = make_link(slot);
            match link.connect().with_context(|| format!("pool slot {}", slot)) {
                Ok(()) => {
                    // cannot overflow: the channel holds `size` slots
                    let _ = tx.send(link);
                    connected += 1;
                }
                Err(error) => {
                    tracing::error!("Pool slot {} failed to connect: {}", slot, error);
                    failures.push(SlotFailure { slot, error });
                }
            }
        }

        (Self { tx, rx, connected }, failures)
    }

    /// Number of successfully connected slots
    pub fn connected_slots(&self) -> usize {
        self.connected
    }

    /// True if no slot connected
    pub fn is_empty(&self) -> bool {
        self.connected == 0
    }

    /// Borrow a session, blocking until one is available
    pub fn acquire(&self) -> Result<Box<dyn RegisterLink>> {
        self.rx
            .recv()
            .map_err(|_| PollError::Channel("link pool closed".to_string()))
    }

    /// Borrow a session without blocking
    pub fn try_acquire(&self) -> Option<Box<dyn RegisterLink>> {
        self.rx.try_recv().ok()
    }

    /// Return a session to the pool. Safe to call even after a failed read
    /// on that session.
    pub fn release(&self, link: Box<dyn RegisterLink>) {
        let _ = self.tx.send(link);
    }

    /// Disconnect and drop every idle session.
    ///
    /// Call after all workers have released their links; lent-out links are
    /// not reclaimed here.
    pub fn close_all(&self) {
        while let Ok(mut link) = self.rx.try_recv() {
            link.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockLink;

    fn mock_pool(size: usize, failing_slots: &[usize]) -> (LinkPool, Vec<SlotFailure>) {
        let failing: Vec<usize> = failing_slots.to_vec();
        LinkPool::build(size, move |slot| {
            let link = MockLink::new();
            if failing.contains(&slot) {
                Box::new(link.with_connect_failure())
            } else {
                Box::new(link)
            }
        })
    }

    #[test]
    fn test_build_all_connected() {
        let (pool, failures) = mock_pool(3, &[]);
        assert_eq!(pool.connected_slots(), 3);
        assert!(failures.is_empty());
    }

    #[test]
    fn test_build_reports_failed_slots() {
        let (pool, failures) = mock_pool(4, &[1, 3]);
        assert_eq!(pool.connected_slots(), 2);
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].slot, 1);
        assert_eq!(failures[1].slot, 3);
    }

    #[test]
    fn test_failed_slot_error_names_the_slot() {
        let (_, failures) = mock_pool(3, &[1]);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].error.to_string().contains("pool slot 1"));
    }

    #[test]
    fn test_build_can_yield_empty_pool() {
        let (pool, failures) = mock_pool(2, &[0, 1]);
        assert!(pool.is_empty());
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn test_no_session_is_duplicated() {
        let (pool, _) = mock_pool(2, &[]);

        let a = pool.try_acquire().expect("first slot");
        let b = pool.try_acquire().expect("second slot");
        // pool exhausted while both are lent out
        assert!(pool.try_acquire().is_none());

        pool.release(a);
        pool.release(b);
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn test_release_after_failed_read_is_safe() {
        let (pool, _) = LinkPool::build(1, |_| {
            Box::new(MockLink::new().with_failure_every(1))
        });

        let mut link = pool.acquire().expect("acquire");
        assert!(link.read_registers(0, 1).is_err());
        pool.release(link);

        // the slot is reusable
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn test_close_all_disconnects_idle_links() {
        let (pool, _) = mock_pool(2, &[]);
        pool.close_all();
        assert!(pool.try_acquire().is_none());
    }
}
