//! Mock device implementation for testing
//!
//! Provides a [`RegisterLink`] that generates register payloads from
//! configurable patterns and can inject connection or read failures, so the
//! pipeline can be exercised without a real PLC on the network.
//!
//! # Example
//!
//! ```ignore
//! use plcstream::device::{MockLink, MockPattern, RegisterLink};
//!
//! let mut link = MockLink::new()
//!     .with_pattern(MockPattern::Counter { step: 1 })
//!     .with_failure_every(10); // every 10th read fails
//! link.connect()?;
//! let raw = link.read_registers(0, 4)?;
//! ```

use crate::device::link::RegisterLink;
use crate::error::{PollError, Result};
use std::time::Duration;

/// Pattern for generating mock register values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockPattern {
    /// Every register holds the same fixed value
    Constant(i16),
    /// Register values advance by `step` on every read, offset by register
    /// index
    Counter { step: i16 },
    /// Registers alternate between two values on successive reads
    Alternating(i16, i16),
}

impl Default for MockPattern {
    fn default() -> Self {
        MockPattern::Counter { step: 1 }
    }
}

impl MockPattern {
    /// Value for register `index` on the `tick`-th read (1-based)
    fn value(&self, tick: u64, index: u16) -> i16 {
        match *self {
            MockPattern::Constant(v) => v,
            MockPattern::Counter { step } => {
                (tick as i16).wrapping_mul(step).wrapping_add(index as i16)
            }
            MockPattern::Alternating(a, b) => {
                if tick % 2 == 0 {
                    b
                } else {
                    a
                }
            }
        }
    }
}

/// Mock register link with configurable data patterns and failure injection
#[derive(Debug, Clone)]
pub struct MockLink {
    pattern: MockPattern,
    /// Every Nth read fails; 0 disables injection
    fail_every: u64,
    /// Refuse to connect
    fail_connect: bool,
    /// Artificial per-read latency, for backpressure tests
    read_delay: Option<Duration>,
    reads: u64,
    connected: bool,
}

impl Default for MockLink {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLink {
    /// Create a mock link with the default counter pattern
    pub fn new() -> Self {
        Self {
            pattern: MockPattern::default(),
            fail_every: 0,
            fail_connect: false,
            read_delay: None,
            reads: 0,
            connected: false,
        }
    }

    /// Set the data generation pattern
    pub fn with_pattern(mut self, pattern: MockPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Fail every `n`-th read (1 = every read)
    pub fn with_failure_every(mut self, n: u64) -> Self {
        self.fail_every = n;
        self
    }

    /// Make `connect` fail
    pub fn with_connect_failure(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Sleep for `delay` on every read to simulate a slow device
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Number of read attempts performed so far
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl RegisterLink for MockLink {
    fn connect(&mut self) -> Result<()> {
        if self.fail_connect {
            return Err(PollError::Connection("mock connect failure".to_string()));
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_registers(&mut self, _start: u16, count: u16) -> Result<Vec<u8>> {
        if !self.connected {
            return Err(PollError::Read("not connected".to_string()));
        }
        if let Some(delay) = self.read_delay {
            std::thread::sleep(delay);
        }

        self.reads += 1;
        if self.fail_every > 0 && self.reads % self.fail_every == 0 {
            return Err(PollError::Read(format!(
                "injected failure on read {}",
                self.reads
            )));
        }

        let mut raw = Vec::with_capacity(count as usize * 2);
        for index in 0..count {
            raw.extend_from_slice(&self.pattern.value(self.reads, index).to_be_bytes());
        }
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::decode_registers;

    #[test]
    fn test_read_requires_connection() {
        let mut link = MockLink::new();
        assert!(link.read_registers(0, 4).is_err());

        link.connect().expect("connect");
        assert!(link.is_connected());
        assert!(link.read_registers(0, 4).is_ok());
    }

    #[test]
    fn test_constant_pattern() {
        let mut link = MockLink::new().with_pattern(MockPattern::Constant(-7));
        link.connect().expect("connect");
        let raw = link.read_registers(0, 3).expect("read");
        assert_eq!(decode_registers(&raw), vec![-7, -7, -7]);
    }

    #[test]
    fn test_counter_pattern_advances_per_read() {
        let mut link = MockLink::new().with_pattern(MockPattern::Counter { step: 1 });
        link.connect().expect("connect");
        let first = decode_registers(&link.read_registers(0, 2).expect("read"));
        let second = decode_registers(&link.read_registers(0, 2).expect("read"));
        assert_eq!(first, vec![1, 2]);
        assert_eq!(second, vec![2, 3]);
    }

    #[test]
    fn test_failure_injection_cadence() {
        let mut link = MockLink::new().with_failure_every(3);
        link.connect().expect("connect");

        let results: Vec<bool> = (0..6)
            .map(|_| link.read_registers(0, 1).is_ok())
            .collect();
        assert_eq!(results, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn test_connect_failure() {
        let mut link = MockLink::new().with_connect_failure();
        assert!(link.connect().is_err());
        assert!(!link.is_connected());
    }
}
