//! Device access: the protocol seam, its implementations, and the session pool
//!
//! All register traffic goes through the [`RegisterLink`] trait:
//!
//! - [`ModbusLink`] - Real Modbus TCP sessions via tokio-modbus
//! - [`MockLink`] - Pattern-generated data and failure injection for tests
//! - [`LinkPool`] - Fixed-size lend/return pool enforcing exclusive use
//!
//! The pipeline never talks to a link directly; workers borrow sessions from
//! the pool for their lifetime and return them on exit.

pub mod link;
pub mod mock;
pub mod modbus;
pub mod pool;

pub use link::RegisterLink;
pub use mock::{MockLink, MockPattern};
pub use modbus::ModbusLink;
pub use pool::{LinkPool, SlotFailure};

use crate::config::DeviceConfig;

/// Build a pool of eagerly connected Modbus TCP sessions.
///
/// Slot failures are returned, not swallowed; the caller decides between a
/// degraded start and aborting (see `PipelineConfig::require_full_pool`).
pub fn build_modbus_pool(device: &DeviceConfig, sessions: usize) -> (LinkPool, Vec<SlotFailure>) {
    LinkPool::build(sessions, |_slot| Box::new(ModbusLink::new(device)))
}
