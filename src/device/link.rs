//! RegisterLink trait for unified device access
//!
//! This module provides a common trait for register-read sessions, enabling
//! both real Modbus TCP connections and mock devices for testing. A link is
//! one live protocol connection capable of exactly one concurrent read; the
//! pool's lend/return discipline enforces exclusive use, so no lock is
//! needed around the link itself.

use crate::error::Result;

/// Unified interface for one register-read session.
///
/// Implementations must be `Send` so links can move between the pool and
/// worker threads.
pub trait RegisterLink: Send {
    /// Establish the connection. The per-call timeout is fixed here.
    fn connect(&mut self) -> Result<()>;

    /// Close the connection. Always safe to call, including after a failed
    /// read.
    fn disconnect(&mut self);

    /// Check whether the link is currently connected
    fn is_connected(&self) -> bool;

    /// Perform one blocking holding-register read.
    ///
    /// Returns the raw register payload: `count` big-endian 16-bit words,
    /// `2 * count` bytes. Decoding into signed values is the caller's
    /// concern (see [`crate::types::decode_registers`]).
    fn read_registers(&mut self, start: u16, count: u16) -> Result<Vec<u8>>;
}
