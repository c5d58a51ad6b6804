//! Modbus TCP implementation of [`RegisterLink`]
//!
//! Wraps the blocking `tokio-modbus` sync client. Each [`ModbusLink`] owns
//! one TCP session to the device; the per-call timeout is fixed when the
//! connection is established.

use crate::config::DeviceConfig;
use crate::device::link::RegisterLink;
use crate::error::{PollError, Result};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tokio_modbus::client::sync::{self, Context};
use tokio_modbus::prelude::{Slave, SyncReader};

/// One Modbus TCP session to the field device
pub struct ModbusLink {
    address: String,
    slave: Slave,
    timeout: Duration,
    ctx: Option<Context>,
}

impl ModbusLink {
    /// Create an unconnected link from device configuration
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            address: config.address.clone(),
            slave: Slave(config.unit_id),
            timeout: config.timeout(),
            ctx: None,
        }
    }

    fn resolve(&self) -> Result<SocketAddr> {
        self.address
            .to_socket_addrs()
            .map_err(|e| PollError::Connection(format!("{}: {}", self.address, e)))?
            .next()
            .ok_or_else(|| {
                PollError::Connection(format!("{}: no address resolved", self.address))
            })
    }
}

impl RegisterLink for ModbusLink {
    fn connect(&mut self) -> Result<()> {
        let addr = self.resolve()?;
        let ctx = sync::tcp::connect_slave_with_timeout(addr, self.slave, Some(self.timeout))
            .map_err(|e| PollError::Connection(format!("{}: {}", self.address, e)))?;
        self.ctx = Some(ctx);
        tracing::debug!("Connected to {} (unit {})", self.address, self.slave.0);
        Ok(())
    }

    fn disconnect(&mut self) {
        // Dropping the context closes the TCP stream
        self.ctx = None;
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    fn read_registers(&mut self, start: u16, count: u16) -> Result<Vec<u8>> {
        let ctx = self
            .ctx
            .as_mut()
            .ok_or_else(|| PollError::Read("not connected".to_string()))?;
        let words = ctx
            .read_holding_registers(start, count)
            .map_err(|e| PollError::Read(format!("registers {}..{}: {}", start, start + count, e)))?;

        let mut raw = Vec::with_capacity(words.len() * 2);
        for word in words {
            raw.extend_from_slice(&word.to_be_bytes());
        }
        Ok(raw)
    }
}
