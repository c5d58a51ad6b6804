//! Error handling for plcstream
//!
//! This module defines the crate-wide error type and a Result alias used
//! throughout the polling pipeline.

use thiserror::Error;

/// Main error type for plcstream operations
#[derive(Error, Debug)]
pub enum PollError {
    /// Errors establishing a device session
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors performing a register read
    #[error("Read error: {0}")]
    Read(String),

    /// Errors from the storage client
    #[error("Storage error: {0}")]
    Storage(String),

    /// Storage backend health check failures
    #[error("Health check error: {0}")]
    Health(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PollError>,
    },
}

impl PollError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PollError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<toml::de::Error> for PollError {
    fn from(err: toml::de::Error) -> Self {
        PollError::Config(err.to_string())
    }
}

/// Result type alias for plcstream operations
pub type Result<T> = std::result::Result<T, PollError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PollError::Read("register 0 unavailable".to_string());
        assert_eq!(err.to_string(), "Read error: register 0 unavailable");
    }

    #[test]
    fn test_error_with_context() {
        let err = PollError::Connection("refused".to_string());
        let with_ctx = err.with_context("slot 3");
        assert!(with_ctx.to_string().contains("slot 3"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err: PollError = io.into();
        assert!(err.to_string().contains("timed out"));
    }
}
