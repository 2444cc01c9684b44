//! Error types for daemonizable-core.
//!
//! Every failure is an explicit value. The voluntary-shutdown sentinel lives
//! in the same enum so hooks can propagate it with `?`, but it is never a
//! fault: the controller catches it where iterations are dispatched.

use std::fmt;

/// Result type alias for runloop operations.
pub type Result<T> = std::result::Result<T, RunloopError>;

/// Error type for runloop operations.
#[derive(Debug, thiserror::Error)]
pub enum RunloopError {
    /// Rejected configuration (negative timeout, negative return code, bad file).
    #[error("configuration error: {0}")]
    Config(String),

    /// A lifecycle hook failed.
    #[error("work failed: {0}")]
    Work(String),

    /// The shared resource could not be reset between iterations.
    #[error("resource reset failed: {0}")]
    Resource(String),

    /// OS signal listeners could not be installed.
    #[error("signal error: {0}")]
    Signal(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Voluntary shutdown raised from a checkpoint.
    #[error(transparent)]
    Shutdown(#[from] ShutdownInProgress),
}

impl RunloopError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a work error.
    #[must_use]
    pub fn work(msg: impl Into<String>) -> Self {
        Self::Work(msg.into())
    }

    /// Creates a resource error.
    #[must_use]
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Creates a signal error.
    #[must_use]
    pub fn signal(msg: impl Into<String>) -> Self {
        Self::Signal(msg.into())
    }

    /// Returns true if this is the voluntary-shutdown sentinel.
    #[must_use]
    pub const fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown(_))
    }

    /// Returns true if this error was caused by rejected configuration.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Sentinel returned by [`RunloopContext::checkpoint`](crate::RunloopContext::checkpoint)
/// once a shutdown has been requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownInProgress;

impl fmt::Display for ShutdownInProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("leaving the runloop early because a shutdown is requested")
    }
}

impl std::error::Error for ShutdownInProgress {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RunloopError::config("invalid timeout");
        assert_eq!(err.to_string(), "configuration error: invalid timeout");
    }

    #[test]
    fn test_shutdown_sentinel_is_not_config() {
        let err: RunloopError = ShutdownInProgress.into();
        assert!(err.is_shutdown());
        assert!(!err.is_config());
        assert!(err.to_string().contains("shutdown is requested"));
    }

    #[test]
    fn test_work_error_is_not_shutdown() {
        assert!(!RunloopError::work("boom").is_shutdown());
        assert!(!RunloopError::resource("cache").is_shutdown());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RunloopError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }
}
