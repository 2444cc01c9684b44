//! Test infrastructure error types.

use std::time::Duration;

use daemonizable_core::RunloopError;

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, TestError>;

/// Harness errors.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// The runloop did not terminate within the harness deadline.
    #[error("runloop still running after {0:?}")]
    Timeout(Duration),

    /// The runloop returned an error.
    #[error("runloop error: {0}")]
    Runloop(#[from] RunloopError),
}

impl TestError {
    /// Returns the runloop error, if that is what failed.
    #[must_use]
    pub const fn as_runloop(&self) -> Option<&RunloopError> {
        match self {
            Self::Runloop(e) => Some(e),
            Self::Timeout(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error() {
        let err = TestError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("still running"));
        assert!(err.as_runloop().is_none());
    }

    #[test]
    fn test_runloop_error_conversion() {
        let err: TestError = RunloopError::work("boom").into();
        assert!(err.to_string().contains("boom"));
        assert!(err.as_runloop().is_some());
    }
}
