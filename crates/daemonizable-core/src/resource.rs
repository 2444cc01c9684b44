//! Per-iteration reset of a shared resource.
//!
//! Long-running loops that use a cache, an identity map or a session tend to
//! accumulate state across iterations. A [`ResettableResource`] attached to the
//! runloop is cleared once after every completed iteration.

use crate::error::Result;

/// Shared resource cleared between iterations.
pub trait ResettableResource: Send {
    /// Name used in logs.
    fn name(&self) -> &str {
        "resource"
    }

    /// Drops whatever state the last iteration accumulated.
    ///
    /// # Errors
    /// A failed reset is a work fault and ends the runloop.
    fn reset(&mut self) -> Result<()>;
}

impl<F> ResettableResource for F
where
    F: FnMut() -> Result<()> + Send,
{
    fn reset(&mut self) -> Result<()> {
        self()
    }
}
