//! Daemonizable: endless, signal-aware runloop commands.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use daemonizable::prelude::*;
//!
//! // Re-exports from sub-crates for convenience
//! ```

pub use daemonizable_core as core;

/// Prelude module for common imports.
pub mod prelude {
    pub use daemonizable_core::{
        Output, Result, ResettableResource, Runloop, RunloopArgs, RunloopConfig, RunloopContext,
        RunloopError, ShutdownFlag, Work, exit_code,
    };
}

/// Installs a stderr `tracing` subscriber honoring `RUST_LOG`.
///
/// `verbose` raises the default level from `info` to `debug`. Calling this
/// twice is a no-op.
pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .try_init();
}
