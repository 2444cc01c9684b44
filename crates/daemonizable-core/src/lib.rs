// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # daemonizable-core
//!
//! Endless runloop commands that cooperate with OS shutdown signals.
//!
//! This crate provides:
//!
//! - [`Work`] trait for the unit of work and its lifecycle hooks
//! - [`Runloop`] controller driving the work until shutdown
//! - [`RunloopContext`] handed to every hook (return code, timeout, output,
//!   voluntary shutdown checkpoint)
//! - [`RunloopConfig`] and [`RunloopArgs`] for configuration
//! - [`ShutdownFlag`] for requesting shutdown from other tasks
//! - [`LeakDetector`] memory diagnostics
//!
//! ## Example
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use daemonizable_core::{Result, Runloop, RunloopConfig, RunloopContext, Work};
//!
//! struct Ticker;
//!
//! #[async_trait]
//! impl Work for Ticker {
//!     async fn do_work(&mut self, ctx: &mut RunloopContext) -> Result<i32> {
//!         ctx.output().writeln("tick");
//!         Ok(0)
//!     }
//! }
//!
//! let code = Runloop::new(Ticker, RunloopConfig::new("ticker"))?.run().await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod memory;
pub mod output;
pub mod resource;
pub mod runloop;
pub mod shutdown;
#[cfg(test)]
pub mod tests;
pub mod types;
pub mod work;

pub use cli::RunloopArgs;
pub use config::{DEFAULT_TIMEOUT, RunloopConfig};
pub use error::{Result, RunloopError, ShutdownInProgress};
pub use memory::{LeakDetector, MemoryProbe, MemoryReport, MemorySample, ProcessMemory, Trend};
pub use output::{BufferedOutput, ConsoleOutput, NullOutput, Output, Verbosity};
pub use resource::ResettableResource;
pub use runloop::Runloop;
pub use shutdown::{ShutdownFlag, SignalGuard, listen_for_signals};
pub use types::{Phase, Signal, exit_code, exit_status};
pub use work::{RunloopContext, Work};
