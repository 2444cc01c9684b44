// Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # daemonizable-test
//!
//! Testing infrastructure for daemonizable runloops.
//!
//! This crate provides:
//! - **Test harness**: runs a [`Work`](daemonizable_core::Work) with captured
//!   output, a delayed shutdown request and a deadline
//! - **Scripted work**: closure-driven work that records its hook calls
//!
//! ## Example
//!
//! ```rust,ignore
//! use daemonizable_test::{RunloopTestHarness, ScriptedWork};
//!
//! let run = RunloopTestHarness::new("ticker")
//!     .run_once()
//!     .run(ScriptedWork::ticker())
//!     .await?;
//! assert_eq!(run.lines(), vec!["tick"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod harness;
pub mod scripted;

pub use error::{Result, TestError};
pub use harness::{DEFAULT_DEADLINE, RunloopTestHarness, TestRun};
pub use scripted::{Hook, ScriptedWork, WorkLog};
