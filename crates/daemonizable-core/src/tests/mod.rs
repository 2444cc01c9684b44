//! Runloop behavior tests.
//!
//! | Category | File | Covers |
//! |----------|------|--------|
//! | A | `lifecycle.rs` | hook order, run-once, checkpoint, fault handling |
//! | B | `signal.rs` | shutdown requests, interruptible sleep |
//! | C | `diagnostics.rs` | memory reports |
//! | D | `properties.rs` | timeout and return code properties |

pub mod properties;
pub mod signal;

pub use mocks::{MockCounters, MockWork, ScriptedProbe};
