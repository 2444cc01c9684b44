//! Core types for the runloop state machine.
//!
//! Transitions are explicit, there are no implicit jumps back.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Runloop lifecycle phase.
///
/// ```text
/// Init → Starting → Iterating* → Finalizing → Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Controller constructed, `run` not called yet.
    #[default]
    Init,
    /// One-time setup (`starting` hook).
    Starting,
    /// Inside the start/work/finish cycle or the sleep after it.
    Iterating,
    /// One-time teardown (`finalize` hook).
    Finalizing,
    /// `run` has returned.
    Terminated,
}

impl Phase {
    /// Returns true if `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::Starting)
                | (Self::Starting, Self::Iterating | Self::Finalizing)
                | (Self::Iterating, Self::Iterating | Self::Finalizing)
                | (Self::Finalizing, Self::Terminated)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Starting => "starting",
            Self::Iterating => "iterating",
            Self::Finalizing => "finalizing",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Termination signals the controller listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// Interrupt (Ctrl+C).
    Int,
    /// Terminate.
    Term,
}

impl Signal {
    /// Returns the Unix signal number.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        match self {
            Self::Int => 2,
            Self::Term => 15,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("SIGINT"),
            Self::Term => f.write_str("SIGTERM"),
        }
    }
}

/// Maps a runloop return code onto a process exit status byte.
///
/// Codes above 255 saturate; negative codes cannot be stored in a context.
#[must_use]
pub fn exit_status(code: i32) -> u8 {
    u8::try_from(code.max(0)).unwrap_or(u8::MAX)
}

/// Converts a runloop return code into a [`std::process::ExitCode`].
#[must_use]
pub fn exit_code(code: i32) -> std::process::ExitCode {
    std::process::ExitCode::from(exit_status(code))
}
