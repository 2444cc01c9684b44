//! Line-oriented output sinks.
//!
//! Writes never fail from the caller's point of view: a sink that cannot
//! deliver text drops it.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Text sink for status and diagnostic output.
pub trait Output: Send {
    /// Writes text without a trailing newline.
    fn write(&mut self, text: &str);

    /// Writes a line.
    fn writeln(&mut self, line: &str) {
        self.write(line);
        self.write("\n");
    }

    /// Returns true if this sink discards everything written to it.
    fn is_quiet(&self) -> bool {
        false
    }
}

/// Console verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Swallow all output.
    Quiet,
    /// Write to stdout.
    #[default]
    Normal,
}

/// Sink writing to stdout.
#[derive(Debug, Default)]
pub struct ConsoleOutput {
    verbosity: Verbosity,
}

impl ConsoleOutput {
    /// Creates a console sink.
    #[must_use]
    pub const fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Creates a console sink that swallows everything.
    #[must_use]
    pub const fn quiet() -> Self {
        Self::new(Verbosity::Quiet)
    }

    /// Returns the verbosity.
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        self.verbosity
    }
}

impl Output for ConsoleOutput {
    fn write(&mut self, text: &str) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
            tracing::trace!(error = %e, "dropped console output");
        }
    }

    fn is_quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }
}

/// In-memory sink.
///
/// Clones share the same buffer, so a test can keep one handle and give the
/// other to the runloop.
#[derive(Debug, Clone, Default)]
pub struct BufferedOutput {
    buffer: Arc<Mutex<String>>,
}

impl BufferedOutput {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything written so far.
    #[must_use]
    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Returns everything written so far and empties the buffer.
    pub fn fetch(&self) -> String {
        std::mem::take(&mut *self.buffer.lock())
    }

    /// Returns the written lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.buffer.lock().lines().map(str::to_owned).collect()
    }
}

impl Output for BufferedOutput {
    fn write(&mut self, text: &str) {
        self.buffer.lock().push_str(text);
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

impl Output for NullOutput {
    fn write(&mut self, _text: &str) {}

    fn is_quiet(&self) -> bool {
        true
    }
}
