//! Runloop test harness.
//!
//! Runs a [`Work`] under a [`Runloop`] with captured output, an optional
//! delayed shutdown request and a hard deadline.

use std::time::{Duration, Instant};

use daemonizable_core::{BufferedOutput, MemoryProbe, Runloop, RunloopConfig, Work};

use crate::error::{Result, TestError};

/// Default upper bound on a harness run.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// Test harness for runloop lifecycle testing.
pub struct RunloopTestHarness {
    config: RunloopConfig,
    shutdown_after: Option<Duration>,
    signal_handlers: bool,
    deadline: Duration,
    probe: Option<Box<dyn MemoryProbe>>,
}

impl RunloopTestHarness {
    /// Creates a harness with a zero iteration timeout and no signal handlers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: RunloopConfig::new(name).with_timeout(Duration::ZERO),
            shutdown_after: None,
            signal_handlers: false,
            deadline: DEFAULT_DEADLINE,
            probe: None,
        }
    }

    /// Runs exactly one iteration.
    #[must_use]
    pub fn run_once(mut self) -> Self {
        self.config = self.config.with_run_once(true);
        self
    }

    /// Enables memory reports after each iteration.
    #[must_use]
    pub fn detect_leaks(mut self) -> Self {
        self.config = self.config.with_detect_leaks(true);
        self
    }

    /// Sets the sleep between iterations.
    #[must_use]
    pub fn iteration_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_timeout(timeout);
        self
    }

    /// Requests shutdown once `delay` has passed.
    #[must_use]
    pub const fn shutdown_after(mut self, delay: Duration) -> Self {
        self.shutdown_after = Some(delay);
        self
    }

    /// Installs the SIGINT/SIGTERM listeners for the run.
    #[must_use]
    pub const fn with_signal_handlers(mut self) -> Self {
        self.signal_handlers = true;
        self
    }

    /// Sets the deadline after which the run counts as hung.
    #[must_use]
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Substitutes the memory probe.
    #[must_use]
    pub fn memory_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Runs `work` to completion.
    ///
    /// # Errors
    /// Returns [`TestError::Timeout`] when the deadline passes first, or the
    /// runloop's own error.
    pub async fn run<W: Work + 'static>(self, work: W) -> Result<TestRun> {
        let output = BufferedOutput::new();
        let mut runloop = Runloop::new(work, self.config)?.with_output(output.clone());
        if let Some(probe) = self.probe {
            runloop = runloop.with_memory_probe(BoxedProbe(probe));
        }
        if !self.signal_handlers {
            runloop = runloop.without_signal_handlers();
        }

        if let Some(delay) = self.shutdown_after {
            let flag = runloop.shutdown_flag();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tracing::debug!(?delay, "harness requesting shutdown");
                flag.request();
            });
        }

        let start = Instant::now();
        let return_code = tokio::time::timeout(self.deadline, runloop.run())
            .await
            .map_err(|_| TestError::Timeout(self.deadline))??;

        Ok(TestRun {
            return_code,
            output: output.contents(),
            elapsed: start.elapsed(),
        })
    }
}

impl std::fmt::Debug for RunloopTestHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunloopTestHarness")
            .field("config", &self.config)
            .field("shutdown_after", &self.shutdown_after)
            .field("signal_handlers", &self.signal_handlers)
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

struct BoxedProbe(Box<dyn MemoryProbe>);

impl MemoryProbe for BoxedProbe {
    fn current_usage(&self) -> u64 {
        self.0.current_usage()
    }

    fn peak_usage(&self) -> u64 {
        self.0.peak_usage()
    }
}

/// Outcome of a harness run.
#[derive(Debug, Clone)]
pub struct TestRun {
    /// Process return code reported by the runloop.
    pub return_code: i32,
    /// Everything the work wrote to its output.
    pub output: String,
    /// Wall time from start to termination.
    pub elapsed: Duration,
}

impl TestRun {
    /// Output split into lines.
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        self.output.lines().collect()
    }

    /// Number of output lines equal to `line`.
    #[must_use]
    pub fn count_lines(&self, line: &str) -> usize {
        self.output.lines().filter(|l| *l == line).count()
    }
}
