//! The runloop controller.
//!
//! Drives a [`Work`] implementation through
//! `Init → Starting → Iterating* → Finalizing → Terminated`, sleeping between
//! iterations and ending cleanly when a shutdown is requested.

use tracing::{debug, info, trace, warn};

use crate::config::RunloopConfig;
use crate::error::{Result, RunloopError};
use crate::memory::{LeakDetector, MemoryProbe, ProcessMemory};
use crate::output::{ConsoleOutput, Output};
use crate::resource::ResettableResource;
use crate::shutdown::{ShutdownFlag, listen_for_signals};
use crate::types::Phase;
use crate::work::{RunloopContext, Work};

/// Runs a unit of work repeatedly until shutdown.
///
/// # Example
///
/// ```rust,ignore
/// let config = RunloopConfig::new("acme:mailer").with_timeout_secs(1.5)?;
/// let code = Runloop::new(Mailer::default(), config)?
///     .with_output(ConsoleOutput::default())
///     .run()
///     .await?;
/// ```
pub struct Runloop<W: Work> {
    work: W,
    ctx: RunloopContext,
    resource: Option<Box<dyn ResettableResource>>,
    probe: Box<dyn MemoryProbe>,
    leaks: LeakDetector,
    install_signal_handlers: bool,
}

impl<W: Work> Runloop<W> {
    /// Creates a runloop for `work`.
    ///
    /// Output goes to stdout until [`with_output`](Self::with_output) is used.
    ///
    /// # Errors
    /// Returns a configuration error if `config` is invalid.
    pub fn new(work: W, config: RunloopConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            work,
            ctx: RunloopContext::new(config, Box::new(ConsoleOutput::default())),
            resource: None,
            probe: Box::new(ProcessMemory::new()),
            leaks: LeakDetector::new(),
            install_signal_handlers: true,
        })
    }

    /// Replaces the output sink.
    #[must_use]
    pub fn with_output(mut self, output: impl Output + 'static) -> Self {
        self.ctx.replace_output(Box::new(output));
        self
    }

    /// Attaches a resource that is reset after every completed iteration.
    #[must_use]
    pub fn with_resource(mut self, resource: impl ResettableResource + 'static) -> Self {
        self.resource = Some(Box::new(resource));
        self
    }

    /// Replaces the memory probe used for leak diagnostics.
    #[must_use]
    pub fn with_memory_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Does not listen for SIGTERM/SIGINT; shutdown then only comes from the
    /// [`ShutdownFlag`], the work itself or `run_once`.
    #[must_use]
    pub const fn without_signal_handlers(mut self) -> Self {
        self.install_signal_handlers = false;
        self
    }

    /// Returns a handle that requests shutdown from another task.
    #[must_use]
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.ctx.shutdown_flag()
    }

    /// Returns the context.
    #[must_use]
    pub const fn context(&self) -> &RunloopContext {
        &self.ctx
    }

    /// Returns the context mutably, e.g. to set the timeout before running.
    pub fn context_mut(&mut self) -> &mut RunloopContext {
        &mut self.ctx
    }

    /// Returns the work.
    #[must_use]
    pub const fn work(&self) -> &W {
        &self.work
    }

    /// Sets the pause between two iterations, in seconds.
    ///
    /// # Errors
    /// Returns a configuration error for negative values.
    pub fn set_timeout(&mut self, seconds: f64) -> Result<&mut Self> {
        self.ctx.set_timeout(seconds)?;
        Ok(self)
    }

    /// Returns the pause between two iterations, in seconds.
    #[must_use]
    pub fn timeout(&self) -> f64 {
        self.ctx.timeout()
    }

    /// Sets the return code.
    ///
    /// # Errors
    /// Returns a configuration error for negative codes.
    pub fn set_return_code(&mut self, code: i32) -> Result<&mut Self> {
        self.ctx.set_return_code(code)?;
        Ok(self)
    }

    /// Returns the return code.
    #[must_use]
    pub const fn return_code(&self) -> i32 {
        self.ctx.return_code()
    }

    /// Runs the loop to completion and returns the return code.
    ///
    /// # Errors
    /// - errors from `starting` are returned without calling `finalize`;
    /// - errors from an iteration are returned after `finalize` ran;
    /// - errors from `finalize` are returned as is.
    ///
    /// The voluntary-shutdown sentinel is never returned.
    pub async fn run(mut self) -> Result<i32> {
        let _signals = if self.install_signal_handlers {
            Some(listen_for_signals(self.ctx.shutdown_flag())?)
        } else {
            None
        };

        info!(
            name = %self.ctx.config().name,
            timeout_ms = self.ctx.timeout_duration().as_millis() as u64,
            run_once = self.ctx.config().run_once,
            "runloop starting"
        );

        self.ctx.enter(Phase::Starting);
        let outcome = match self.work.starting(&mut self.ctx).await {
            Ok(()) => self.iterate().await,
            Err(e) if e.is_shutdown() => Err(e),
            Err(e) => return Err(e),
        };

        match outcome {
            Ok(()) => {}
            Err(e) if e.is_shutdown() => {
                debug!(iteration = self.ctx.iteration(), "left runloop at checkpoint");
            }
            Err(e) => {
                self.finalize_after_fault(&e).await;
                return Err(e);
            }
        }

        self.finalize().await?;
        info!(
            name = %self.ctx.config().name,
            iterations = self.ctx.iteration(),
            return_code = self.ctx.return_code(),
            "runloop terminated"
        );
        Ok(self.ctx.return_code())
    }

    async fn iterate(&mut self) -> Result<()> {
        while !self.ctx.should_shutdown() {
            self.ctx.enter(Phase::Iterating);
            self.ctx.begin_iteration();
            let iteration = self.ctx.iteration();

            self.work.start_iteration(&mut self.ctx).await?;
            let status = self.work.do_work(&mut self.ctx).await?;
            trace!(iteration, status, "work done");
            self.work.finish_iteration(&mut self.ctx).await?;

            if let Some(resource) = self.resource.as_mut() {
                resource.reset()?;
                trace!(iteration, resource = resource.name(), "resource reset");
            }

            if self.ctx.config().run_once {
                self.ctx.request_shutdown();
            }

            if self.ctx.config().detect_leaks {
                let report = self.leaks.sample(self.probe.as_ref());
                debug!(
                    iteration,
                    current = report.current.amount,
                    peak = report.peak.amount,
                    trend = %report.current.trend,
                    "memory usage"
                );
                report.write_to(self.ctx.output());
            }

            if !self.ctx.should_shutdown() {
                let timeout = self.ctx.timeout_duration();
                trace!(iteration, timeout_ms = timeout.as_millis() as u64, "sleeping");
                if self.ctx.shutdown_flag().sleep(timeout).await {
                    debug!(iteration, "sleep interrupted by shutdown request");
                }
            }
        }
        debug!(iterations = self.ctx.iteration(), "shutdown requested, leaving runloop");
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.ctx.enter(Phase::Finalizing);
        let result = match self.work.finalize(&mut self.ctx).await {
            Err(e) if e.is_shutdown() => Ok(()),
            other => other,
        };
        self.ctx.enter(Phase::Terminated);
        result
    }

    async fn finalize_after_fault(&mut self, fault: &RunloopError) {
        warn!(iteration = self.ctx.iteration(), error = %fault, "iteration failed, finalizing");
        if let Err(e) = self.finalize().await {
            warn!(error = %e, "finalize failed after iteration fault");
        }
    }
}

impl<W: Work> std::fmt::Debug for Runloop<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runloop")
            .field("ctx", &self.ctx)
            .field("has_resource", &self.resource.is_some())
            .field("leaks", &self.leaks)
            .field("install_signal_handlers", &self.install_signal_handlers)
            .finish_non_exhaustive()
    }
}
