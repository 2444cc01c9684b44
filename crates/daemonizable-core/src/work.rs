//! Unit-of-work trait and runloop context.
//!
//! Every command follows the same lifecycle contract: setup once, iterate
//! until shutdown, tear down once.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::{RunloopConfig, micros_to_secs, timeout_micros};
use crate::error::{Result, RunloopError, ShutdownInProgress};
use crate::output::Output;
use crate::shutdown::ShutdownFlag;
use crate::types::Phase;

/// The unit of work a runloop repeats.
///
/// Only [`do_work`](Work::do_work) is required; the other hooks default to
/// doing nothing.
///
/// # Lifecycle
///
/// 1. **starting**: one-time setup before the first iteration. An error here
///    ends the run without calling `finalize`.
///
/// 2. **start_iteration / do_work / finish_iteration**: called in this order
///    for every iteration until shutdown is requested. A started iteration is
///    never interrupted by the controller; call
///    [`RunloopContext::checkpoint`] inside long `do_work` bodies to leave
///    early at a safe point.
///
/// 3. **finalize**: one-time teardown after the loop ends. Keep it short: the
///    OS may be waiting for the process to exit.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use daemonizable_core::{Result, RunloopContext, Work};
///
/// struct Ticker;
///
/// #[async_trait]
/// impl Work for Ticker {
///     async fn do_work(&mut self, ctx: &mut RunloopContext) -> Result<i32> {
///         ctx.output().writeln("tick");
///         Ok(0)
///     }
/// }
/// ```
#[async_trait]
pub trait Work: Send {
    /// Called once, before the first iteration.
    ///
    /// # Errors
    /// Any error aborts the run; `finalize` is not called.
    async fn starting(&mut self, _ctx: &mut RunloopContext) -> Result<()> {
        Ok(())
    }

    /// Called before every `do_work`.
    ///
    /// # Errors
    /// Any error other than the shutdown sentinel ends the run.
    async fn start_iteration(&mut self, _ctx: &mut RunloopContext) -> Result<()> {
        Ok(())
    }

    /// Performs one unit of work and returns its exit status.
    ///
    /// Keep each call small. The status is logged but does not set the
    /// command's return code; use [`RunloopContext::set_return_code`] for that.
    ///
    /// # Errors
    /// Return the [`checkpoint`](RunloopContext::checkpoint) error to leave the
    /// loop early; any other error ends the run.
    async fn do_work(&mut self, ctx: &mut RunloopContext) -> Result<i32>;

    /// Called after every `do_work`.
    ///
    /// # Errors
    /// Any error other than the shutdown sentinel ends the run.
    async fn finish_iteration(&mut self, _ctx: &mut RunloopContext) -> Result<()> {
        Ok(())
    }

    /// Called once, after the loop has ended by any path.
    ///
    /// # Errors
    /// Errors are returned from the run as is.
    async fn finalize(&mut self, _ctx: &mut RunloopContext) -> Result<()> {
        Ok(())
    }
}

/// State owned by one runloop and handed to every hook.
pub struct RunloopContext {
    config: RunloopConfig,
    shutdown: ShutdownFlag,
    output: Box<dyn Output>,
    return_code: i32,
    timeout_micros: u64,
    phase: Phase,
    iteration: u64,
}

impl RunloopContext {
    /// Creates a context for `config`, writing to `output`.
    #[must_use]
    pub fn new(config: RunloopConfig, output: Box<dyn Output>) -> Self {
        let timeout_micros = u64::try_from(config.iteration_timeout.as_micros()).unwrap_or(u64::MAX);
        Self {
            config,
            shutdown: ShutdownFlag::new(),
            output,
            return_code: 0,
            timeout_micros,
            phase: Phase::Init,
            iteration: 0,
        }
    }

    /// Returns true once a shutdown has been requested.
    #[must_use]
    pub fn should_shutdown(&self) -> bool {
        self.shutdown.is_requested()
    }

    /// Asks the loop to end after the current iteration.
    ///
    /// The current iteration still completes; `finalize` runs afterwards.
    pub fn request_shutdown(&mut self) -> &mut Self {
        self.shutdown.request();
        self
    }

    /// Voluntary shutdown checkpoint.
    ///
    /// Call this inside a long `do_work` right before something that cannot be
    /// undone. Propagating the error with `?` skips the rest of the iteration
    /// (including `finish_iteration`) and goes straight to `finalize`.
    ///
    /// This only reads the shutdown flag. OS signals are turned into a request
    /// by a listener task, so on a current-thread runtime a signal is not seen
    /// here until the work has awaited something. Synchronous bodies should
    /// use [`yield_checkpoint`](Self::yield_checkpoint) instead.
    ///
    /// # Errors
    /// Returns [`RunloopError::Shutdown`] if a shutdown has been requested.
    pub fn checkpoint(&self) -> Result<()> {
        if self.should_shutdown() {
            return Err(ShutdownInProgress.into());
        }
        Ok(())
    }

    /// Like [`checkpoint`](Self::checkpoint), but yields to the runtime first
    /// so pending signals reach the shutdown flag.
    ///
    /// # Errors
    /// Returns [`RunloopError::Shutdown`] if a shutdown has been requested.
    pub fn yield_checkpoint(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        let flag = self.shutdown.clone();
        async move {
            tokio::task::yield_now().await;
            if flag.is_requested() {
                return Err(ShutdownInProgress.into());
            }
            Ok(())
        }
    }

    /// Sets the command's return code.
    ///
    /// # Errors
    /// Returns a configuration error if `code` is negative.
    pub fn set_return_code(&mut self, code: i32) -> Result<&mut Self> {
        if code < 0 {
            return Err(RunloopError::config(format!(
                "invalid return code {code}: must be non-negative"
            )));
        }
        self.return_code = code;
        Ok(self)
    }

    /// Returns the command's return code.
    #[must_use]
    pub const fn return_code(&self) -> i32 {
        self.return_code
    }

    /// Sets the pause between two iterations, in seconds.
    ///
    /// Stored as whole microseconds.
    ///
    /// # Errors
    /// Returns a configuration error for negative (including `-0.0`), NaN or
    /// infinite values.
    pub fn set_timeout(&mut self, seconds: f64) -> Result<&mut Self> {
        self.timeout_micros = timeout_micros(seconds)?;
        self.config.iteration_timeout = self.timeout_duration();
        Ok(self)
    }

    /// Returns the pause between two iterations, in seconds.
    #[must_use]
    pub fn timeout(&self) -> f64 {
        micros_to_secs(self.timeout_micros)
    }

    /// Sets the pause between two iterations.
    pub fn set_timeout_duration(&mut self, timeout: Duration) -> &mut Self {
        self.timeout_micros = u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX);
        self.config.iteration_timeout = self.timeout_duration();
        self
    }

    /// Returns the pause between two iterations.
    #[must_use]
    pub const fn timeout_duration(&self) -> Duration {
        Duration::from_micros(self.timeout_micros)
    }

    /// Returns the output sink.
    pub fn output(&mut self) -> &mut dyn Output {
        self.output.as_mut()
    }

    /// Returns the configuration. `iteration_timeout` follows the timeout
    /// mutators.
    #[must_use]
    pub const fn config(&self) -> &RunloopConfig {
        &self.config
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the 1-based number of the iteration in flight, 0 before the first.
    #[must_use]
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Returns a handle to the shutdown flag, for use from other tasks.
    #[must_use]
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    pub(crate) fn enter(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal phase transition {} -> {}",
            self.phase,
            next
        );
        tracing::debug!(name = %self.config.name, from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }

    pub(crate) fn replace_output(&mut self, output: Box<dyn Output>) {
        self.output = output;
    }

    pub(crate) fn begin_iteration(&mut self) {
        self.iteration += 1;
    }
}

impl std::fmt::Debug for RunloopContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunloopContext")
            .field("config", &self.config)
            .field("shutdown_requested", &self.should_shutdown())
            .field("return_code", &self.return_code)
            .field("timeout_micros", &self.timeout_micros)
            .field("phase", &self.phase)
            .field("iteration", &self.iteration)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{BufferedOutput, NullOutput};

    fn context() -> RunloopContext {
        RunloopContext::new(RunloopConfig::new("test"), Box::new(NullOutput))
    }

    #[test]
    fn test_context_defaults() {
        let ctx = context();
        assert!(!ctx.should_shutdown());
        assert_eq!(ctx.return_code(), 0);
        assert_eq!(ctx.timeout(), 5.0);
        assert_eq!(ctx.phase(), Phase::Init);
        assert_eq!(ctx.iteration(), 0);
    }

    #[test]
    fn test_request_shutdown() {
        let mut ctx = context();
        ctx.request_shutdown();
        assert!(ctx.should_shutdown());
        assert!(ctx.shutdown_flag().is_requested());
    }

    #[test]
    fn test_checkpoint_passes_without_shutdown() {
        let ctx = context();
        assert!(ctx.checkpoint().is_ok());
    }

    #[test]
    fn test_checkpoint_raises_sentinel() {
        let ctx = context();
        ctx.shutdown_flag().request();
        let err = ctx.checkpoint().unwrap_err();
        assert!(err.is_shutdown());
    }

    #[test]
    fn test_return_code_chaining() {
        let mut ctx = context();
        ctx.set_return_code(1).unwrap().request_shutdown();
        assert_eq!(ctx.return_code(), 1);
        assert!(ctx.should_shutdown());
    }

    #[test]
    fn test_timeout_duration() {
        let mut ctx = context();
        ctx.set_timeout_duration(Duration::from_millis(1500));
        assert_eq!(ctx.timeout(), 1.5);
        ctx.set_timeout(0.25).unwrap();
        assert_eq!(ctx.timeout_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_config_follows_timeout_mutators() {
        let mut ctx = context();
        ctx.set_timeout(0.25).unwrap();
        assert_eq!(ctx.config().iteration_timeout, Duration::from_millis(250));
        ctx.set_timeout_duration(Duration::from_secs(2));
        assert_eq!(ctx.config().iteration_timeout, Duration::from_secs(2));

        // a rejected value changes neither
        assert!(ctx.set_timeout(-1.0).is_err());
        assert_eq!(ctx.config().iteration_timeout, Duration::from_secs(2));
        assert_eq!(ctx.timeout(), 2.0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_yield_checkpoint_sees_request_from_other_task() {
        let ctx = context();
        let flag = ctx.shutdown_flag();
        tokio::spawn(async move { flag.request() });

        // the spawned task has not run yet
        assert!(ctx.checkpoint().is_ok());
        let err = ctx.yield_checkpoint().await.unwrap_err();
        assert!(err.is_shutdown());
    }

    #[tokio::test]
    async fn test_yield_checkpoint_passes_without_shutdown() {
        let ctx = context();
        assert!(ctx.yield_checkpoint().await.is_ok());
    }

    #[test]
    fn test_output_reaches_sink() {
        let buffer = BufferedOutput::new();
        let mut ctx = RunloopContext::new(RunloopConfig::new("test"), Box::new(buffer.clone()));
        ctx.output().writeln("Execute called");
        assert_eq!(buffer.contents(), "Execute called\n");
    }
}
