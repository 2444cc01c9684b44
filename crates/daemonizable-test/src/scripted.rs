//! Closure-driven work for tests.

use std::sync::Arc;

use async_trait::async_trait;
use daemonizable_core::{Result, RunloopContext, Work};
use parking_lot::Mutex;

/// Lifecycle hook identifiers, as recorded by [`ScriptedWork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// `starting`
    Starting,
    /// `start_iteration`
    StartIteration,
    /// `do_work`
    DoWork,
    /// `finish_iteration`
    FinishIteration,
    /// `finalize`
    Finalize,
}

/// Ordered record of the hooks a [`ScriptedWork`] received.
#[derive(Debug, Default)]
pub struct WorkLog {
    events: Mutex<Vec<Hook>>,
}

impl WorkLog {
    fn push(&self, hook: Hook) {
        self.events.lock().push(hook);
    }

    /// All hooks in call order.
    #[must_use]
    pub fn events(&self) -> Vec<Hook> {
        self.events.lock().clone()
    }

    /// Number of calls to `hook`.
    #[must_use]
    pub fn count(&self, hook: Hook) -> usize {
        self.events.lock().iter().filter(|h| **h == hook).count()
    }
}

type Step = Box<dyn FnMut(&mut RunloopContext) -> Result<i32> + Send>;

/// Work whose `do_work` is a closure. Every hook call is logged.
pub struct ScriptedWork {
    step: Step,
    log: Arc<WorkLog>,
}

impl ScriptedWork {
    /// Creates work running `step` on every iteration.
    pub fn new(step: impl FnMut(&mut RunloopContext) -> Result<i32> + Send + 'static) -> Self {
        Self {
            step: Box::new(step),
            log: Arc::new(WorkLog::default()),
        }
    }

    /// Creates work writing a `tick` line on every iteration.
    #[must_use]
    pub fn ticker() -> Self {
        Self::new(|ctx| {
            ctx.output().writeln("tick");
            Ok(0)
        })
    }

    /// Returns the shared hook log.
    #[must_use]
    pub fn log(&self) -> Arc<WorkLog> {
        Arc::clone(&self.log)
    }
}

impl std::fmt::Debug for ScriptedWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedWork")
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Work for ScriptedWork {
    async fn starting(&mut self, _ctx: &mut RunloopContext) -> Result<()> {
        self.log.push(Hook::Starting);
        Ok(())
    }

    async fn start_iteration(&mut self, _ctx: &mut RunloopContext) -> Result<()> {
        self.log.push(Hook::StartIteration);
        Ok(())
    }

    async fn do_work(&mut self, ctx: &mut RunloopContext) -> Result<i32> {
        self.log.push(Hook::DoWork);
        (self.step)(ctx)
    }

    async fn finish_iteration(&mut self, _ctx: &mut RunloopContext) -> Result<()> {
        self.log.push(Hook::FinishIteration);
        Ok(())
    }

    async fn finalize(&mut self, _ctx: &mut RunloopContext) -> Result<()> {
        self.log.push(Hook::Finalize);
        Ok(())
    }
}
