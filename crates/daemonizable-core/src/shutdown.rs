//! Shutdown coordination.
//!
//! The [`ShutdownFlag`] is the only state shared between the runloop and the
//! OS signal listener. It moves from false to true once and never back.
//! The listener does nothing but flip it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::Result;
#[cfg(unix)]
use crate::error::RunloopError;
use crate::types::Signal;

/// Monotonic shutdown request shared across tasks.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    inner: Arc<FlagInner>,
}

#[derive(Debug, Default)]
struct FlagInner {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownFlag {
    /// Creates a flag with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown and wakes every task sleeping on this flag.
    pub fn request(&self) {
        if !self.inner.requested.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns true once a shutdown has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Waits until a shutdown is requested.
    pub async fn wait(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent request cannot
        // slip between the check and the await.
        notified.as_mut().enable();
        if self.is_requested() {
            return;
        }
        notified.await;
    }

    /// Sleeps for `duration` or until a shutdown is requested.
    ///
    /// Returns true if the sleep ended because of a shutdown request.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            () = self.wait() => true,
            () = tokio::time::sleep(duration) => self.is_requested(),
        }
    }
}

/// Keeps the OS signal listener alive; aborts it on drop.
#[derive(Debug)]
pub struct SignalGuard {
    task: JoinHandle<()>,
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Installs SIGTERM and SIGINT listeners that request shutdown on `flag`.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
/// Returns a signal error if a listener cannot be registered.
#[cfg(unix)]
pub fn listen_for_signals(flag: ShutdownFlag) -> Result<SignalGuard> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())
        .map_err(|e| RunloopError::signal(format!("failed to listen for SIGTERM: {e}")))?;
    let mut int = signal(SignalKind::interrupt())
        .map_err(|e| RunloopError::signal(format!("failed to listen for SIGINT: {e}")))?;

    let task = tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                sig = term.recv() => sig.map(|()| Signal::Term),
                sig = int.recv() => sig.map(|()| Signal::Int),
            };
            let Some(signal) = received else { break };
            tracing::info!(%signal, signo = signal.as_i32(), "shutdown signal received");
            flag.request();
        }
    });

    Ok(SignalGuard { task })
}

/// Installs a Ctrl+C listener that requests shutdown on `flag`.
///
/// # Errors
/// Never fails on this platform; registration errors end the listener.
#[cfg(not(unix))]
pub fn listen_for_signals(flag: ShutdownFlag) -> Result<SignalGuard> {
    let task = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!(signal = %Signal::Int, signo = Signal::Int.as_i32(), "shutdown signal received");
            flag.request();
        }
    });

    Ok(SignalGuard { task })
}
