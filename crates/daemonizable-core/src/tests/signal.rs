//! Category B: shutdown request tests.
//!
//! Real OS signals are raised in the `os_signals` integration test, which
//! runs in its own process.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::RunloopConfig;
use crate::error::Result;
use crate::output::NullOutput;
use crate::runloop::Runloop;
use crate::shutdown::ShutdownFlag;
use crate::tests::mocks::MockWork;
use crate::types::Signal;
use crate::work::{RunloopContext, Work};

/// A shutdown request during the sleep ends the loop well before the timeout.
#[tokio::test]
async fn request_interrupts_sleep() {
    let work = MockWork::new();
    let counters = work.counters();
    let runloop = Runloop::new(
        work,
        RunloopConfig::new("test").with_timeout(Duration::from_secs(30)),
    )
    .unwrap()
    .with_output(NullOutput)
    .without_signal_handlers();

    let flag = runloop.shutdown_flag();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        flag.request();
    });

    let start = Instant::now();
    let code = tokio::time::timeout(Duration::from_secs(10), runloop.run())
        .await
        .expect("shutdown should interrupt the sleep")
        .unwrap();

    assert_eq!(code, 0);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(counters.do_work(), 1);
    assert_eq!(counters.finish_iteration(), 1);
    assert_eq!(counters.finalize(), 1);
}

/// Work that takes a while and never checks for shutdown.
struct SlowWork {
    finished: Arc<AtomicU32>,
}

#[async_trait]
impl Work for SlowWork {
    async fn do_work(&mut self, _ctx: &mut RunloopContext) -> Result<i32> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(0)
    }

    async fn finish_iteration(&mut self, ctx: &mut RunloopContext) -> Result<()> {
        assert!(ctx.should_shutdown());
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A request arriving mid-phase does not preempt the iteration.
#[tokio::test]
async fn request_mid_work_does_not_preempt_iteration() {
    let finished = Arc::new(AtomicU32::new(0));
    let work = SlowWork {
        finished: Arc::clone(&finished),
    };
    let runloop = Runloop::new(work, RunloopConfig::new("test"))
        .unwrap()
        .with_output(NullOutput)
        .without_signal_handlers();

    let flag = runloop.shutdown_flag();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        flag.request();
    });

    assert_eq!(runloop.run().await.unwrap(), 0);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
}

/// Listening for OS signals does not request shutdown by itself.
#[tokio::test]
async fn signal_handlers_install_cleanly() {
    let work = MockWork::new();
    let counters = work.counters();
    let code = Runloop::new(work, RunloopConfig::new("test").with_run_once(true))
        .unwrap()
        .with_output(NullOutput)
        .run()
        .await
        .unwrap();

    assert_eq!(code, 0);
    assert_eq!(counters.do_work(), 1);
}

/// Interrupt and terminate are reported under their Unix names and numbers.
#[test]
fn listened_signals() {
    assert_eq!((Signal::Int.to_string(), Signal::Int.as_i32()), ("SIGINT".to_string(), 2));
    assert_eq!((Signal::Term.to_string(), Signal::Term.as_i32()), ("SIGTERM".to_string(), 15));
}

/// Repeated requests are harmless and the flag never resets.
#[test]
fn flag_is_monotonic() {
    let flag = ShutdownFlag::new();
    for _ in 0..3 {
        flag.request();
        assert!(flag.is_requested());
    }
}
