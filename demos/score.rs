// Examples are allowed to use expect/unwrap for simplicity
#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Score updater example.
//!
//! Recomputes an average score every iteration and stores it in a file.
//!
//! # Usage
//!
//! ```bash
//! # Loop every 1.5 seconds until Ctrl-C
//! cargo run --example score
//!
//! # One iteration with a memory report
//! cargo run --example score -- --run-once --detect-leaks
//!
//! # Faster loop, debug logging
//! RUST_LOG=debug cargo run --example score -- --timeout 0.25
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use async_trait::async_trait;
use clap::Parser;
use daemonizable::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "score", about = "Keeps the average score file up to date")]
struct Cli {
    #[command(flatten)]
    runloop: RunloopArgs,

    /// Where to write the score.
    #[arg(long, default_value_os_t = std::env::temp_dir().join("daemonizable-avg-score.txt"))]
    out: PathBuf,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

struct ScoreUpdater {
    out: PathBuf,
    scores: Vec<u32>,
}

impl ScoreUpdater {
    fn average(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let total: u64 = self.scores.iter().map(|s| u64::from(*s)).sum();
        total as f64 / self.scores.len() as f64
    }
}

#[async_trait]
impl Work for ScoreUpdater {
    async fn starting(&mut self, _ctx: &mut RunloopContext) -> Result<()> {
        tracing::info!(out = %self.out.display(), "score updater starting");
        Ok(())
    }

    async fn do_work(&mut self, ctx: &mut RunloopContext) -> Result<i32> {
        ctx.output().write("Updating average score... ");

        let next = u32::try_from(ctx.iteration() % 100).unwrap_or(0);
        self.scores.push(next);
        let score = self.average();

        // Past this point the file is touched; leave now if asked to.
        ctx.yield_checkpoint().await?;

        if let Err(e) = tokio::fs::write(&self.out, format!("{score:.2}\n")).await {
            tracing::warn!(error = %e, "could not store score");
            ctx.set_return_code(1)?.request_shutdown();
            ctx.output().writeln("failed!");
        } else {
            ctx.output().writeln("done");
        }
        Ok(0)
    }

    async fn finish_iteration(&mut self, _ctx: &mut RunloopContext) -> Result<()> {
        if self.scores.len() > 1000 {
            self.scores.drain(..500);
        }
        Ok(())
    }

    async fn finalize(&mut self, ctx: &mut RunloopContext) -> Result<()> {
        tracing::info!(samples = self.scores.len(), "score updater stopping");
        ctx.output().writeln("Bye.");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut cli = Cli::parse();
    daemonizable::init_tracing(cli.verbose);

    if cli.runloop.timeout.is_none() && cli.runloop.config.is_none() {
        cli.runloop.timeout = Some(1.5);
    }

    let work = ScoreUpdater {
        out: cli.out,
        scores: Vec::new(),
    };

    let result = match cli.runloop.into_config("score-updater") {
        Ok(config) => match Runloop::new(work, config) {
            Ok(runloop) => runloop.run().await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(code) => exit_code(code),
        Err(e) => {
            tracing::error!(error = %e, "score updater failed");
            exit_code(if e.is_config() { 2 } else { 1 })
        }
    }
}
