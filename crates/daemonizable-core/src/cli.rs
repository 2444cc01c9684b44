//! Invocation options shared by every runloop command.
//!
//! Flatten [`RunloopArgs`] into a command's own parser:
//!
//! ```rust,ignore
//! #[derive(clap::Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     runloop: RunloopArgs,
//! }
//! ```

use std::path::PathBuf;

use clap::Args;

use crate::config::RunloopConfig;
use crate::error::Result;

/// Options read once, when the command starts.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct RunloopArgs {
    /// Run the command just once, do not go into an endless loop
    #[arg(long)]
    pub run_once: bool,

    /// Output information about memory usage after every iteration
    #[arg(long)]
    pub detect_leaks: bool,

    /// Seconds to sleep between two iterations
    #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
    pub timeout: Option<f64>,

    /// Path to a TOML runloop config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl RunloopArgs {
    /// Resolves the options into a configuration.
    ///
    /// The config file (or the defaults) is read first, then the flags
    /// override it. Flags only switch features on. `name` is used unless the
    /// file sets a name of its own.
    ///
    /// # Errors
    /// Returns a configuration error if the file is invalid or `--timeout`
    /// is negative.
    pub fn into_config(self, name: impl Into<String>) -> Result<RunloopConfig> {
        let mut config = match &self.config {
            Some(path) => RunloopConfig::read(path)?,
            None => RunloopConfig::new(String::new()),
        };
        if config.name.is_empty() {
            config.name = name.into();
        }
        if let Some(seconds) = self.timeout {
            config = config.with_timeout_secs(seconds)?;
        }
        config.run_once |= self.run_once;
        config.detect_leaks |= self.detect_leaks;
        config.validate()?;
        Ok(config)
    }
}
