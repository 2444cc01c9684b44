//! Runloop configuration.
//!
//! Configuration is validated when it is built or loaded, never clamped later.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RunloopError};

/// Default pause between two iterations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Largest timeout, in seconds, that fits in whole microseconds.
const MAX_TIMEOUT_SECS: f64 = u64::MAX as f64 / MICROS_PER_SEC;

/// Settings for one runloop invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunloopConfig {
    /// Command name, used in logs.
    ///
    /// Config files may leave it out; the command then supplies it (see
    /// [`RunloopArgs::into_config`](crate::cli::RunloopArgs::into_config)).
    #[serde(default)]
    pub name: String,

    /// Pause between two iterations.
    #[serde(default = "default_iteration_timeout")]
    #[serde(with = "humantime_serde")]
    pub iteration_timeout: Duration,

    /// Run a single iteration, then finalize.
    #[serde(default)]
    pub run_once: bool,

    /// Report memory usage after every iteration.
    #[serde(default)]
    pub detect_leaks: bool,
}

fn default_iteration_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl RunloopConfig {
    /// Creates a configuration with defaults for everything but the name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            iteration_timeout: default_iteration_timeout(),
            run_once: false,
            detect_leaks: false,
        }
    }

    /// Sets the iteration timeout from a number of seconds.
    ///
    /// # Errors
    /// Returns a configuration error for negative (including `-0.0`),
    /// NaN or infinite values.
    pub fn with_timeout_secs(mut self, seconds: f64) -> Result<Self> {
        let micros = timeout_micros(seconds)?;
        self.iteration_timeout = Duration::from_micros(micros);
        Ok(self)
    }

    /// Sets the iteration timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.iteration_timeout = timeout;
        self
    }

    /// Enables or disables single-iteration mode.
    #[must_use]
    pub const fn with_run_once(mut self, run_once: bool) -> Self {
        self.run_once = run_once;
        self
    }

    /// Enables or disables memory diagnostics.
    #[must_use]
    pub const fn with_detect_leaks(mut self, detect_leaks: bool) -> Self {
        self.detect_leaks = detect_leaks;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the name is empty or contains characters other
    /// than alphanumerics, `-`, `_` and `:`.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(RunloopError::config("name cannot be empty"));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ':'))
        {
            return Err(RunloopError::config(
                "name must contain only alphanumeric characters, hyphens, underscores and colons",
            ));
        }
        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text cannot be parsed or validated.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file without validating it, so the caller can fill in
    /// the name first.
    pub(crate) fn read(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RunloopError::config(format!("failed to read config: {e}")))?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| RunloopError::config(format!("failed to parse config: {e}")))
    }
}

/// Converts a timeout in seconds to whole microseconds.
///
/// # Errors
/// Rejects negative values (the sign bit is checked, so `-0.0` is rejected
/// too), NaN, infinity and anything too large for `u64` microseconds.
pub(crate) fn timeout_micros(seconds: f64) -> Result<u64> {
    if seconds.is_nan() || seconds.is_sign_negative() || seconds.is_infinite() {
        return Err(RunloopError::config(format!(
            "invalid timeout {seconds}: must be a finite, non-negative number of seconds"
        )));
    }
    let micros = (seconds * MICROS_PER_SEC).round();
    if micros >= u64::MAX as f64 {
        return Err(RunloopError::config(format!(
            "invalid timeout {seconds}: must not exceed {MAX_TIMEOUT_SECS:.0} seconds"
        )));
    }
    Ok(micros as u64)
}

/// Converts microseconds back to seconds.
pub(crate) fn micros_to_secs(micros: u64) -> f64 {
    micros as f64 / MICROS_PER_SEC
}

/// Serde helper for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
