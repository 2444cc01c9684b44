//! Memory diagnostics for leak detection.
//!
//! After every iteration the runloop can sample the process' current and
//! peak memory usage and report how each moved since the previous sample.
//! The report is a side channel: it never changes control flow or the
//! return code.

use std::fmt;

use crate::output::Output;

/// Source of memory usage figures, in bytes.
pub trait MemoryProbe: Send {
    /// Current memory usage.
    fn current_usage(&self) -> u64;

    /// Peak memory usage since process start.
    fn peak_usage(&self) -> u64;
}

/// Memory usage of the running process.
///
/// - **Linux**: `VmRSS` and `VmHWM` from `/proc/self/status`
/// - **Other unix**: `getrusage(RUSAGE_SELF)` max RSS for both figures
/// - **Others**: always 0
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemory;

impl ProcessMemory {
    /// Creates the probe.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl MemoryProbe for ProcessMemory {
    fn current_usage(&self) -> u64 {
        platform::current_usage()
    }

    fn peak_usage(&self) -> u64 {
        platform::peak_usage()
    }
}

#[cfg(target_os = "linux")]
mod platform {
    pub fn current_usage() -> u64 {
        status_field("VmRSS:")
    }

    pub fn peak_usage() -> u64 {
        status_field("VmHWM:")
    }

    fn status_field(key: &str) -> u64 {
        match std::fs::read_to_string("/proc/self/status") {
            Ok(status) => parse_status_field(&status, key).unwrap_or(0),
            Err(e) => {
                tracing::trace!(error = %e, "cannot read /proc/self/status");
                0
            }
        }
    }

    /// Parses a `Key:   1234 kB` line into bytes.
    pub(super) fn parse_status_field(status: &str, key: &str) -> Option<u64> {
        let line = status.lines().find(|l| l.starts_with(key))?;
        let kib: u64 = line[key.len()..].split_whitespace().next()?.parse().ok()?;
        Some(kib * 1024)
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
mod platform {
    use nix::sys::resource::{UsageWho, getrusage};

    pub fn current_usage() -> u64 {
        max_rss()
    }

    pub fn peak_usage() -> u64 {
        max_rss()
    }

    fn max_rss() -> u64 {
        match getrusage(UsageWho::RUSAGE_SELF) {
            Ok(usage) => {
                let rss = u64::try_from(usage.max_rss()).unwrap_or(0);
                // macOS reports bytes, the BSDs kilobytes
                if cfg!(target_os = "macos") { rss } else { rss * 1024 }
            }
            Err(e) => {
                tracing::trace!(error = %e, "getrusage failed");
                0
            }
        }
    }
}

#[cfg(not(unix))]
mod platform {
    pub fn current_usage() -> u64 {
        0
    }

    pub fn peak_usage() -> u64 {
        0
    }
}

/// Direction of a memory figure since the previous sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// No change.
    Stable,
    /// Grew since the previous sample.
    Increasing,
    /// Shrank since the previous sample.
    Decreasing,
}

impl Trend {
    /// Classifies a signed delta.
    #[must_use]
    pub const fn from_diff(diff: i64) -> Self {
        if diff > 0 {
            Self::Increasing
        } else if diff < 0 {
            Self::Decreasing
        } else {
            Self::Stable
        }
    }

    /// Returns the label used in reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One memory figure compared with the previous one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySample {
    /// Bytes measured now.
    pub amount: u64,
    /// Signed change in bytes.
    pub diff: i64,
    /// Change relative to the previous amount, in percent. 0 when there was
    /// no previous amount.
    pub diff_percentage: f64,
    /// Direction of the change.
    pub trend: Trend,
}

impl MemorySample {
    /// Compares `amount` with `previous`.
    #[must_use]
    pub fn measure(amount: u64, previous: u64) -> Self {
        let diff = to_signed(amount).saturating_sub(to_signed(previous));
        let diff_percentage = if previous == 0 {
            0.0
        } else {
            diff as f64 / (previous as f64 / 100.0)
        };
        Self {
            amount,
            diff,
            diff_percentage,
            trend: Trend::from_diff(diff),
        }
    }

    /// Amount in KiB.
    #[must_use]
    pub fn kilobytes(&self) -> f64 {
        self.amount as f64 / 1024.0
    }
}

impl fmt::Display for MemorySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2} KByte {} ({:.3} %)",
            self.kilobytes(),
            self.trend,
            self.diff_percentage
        )
    }
}

fn to_signed(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}

/// Peak and current usage after one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryReport {
    /// Peak usage.
    pub peak: MemorySample,
    /// Current usage.
    pub current: MemorySample,
}

impl MemoryReport {
    /// Header line of the report.
    pub const HEADER: &'static str = "== MEMORY USAGE ==";

    /// Renders the report as lines, blank separator included.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        vec![
            Self::HEADER.to_string(),
            format!("Peak: {}", self.peak),
            format!("Cur.: {}", self.current),
            String::new(),
        ]
    }

    /// Writes the report to `output`.
    pub fn write_to(&self, output: &mut dyn Output) {
        for line in self.lines() {
            output.writeln(&line);
        }
    }
}

/// Tracks the previous samples between iterations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeakDetector {
    last_usage: u64,
    last_peak_usage: u64,
}

impl LeakDetector {
    /// Creates a detector with no previous samples.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last_usage: 0,
            last_peak_usage: 0,
        }
    }

    /// Samples `probe`, peak first, and remembers the figures.
    pub fn sample(&mut self, probe: &dyn MemoryProbe) -> MemoryReport {
        let peak = probe.peak_usage();
        let current = probe.current_usage();
        self.record(current, peak)
    }

    /// Compares the given figures with the previous ones and remembers them.
    pub fn record(&mut self, current: u64, peak: u64) -> MemoryReport {
        let report = MemoryReport {
            peak: MemorySample::measure(peak, self.last_peak_usage),
            current: MemorySample::measure(current, self.last_usage),
        };
        self.last_peak_usage = peak;
        self.last_usage = current;
        report
    }

    /// Last current usage seen.
    #[must_use]
    pub const fn last_usage(&self) -> u64 {
        self.last_usage
    }

    /// Last peak usage seen.
    #[must_use]
    pub const fn last_peak_usage(&self) -> u64 {
        self.last_peak_usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::BufferedOutput;

    #[test]
    fn test_first_sample_has_zero_percentage() {
        let sample = MemorySample::measure(100, 0);
        assert_eq!(sample.diff, 100);
        assert_eq!(sample.diff_percentage, 0.0);
        assert_eq!(sample.trend, Trend::Increasing);
    }

    #[test]
    fn test_sequence_100_150_100() {
        let mut detector = LeakDetector::new();
        detector.record(100, 100);

        let up = detector.record(150, 150);
        assert_eq!(up.current.trend, Trend::Increasing);
        assert_eq!(up.current.diff, 50);
        assert!((up.current.diff_percentage - 50.0).abs() < 1e-9);

        let down = detector.record(100, 150);
        assert_eq!(down.current.trend, Trend::Decreasing);
        assert_eq!(down.current.diff, -50);
        assert!((down.current.diff_percentage - (-100.0 / 3.0)).abs() < 1e-9);
        assert_eq!(down.peak.trend, Trend::Stable);
        assert_eq!(down.peak.diff_percentage, 0.0);
    }

    #[test]
    fn test_trend_labels() {
        assert_eq!(Trend::from_diff(0), Trend::Stable);
        assert_eq!(Trend::from_diff(-1).to_string(), "decreasing");
        assert_eq!(Trend::from_diff(1).as_str(), "increasing");
    }

    #[test]
    fn test_report_format() {
        let report = MemoryReport {
            peak: MemorySample::measure(150 * 1024, 100 * 1024),
            current: MemorySample::measure(100 * 1024, 150 * 1024),
        };
        let lines = report.lines();
        assert_eq!(lines[0], "== MEMORY USAGE ==");
        assert_eq!(lines[1], "Peak: 150.00 KByte increasing (50.000 %)");
        assert_eq!(lines[2], "Cur.: 100.00 KByte decreasing (-33.333 %)");
        assert_eq!(lines[3], "");

        let mut out = BufferedOutput::new();
        report.write_to(&mut out);
        assert_eq!(out.lines().len(), 4);
    }

    #[test]
    fn test_detector_remembers_figures() {
        let mut detector = LeakDetector::new();
        detector.record(10, 20);
        assert_eq!(detector.last_usage(), 10);
        assert_eq!(detector.last_peak_usage(), 20);
    }

    #[test]
    fn test_process_memory_probe_does_not_fail() {
        let probe = ProcessMemory::new();
        let _ = probe.current_usage();
        let _ = probe.peak_usage();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_parse_status_field() {
        let status = "Name:\tworker\nVmHWM:\t    2048 kB\nVmRSS:\t    1024 kB\n";
        assert_eq!(
            platform::parse_status_field(status, "VmRSS:"),
            Some(1024 * 1024)
        );
        assert_eq!(
            platform::parse_status_field(status, "VmHWM:"),
            Some(2048 * 1024)
        );
        assert_eq!(platform::parse_status_field(status, "VmSwap:"), None);
    }
}
