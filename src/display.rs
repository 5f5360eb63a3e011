//! Live status line
//!
//! Both the aggregator and the controller write to the same single line.
//! On a terminal it is an indicatif spinner whose message is replaced on
//! every update; otherwise each update is printed as its own line.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::fmt;
use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the status line currently says
#[derive(Debug, Clone, PartialEq)]
pub enum StatusLine {
    /// Gap and rate after an applied sample
    Progress {
        gap: f64,
        rate: f64,
        interval_secs: u64,
    },
    /// A poll failed; `failures` counts every failure so far
    FetchFailed { error: String, failures: u32 },
    /// Gap closed
    CaughtUp,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Progress {
                gap,
                rate,
                interval_secs,
            } => {
                let interval = (*interval_secs).max(1) as i64;
                let speed = if *rate < 0.0 {
                    format!("catching up at {}/s", -(*rate as i64) / interval)
                } else {
                    format!("falling behind at {}/s", (*rate as i64) / interval)
                };
                write!(
                    f,
                    "Catching up, {} checkpoints behind ({})",
                    *gap as i64, speed
                )
            }
            StatusLine::FetchFailed { error, failures } => {
                write!(
                    f,
                    "Error fetching metrics: {} {}",
                    error,
                    failure_indicator(*failures)
                )
            }
            StatusLine::CaughtUp => f.write_str("Node caught up"),
        }
    }
}

/// One marker per failure so a stuck poll is visible at a glance
pub fn failure_indicator(failures: u32) -> String {
    ".".repeat(failures as usize)
}

/// Destination for status updates
pub trait StatusSink: Send + Sync {
    /// Replace the current line
    fn show(&self, line: &StatusLine);

    /// Stop redrawing, leaving the last line in place
    fn finish(&self);
}

/// Pick a sink for stdout: a live spinner on a terminal, plain lines otherwise
pub fn stdout_sink() -> Arc<dyn StatusSink> {
    if std::io::stdout().is_terminal() {
        Arc::new(TerminalStatus::new())
    } else {
        Arc::new(PlainStatus::new(Box::new(std::io::stdout())))
    }
}

/// Spinner line redrawn in place on stdout
pub struct TerminalStatus {
    bar: ProgressBar,
}

impl TerminalStatus {
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        let style = ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl Default for TerminalStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for TerminalStatus {
    fn show(&self, line: &StatusLine) {
        self.bar.set_message(line.to_string());
    }

    fn finish(&self) {
        self.bar.finish();
    }
}

/// Writes every update as a new line, for pipes and log files
pub struct PlainStatus {
    out: Mutex<Box<dyn Write + Send>>,
}

impl PlainStatus {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl StatusSink for PlainStatus {
    fn show(&self, line: &StatusLine) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            tracing::debug!(error = %e, "Failed to write status line");
        }
    }

    fn finish(&self) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(e) = out.flush() {
            tracing::debug!(error = %e, "Failed to flush status output");
        }
    }
}
