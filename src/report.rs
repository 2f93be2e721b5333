//! Status reporting - where send outcomes go.
//!
//! The session pushes one `AttemptReport` per send attempt and one
//! `RunSummary` at the end. Reporters are pure sinks; nothing is read back.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use colored::*;

use crate::input::MonitorExit;
use crate::sender::LoopReport;

/// Result of a single send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Success,
    Failure(String),
    /// Cut short by the shutdown abort
    Aborted,
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Success)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptReport {
    pub sequence: u64,
    pub outcome: SendOutcome,
    pub at: DateTime<Utc>,
}

impl AttemptReport {
    pub fn new(sequence: u64, outcome: SendOutcome) -> Self {
        Self {
            sequence,
            outcome,
            at: Utc::now(),
        }
    }
}

/// End-of-session totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub report: LoopReport,
    pub exit: Option<MonitorExit>,
    /// Set when the session ended on a fatal error
    pub error: Option<String>,
}

/// Sink for session status.
pub trait Reporter: Send + Sync {
    fn attempt(&self, report: &AttemptReport);
    fn summary(&self, summary: &RunSummary);
}

/// Prints colored status lines to stdout.
///
/// Lines end in `\r\n` because the terminal is in raw mode while a session
/// runs.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    fn write_line(&self, line: &str) {
        let mut out = io::stdout().lock();
        // A closed stdout must not take the session down with it
        let _ = write!(out, "{}\r\n", line);
        let _ = out.flush();
    }
}

pub fn format_attempt(report: &AttemptReport) -> String {
    let when = report.at.format("%H:%M:%S");
    match &report.outcome {
        SendOutcome::Success => format!(
            "{} Run {} {}",
            when.to_string().dimmed(),
            report.sequence.to_string().blue(),
            "sent".green()
        ),
        SendOutcome::Failure(reason) => format!(
            "{} Run {} {} {}",
            when.to_string().dimmed(),
            report.sequence.to_string().blue(),
            "failed:".red(),
            reason
        ),
        SendOutcome::Aborted => format!(
            "{} Run {} {}",
            when.to_string().dimmed(),
            report.sequence.to_string().blue(),
            "aborted".yellow()
        ),
    }
}

pub fn format_summary(summary: &RunSummary) -> String {
    let report = &summary.report;
    let mut line = format!(
        "{} {} attempts, {} sent, {} failed",
        "Stopped:".yellow(),
        report.attempts,
        report.succeeded.to_string().green(),
        report.failed.to_string().red()
    );
    if report.aborted {
        line.push_str(", last send aborted");
    }
    if let Some(error) = &summary.error {
        line.push_str(&format!(" ({} {})", "error:".red(), error));
    }
    line
}

impl Reporter for ConsoleReporter {
    fn attempt(&self, report: &AttemptReport) {
        self.write_line(&format_attempt(report));
    }

    fn summary(&self, summary: &RunSummary) {
        self.write_line(&format_summary(summary));
    }
}

/// Keeps every report in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    attempts: Mutex<Vec<AttemptReport>>,
    summaries: Mutex<Vec<RunSummary>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> Vec<AttemptReport> {
        lock(&self.attempts).clone()
    }

    pub fn outcomes(&self) -> Vec<SendOutcome> {
        lock(&self.attempts).iter().map(|a| a.outcome.clone()).collect()
    }

    pub fn sequences(&self) -> Vec<u64> {
        lock(&self.attempts).iter().map(|a| a.sequence).collect()
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        lock(&self.summaries).clone()
    }
}

impl Reporter for RecordingReporter {
    fn attempt(&self, report: &AttemptReport) {
        lock(&self.attempts).push(report.clone());
    }

    fn summary(&self, summary: &RunSummary) {
        lock(&self.summaries).push(summary.clone());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
