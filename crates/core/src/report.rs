//! Reporting sink for user-facing build messages.
//!
//! The build target never prints directly. It writes severity-tagged lines
//! to a [`Report`], and the front-end decides how they look.

use std::sync::Mutex;

use tracing::{error, info, warn};

/// Severity of one report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Warn,
    Error,
    Success,
}

/// Sink with four severity-tagged write operations.
pub trait Report: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn success(&self, message: &str);
}

/// Forwards every line to `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReport;

impl Report for TracingReport {
    fn info(&self, message: &str) {
        info!(target: "tsdecl::report", "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(target: "tsdecl::report", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: "tsdecl::report", "{}", message);
    }

    fn success(&self, message: &str) {
        info!(target: "tsdecl::report", success = true, "{}", message);
    }
}

/// Records every line in memory, in write order.
#[derive(Debug, Default)]
pub struct MemoryReport {
    entries: Mutex<Vec<(ReportLevel, String)>>,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded lines.
    pub fn entries(&self) -> Vec<(ReportLevel, String)> {
        self.lock().clone()
    }

    /// Messages recorded at `level`, in write order.
    pub fn messages(&self, level: ReportLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn push(&self, level: ReportLevel, message: &str) {
        self.lock().push((level, message.to_string()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ReportLevel, String)>> {
        // Poisoned only if a writer panicked mid-push.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Report for MemoryReport {
    fn info(&self, message: &str) {
        self.push(ReportLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(ReportLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(ReportLevel::Error, message);
    }

    fn success(&self, message: &str) {
        self.push(ReportLevel::Success, message);
    }
}
