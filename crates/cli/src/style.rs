//! Terminal styling and the console report sink.

use console::{Style, Term};

use tsdecl_core::Report;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create an info-styled string (blue bullet).
pub fn info(msg: &str) -> String {
    let style = Style::new().blue();
    format!("{} {}", style.apply_to("ℹ"), msg)
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Writes report lines to stderr, prefixed with a target label.
pub struct ConsoleReport {
    term: Term,
    label: String,
}

impl ConsoleReport {
    pub fn new(label: &str) -> Self {
        Self {
            term: Term::stderr(),
            label: format!("[{}]", label),
        }
    }

    fn line(&self, styled: String) {
        // Nothing useful can be done if stderr is gone.
        let _ = self
            .term
            .write_line(&format!("{} {}", dim(&self.label), styled));
    }
}

impl Report for ConsoleReport {
    fn info(&self, message: &str) {
        self.line(info(message));
    }

    fn warn(&self, message: &str) {
        self.line(warn(message));
    }

    fn error(&self, message: &str) {
        self.line(error(message));
    }

    fn success(&self, message: &str) {
        self.line(success(message));
    }
}
