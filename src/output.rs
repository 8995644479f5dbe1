//! Output handler implementations: console, null, buffered.
//!
//! The sync engine narrates through the `OutputHandler` trait and never
//! consults it for decisions: a no-op implementation is fully
//! substitutable (and is exactly what JSON mode uses).

use colored::Colorize;
use std::sync::Mutex;

/// Width of section divider lines.
pub const SECTION_WIDTH: usize = 50;

/// Sink for human-readable narration.
pub trait OutputHandler: Send + Sync {
    fn info(&self, message: &str, indent: usize);
    fn success(&self, message: &str, indent: usize);
    fn warning(&self, message: &str, indent: usize);
    fn error(&self, message: &str, indent: usize);
    fn section(&self, title: &str);
    fn debug(&self, message: &str);
}

fn indented(message: &str, indent: usize) -> String {
    format!("{}{}", "  ".repeat(indent), message)
}

/// Console output with colors.
pub struct ConsoleOutputHandler {
    verbose: bool,
}

impl ConsoleOutputHandler {
    /// Create a console handler. Set `verbose` to enable debug output.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl OutputHandler for ConsoleOutputHandler {
    fn info(&self, message: &str, indent: usize) {
        println!("{}", indented(message, indent));
    }

    fn success(&self, message: &str, indent: usize) {
        println!("{}", indented(message, indent).green());
    }

    fn warning(&self, message: &str, indent: usize) {
        println!("{}", indented(message, indent).yellow());
    }

    fn error(&self, message: &str, indent: usize) {
        println!("{}", indented(message, indent).red());
    }

    fn section(&self, title: &str) {
        println!();
        println!("{}", title);
        println!("{}", "-".repeat(SECTION_WIDTH));
    }

    fn debug(&self, message: &str) {
        if self.verbose {
            println!("{}", format!("[debug] {}", message).cyan());
        }
    }
}

/// Silent output handler for JSON mode and tests.
pub struct NullOutputHandler;

impl OutputHandler for NullOutputHandler {
    fn info(&self, _message: &str, _indent: usize) {}
    fn success(&self, _message: &str, _indent: usize) {}
    fn warning(&self, _message: &str, _indent: usize) {}
    fn error(&self, _message: &str, _indent: usize) {}
    fn section(&self, _title: &str) {}
    fn debug(&self, _message: &str) {}
}

/// Collects rendered lines for deferred printing.
///
/// Each parallel worker narrates into its own buffer; the buffer is flushed
/// to the real handler under the merge lock so one repository's narration
/// stays contiguous.
#[derive(Default)]
pub struct BufferedOutputHandler {
    messages: Mutex<Vec<String>>,
}

impl BufferedOutputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, line: String) {
        self.messages
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .push(line);
    }

    /// Write all buffered lines to a target handler and clear the buffer.
    pub fn flush_to(&self, target: &dyn OutputHandler) {
        let mut messages = self
            .messages
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        for message in messages.drain(..) {
            target.info(&message, 0);
        }
    }

    #[cfg(test)]
    pub(crate) fn lines(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }
}

impl OutputHandler for BufferedOutputHandler {
    fn info(&self, message: &str, indent: usize) {
        self.push(indented(message, indent));
    }

    fn success(&self, message: &str, indent: usize) {
        self.push(indented(message, indent).green().to_string());
    }

    fn warning(&self, message: &str, indent: usize) {
        self.push(indented(message, indent).yellow().to_string());
    }

    fn error(&self, message: &str, indent: usize) {
        self.push(indented(message, indent).red().to_string());
    }

    fn section(&self, title: &str) {
        self.push(String::new());
        self.push(title.to_string());
        self.push("-".repeat(SECTION_WIDTH));
    }

    fn debug(&self, _message: &str) {
        // Debug output is suppressed in buffered (parallel) mode.
    }
}
