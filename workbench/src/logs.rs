//! Progress reporting.
//!
//! Each entry is printed to stdout as a human-readable line and mirrored to
//! the log file as a `tracing` event.

use tracing::{error, info, warn};

/// Log level for progress lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A single progress entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// CSV line the entry is about, if any
    pub line: Option<usize>,
    /// Nesting level for console output
    pub indent: u8,
}

impl LogEntry {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            line: None,
            indent: 0,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Console form of the entry.
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        let indent = "   ".repeat(self.indent as usize);
        match self.line {
            Some(line) => format!("{}{} [line {}] {}", indent, prefix, line, self.message),
            None => format!("{}{} {}", indent, prefix, self.message),
        }
    }

    /// Print to stdout and record in the log file.
    pub fn emit(&self) {
        println!("{}", self.render());

        let line = self.line.unwrap_or_default();
        match self.level {
            LogLevel::Info => info!(line, "{}", self.message),
            LogLevel::Success => info!(line, outcome = "success", "{}", self.message),
            LogLevel::Warning => warn!(line, "{}", self.message),
            LogLevel::Error => error!(line, "{}", self.message),
        }
    }
}

/// Convenient logging functions
pub fn log_info(msg: impl Into<String>) {
    LogEntry::info(msg).emit();
}

pub fn log_success(msg: impl Into<String>) {
    LogEntry::success(msg).emit();
}
