//! Structured logging seam.
//!
//! Components receive a [`Logger`] by injection instead of reaching for a
//! global. [`StructuredLogger`] is the production adapter: it renders
//! `message key=value ...` lines through the `log` facade, so `env_logger`
//! filtering still applies.

use log::Level;
use std::fmt::Write;

/// Key/value context attached to a log event.
pub type Fields<'a> = &'a [(&'a str, &'a str)];

pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str, fields: Fields<'_>);

    fn debug(&self, message: &str, fields: Fields<'_>) {
        self.log(Level::Debug, message, fields);
    }

    fn info(&self, message: &str, fields: Fields<'_>) {
        self.log(Level::Info, message, fields);
    }

    fn warn(&self, message: &str, fields: Fields<'_>) {
        self.log(Level::Warn, message, fields);
    }

    fn error(&self, message: &str, fields: Fields<'_>) {
        self.log(Level::Error, message, fields);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredLogger;

impl Logger for StructuredLogger {
    fn log(&self, level: Level, message: &str, fields: Fields<'_>) {
        log::log!(target: "lint_sweeper", level, "{}", format_event(message, fields));
    }
}

/// Render an event as `message key=value key="quoted value"`.
pub fn format_event(message: &str, fields: Fields<'_>) -> String {
    let mut line = String::with_capacity(message.len() + fields.len() * 16);
    line.push_str(message);

    for (key, value) in fields {
        if value.is_empty() || value.contains(char::is_whitespace) || value.contains('"') {
            let _ = write!(line, " {key}={value:?}");
        } else {
            let _ = write!(line, " {key}={value}");
        }
    }

    line
}
