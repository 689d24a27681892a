//! Logging
//!
//! Structured logging for adapter operations. Every record carries an
//! [`AuthLogContext`] naming the operation and the adapter instance, so
//! interleaved output from several instances can be told apart.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&tracing::Level::from(*self), f)
    }
}

/// Structured fields attached to a log record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthLogContext {
    pub operation: Option<String>,
    pub client_id: Option<String>,
    /// Adapter instance the record belongs to.
    pub instance: Option<u64>,
    /// Free-form fields, kept sorted for stable output.
    pub extra: BTreeMap<String, String>,
}

impl AuthLogContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn instance(mut self, instance: u64) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Attach a free-form field.
    pub fn extra(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.extra.insert(key.into(), value.to_string());
        self
    }

    fn render_extra(&self) -> String {
        let fields: Vec<String> = self
            .extra
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        fields.join(" ")
    }
}

/// Sink for adapter log records.
///
/// Implementors provide [`log`](Logger::log) and
/// [`is_enabled`](Logger::is_enabled); the per-level methods forward to
/// `log`.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, context: &AuthLogContext);

    fn is_enabled(&self, level: LogLevel) -> bool;

    fn trace(&self, message: &str, context: &AuthLogContext) {
        self.log(LogLevel::Trace, message, context);
    }

    fn debug(&self, message: &str, context: &AuthLogContext) {
        self.log(LogLevel::Debug, message, context);
    }

    fn info(&self, message: &str, context: &AuthLogContext) {
        self.log(LogLevel::Info, message, context);
    }

    fn warn(&self, message: &str, context: &AuthLogContext) {
        self.log(LogLevel::Warn, message, context);
    }

    fn error(&self, message: &str, context: &AuthLogContext) {
        self.log(LogLevel::Error, message, context);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _level: LogLevel, _message: &str, _context: &AuthLogContext) {}

    fn is_enabled(&self, _level: LogLevel) -> bool {
        false
    }
}

pub fn no_op_logger() -> NoOpLogger {
    NoOpLogger
}

/// Logger that forwards to `tracing`, the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

macro_rules! forward {
    ($macro:ident, $message:expr, $context:expr) => {
        ::tracing::$macro!(
            operation = $context.operation.as_deref().unwrap_or(""),
            client_id = $context.client_id.as_deref().unwrap_or(""),
            instance = $context.instance.unwrap_or_default(),
            extra = %$context.render_extra(),
            "{}",
            $message
        )
    };
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, context: &AuthLogContext) {
        match level {
            LogLevel::Trace => forward!(trace, message, context),
            LogLevel::Debug => forward!(debug, message, context),
            LogLevel::Info => forward!(info, message, context),
            LogLevel::Warn => forward!(warn, message, context),
            LogLevel::Error => forward!(error, message, context),
        }
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        // `enabled!` needs a constant level.
        match level {
            LogLevel::Trace => tracing::enabled!(tracing::Level::TRACE),
            LogLevel::Debug => tracing::enabled!(tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(tracing::Level::INFO),
            LogLevel::Warn => tracing::enabled!(tracing::Level::WARN),
            LogLevel::Error => tracing::enabled!(tracing::Level::ERROR),
        }
    }
}

pub fn create_tracing_logger() -> TracingLogger {
    TracingLogger
}

/// A captured log record.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub context: AuthLogContext,
    pub at: DateTime<Utc>,
}

/// Logger that keeps records in memory, for assertions in tests.
#[derive(Debug)]
pub struct InMemoryLogger {
    records: Mutex<Vec<LogEntry>>,
    threshold: LogLevel,
}

impl InMemoryLogger {
    /// Capture every level.
    pub fn new() -> Self {
        Self::with_level(LogLevel::Trace)
    }

    /// Capture `threshold` and above.
    pub fn with_level(threshold: LogLevel) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            threshold,
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.records.lock().unwrap().clone()
    }

    /// Records matching `predicate`, oldest first.
    pub fn entries_where(&self, predicate: impl Fn(&LogEntry) -> bool) -> Vec<LogEntry> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| predicate(entry))
            .cloned()
            .collect()
    }

    pub fn entries_at(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries_where(|entry| entry.level == level)
    }

    pub fn entries_for(&self, operation: &str) -> Vec<LogEntry> {
        self.entries_where(|entry| entry.context.operation.as_deref() == Some(operation))
    }

    /// Whether any record's message contains `fragment`.
    pub fn contains(&self, fragment: &str) -> bool {
        self.records
            .lock()
            .unwrap()
            .iter()
            .any(|entry| entry.message.contains(fragment))
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }
}

impl Default for InMemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for InMemoryLogger {
    fn log(&self, level: LogLevel, message: &str, context: &AuthLogContext) {
        if !self.is_enabled(level) {
            return;
        }
        self.records.lock().unwrap().push(LogEntry {
            level,
            message: message.to_string(),
            context: context.clone(),
            at: Utc::now(),
        });
    }

    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.threshold
    }
}

pub fn create_in_memory_logger() -> InMemoryLogger {
    InMemoryLogger::new()
}
