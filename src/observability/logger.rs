//! Structured application logger.
//!
//! # Responsibilities
//! - Build a `LogRecord` per call (level, message, context, timestamp)
//! - Hand records to an injected `LogSink`
//! - Tag HTTP request/response records with a `type` discriminator
//!
//! # Design Decisions
//! - The sink is passed in at construction, never looked up globally
//! - Error text and stack go into the context, the message stays scannable
//! - A failing sink never propagates into the request being logged

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Verbose,
    Log,
    Warn,
    Error,
}

/// Open-ended key/value context attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogContext(Map<String, Value>);

impl LogContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert. Values that fail to serialize become `null`.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        self.insert(key, value);
        self
    }

    /// Like [`with`](Self::with), skipping `None`.
    pub fn with_opt<T: Serialize>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn insert(&mut self, key: &str, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.0.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// One structured log entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub context: LogContext,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// The `type` discriminator, when tagged.
    pub fn event_type(&self) -> Option<&str> {
        self.context.get_str("type")
    }
}

/// Text and stack of an error attached to an `error` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTrace {
    pub message: String,
    pub stack: Option<String>,
}

impl ErrorTrace {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    /// Message plus the `{:?}` rendering (source chain, and backtrace when enabled).
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        Self {
            message: error.to_string(),
            stack: Some(format!("{:?}", error)),
        }
    }
}

/// Destination for log records.
///
/// Implementations must tolerate concurrent calls from many request tasks.
pub trait LogSink: Send + Sync {
    fn write(&self, record: &LogRecord);
}

/// Forwards records to `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, record: &LogRecord) {
        let event_type = record.event_type().unwrap_or("app");
        let correlation_id = record.context.get_str("correlationId").unwrap_or("-");
        let context = serde_json::to_string(&record.context).unwrap_or_default();

        match record.level {
            LogLevel::Debug => tracing::debug!(event_type, correlation_id, context = %context, "{}", record.message),
            LogLevel::Verbose => tracing::trace!(event_type, correlation_id, context = %context, "{}", record.message),
            LogLevel::Log => tracing::info!(event_type, correlation_id, context = %context, "{}", record.message),
            LogLevel::Warn => tracing::warn!(event_type, correlation_id, context = %context, "{}", record.message),
            LogLevel::Error => tracing::error!(event_type, correlation_id, context = %context, "{}", record.message),
        }
    }
}

/// Append-only in-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn write(&self, record: &LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

/// Leveled structured logger over a shared sink.
#[derive(Clone)]
pub struct StructuredLogger {
    sink: Arc<dyn LogSink>,
    scope: Option<Arc<str>>,
}

impl StructuredLogger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink, scope: None }
    }

    /// Logger whose records carry `scope` (e.g. "EntityService").
    pub fn scoped(&self, scope: &str) -> Self {
        Self {
            sink: self.sink.clone(),
            scope: Some(Arc::from(scope)),
        }
    }

    pub fn debug(&self, message: impl Into<String>, context: LogContext) {
        self.emit(LogLevel::Debug, message.into(), context);
    }

    pub fn verbose(&self, message: impl Into<String>, context: LogContext) {
        self.emit(LogLevel::Verbose, message.into(), context);
    }

    pub fn log(&self, message: impl Into<String>, context: LogContext) {
        self.emit(LogLevel::Log, message.into(), context);
    }

    pub fn warn(&self, message: impl Into<String>, context: LogContext) {
        self.emit(LogLevel::Warn, message.into(), context);
    }

    pub fn error(&self, message: impl Into<String>, context: LogContext, error: Option<ErrorTrace>) {
        let context = match error {
            Some(trace) => context
                .with("error", trace.message)
                .with_opt("stack", trace.stack),
            None => context,
        };
        self.emit(LogLevel::Error, message.into(), context);
    }

    pub fn http_request(&self, method: &str, url: &str, context: LogContext) {
        let context = context
            .with("type", "http_request")
            .with("method", method)
            .with("url", url);
        self.emit(LogLevel::Log, format!("{} {}", method, url), context);
    }

    pub fn http_response(
        &self,
        method: &str,
        url: &str,
        status_code: u16,
        response_time_ms: u64,
        context: LogContext,
    ) {
        let context = context
            .with("type", "http_response")
            .with("method", method)
            .with("url", url)
            .with("statusCode", status_code)
            .with("responseTime", response_time_ms);
        self.emit(
            LogLevel::Log,
            format!("{} {} {} - {}ms", method, url, status_code, response_time_ms),
            context,
        );
    }

    fn emit(&self, level: LogLevel, message: String, context: LogContext) {
        let context = match &self.scope {
            Some(scope) if context.get("scope").is_none() => context.with("scope", scope.as_ref()),
            _ => context,
        };
        let record = LogRecord {
            level,
            message,
            context,
            timestamp: Utc::now(),
        };
        if catch_unwind(AssertUnwindSafe(|| self.sink.write(&record))).is_err() {
            eprintln!("log sink panicked while writing record: {}", record.message);
        }
    }
}

/// Run `operation` with start/finish records and its execution time.
///
/// Explicit opt-in wrapper for individual operations.
pub async fn log_execution<F, T, E>(
    logger: &StructuredLogger,
    operation: &str,
    context: LogContext,
    fut: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let start = Instant::now();
    logger.debug(
        format!("{} started", operation),
        context.clone().with("operation", operation),
    );

    let result = fut.await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let context = context
        .with("operation", operation)
        .with("executionTime", elapsed_ms);

    match &result {
        Ok(_) => logger.debug(format!("{} completed", operation), context),
        Err(e) => logger.warn(
            format!("{} failed", operation),
            context.with("error", e.to_string()),
        ),
    }
    result
}
