//! Structured logging for the CDN latency probe
//!
//! This module provides:
//! - Structured log entries with levels, named loggers and JSON fields
//! - Console, JSON and compact output formats
//! - Session and correlation ids so every entry of one probe round can be
//!   grouped together
//! - Specialized loggers for probe rounds and error events
//!
//! Logging is synchronous: the endpoint selector logs from whatever thread
//! the host calls it on, not necessarily inside a runtime.

use crate::error::{AppError, Result};
use crate::models::{ProbeConfig, ProbeResult, ProbeRound, RoundId};
use crate::types::ProbeOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general information
    Info = 2,
    /// Warning level - degraded but handled situations
    Warn = 3,
    /// Error level - failures the subsystem recovered from
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",    // White
            LogLevel::Debug => "\x1b[36m",    // Cyan
            LogLevel::Info => "\x1b[32m",     // Green
            LogLevel::Warn => "\x1b[33m",     // Yellow
            LogLevel::Error => "\x1b[31m",    // Red
        }
    }

    /// Reset ANSI color code
    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Additional structured fields
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

/// Where formatted entries are written
#[derive(Debug, Clone)]
pub enum LogTarget {
    /// stderr for warnings and errors, stdout for the rest
    Console,
    /// In-memory buffer, for hosts that forward entries elsewhere
    Buffer(Arc<Mutex<Vec<String>>>),
}

/// Shared logging context for session tracking
#[derive(Debug, Default)]
struct LogContext {
    /// Global correlation ID for the session
    session_id: Option<String>,
    /// Additional context fields
    context_fields: HashMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
#[derive(Debug, Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    target: LogTarget,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            format: LogFormat::Console,
            target: LogTarget::Console,
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: &str, config: &ProbeConfig) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            target: LogTarget::Console,
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger that records plain entries into a shared buffer
    pub fn buffered(name: &str, level: LogLevel) -> (Self, Arc<Mutex<Vec<String>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let mut logger = Self::new(name);
        logger.min_level = level;
        logger.use_color = false;
        logger.format = LogFormat::Compact;
        logger.target = LogTarget::Buffer(buffer.clone());
        (logger, buffer)
    }

    /// Derive a logger with another name sharing this logger's context
    pub fn named(&self, name: &str) -> Self {
        let mut logger = self.clone();
        logger.name = name.to_string();
        logger
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Set output format
    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    /// Enable or disable colored output
    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Set session correlation ID
    pub fn set_session_id(&self, session_id: String) {
        if let Ok(mut context) = self.context.write() {
            context.session_id = Some(session_id);
        }
    }

    /// Add context field for all subsequent log entries
    pub fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            if let Ok(mut context) = self.context.write() {
                context.context_fields.insert(key.to_string(), json_value);
            }
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    /// Convenience methods for different log levels
    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Write log entry to output
    fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        if let Ok(context) = self.context.read() {
            if let Some(session_id) = &context.session_id {
                entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
            }
            for (key, value) in &context.context_fields {
                entry.fields.insert(key.clone(), value.clone());
            }
        }

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
            LogFormat::Compact => self.format_compact(&entry),
        };

        match &self.target {
            LogTarget::Console => {
                if entry.level >= LogLevel::Warn {
                    let _ = writeln!(io::stderr(), "{}", output);
                } else {
                    let _ = writeln!(io::stdout(), "{}", output);
                }
            }
            LogTarget::Buffer(buffer) => {
                if let Ok(mut lines) = buffer.lock() {
                    lines.push(output);
                }
            }
        }
    }

    /// Format log entry for console output
    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}",
            timestamp,
            formatted_level,
            entry.logger,
            entry.message
        );

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields_str: Vec<String> = entry.fields.iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields_str.sort();
            output.push_str(&format!(" {{{}}}", fields_str.join(", ")));
        }

        output
    }

    /// Format log entry as JSON
    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }

    /// Format log entry in compact format
    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!("{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
            },
        }
    }

    /// Add a correlation ID
    pub fn correlation_id(mut self, id: &str) -> Self {
        if !id.is_empty() {
            self.entry.correlation_id = Some(id.to_string());
        }
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add probe outcome information
    pub fn outcome(self, outcome: &ProbeOutcome) -> Self {
        let builder = self.field("status", outcome.status());
        match outcome {
            ProbeOutcome::Success(elapsed) => builder.field("elapsed_ms", elapsed.as_millis() as u64),
            ProbeOutcome::NetworkError(reason) => builder.field("error", reason),
            ProbeOutcome::Timeout => builder,
        }
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
    }

    /// Finalize and write the log entry
    pub fn log(self) {
        self.logger.write_entry(self.entry);
    }
}

/// Logger for probe rounds
///
/// Every entry of a round carries the round's correlation id.
#[derive(Debug, Clone)]
pub struct ProbeLogger {
    logger: Logger,
    correlation_ids: Arc<Mutex<HashMap<RoundId, String>>>,
}

impl ProbeLogger {
    /// Create a new probe logger
    pub fn new(config: &ProbeConfig) -> Self {
        Self::from_logger(Logger::with_config("PROBE", config))
    }

    /// Wrap an existing logger
    pub fn from_logger(logger: Logger) -> Self {
        Self {
            logger,
            correlation_ids: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of rounds started but not yet finished
    pub fn open_rounds(&self) -> usize {
        self.correlation_ids.lock().map(|ids| ids.len()).unwrap_or(0)
    }

    fn correlation_for(&self, round: RoundId) -> String {
        self.correlation_ids
            .lock()
            .map(|ids| ids.get(&round).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Log the start of a round
    pub fn log_round_started(&self, round: RoundId, endpoints: usize, deadline: Duration) {
        let correlation_id = Uuid::new_v4().to_string();
        if let Ok(mut ids) = self.correlation_ids.lock() {
            ids.insert(round, correlation_id.clone());
        }

        self.logger.info(&format!("Started {} across {} endpoints", round, endpoints))
            .correlation_id(&correlation_id)
            .field("round", round.0)
            .field("endpoints", endpoints)
            .field("deadline_ms", deadline.as_millis() as u64)
            .log();
    }

    /// Log one probe result
    pub fn log_probe_result(&self, result: &ProbeResult) {
        let level = match result.outcome {
            ProbeOutcome::Success(_) => LogLevel::Debug,
            ProbeOutcome::NetworkError(_) | ProbeOutcome::Timeout => LogLevel::Info,
        };
        let message = format!("{} {} -> {}", result.round, result.endpoint.name, result.outcome);

        self.logger.log(level, &message)
            .correlation_id(&self.correlation_for(result.round))
            .field("round", result.round.0)
            .field("endpoint_id", result.endpoint.id)
            .field("url", &result.endpoint.probe_url)
            .outcome(&result.outcome)
            .log();
    }

    /// Log the end of a round, complete or cancelled
    pub fn log_round_finished(&self, round: &ProbeRound) {
        let correlation_id = self.correlation_ids
            .lock()
            .ok()
            .and_then(|mut ids| ids.remove(&round.id))
            .unwrap_or_default();

        let message = if round.is_cancelled() {
            format!("Cancelled {} after {}/{} results", round.id, round.results.len(), round.expected)
        } else {
            format!("Completed {} ({} of {} reachable)", round.id, round.successes().count(), round.expected)
        };

        let mut builder = self.logger.info(&message)
            .correlation_id(&correlation_id)
            .field("round", round.id.0)
            .field("delivered", round.results.len())
            .field("cancelled", round.is_cancelled());

        if let Some(fastest) = round.fastest() {
            builder = builder.field("fastest_endpoint", fastest.endpoint.id);
        }

        builder.log();
    }
}

/// Error event logger with enhanced context
#[derive(Debug, Clone)]
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    /// Create a new error event logger
    pub fn new(config: &ProbeConfig) -> Self {
        Self::from_logger(Logger::with_config("ERR", config))
    }

    /// Wrap an existing logger
    pub fn from_logger(logger: Logger) -> Self {
        Self { logger }
    }

    /// Log an error with context
    pub fn log_error(&self, error: &AppError, context: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let mut builder = self.logger.error(&message).error_info(error);
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }
        builder.log();
    }

    /// Log an error that was handled by falling back to a safe default
    pub fn log_fallback(&self, error: &AppError, fallback: &str) {
        self.logger.warn(&format!("{}; falling back to {}", error, fallback))
            .error_info(error)
            .field("fallback", fallback)
            .log();
    }
}

/// Hands out loggers that share one session id
pub struct LoggerFactory {
    config: ProbeConfig,
    session_id: String,
}

impl LoggerFactory {
    /// Create a new logger factory
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name, &self.config);
        logger.set_session_id(self.session_id.clone());
        logger
    }

    /// Create a probe round logger
    pub fn create_probe_logger(&self) -> ProbeLogger {
        ProbeLogger::from_logger(self.create_logger("PROBE"))
    }

    /// Create an error event logger
    pub fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger::from_logger(self.create_logger("ERR"))
    }

    /// Get session ID
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
