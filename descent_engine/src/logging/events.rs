//! Log events
//!
//! An event is a coded message with optional source span and key/value
//! context. Text output is one line per event; JSON output goes through
//! [`EventRecord`].

use super::codes::{self, Code};
use crate::config::compile_time::logging::MAX_LOG_MESSAGE_LENGTH;
use crate::utils::Span;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Log severity levels, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Placeholder code for debug events, which carry none of their own
const DEBUG_CODE: Code = Code::new("D000");

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: SystemTime,
    pub level: LogLevel,
    pub code: Code,
    pub message: String,
    pub span: Option<Span>,
    pub context: BTreeMap<String, String>,
}

impl LogEvent {
    pub fn new(level: LogLevel, code: Code, message: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            level,
            code,
            message: truncate(message),
            span: None,
            context: BTreeMap::new(),
        }
    }

    pub fn error(code: Code, message: &str) -> Self {
        Self::new(LogLevel::Error, code, message)
    }

    pub fn warning_with_code(code: Code, message: &str) -> Self {
        Self::new(LogLevel::Warning, code, message)
    }

    /// Info event carrying a success code
    pub fn success(code: Code, message: &str) -> Self {
        Self::new(LogLevel::Info, code, message)
    }

    pub fn debug(message: &str) -> Self {
        Self::new(LogLevel::Debug, DEBUG_CODE, message)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }

    pub fn is_warning(&self) -> bool {
        self.level == LogLevel::Warning
    }

    /// `[LEVEL] CODE - message at line:col key=value ...`
    pub fn format(&self) -> String {
        let mut output = format!("[{}] {} - {}", self.level.as_str(), self.code, self.message);
        if let Some(span) = &self.span {
            output.push_str(&format!(" at {}", span.start()));
        }
        for (key, value) in &self.context {
            output.push_str(&format!(" {}={}", key, value));
        }
        output
    }

    pub fn record(&self) -> EventRecord<'_> {
        let metadata = codes::get_error_metadata(self.code.as_str());
        EventRecord {
            timestamp: self
                .timestamp
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis())
                .unwrap_or_default(),
            level: self.level.as_str(),
            code: self.code,
            message: &self.message,
            category: codes::get_category(self.code.as_str()),
            severity: codes::get_severity(self.code.as_str()).as_str(),
            recoverable: metadata.filter(|_| self.is_error()).map(|m| m.recoverable),
            description: metadata.filter(|_| self.is_error()).map(|m| m.description),
            span: self.span.as_ref(),
            context: &self.context,
        }
    }

    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.record())
    }
}

/// Serializable view of a [`LogEvent`]
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Milliseconds since the Unix epoch
    pub timestamp: u128,
    pub level: &'static str,
    pub code: Code,
    pub message: &'a str,
    pub category: &'static str,
    pub severity: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recoverable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<&'a Span>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub context: &'a BTreeMap<String, String>,
}

fn truncate(message: &str) -> String {
    if message.len() <= MAX_LOG_MESSAGE_LENGTH {
        return message.to_string();
    }
    let mut cut = MAX_LOG_MESSAGE_LENGTH;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &message[..cut])
}
