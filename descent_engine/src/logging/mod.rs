//! Global logging module
//!
//! Thread-safe global logging with coded events and a small macro interface.
//! Until `init_global_logging` (or `init_global_logging_with_service`) runs,
//! every logging call is a no-op.

pub mod codes;
pub mod config;
pub mod events;
pub mod macros;
pub mod service;

use std::sync::{Arc, OnceLock};

pub use codes::Code;
pub use events::{LogEvent, LogLevel};
pub use service::{ConsoleLogger, Logger, LoggingService, MemoryLogger, StructuredLogger};

// ============================================================================
// GLOBAL STATE
// ============================================================================

static GLOBAL_LOGGER: OnceLock<Arc<LoggingService>> = OnceLock::new();

// ============================================================================
// INITIALIZATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoggingInitError {
    #[error("Global logger already initialized")]
    AlreadyInitialized,

    #[error("Runtime logging preferences already initialized")]
    PreferencesAlreadySet,

    #[error("Configuration validation failed: {0}")]
    InvalidConfiguration(String),

    #[error("Missing metadata for code: {0}")]
    MissingMetadata(Code),
}

impl LoggingInitError {
    pub fn error_code(&self) -> Code {
        codes::system::INITIALIZATION_FAILURE
    }
}

/// Initialize global logging from runtime preferences
pub fn init_global_logging() -> Result<(), LoggingInitError> {
    config::validate_config().map_err(LoggingInitError::InvalidConfiguration)?;

    for code in [
        codes::lexical::UNMATCHED_INPUT,
        codes::syntax::MISMATCHED_TOKEN,
        codes::analysis::LEFT_RECURSION,
    ] {
        if codes::get_error_metadata(code.as_str()).is_none() {
            return Err(LoggingInitError::MissingMetadata(code));
        }
    }

    let logging_service = Arc::new(service::create_configured_service());
    GLOBAL_LOGGER
        .set(logging_service.clone())
        .map_err(|_| LoggingInitError::AlreadyInitialized)?;

    logging_service.log_event(LogEvent::success(
        codes::success::SYSTEM_INITIALIZATION_COMPLETED,
        "Global logging system initialized",
    ));

    Ok(())
}

/// Initialize with custom service (embedding applications and tests)
pub fn init_global_logging_with_service(service: Arc<LoggingService>) -> Result<(), LoggingInitError> {
    GLOBAL_LOGGER
        .set(service)
        .map_err(|_| LoggingInitError::AlreadyInitialized)
}

pub fn is_initialized() -> bool {
    GLOBAL_LOGGER.get().is_some()
}

/// Safe access to global logger
pub fn try_get_global_logger() -> Option<&'static LoggingService> {
    GLOBAL_LOGGER.get().map(|service| service.as_ref())
}

/// Whether debug events would reach a sink
pub fn debug_enabled() -> bool {
    try_get_global_logger().is_some_and(|logger| logger.should_log(LogLevel::Debug))
}

// ============================================================================
// MACRO SUPPORT
// ============================================================================

/// Build and dispatch one event (used by the logging macros)
pub fn log_with_context(
    level: LogLevel,
    code: Code,
    message: &str,
    span: Option<crate::utils::Span>,
    context: Vec<(&str, &str)>,
) {
    let Some(logger) = try_get_global_logger() else {
        return;
    };
    if !logger.should_log(level) {
        return;
    }

    let mut event = match level {
        LogLevel::Error => LogEvent::error(code, message),
        LogLevel::Warning => LogEvent::warning_with_code(code, message),
        LogLevel::Info => LogEvent::success(code, message),
        LogLevel::Debug => LogEvent::debug(message),
    };

    if let Some(s) = span {
        event = event.with_span(s);
    }

    for (key, value) in context {
        event = event.with_context(key, value);
    }

    logger.log_event(event);
}

/// Get system diagnostics
pub fn get_system_diagnostics() -> String {
    format!(
        "=== Logging System Diagnostics ===\nInitialized: {}\n\n{}",
        is_initialized(),
        config::get_config_summary()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_without_initialization_is_silent() {
        log_with_context(
            LogLevel::Error,
            codes::system::INTERNAL_ERROR,
            "ignored",
            None,
            vec![("key", "value")],
        );
    }

    #[test]
    fn test_second_initialization_is_rejected() {
        let _ = init_global_logging();
        let err = init_global_logging_with_service(Arc::new(LoggingService::new(
            Arc::new(MemoryLogger::new()),
            LogLevel::Debug,
        )))
        .unwrap_err();

        assert_eq!(err, LoggingInitError::AlreadyInitialized);
        assert_eq!(err.error_code(), codes::system::INITIALIZATION_FAILURE);
        assert_eq!(init_global_logging(), Err(LoggingInitError::AlreadyInitialized));
        assert!(is_initialized());
    }

    #[test]
    fn test_diagnostics() {
        let diagnostics = get_system_diagnostics();
        assert!(diagnostics.contains("Logging System Diagnostics"));
        assert!(diagnostics.contains("Initialized:"));
    }
}
