//! Logging configuration: compile-time buffer limits plus runtime preferences

use super::LoggingInitError;
use crate::config::compile_time::logging::*;
use crate::config::runtime::LoggingPreferences;
use std::sync::OnceLock;

type EventsLogLevel = crate::logging::events::LogLevel;

static RUNTIME_PREFERENCES: OnceLock<LoggingPreferences> = OnceLock::new();

/// Install runtime preferences; only the first call wins
pub fn init_runtime_preferences(preferences: LoggingPreferences) -> Result<(), LoggingInitError> {
    RUNTIME_PREFERENCES
        .set(preferences)
        .map_err(|_| LoggingInitError::PreferencesAlreadySet)
}

fn with_preferences<R>(f: impl FnOnce(&LoggingPreferences) -> R) -> R {
    match RUNTIME_PREFERENCES.get() {
        Some(preferences) => f(preferences),
        None => f(&LoggingPreferences::default()),
    }
}

pub fn get_min_log_level() -> EventsLogLevel {
    with_preferences(|p| p.min_log_level.to_events_log_level())
}

pub fn use_structured_logging() -> bool {
    with_preferences(|p| p.use_structured_logging)
}

pub fn use_console_logging() -> bool {
    with_preferences(|p| p.enable_console_logging)
}

/// Get in-memory event buffer size (compile-time constant)
pub fn get_error_buffer_size() -> usize {
    LOG_BUFFER_SIZE
}

/// Validate current configuration settings
pub fn validate_config() -> Result<(), String> {
    if LOG_BUFFER_SIZE == 0 {
        return Err("Log buffer size cannot be zero".to_string());
    }

    if MAX_LOG_MESSAGE_LENGTH < 16 {
        return Err(format!(
            "Max log message length too small: {}",
            MAX_LOG_MESSAGE_LENGTH
        ));
    }

    Ok(())
}

/// Get configuration summary for diagnostics
pub fn get_config_summary() -> String {
    with_preferences(|preferences| {
        format!(
            "Logging Configuration:\n\
             - Log buffer size: {}\n\
             - Max message length: {}\n\
             - Min log level: {:?}\n\
             - Structured logging: {}\n\
             - Console logging: {}",
            LOG_BUFFER_SIZE,
            MAX_LOG_MESSAGE_LENGTH,
            preferences.min_log_level,
            preferences.use_structured_logging,
            preferences.enable_console_logging,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(validate_config().is_ok());
    }

    #[test]
    fn test_runtime_preferences_install_once() {
        let preferences = LoggingPreferences {
            use_structured_logging: false,
            enable_console_logging: false,
            min_log_level: crate::config::runtime::LogLevel::Warning,
        };

        let first = init_runtime_preferences(preferences.clone());
        assert_eq!(
            init_runtime_preferences(preferences),
            Err(LoggingInitError::PreferencesAlreadySet)
        );
        if first.is_ok() {
            assert_eq!(get_min_log_level(), EventsLogLevel::Warning);
            assert!(!use_console_logging());
        }
    }

    #[test]
    fn test_config_summary() {
        let summary = get_config_summary();
        assert!(summary.contains("Log buffer size"));
        assert!(summary.contains("Min log level"));
    }
}
