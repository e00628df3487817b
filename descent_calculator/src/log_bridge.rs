//! Forwards engine log events to the `log` facade

use descent_engine::logging::{self, LogEvent, LogLevel, Logger, LoggingInitError, LoggingService};
use std::sync::Arc;

/// Engine logger that hands every event to whatever `log` backend is installed
#[derive(Debug, Default)]
pub struct LogBridge;

impl Logger for LogBridge {
    fn log(&self, event: &LogEvent) {
        let level = match event.level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        };
        let mut line = format!("{} {}", event.code, event.message);
        for (key, value) in &event.context {
            line.push_str(&format!(" {}={}", key, value));
        }
        log::log!(target: "descent", level, "{}", line);
    }
}

/// Install the bridge as the engine's global logger
pub fn install(min_level: LogLevel) -> Result<(), LoggingInitError> {
    logging::init_global_logging_with_service(Arc::new(LoggingService::new(Arc::new(LogBridge), min_level)))
}
