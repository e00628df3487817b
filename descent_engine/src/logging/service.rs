//! Logging service and sinks

use super::codes::Code;
use super::config;
use super::events::{LogEvent, LogLevel};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Sink for log events
pub trait Logger: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Level filter in front of one sink
pub struct LoggingService {
    logger: Arc<dyn Logger>,
    min_level: LogLevel,
}

impl LoggingService {
    pub fn new(logger: Arc<dyn Logger>, min_level: LogLevel) -> Self {
        Self { logger, min_level }
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn should_log(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    pub fn log_event(&self, event: LogEvent) {
        if self.should_log(event.level) {
            self.logger.log(&event);
        }
    }
}

/// Build the service described by the runtime logging preferences.
///
/// Without console or structured output enabled, events are still filtered
/// but go nowhere.
pub fn create_configured_service() -> LoggingService {
    let min_level = config::get_min_log_level();
    let logger: Arc<dyn Logger> = if config::use_structured_logging() {
        Arc::new(StructuredLogger)
    } else if config::use_console_logging() {
        Arc::new(ConsoleLogger)
    } else {
        Arc::new(NullLogger)
    };
    LoggingService::new(logger, min_level)
}

/// Problems go to stderr, progress to stdout
fn emit(level: LogLevel, line: &str) {
    match level {
        LogLevel::Error | LogLevel::Warning => eprintln!("{}", line),
        LogLevel::Info | LogLevel::Debug => println!("{}", line),
    }
}

pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _event: &LogEvent) {}
}

/// One text line per event
pub struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, event: &LogEvent) {
        emit(event.level, &event.format());
    }
}

/// One JSON object per event; falls back to text if serialization fails
pub struct StructuredLogger;

impl Logger for StructuredLogger {
    fn log(&self, event: &LogEvent) {
        let line = event.format_json().unwrap_or_else(|_| event.format());
        emit(event.level, &line);
    }
}

/// Keeps the most recent `LOG_BUFFER_SIZE` events in memory
pub struct MemoryLogger {
    events: Mutex<VecDeque<LogEvent>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_events(&self) -> Vec<LogEvent> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn event_count(&self) -> usize {
        self.lock().len()
    }

    pub fn has_event_with_code(&self, code: Code) -> bool {
        self.lock().iter().any(|event| event.code == code)
    }

    pub fn count_level(&self, level: LogLevel) -> usize {
        self.lock().iter().filter(|event| event.level == level).count()
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for MemoryLogger {
    fn log(&self, event: &LogEvent) {
        let mut events = self.lock();
        if events.len() >= config::get_error_buffer_size() {
            events.pop_front();
        }
        events.push_back(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;

    #[test]
    fn test_service_filters_by_level() {
        let memory = Arc::new(MemoryLogger::new());
        let service = LoggingService::new(memory.clone(), LogLevel::Warning);

        service.log_event(LogEvent::error(codes::lexical::UNMATCHED_INPUT, "bad char"));
        service.log_event(LogEvent::warning_with_code(codes::analysis::AMBIGUOUS_DECISION, "ambiguous"));
        service.log_event(LogEvent::success(codes::success::PARSE_COMPLETE, "done"));
        service.log_event(LogEvent::debug("noise"));

        assert_eq!(memory.event_count(), 2);
        assert!(memory.has_event_with_code(codes::lexical::UNMATCHED_INPUT));
        assert_eq!(memory.count_level(LogLevel::Warning), 1);
        assert!(!memory.has_event_with_code(codes::success::PARSE_COMPLETE));
    }

    #[test]
    fn test_configured_service_follows_preferences() {
        let service = create_configured_service();
        assert!(service.should_log(LogLevel::Error));
        assert!(!service.should_log(LogLevel::Debug));
    }

    #[test]
    fn test_memory_logger_drops_oldest() {
        let memory = MemoryLogger::new();
        let capacity = config::get_error_buffer_size();
        for i in 0..capacity + 2 {
            memory.log(&LogEvent::debug(&format!("event {}", i)));
        }

        let events = memory.get_events();
        assert_eq!(events.len(), capacity);
        assert_eq!(events[0].message, "event 2");

        memory.clear();
        assert_eq!(memory.event_count(), 0);
    }
}
