//! Runtime preferences
//!
//! Hard limits live in `compile_time` and cannot be changed at runtime. The
//! structures here carry user preferences that may be tuned per process through
//! `DESCENT_*` environment variables or a TOML file.

use super::compile_time::analysis::{DEFAULT_MAX_LOOKAHEAD, MAX_LOOKAHEAD_CEILING};
use super::compile_time::lexical::MAX_TOKEN_COUNT;
use super::compile_time::syntax::MAX_DIAGNOSTICS;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Errors raised while loading runtime configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid runtime configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How the tokenizer continues after input that no category matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexerRecoveryMode {
    /// Report the offending character and resume at the next one
    SingleChar,
    /// Report the whole unmatched run once and resume where a category matches again
    SkipToNextMatch,
}

impl LexerRecoveryMode {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "single_char" | "single" => Some(Self::SingleChar),
            "skip_to_next_match" | "skip" => Some(Self::SkipToNextMatch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerPreferences {
    /// Treat a missing first-character dispatch table as a configuration error
    pub ensure_optimizations: bool,

    /// Recovery strategy for unmatched input
    pub recovery_mode: LexerRecoveryMode,

    /// Non-skipped tokens kept before the rest of the input is dropped
    pub max_tokens: usize,
}

impl TokenizerPreferences {
    /// Token cap clamped to the compile-time limit
    pub fn effective_max_tokens(&self) -> usize {
        self.max_tokens.clamp(1, MAX_TOKEN_COUNT)
    }
}

impl Default for TokenizerPreferences {
    fn default() -> Self {
        Self {
            ensure_optimizations: env::var("DESCENT_TOKENIZER_ENSURE_OPTIMIZATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            recovery_mode: env::var("DESCENT_TOKENIZER_RECOVERY_MODE")
                .ok()
                .and_then(|v| LexerRecoveryMode::parse(&v))
                .unwrap_or(LexerRecoveryMode::SingleChar),
            max_tokens: env::var("DESCENT_TOKENIZER_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_TOKEN_COUNT),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserPreferences {
    /// Upper bound on lookahead depth computed for a single decision point
    pub max_lookahead: usize,

    /// Whether in-rule recovery and re-synchronization are attempted
    pub recovery_enabled: bool,

    /// Syntax diagnostics kept per parse; the rest are only counted
    pub max_diagnostics: usize,
}

impl ParserPreferences {
    /// Lookahead bound clamped to the compile-time ceiling
    pub fn effective_max_lookahead(&self) -> usize {
        self.max_lookahead.clamp(1, MAX_LOOKAHEAD_CEILING)
    }

    pub fn effective_max_diagnostics(&self) -> usize {
        self.max_diagnostics.clamp(1, MAX_DIAGNOSTICS)
    }
}

impl Default for ParserPreferences {
    fn default() -> Self {
        Self {
            max_lookahead: env::var("DESCENT_PARSER_MAX_LOOKAHEAD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_LOOKAHEAD),
            recovery_enabled: env::var("DESCENT_PARSER_RECOVERY_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            max_diagnostics: env::var("DESCENT_PARSER_MAX_DIAGNOSTICS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_DIAGNOSTICS),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingPreferences {
    /// Whether to use structured JSON logging
    pub use_structured_logging: bool,

    /// Whether to enable console output
    pub enable_console_logging: bool,

    /// Minimum level that reaches the sinks
    pub min_log_level: LogLevel,
}

impl Default for LoggingPreferences {
    fn default() -> Self {
        Self {
            use_structured_logging: env::var("DESCENT_LOGGING_USE_STRUCTURED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            enable_console_logging: env::var("DESCENT_LOGGING_ENABLE_CONSOLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            min_log_level: env::var("DESCENT_LOGGING_MIN_LEVEL")
                .ok()
                .and_then(|v| parse_log_level(&v))
                .unwrap_or(LogLevel::Info),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
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

    /// Convert to events::LogLevel
    pub fn to_events_log_level(&self) -> crate::logging::events::LogLevel {
        match self {
            LogLevel::Error => crate::logging::events::LogLevel::Error,
            LogLevel::Warning => crate::logging::events::LogLevel::Warning,
            LogLevel::Info => crate::logging::events::LogLevel::Info,
            LogLevel::Debug => crate::logging::events::LogLevel::Debug,
        }
    }
}

/// Parse log level from string (used for environment variables)
pub fn parse_log_level(level: &str) -> Option<LogLevel> {
    match level.to_lowercase().as_str() {
        "error" | "0" => Some(LogLevel::Error),
        "warning" | "warn" | "1" => Some(LogLevel::Warning),
        "info" | "2" => Some(LogLevel::Info),
        "debug" | "3" => Some(LogLevel::Debug),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub tokenizer: TokenizerPreferences,
    pub parser: ParserPreferences,
    pub logging: LoggingPreferences,
}

impl RuntimeConfig {
    /// Parse preferences from TOML text; absent keys fall back to environment defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load preferences from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Environment variable names for configuration
pub mod env_vars {
    pub const TOKENIZER_ENSURE_OPTIMIZATIONS: &str = "DESCENT_TOKENIZER_ENSURE_OPTIMIZATIONS";
    pub const TOKENIZER_RECOVERY_MODE: &str = "DESCENT_TOKENIZER_RECOVERY_MODE";
    pub const TOKENIZER_MAX_TOKENS: &str = "DESCENT_TOKENIZER_MAX_TOKENS";
    pub const PARSER_MAX_LOOKAHEAD: &str = "DESCENT_PARSER_MAX_LOOKAHEAD";
    pub const PARSER_RECOVERY_ENABLED: &str = "DESCENT_PARSER_RECOVERY_ENABLED";
    pub const PARSER_MAX_DIAGNOSTICS: &str = "DESCENT_PARSER_MAX_DIAGNOSTICS";
    pub const LOGGING_USE_STRUCTURED: &str = "DESCENT_LOGGING_USE_STRUCTURED";
    pub const LOGGING_ENABLE_CONSOLE: &str = "DESCENT_LOGGING_ENABLE_CONSOLE";
    pub const LOGGING_MIN_LEVEL: &str = "DESCENT_LOGGING_MIN_LEVEL";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("error"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("ERROR"), Some(LogLevel::Error));
        assert_eq!(parse_log_level("warn"), Some(LogLevel::Warning));
        assert_eq!(parse_log_level("2"), Some(LogLevel::Info));
        assert_eq!(parse_log_level("debug"), Some(LogLevel::Debug));
        assert_eq!(parse_log_level("invalid"), None);
    }

    #[test]
    fn test_recovery_mode_parsing() {
        assert_eq!(
            LexerRecoveryMode::parse("skip"),
            Some(LexerRecoveryMode::SkipToNextMatch)
        );
        assert_eq!(
            LexerRecoveryMode::parse("SINGLE_CHAR"),
            Some(LexerRecoveryMode::SingleChar)
        );
        assert_eq!(LexerRecoveryMode::parse("other"), None);
    }

    #[test]
    fn test_effective_limits_are_clamped() {
        let zero = ParserPreferences {
            max_lookahead: 0,
            max_diagnostics: 0,
            ..ParserPreferences::default()
        };
        assert_eq!(zero.effective_max_lookahead(), 1);
        assert_eq!(zero.effective_max_diagnostics(), 1);

        let huge = ParserPreferences {
            max_lookahead: usize::MAX,
            max_diagnostics: usize::MAX,
            ..ParserPreferences::default()
        };
        assert_eq!(huge.effective_max_lookahead(), MAX_LOOKAHEAD_CEILING);
        assert_eq!(huge.effective_max_diagnostics(), MAX_DIAGNOSTICS);

        let tokens = TokenizerPreferences {
            max_tokens: usize::MAX,
            ..TokenizerPreferences::default()
        };
        assert_eq!(tokens.effective_max_tokens(), MAX_TOKEN_COUNT);
    }

    #[test]
    fn test_runtime_config_from_toml() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [tokenizer]
            ensure_optimizations = true
            recovery_mode = "skip_to_next_match"

            [parser]
            max_lookahead = 2
            max_diagnostics = 5

            [logging]
            min_log_level = "debug"
            "#,
        )
        .unwrap();

        assert!(config.tokenizer.ensure_optimizations);
        assert_eq!(
            config.tokenizer.recovery_mode,
            LexerRecoveryMode::SkipToNextMatch
        );
        assert_eq!(config.parser.max_lookahead, 2);
        assert_eq!(config.parser.max_diagnostics, 5);
        assert_eq!(config.logging.min_log_level, LogLevel::Debug);
    }

    #[test]
    fn test_load_reports_missing_file() {
        let result = RuntimeConfig::load(Path::new("/nonexistent/descent/runtime.toml"));
        assert!(matches!(result, Err(ConfigError::Io { ref path, .. }) if path.ends_with("runtime.toml")));
    }

    #[test]
    fn test_runtime_config_rejects_bad_toml() {
        let result = RuntimeConfig::from_toml_str("[parser]\nmax_lookahead = \"many\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
