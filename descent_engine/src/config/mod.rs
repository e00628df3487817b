//! Configuration module for the descent engine
//! Automatically uses generated constants from TOML configuration

// Include generated constants from build.rs
// This file is generated at compile time from the workspace TOML configuration
include!(concat!(env!("OUT_DIR"), "/constants.rs"));

pub mod runtime;

pub use runtime::{
    ConfigError, LexerRecoveryMode, LogLevel, LoggingPreferences, ParserPreferences, RuntimeConfig,
    TokenizerPreferences,
};

/// Build information and configuration metadata
pub mod build_info {
    /// Returns the configuration profile used during build
    pub fn profile() -> &'static str {
        option_env!("DESCENT_BUILD_PROFILE").unwrap_or("development")
    }

    /// Returns the configuration directory used during build
    pub fn config_dir() -> &'static str {
        option_env!("DESCENT_CONFIG_DIR").unwrap_or("config")
    }

    /// Returns configuration source information
    pub fn source_info() -> String {
        format!("Generated from {}/{}.toml", config_dir(), profile())
    }
}

#[cfg(test)]
mod tests {
    use super::compile_time::*;
    use super::*;

    #[test]
    fn test_compile_time_constants_exist() {
        assert!(lexical::MAX_TOKEN_COUNT > 0);
        assert!(syntax::MAX_PARSE_DEPTH > 0);
        assert!(syntax::MAX_RECOVERY_SCAN_TOKENS > 0);
        assert!(analysis::DEFAULT_MAX_LOOKAHEAD <= analysis::MAX_LOOKAHEAD_CEILING);
        assert!(logging::LOG_BUFFER_SIZE > 0);
    }

    #[test]
    fn test_build_info() {
        assert!(build_info::source_info().ends_with(".toml"));
    }
}
