// build.rs - TOML-driven compile-time limit generation
use std::env;
use std::fs;
use std::path::Path;

#[derive(serde::Deserialize)]
struct CompileTimeConfig {
    lexical: LexicalLimits,
    syntax: SyntaxLimits,
    analysis: AnalysisLimits,
    logging: LoggingLimits,
}

#[derive(serde::Deserialize)]
struct LexicalLimits {
    max_token_count: usize,
    max_lexical_diagnostics: usize,
}

#[derive(serde::Deserialize)]
struct SyntaxLimits {
    max_parse_depth: usize,
    max_diagnostics: usize,
    max_recovery_scan_tokens: usize,
}

#[derive(serde::Deserialize)]
struct AnalysisLimits {
    default_max_lookahead: usize,
    max_lookahead_ceiling: usize,
    max_paths_per_decision: usize,
    max_rules: usize,
}

#[derive(serde::Deserialize)]
struct LoggingLimits {
    log_buffer_size: usize,
    max_log_message_length: usize,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=DESCENT_BUILD_PROFILE");
    println!("cargo:rerun-if-env-changed=DESCENT_CONFIG_DIR");

    let profile = env::var("DESCENT_BUILD_PROFILE").unwrap_or_else(|_| "development".to_string());
    let config_dir = env::var("DESCENT_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    // Find workspace root (parent of descent_engine directory)
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = Path::new(&manifest_dir)
        .parent()
        .expect("Could not find workspace root (parent directory)");

    let config_path = workspace_root
        .join(&config_dir)
        .join(format!("{}.toml", profile));

    println!("cargo:rerun-if-changed={}", config_path.display());

    if !config_path.exists() {
        panic!(
            "Configuration file not found: {}\nWorkspace root: {}\nLooking for: {}/{}/{}.toml",
            config_path.display(),
            workspace_root.display(),
            workspace_root.display(),
            config_dir,
            profile
        );
    }

    let config_content = fs::read_to_string(&config_path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path.display(), e));

    let config: CompileTimeConfig = toml::from_str(&config_content)
        .unwrap_or_else(|e| panic!("Invalid TOML in {}: {}", config_path.display(), e));

    validate_limits(&config, &profile);
    generate_constants(&config, &profile);
}

fn validate_limits(config: &CompileTimeConfig, profile: &str) {
    const ABSOLUTE_MAX_LOOKAHEAD: usize = 16;
    const ABSOLUTE_MAX_PARSE_DEPTH: usize = 10_000;

    if config.analysis.max_lookahead_ceiling == 0
        || config.analysis.max_lookahead_ceiling > ABSOLUTE_MAX_LOOKAHEAD
    {
        panic!(
            "LIMITS: max_lookahead_ceiling must be within 1..={}",
            ABSOLUTE_MAX_LOOKAHEAD
        );
    }

    if config.analysis.default_max_lookahead == 0
        || config.analysis.default_max_lookahead > config.analysis.max_lookahead_ceiling
    {
        panic!("LIMITS: default_max_lookahead must be within 1..=max_lookahead_ceiling");
    }

    if config.analysis.max_paths_per_decision == 0 {
        panic!("LIMITS: max_paths_per_decision cannot be zero");
    }

    if config.syntax.max_parse_depth == 0
        || config.syntax.max_parse_depth > ABSOLUTE_MAX_PARSE_DEPTH
    {
        panic!(
            "LIMITS: max_parse_depth must be within 1..={}",
            ABSOLUTE_MAX_PARSE_DEPTH
        );
    }

    if config.lexical.max_token_count == 0 {
        panic!("LIMITS: max_token_count cannot be zero");
    }

    if profile == "production" && config.syntax.max_parse_depth > 2_000 {
        panic!("PRODUCTION: max_parse_depth too high for production");
    }
}

fn generate_constants(config: &CompileTimeConfig, profile: &str) {
    let out_dir = env::var("OUT_DIR").unwrap();
    let output_path = Path::new(&out_dir).join("constants.rs");

    let constants_code = format!(
        r#"
// Generated compile-time constants from TOML configuration
// Profile: {}
// DO NOT EDIT - Generated by build.rs

pub mod compile_time {{
    pub mod lexical {{
        pub const MAX_TOKEN_COUNT: usize = {};
        pub const MAX_LEXICAL_DIAGNOSTICS: usize = {};
    }}

    pub mod syntax {{
        pub const MAX_PARSE_DEPTH: usize = {};
        pub const MAX_DIAGNOSTICS: usize = {};
        pub const MAX_RECOVERY_SCAN_TOKENS: usize = {};
    }}

    pub mod analysis {{
        pub const DEFAULT_MAX_LOOKAHEAD: usize = {};
        pub const MAX_LOOKAHEAD_CEILING: usize = {};
        pub const MAX_PATHS_PER_DECISION: usize = {};
        pub const MAX_RULES: usize = {};
    }}

    pub mod logging {{
        pub const LOG_BUFFER_SIZE: usize = {};
        pub const MAX_LOG_MESSAGE_LENGTH: usize = {};
    }}
}}
"#,
        profile,
        // Lexical
        config.lexical.max_token_count,
        config.lexical.max_lexical_diagnostics,
        // Syntax
        config.syntax.max_parse_depth,
        config.syntax.max_diagnostics,
        config.syntax.max_recovery_scan_tokens,
        // Analysis
        config.analysis.default_max_lookahead,
        config.analysis.max_lookahead_ceiling,
        config.analysis.max_paths_per_decision,
        config.analysis.max_rules,
        // Logging
        config.logging.log_buffer_size,
        config.logging.max_log_message_length,
    );

    fs::write(output_path, constants_code).unwrap();
}
