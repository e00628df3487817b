use crate::config::compile_time::{analysis, lexical, syntax};

/// Compile-time limits the pipeline runs under
#[derive(Debug, Clone)]
pub struct PipelineInfo {
    pub max_token_count: usize,
    pub max_lexical_diagnostics: usize,
    pub max_parse_depth: usize,
    pub max_diagnostics: usize,
    pub max_recovery_scan_tokens: usize,
    pub default_max_lookahead: usize,
    pub max_lookahead_ceiling: usize,
    pub max_paths_per_decision: usize,
    pub max_rules: usize,
    pub global_logging_enabled: bool,
}

impl PipelineInfo {
    pub fn report(&self) -> String {
        format!(
            "Descent Pipeline:\n\
             - Max Tokens: {}\n\
             - Max Lexical Diagnostics: {}\n\
             - Max Parse Depth: {}\n\
             - Max Syntax Diagnostics: {}\n\
             - Max Recovery Scan: {} tokens\n\
             - Lookahead: default {}, ceiling {}\n\
             - Max Paths per Decision: {}\n\
             - Max Rules: {}\n\
             - Global Logging: {}",
            self.max_token_count,
            self.max_lexical_diagnostics,
            self.max_parse_depth,
            self.max_diagnostics,
            self.max_recovery_scan_tokens,
            self.default_max_lookahead,
            self.max_lookahead_ceiling,
            self.max_paths_per_decision,
            self.max_rules,
            self.global_logging_enabled,
        )
    }
}

pub fn get_pipeline_info() -> PipelineInfo {
    PipelineInfo {
        max_token_count: lexical::MAX_TOKEN_COUNT,
        max_lexical_diagnostics: lexical::MAX_LEXICAL_DIAGNOSTICS,
        max_parse_depth: syntax::MAX_PARSE_DEPTH,
        max_diagnostics: syntax::MAX_DIAGNOSTICS,
        max_recovery_scan_tokens: syntax::MAX_RECOVERY_SCAN_TOKENS,
        default_max_lookahead: analysis::DEFAULT_MAX_LOOKAHEAD,
        max_lookahead_ceiling: analysis::MAX_LOOKAHEAD_CEILING,
        max_paths_per_decision: analysis::MAX_PATHS_PER_DECISION,
        max_rules: analysis::MAX_RULES,
        global_logging_enabled: crate::logging::is_initialized(),
    }
}
