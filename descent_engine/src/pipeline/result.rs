use crate::diagnostics::Diagnostic;
use crate::lexical::LexicalMetrics;
use crate::tokens::Token;
use std::collections::BTreeMap;
use std::time::Duration;

/// Everything one tokenize-then-parse run produces
#[derive(Debug, Clone)]
pub struct PipelineResult<V> {
    pub value: V,
    pub lexical_diagnostics: Vec<Diagnostic>,
    pub syntactic_diagnostics: Vec<Diagnostic>,
    /// Syntax diagnostics dropped after the per-parse cap
    pub suppressed_diagnostics: usize,
    /// Tokens of named groups, keyed by group name
    pub groups: BTreeMap<String, Vec<Token>>,
    pub lexical_metrics: LexicalMetrics,
    /// Tokens handed to the parser, `EOF` included
    pub token_count: usize,
    pub processing_duration: Duration,
}

impl<V> PipelineResult<V> {
    pub fn is_clean(&self) -> bool {
        self.lexical_diagnostics.is_empty() && self.syntactic_diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.lexical_diagnostics
            .iter()
            .chain(self.syntactic_diagnostics.iter())
    }

    pub fn log_success(&self, start: &str) {
        crate::log_success!(
            crate::logging::codes::success::PIPELINE_COMPLETE,
            "Tokenize and parse pipeline finished",
            "start" => start,
            "tokens" => self.token_count,
            "lexical_diagnostics" => self.lexical_diagnostics.len(),
            "syntactic_diagnostics" => self.syntactic_diagnostics.len(),
            "duration_ms" => format!("{:.2}", self.processing_duration.as_secs_f64() * 1000.0),
            "processing_rate_tokens_per_sec" => format!("{:.0}",
                self.token_count as f64 / self.processing_duration.as_secs_f64().max(f64::EPSILON))
        );
    }
}
