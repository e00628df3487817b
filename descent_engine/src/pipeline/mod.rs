mod error;
mod info;
mod result;

pub use error::PipelineError;
pub use info::{get_pipeline_info, PipelineInfo};
pub use result::PipelineResult;

use crate::analysis::GrammarAnalysis;
use crate::grammar::Registry;
use crate::lexical::Tokenizer;
use crate::tokens::TokenStream;
use std::sync::Arc;
use std::time::Instant;

/// Tokenizer plus finalized registry over the same token model.
///
/// Text is tokenized fully before parsing starts. An `Engine` is immutable
/// once built and can be shared across threads.
#[derive(Debug)]
pub struct Engine<V> {
    tokenizer: Tokenizer,
    registry: Registry<V>,
}

impl<V: Default + 'static> Engine<V> {
    /// Pair a tokenizer with a registry and finalize the registry
    pub fn new(tokenizer: Tokenizer, mut registry: Registry<V>) -> Result<Self, PipelineError> {
        if !Arc::ptr_eq(tokenizer.model(), registry.model()) {
            crate::log_error!(crate::logging::codes::system::CONFIGURATION_ERROR,
                "Tokenizer and registry use different token models");
            return Err(PipelineError::ModelMismatch);
        }
        registry.finalize()?;
        Ok(Self {
            tokenizer,
            registry,
        })
    }

    /// Build a tokenizer with default preferences for the registry's model
    pub fn from_registry(registry: Registry<V>) -> Result<Self, PipelineError> {
        let tokenizer = Tokenizer::new(registry.model().clone())?;
        Self::new(tokenizer, registry)
    }

    /// Tokenize `text` and parse it from the rule named `start`
    pub fn parse_text(&self, start: &str, text: &str) -> Result<PipelineResult<V>, PipelineError> {
        let start_time = Instant::now();
        crate::log_debug!("Pipeline started", "start" => start, "bytes" => text.len());

        let tokenized = self.tokenizer.tokenize(text);
        let token_count = tokenized.tokens.len();

        let mut session = self.registry.session(TokenStream::new(Vec::new()))?;
        session.load(tokenized.tokens, tokenized.diagnostics);
        let output = session.invoke(start)?;

        let result = PipelineResult {
            value: output.value,
            lexical_diagnostics: output.lexical_diagnostics,
            syntactic_diagnostics: output.syntactic_diagnostics,
            suppressed_diagnostics: output.suppressed_diagnostics,
            groups: tokenized.groups,
            lexical_metrics: tokenized.metrics,
            token_count,
            processing_duration: start_time.elapsed(),
        };
        result.log_success(start);

        Ok(result)
    }

    pub fn analysis(&self) -> Option<&GrammarAnalysis> {
        self.registry.analysis()
    }
}

impl<V> Engine<V> {
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn registry(&self) -> &Registry<V> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::codes;
    use crate::syntax::EngineError;
    use crate::tokens::{CategoryId, Group, TokenModel, TokenPattern};
    use assert_matches::assert_matches;

    fn model() -> (Arc<TokenModel>, CategoryId) {
        let mut model = TokenModel::new();
        let word = model
            .define_category("Word", None, TokenPattern::regex("[a-z]+"), Group::Normal)
            .unwrap();
        model
            .define_category("Comment", None, TokenPattern::regex("#[^\n]*"), Group::Named("comments".to_string()))
            .unwrap();
        model
            .define_category("WhiteSpace", None, TokenPattern::regex("[ \n]+"), Group::Skipped)
            .unwrap();
        (Arc::new(model), word)
    }

    fn word_count_registry(model: Arc<TokenModel>, word: CategoryId) -> Registry<usize> {
        let mut registry = Registry::new(model);
        registry
            .define_rule("words", move |s| {
                let words = s.many(1, |s| s.consume(1, word))?;
                Ok(words.len())
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_parse_text_collects_everything() {
        let (model, word) = model();
        let engine = Engine::from_registry(word_count_registry(model, word)).unwrap();

        let result = engine.parse_text("words", "alpha # note\nbeta ? gamma").unwrap();
        assert_eq!(result.value, 3);
        assert_eq!(result.token_count, 4);
        assert_eq!(result.groups["comments"].len(), 1);
        assert_eq!(result.groups["comments"][0].image(), "# note");
        assert_eq!(result.lexical_diagnostics.len(), 1);
        assert_eq!(result.lexical_diagnostics[0].code, codes::lexical::UNMATCHED_INPUT);
        assert!(result.syntactic_diagnostics.is_empty());
        assert!(!result.is_clean());
        assert_eq!(result.diagnostics().count(), 1);
    }

    #[test]
    fn test_model_mismatch_is_rejected() {
        let (model, word) = model();
        let (other, _) = self::model();
        let tokenizer = Tokenizer::new(other).unwrap();

        let err = Engine::new(tokenizer, word_count_registry(model, word)).unwrap_err();
        assert_matches!(err, PipelineError::ModelMismatch);
        assert_eq!(err.error_code(), codes::system::CONFIGURATION_ERROR);
    }

    #[test]
    fn test_unknown_start_rule() {
        let (model, word) = model();
        let engine = Engine::from_registry(word_count_registry(model, word)).unwrap();

        assert_matches!(
            engine.parse_text("sentence", "alpha"),
            Err(PipelineError::Engine(EngineError::UnknownRule { .. }))
        );
    }

    #[test]
    fn test_pipeline_info_report() {
        let info = get_pipeline_info();
        assert!(info.max_lookahead_ceiling >= info.default_max_lookahead);
        assert!(info.report().contains("Max Parse Depth"));
    }
}
