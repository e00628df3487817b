//! Lexical analysis
//!
//! Turns text into an `EOF`-terminated token sequence using a [`TokenModel`].
//! Unmatched input is reported as diagnostics and skipped; tokenization itself
//! never fails once a [`Tokenizer`] exists.
//!
//! [`TokenModel`]: crate::tokens::TokenModel

pub mod analyzer;
pub mod dispatch;
pub mod first_chars;

use crate::config::compile_time::lexical::{MAX_LEXICAL_DIAGNOSTICS, MAX_TOKEN_COUNT};
use crate::config::runtime::TokenizerPreferences;
use crate::tokens::TokenModel;
use std::sync::Arc;

pub use analyzer::{LexicalMetrics, TokenizeOutput, Tokenizer, TokenizerError};
pub use dispatch::{DispatchBuild, DispatchTable};
pub use first_chars::{leading_chars, regex_leading_chars, CharSet};

/// Tokenize once with default preferences
pub fn tokenize(model: Arc<TokenModel>, text: &str) -> Result<TokenizeOutput, TokenizerError> {
    Ok(Tokenizer::new(model)?.tokenize(text))
}

/// Build a tokenizer with explicit preferences
pub fn create_tokenizer_with_preferences(
    model: Arc<TokenModel>,
    preferences: TokenizerPreferences,
) -> Result<Tokenizer, TokenizerError> {
    Tokenizer::with_preferences(model, preferences)
}

/// Compile-time lexical limits, for reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexicalLimits {
    pub max_token_count: usize,
    pub max_lexical_diagnostics: usize,
}

pub fn get_lexical_limits() -> LexicalLimits {
    LexicalLimits {
        max_token_count: MAX_TOKEN_COUNT,
        max_lexical_diagnostics: MAX_LEXICAL_DIAGNOSTICS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{Group, TokenPattern};

    #[test]
    fn test_module_tokenize_helper() {
        let mut model = TokenModel::new();
        model
            .define_category("Digit", None, TokenPattern::regex("[0-9]"), Group::Normal)
            .unwrap();

        let output = tokenize(Arc::new(model), "123").unwrap();
        assert_eq!(output.tokens.len(), 4);
    }

    #[test]
    fn test_limits_are_nonzero() {
        let limits = get_lexical_limits();
        assert!(limits.max_token_count > 0);
        assert!(limits.max_lexical_diagnostics > 0);
    }
}
