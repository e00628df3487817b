//! Tokenizer over a token model
//!
//! Each position is matched against candidate categories and the longest
//! match wins, ties going to the category registered first. Candidates come
//! from the first-character dispatch table when one could be built, otherwise
//! every concrete category is tried in registration order. Both paths produce
//! the same tokens.

use super::dispatch::{DispatchBuild, DispatchTable};
use crate::config::compile_time::lexical::MAX_LEXICAL_DIAGNOSTICS;
use crate::config::runtime::{LexerRecoveryMode, TokenizerPreferences};
use crate::diagnostics::{Diagnostic, RecoveryAction};
use crate::logging::{codes, Code};
use crate::tokens::{CategoryId, Group, Token, TokenModel, TokenModelError};
use crate::utils::{Position, Span};
use crate::{log_debug, log_success};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Configuration errors raised when a tokenizer is built
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizerError {
    #[error("Invalid token model: {0}")]
    Model(#[from] TokenModelError),

    #[error("First-character optimization unavailable for: {}", categories.join(", "))]
    OptimizationUnavailable { categories: Vec<String> },
}

impl TokenizerError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::Model(inner) => inner.error_code(),
            Self::OptimizationUnavailable { .. } => codes::lexical::OPTIMIZATION_UNAVAILABLE,
        }
    }
}

/// Counters gathered during one tokenization
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LexicalMetrics {
    pub total_tokens: usize,
    pub skipped_tokens: usize,
    pub grouped_tokens: usize,
    pub unmatched_bytes: usize,
    /// Diagnostics dropped after `MAX_LEXICAL_DIAGNOSTICS` was reached
    pub suppressed_diagnostics: usize,
    pub used_dispatch: bool,
}

impl LexicalMetrics {
    fn record_token(&mut self, group: &Group) {
        self.total_tokens += 1;
        match group {
            Group::Normal => {}
            Group::Skipped => self.skipped_tokens += 1,
            Group::Named(_) => self.grouped_tokens += 1,
        }
    }
}

/// Everything one tokenization produces
#[derive(Debug, Clone, Default)]
pub struct TokenizeOutput {
    /// `Normal` tokens in input order, always ending with `EOF`
    pub tokens: Vec<Token>,
    /// Tokens of `Named` groups, keyed by group name
    pub groups: BTreeMap<String, Vec<Token>>,
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: LexicalMetrics,
}

impl TokenizeOutput {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        if self.diagnostics.len() < MAX_LEXICAL_DIAGNOSTICS {
            self.diagnostics.push(diagnostic);
        } else {
            self.metrics.suppressed_diagnostics += 1;
        }
    }
}

/// Tokenizer bound to one token model
#[derive(Debug)]
pub struct Tokenizer {
    model: Arc<TokenModel>,
    dispatch: Option<DispatchTable>,
    preferences: TokenizerPreferences,
}

impl Tokenizer {
    pub fn new(model: Arc<TokenModel>) -> Result<Self, TokenizerError> {
        Self::with_preferences(model, TokenizerPreferences::default())
    }

    /// Validate the model and build the dispatch table.
    ///
    /// In strict mode an underivable category is an error; otherwise the
    /// tokenizer falls back to the ordered scan.
    pub fn with_preferences(
        model: Arc<TokenModel>,
        preferences: TokenizerPreferences,
    ) -> Result<Self, TokenizerError> {
        model.validate()?;

        let dispatch = match DispatchTable::build(&model) {
            DispatchBuild::Ready(table) => Some(table),
            DispatchBuild::Unavailable(categories) => {
                if preferences.ensure_optimizations {
                    return Err(TokenizerError::OptimizationUnavailable { categories });
                }
                log_debug!("First-character dispatch unavailable, using ordered scan",
                    "categories" => categories.join(", ")
                );
                None
            }
        };

        log_success!(codes::success::TOKENIZER_READY, "Tokenizer ready",
            "categories" => model.len(),
            "optimized" => dispatch.is_some()
        );

        Ok(Self {
            model,
            dispatch,
            preferences,
        })
    }

    pub fn model(&self) -> &Arc<TokenModel> {
        &self.model
    }

    pub fn preferences(&self) -> &TokenizerPreferences {
        &self.preferences
    }

    /// Whether the first-character fast path is active
    pub fn is_optimized(&self) -> bool {
        self.dispatch.is_some()
    }

    /// Tokenize `text`. Malformed input becomes diagnostics, never an error.
    pub fn tokenize(&self, text: &str) -> TokenizeOutput {
        self.scan(text, self.dispatch.as_ref())
    }

    /// Tokenize with the ordered scan regardless of the dispatch table
    pub fn tokenize_unoptimized(&self, text: &str) -> TokenizeOutput {
        self.scan(text, None)
    }

    fn scan(&self, text: &str, dispatch: Option<&DispatchTable>) -> TokenizeOutput {
        let mut output = TokenizeOutput {
            metrics: LexicalMetrics {
                used_dispatch: dispatch.is_some(),
                ..LexicalMetrics::default()
            },
            ..TokenizeOutput::default()
        };
        let mut position = Position::start();
        let max_tokens = self.preferences.effective_max_tokens();

        while position.offset < text.len() {
            let Some((category, len)) = self.longest_match(text, position.offset, dispatch) else {
                position = self.recover(text, position, dispatch, &mut output);
                continue;
            };

            let Some(definition) = self.model.get(category) else {
                break;
            };
            let group = definition.group();
            let kept = output.metrics.total_tokens - output.metrics.skipped_tokens;
            if !matches!(group, Group::Skipped) && kept >= max_tokens {
                let span = Span::new(position, advance_over(text, position, len));
                output.push_diagnostic(
                    Diagnostic::lexical(
                        codes::lexical::TOO_MANY_TOKENS,
                        format!("Token limit of {} reached, remaining input ignored", max_tokens),
                        span,
                    )
                    .with_recovery(RecoveryAction::SkippedInput {
                        bytes: text.len() - position.offset,
                    }),
                );
                break;
            }

            let end = advance_over(text, position, len);
            let token = Token::new(category, &text[position.offset..end.offset], Span::new(position, end));
            output.metrics.record_token(group);
            match group {
                Group::Normal => output.tokens.push(token),
                Group::Skipped => {}
                Group::Named(name) => output.groups.entry(name.clone()).or_default().push(token),
            }
            position = end;
        }

        output.tokens.push(Token::eof(position));

        log_success!(codes::success::TOKENIZATION_COMPLETE, "Tokenization complete",
            "tokens" => output.tokens.len(),
            "diagnostics" => output.diagnostics.len(),
            "optimized" => output.metrics.used_dispatch
        );

        output
    }

    /// Longest non-empty match at `offset` as `(category, byte length)`
    fn longest_match(
        &self,
        text: &str,
        offset: usize,
        dispatch: Option<&DispatchTable>,
    ) -> Option<(CategoryId, usize)> {
        let mut best: Option<(CategoryId, usize)> = None;
        let mut consider = |id: CategoryId, len: Option<usize>| {
            if let Some(len) = len.filter(|len| *len > 0) {
                if best.map_or(true, |(_, best_len)| len > best_len) {
                    best = Some((id, len));
                }
            }
        };

        match dispatch {
            Some(table) => {
                let ch = text[offset..].chars().next()?;
                for id in table.candidates(ch) {
                    if let Some(category) = self.model.get(*id) {
                        consider(*id, category.match_at(text, offset));
                    }
                }
            }
            None => {
                for category in self.model.concrete_categories() {
                    consider(category.id(), category.match_at(text, offset));
                }
            }
        }

        best
    }

    /// Skip unmatched input at `position` and report it; returns where scanning resumes
    fn recover(
        &self,
        text: &str,
        position: Position,
        dispatch: Option<&DispatchTable>,
        output: &mut TokenizeOutput,
    ) -> Position {
        let mut end = step_char(text, position);
        if self.preferences.recovery_mode == LexerRecoveryMode::SkipToNextMatch {
            while end.offset < text.len() && self.longest_match(text, end.offset, dispatch).is_none() {
                end = step_char(text, end);
            }
        }

        let skipped = &text[position.offset..end.offset];
        let message = if skipped.chars().count() == 1 {
            format!("Unexpected character {:?}", skipped)
        } else {
            format!("Unexpected input {:?}", skipped)
        };
        log_debug!("Unmatched input skipped",
            "offset" => position.offset,
            "bytes" => skipped.len()
        );

        output.metrics.unmatched_bytes += skipped.len();
        output.push_diagnostic(Diagnostic::lexical(
            codes::lexical::UNMATCHED_INPUT,
            message,
            Span::new(position, end),
        ));
        end
    }
}

/// Position after the one character starting at `from`
fn step_char(text: &str, from: Position) -> Position {
    let len = text[from.offset..].chars().next().map_or(1, char::len_utf8);
    advance_over(text, from, len)
}

/// Position after `len` bytes starting at `from`.
///
/// Peeks into the full text so a `\r` at the end of the slice still sees the
/// `\n` that follows it.
fn advance_over(text: &str, from: Position, len: usize) -> Position {
    let end = from.offset + len;
    let mut position = from;
    let mut chars = text[from.offset..].chars().peekable();
    while position.offset < end {
        let Some(ch) = chars.next() else {
            break;
        };
        position = position.advance(ch, chars.peek().copied());
    }
    position
}
