//! Parse-time error types
//!
//! `RuleFailure` is the in-rule control flow that unwinds a rule body through
//! `?`. It never escapes a parse: the recovery controller turns every failure
//! into a `Diagnostic`. `EngineError` is the refusal to start a parse at all.

use super::session::describe_token;
use crate::analysis::StructuralError;
use crate::logging::{codes, Code};
use crate::tokens::{CategoryId, Token, TokenModel};

pub type RuleResult<T> = Result<T, RuleFailure>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleFailure {
    #[error("Mismatched token '{}'", .actual.image)]
    MismatchedToken {
        expected: Vec<CategoryId>,
        actual: Token,
    },

    #[error("No viable alternative at '{}'", .actual.image)]
    NoViableAlternative {
        expected: Vec<CategoryId>,
        actual: Token,
        description: Option<String>,
    },

    #[error("Expected at least one iteration before '{}'", .actual.image)]
    EarlyExit {
        expected: Vec<CategoryId>,
        actual: Token,
    },

    #[error("Rule nesting exceeded {depth} levels")]
    RecursionLimit { depth: usize, actual: Token },

    #[error("Rule '{name}' is not defined")]
    UnknownRule { name: String, actual: Token },

    #[error("Decision {kind}#{idx} was not seen while recording the rule")]
    UnrecordedDecision {
        kind: String,
        idx: u32,
        actual: Token,
    },
}

impl RuleFailure {
    pub fn error_code(&self) -> Code {
        match self {
            Self::MismatchedToken { .. } => codes::syntax::MISMATCHED_TOKEN,
            Self::NoViableAlternative { .. } => codes::syntax::NO_VIABLE_ALTERNATIVE,
            Self::EarlyExit { .. } => codes::syntax::EARLY_EXIT,
            Self::RecursionLimit { .. } => codes::syntax::RECURSION_LIMIT,
            Self::UnknownRule { .. } => codes::syntax::UNKNOWN_RULE_NAME,
            Self::UnrecordedDecision { .. } => codes::system::INTERNAL_ERROR,
        }
    }

    /// Token that was current when the rule failed
    pub fn actual(&self) -> &Token {
        match self {
            Self::MismatchedToken { actual, .. }
            | Self::NoViableAlternative { actual, .. }
            | Self::EarlyExit { actual, .. }
            | Self::RecursionLimit { actual, .. }
            | Self::UnknownRule { actual, .. }
            | Self::UnrecordedDecision { actual, .. } => actual,
        }
    }

    pub fn expected(&self) -> &[CategoryId] {
        match self {
            Self::MismatchedToken { expected, .. }
            | Self::NoViableAlternative { expected, .. }
            | Self::EarlyExit { expected, .. } => expected,
            Self::RecursionLimit { .. }
            | Self::UnknownRule { .. }
            | Self::UnrecordedDecision { .. } => &[],
        }
    }

    /// Message with expected categories spelled out by name
    pub fn describe(&self, model: &TokenModel) -> String {
        match self {
            Self::MismatchedToken { expected, actual } => format!(
                "Expecting {} but found {}",
                model.describe(expected),
                describe_token(actual)
            ),
            Self::NoViableAlternative {
                description: Some(description),
                actual,
                ..
            } => format!("Expecting {} but found {}", description, describe_token(actual)),
            Self::NoViableAlternative { expected, actual, .. } => format!(
                "Expecting one of {} but found {}",
                model.describe(expected),
                describe_token(actual)
            ),
            Self::EarlyExit { expected, actual } => format!(
                "Expecting at least one of {} but found {}",
                model.describe(expected),
                describe_token(actual)
            ),
            other => other.to_string(),
        }
    }

    /// Failures that re-synchronization may repair
    pub fn is_resyncable(&self) -> bool {
        matches!(
            self,
            Self::MismatchedToken { .. } | Self::NoViableAlternative { .. } | Self::EarlyExit { .. }
        )
    }
}

/// Reasons a parse cannot start
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Registry has not been finalized")]
    NotFinalized,

    #[error("Grammar is structurally invalid: {0}")]
    Structural(#[from] StructuralError),

    #[error("Start rule '{name}' is not defined")]
    UnknownRule { name: String },
}

impl EngineError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::NotFinalized => codes::syntax::NOT_FINALIZED,
            Self::Structural(err) => err.error_code(),
            Self::UnknownRule { .. } => codes::syntax::UNKNOWN_RULE_NAME,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{Group, TokenPattern};
    use crate::utils::Position;

    #[test]
    fn test_failure_codes_and_accessors() {
        let actual = Token::eof(Position::new(3, 1, 4));
        let failure = RuleFailure::MismatchedToken {
            expected: vec![CategoryId(2)],
            actual: actual.clone(),
        };

        assert_eq!(failure.error_code(), codes::syntax::MISMATCHED_TOKEN);
        assert_eq!(failure.expected(), &[CategoryId(2)]);
        assert!(failure.actual().is_eof());
        assert!(failure.is_resyncable());

        let limit = RuleFailure::RecursionLimit { depth: 512, actual };
        assert!(!limit.is_resyncable());
        assert!(limit.expected().is_empty());
        assert_eq!(limit.to_string(), "Rule nesting exceeded 512 levels");
    }

    #[test]
    fn test_describe_names_expected_categories() {
        let mut model = TokenModel::new();
        let semi = model
            .define_category("Semi", None, TokenPattern::literal(";"), Group::Normal)
            .unwrap();
        let comma = model
            .define_category("Comma", None, TokenPattern::literal(","), Group::Normal)
            .unwrap();
        let actual = Token::eof(Position::new(0, 1, 1));

        let mismatch = RuleFailure::MismatchedToken {
            expected: vec![semi],
            actual: actual.clone(),
        };
        assert_eq!(mismatch.describe(&model), "Expecting Semi but found end of input");
        assert!(!mismatch.to_string().contains("CategoryId"));

        let no_alt = RuleFailure::NoViableAlternative {
            expected: vec![semi, comma],
            actual,
            description: None,
        };
        assert_eq!(no_alt.describe(&model), "Expecting one of Semi, Comma but found end of input");
    }
}
