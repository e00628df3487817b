//! Structural grammar errors found by self-analysis

use crate::logging::{codes, Code};

/// Fatal defects in a grammar's shape.
///
/// A registry that produced one of these refuses to parse until a rule is
/// added or removed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("Left recursion in rule '{rule}': {}", path.join(" -> "))]
    LeftRecursion { rule: String, path: Vec<String> },

    #[error("Rule '{rule}' calls undefined rule '{callee}'")]
    UnknownRule { rule: String, callee: String },

    #[error("Rule '{rule}' uses {kind} with index {idx} more than once")]
    DuplicateOccurrence { rule: String, kind: String, idx: u32 },

    #[error("Token category '{category}' cannot be resolved: {reason}")]
    UnresolvedHierarchy { category: String, reason: String },

    #[error("Recording rule '{rule}' failed: {message}")]
    RecordingFailed { rule: String, message: String },
}

impl StructuralError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::LeftRecursion { .. } => codes::analysis::LEFT_RECURSION,
            Self::UnknownRule { .. } => codes::analysis::UNKNOWN_RULE,
            Self::DuplicateOccurrence { .. } => codes::analysis::DUPLICATE_OCCURRENCE,
            Self::UnresolvedHierarchy { .. } => codes::analysis::UNRESOLVED_HIERARCHY,
            Self::RecordingFailed { .. } => codes::analysis::RECORDING_FAILED,
        }
    }

    /// Name of the rule the error is attached to, if any
    pub fn rule(&self) -> Option<&str> {
        match self {
            Self::LeftRecursion { rule, .. }
            | Self::UnknownRule { rule, .. }
            | Self::DuplicateOccurrence { rule, .. }
            | Self::RecordingFailed { rule, .. } => Some(rule),
            Self::UnresolvedHierarchy { .. } => None,
        }
    }
}
