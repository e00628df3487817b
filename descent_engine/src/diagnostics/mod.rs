//! Lexical and syntactic diagnostics
//!
//! Diagnostics are data returned next to a best-effort result. They are never
//! raised as errors.

use crate::logging::Code;
use crate::tokens::{CategoryId, Token, TokenModel};
use crate::utils::{SourceMap, Span};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// No token category matched the input at an offset
    Lexical,
    /// The expected category set did not match the actual token
    Syntactic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticSeverity {
    /// Repaired in place; the surrounding rule continued normally
    Recoverable,
    /// The current alternative was abandoned
    FatalForAlternative,
}

/// What the engine did about the problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    None,
    /// Unmatched input skipped by the tokenizer
    SkippedInput { bytes: usize },
    /// Unexpected token removed before continuing
    Deleted,
    /// Missing token synthesized without consuming input
    Inserted,
    /// Tokens skipped until a follow token of the failing rule
    Resynced { skipped: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub code: Code,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub span: Span,
    pub expected: Vec<CategoryId>,
    pub actual: Option<Token>,
    /// Rule call stack at the point of failure, outermost first
    pub rule_stack: Vec<String>,
    pub recovery: RecoveryAction,
}

impl Diagnostic {
    pub fn lexical(code: Code, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind: DiagnosticKind::Lexical,
            code,
            severity: DiagnosticSeverity::Recoverable,
            message: message.into(),
            span,
            expected: Vec::new(),
            actual: None,
            rule_stack: Vec::new(),
            recovery: RecoveryAction::SkippedInput { bytes: span.len() },
        }
    }

    pub fn syntactic(
        code: Code,
        message: impl Into<String>,
        expected: Vec<CategoryId>,
        actual: Token,
    ) -> Self {
        Self {
            kind: DiagnosticKind::Syntactic,
            code,
            severity: DiagnosticSeverity::FatalForAlternative,
            message: message.into(),
            span: actual.span,
            expected,
            actual: Some(actual),
            rule_stack: Vec::new(),
            recovery: RecoveryAction::None,
        }
    }

    pub fn with_severity(mut self, severity: DiagnosticSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_recovery(mut self, recovery: RecoveryAction) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_rule_stack(mut self, rule_stack: Vec<String>) -> Self {
        self.rule_stack = rule_stack;
        self
    }

    /// Byte offset where the problem starts
    pub fn offset(&self) -> usize {
        self.span.start.offset
    }

    pub fn is_lexical(&self) -> bool {
        self.kind == DiagnosticKind::Lexical
    }

    pub fn is_recoverable(&self) -> bool {
        self.severity == DiagnosticSeverity::Recoverable
    }

    /// Human-readable rendering with the offending source line
    pub fn render(&self, source: &str, model: &TokenModel) -> String {
        let mut message = self.message.clone();
        if !self.expected.is_empty() {
            message.push_str(&format!(" (expected one of: {})", model.describe(&self.expected)));
        }
        let mut rendered = SourceMap::new(source).format_error(&self.span, &message);
        if !self.rule_stack.is_empty() {
            rendered.push_str(&format!("  = in rule: {}\n", self.rule_stack.join(" > ")));
        }
        rendered
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} at {}", self.code, self.message, self.span.start)
    }
}
