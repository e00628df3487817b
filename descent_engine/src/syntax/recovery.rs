//! Error recovery controller
//!
//! In-place repairs run at the failing consume site or choice point:
//! single-token deletion first, then single-token insertion. Each site is
//! repaired at most once per parse. Anything else unwinds to the enclosing
//! rule invocation, which skips ahead to a token in the rule's FOLLOW set (or
//! `EOF`) and returns the rule's default value.

use super::error::{RuleFailure, RuleResult};
use super::session::{describe_token, ParseSession, RecoverySite};
use crate::config::compile_time::syntax::MAX_RECOVERY_SCAN_TOKENS;
use crate::diagnostics::{Diagnostic, DiagnosticSeverity, RecoveryAction};
use crate::grammar::{DecisionKind, RuleId};
use crate::log_debug;
use crate::logging::{codes, Code};
use crate::tokens::{CategoryId, Token};

impl<'r, V: Default + 'static> ParseSession<'r, V> {
    /// Repair a failed consume of `category` in place, returning the token to use
    pub(super) fn recover_consume(&mut self, idx: u32, category: CategoryId) -> Option<Token> {
        if !self.recovery_enabled() {
            return None;
        }
        let registry = self.registry;
        let model = registry.model();
        let rule = self.current_rule();
        let site_key = RecoverySite::Consume(rule, category, idx);
        if self.recovered.contains(&site_key) {
            return None;
        }
        let rule_analysis = self.analysis()?.rule_at(rule.index())?;
        let site = rule_analysis.site(category, idx)?;

        let next = self.la(1).clone();
        let in_follows = |candidate: CategoryId| site.follows.iter().any(|follow| model.is_a(candidate, *follow));

        // Deletion: the next token is noise and the one after it is what we want
        if !next.is_eof() && !in_follows(next.category) && model.is_a(self.la(2).category, category) {
            self.cursor += 1;
            let token = self.advance();
            self.recovered.insert(site_key);
            let message = format!(
                "Unexpected {} before {}, token deleted",
                describe_token(&next),
                model.name(category)
            );
            self.record_repair(codes::syntax::MISMATCHED_TOKEN, message, vec![category], next, RecoveryAction::Deleted);
            return Some(token);
        }

        // Insertion: the next token is what would follow the missing one
        let follows_rule_end = site.reaches_end
            && (next.is_eof() || rule_analysis.follow.iter().any(|follow| model.is_a(next.category, *follow)));
        if registry.can_insert(category) && (in_follows(next.category) || follows_rule_end) {
            self.recovered.insert(site_key);
            let token = Token::placeholder(category, next.span.start);
            let message = format!(
                "Missing {} before {}, token inserted",
                model.name(category),
                describe_token(&next)
            );
            self.record_repair(codes::syntax::MISMATCHED_TOKEN, message, vec![category], next, RecoveryAction::Inserted);
            return Some(token);
        }

        None
    }

    /// Skip one token when the decision can be taken right after it
    pub(super) fn delete_for_decision<R>(
        &mut self,
        site: RecoverySite,
        expected: Vec<CategoryId>,
        select: impl Fn(&Self) -> Option<R>,
    ) -> Option<R> {
        if !self.recovery_enabled() || self.la(1).is_eof() || self.recovered.contains(&site) {
            return None;
        }

        let before = self.cursor;
        self.cursor += 1;
        let Some(selected) = select(self) else {
            self.cursor = before;
            return None;
        };

        self.recovered.insert(site);
        let deleted = self.tokens.get(before).clone();
        let code = match site {
            RecoverySite::Decision(_, DecisionKind::AtLeastOne, _) => codes::syntax::EARLY_EXIT,
            _ => codes::syntax::NO_VIABLE_ALTERNATIVE,
        };
        let message = format!("Unexpected {}, token deleted", describe_token(&deleted));
        self.record_repair(code, message, expected, deleted, RecoveryAction::Deleted);
        Some(selected)
    }

    /// Skip to a token that may follow `rule` and return its default value
    pub(super) fn resync(&mut self, rule: RuleId, failure: RuleFailure) -> RuleResult<V> {
        if !self.recovery_enabled() || !failure.is_resyncable() {
            return Err(failure);
        }
        let Some(rule_analysis) = self.analysis().and_then(|analysis| analysis.rule_at(rule.index())) else {
            return Err(failure);
        };
        let registry = self.registry;
        let model = registry.model();

        let start = self.cursor;
        let mut skipped = 0;
        loop {
            let next = self.la(1).category;
            if next.is_eof() || rule_analysis.follow.iter().any(|follow| model.is_a(next, *follow)) {
                break;
            }
            if skipped >= MAX_RECOVERY_SCAN_TOKENS {
                self.cursor = start;
                return Err(failure);
            }
            self.cursor += 1;
            skipped += 1;
        }

        log_debug!("Re-synchronized after failure",
            "rule" => registry.rule_name(rule),
            "skipped" => skipped,
            "resume" => self.cursor
        );

        let diagnostic = self
            .failure_diagnostic(&failure)
            .with_recovery(RecoveryAction::Resynced { skipped });
        self.record(diagnostic);
        Ok(V::default())
    }

    /// Diagnostic describing an unrepaired failure
    pub(super) fn failure_diagnostic(&self, failure: &RuleFailure) -> Diagnostic {
        let message = failure.describe(self.registry.model());

        Diagnostic::syntactic(
            failure.error_code(),
            message,
            failure.expected().to_vec(),
            failure.actual().clone(),
        )
        .with_rule_stack(self.rule_stack())
    }

    fn record_repair(
        &mut self,
        code: Code,
        message: String,
        expected: Vec<CategoryId>,
        actual: Token,
        action: RecoveryAction,
    ) {
        let diagnostic = Diagnostic::syntactic(code, message, expected, actual)
            .with_severity(DiagnosticSeverity::Recoverable)
            .with_recovery(action)
            .with_rule_stack(self.rule_stack());
        self.record(diagnostic);
    }

    /// Keep a diagnostic unless the per-parse cap is reached
    pub(super) fn record(&mut self, diagnostic: Diagnostic) {
        if self.diagnostics.len() >= self.registry.preferences().effective_max_diagnostics() {
            self.suppressed += 1;
            return;
        }
        log_debug!("Syntax diagnostic",
            "code" => diagnostic.code,
            "offset" => diagnostic.offset(),
            "message" => &diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }
}
