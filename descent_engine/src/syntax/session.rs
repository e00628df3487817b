//! Parse sessions and combinator primitives
//!
//! A session runs in one of two modes. While the registry records a rule, each
//! combinator appends a GAST node and returns a placeholder value. While
//! parsing, each combinator consults the precomputed lookahead table for its
//! `(rule, kind, idx)` decision.

use super::error::{EngineError, RuleFailure, RuleResult};
use super::output::ParseOutput;
use crate::analysis::{AlternativeLookahead, Decision, GrammarAnalysis};
use crate::diagnostics::Diagnostic;
use crate::grammar::recorder::Recorder;
use crate::grammar::{Alternative, DecisionKind, Production, Registry, RuleId};
use crate::logging::codes;
use crate::tokens::{CategoryId, Token, TokenStream};
use crate::utils::Position;
use crate::{log_debug, log_success};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

pub(super) type Gate<'a, 'r, V> = Box<dyn Fn(&ParseSession<'r, V>) -> bool + 'a>;
type AltBody<'a, 'r, V, T> = Box<dyn FnOnce(&mut ParseSession<'r, V>) -> RuleResult<T> + 'a>;

/// One alternative of a choice
pub struct Alt<'a, 'r, V, T> {
    gate: Option<Gate<'a, 'r, V>>,
    body: AltBody<'a, 'r, V, T>,
}

impl<'a, 'r, V, T> Alt<'a, 'r, V, T> {
    pub fn new(body: impl FnOnce(&mut ParseSession<'r, V>) -> RuleResult<T> + 'a) -> Self {
        Self {
            gate: None,
            body: Box::new(body),
        }
    }

    /// Alternative that is only considered while `gate` holds
    pub fn gated(
        gate: impl Fn(&ParseSession<'r, V>) -> bool + 'a,
        body: impl FnOnce(&mut ParseSession<'r, V>) -> RuleResult<T> + 'a,
    ) -> Self {
        Self {
            gate: Some(Box::new(gate)),
            body: Box::new(body),
        }
    }
}

enum Mode<'r> {
    Recording(Recorder),
    Parsing(&'r GrammarAnalysis),
}

/// Site of an in-place recovery; each is repaired at most once per parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum RecoverySite {
    Consume(RuleId, CategoryId, u32),
    Decision(RuleId, DecisionKind, u32),
}

/// Mutable state of one parse over one token stream
pub struct ParseSession<'r, V> {
    pub(super) registry: &'r Registry<V>,
    mode: Mode<'r>,
    pub(super) tokens: TokenStream,
    pub(super) cursor: usize,
    pub(super) call_stack: Vec<RuleId>,
    pub(super) diagnostics: Vec<Diagnostic>,
    pub(super) suppressed: usize,
    pub(super) recovered: HashSet<RecoverySite>,
    lexical_diagnostics: Vec<Diagnostic>,
}

impl<'r, V: Default + 'static> ParseSession<'r, V> {
    pub(crate) fn new(registry: &'r Registry<V>, tokens: TokenStream) -> Result<Self, EngineError> {
        let analysis = registry.ready_analysis()?;
        Ok(Self::with_mode(registry, Mode::Parsing(analysis), tokens))
    }

    pub(crate) fn recording(registry: &'r Registry<V>, rule: RuleId) -> Self {
        let mut session = Self::with_mode(registry, Mode::Recording(Recorder::new()), TokenStream::new(Vec::new()));
        session.call_stack.push(rule);
        session
    }

    fn with_mode(registry: &'r Registry<V>, mode: Mode<'r>, tokens: TokenStream) -> Self {
        Self {
            registry,
            mode,
            tokens,
            cursor: 0,
            call_stack: Vec::new(),
            diagnostics: Vec::new(),
            suppressed: 0,
            recovered: HashSet::new(),
            lexical_diagnostics: Vec::new(),
        }
    }

    pub(crate) fn finish_recording(self) -> Vec<Production> {
        match self.mode {
            Mode::Recording(recorder) => recorder.finish(),
            Mode::Parsing(_) => Vec::new(),
        }
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Replace the input and clear all per-parse state
    pub fn reset(&mut self, tokens: impl Into<TokenStream>) {
        self.load(tokens, Vec::new());
    }

    /// Replace the input, carrying the tokenizer's diagnostics into the output
    pub fn load(&mut self, tokens: impl Into<TokenStream>, lexical_diagnostics: Vec<Diagnostic>) {
        self.tokens = tokens.into();
        self.lexical_diagnostics = lexical_diagnostics;
        self.rewind();
    }

    fn rewind(&mut self) {
        self.cursor = 0;
        self.call_stack.clear();
        self.diagnostics.clear();
        self.suppressed = 0;
        self.recovered.clear();
    }

    /// Parse the loaded tokens from the rule named `start`
    pub fn invoke(&mut self, start: &str) -> Result<ParseOutput<V>, EngineError> {
        let Some(id) = self.registry.rule_id(start) else {
            return Err(EngineError::UnknownRule {
                name: start.to_string(),
            });
        };
        if self.is_recording() {
            return Err(EngineError::NotFinalized);
        }
        self.rewind();

        log_debug!("Parse started", "start" => start, "tokens" => self.tokens.len());

        let value = match self.invoke_rule(id) {
            Ok(value) => value,
            Err(failure) => {
                let diagnostic = self.failure_diagnostic(&failure);
                self.record(diagnostic);
                V::default()
            }
        };

        if !self.la(1).is_eof() {
            let actual = self.la(1).clone();
            let message = format!("Redundant input, expecting end of input but found {}", describe_token(&actual));
            self.record(Diagnostic::syntactic(
                codes::syntax::NOT_ALL_INPUT_PARSED,
                message,
                vec![CategoryId::EOF],
                actual,
            ));
        }

        log_success!(codes::success::PARSE_COMPLETE, "Parse complete",
            "start" => start,
            "consumed" => self.cursor,
            "diagnostics" => self.diagnostics.len(),
            "suppressed" => self.suppressed
        );

        Ok(ParseOutput {
            value,
            lexical_diagnostics: std::mem::take(&mut self.lexical_diagnostics),
            syntactic_diagnostics: std::mem::take(&mut self.diagnostics),
            suppressed_diagnostics: self.suppressed,
        })
    }

    pub(super) fn invoke_rule(&mut self, id: RuleId) -> RuleResult<V> {
        let registry = self.registry;
        let Some(rule) = registry.rule(id) else {
            return Err(RuleFailure::UnknownRule {
                name: format!("#{}", id.index()),
                actual: self.la(1).clone(),
            });
        };
        if self.call_stack.len() >= crate::config::compile_time::syntax::MAX_PARSE_DEPTH {
            return Err(RuleFailure::RecursionLimit {
                depth: self.call_stack.len(),
                actual: self.la(1).clone(),
            });
        }

        self.call_stack.push(id);
        let result = match (rule.body)(self) {
            Ok(value) => Ok(value),
            Err(failure) if self.call_stack.len() == 1 => {
                let diagnostic = self.failure_diagnostic(&failure);
                self.record(diagnostic);
                Ok(V::default())
            }
            Err(failure) => self.resync(id, failure),
        };
        self.call_stack.pop();
        result
    }

    // ========================================================================
    // INSPECTION
    // ========================================================================

    pub fn is_recording(&self) -> bool {
        matches!(self.mode, Mode::Recording(_))
    }

    /// Token `n` positions ahead, 1-based; reads past the end yield `EOF`
    pub fn la(&self, n: usize) -> &Token {
        self.tokens.get(self.cursor + n.max(1) - 1)
    }

    /// Index of the next unconsumed token
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Names of the active rules, outermost first
    pub fn rule_stack(&self) -> Vec<String> {
        self.call_stack
            .iter()
            .map(|id| self.registry.rule_name(*id).to_string())
            .collect()
    }

    /// Syntactic diagnostics recorded so far in this parse
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(super) fn analysis(&self) -> Option<&'r GrammarAnalysis> {
        match self.mode {
            Mode::Parsing(analysis) => Some(analysis),
            Mode::Recording(_) => None,
        }
    }

    pub(super) fn current_rule(&self) -> RuleId {
        self.call_stack.last().copied().unwrap_or(RuleId(0))
    }

    pub(super) fn recovery_enabled(&self) -> bool {
        self.registry.preferences().recovery_enabled
    }

    fn recorder(&mut self) -> Option<&mut Recorder> {
        match &mut self.mode {
            Mode::Recording(recorder) => Some(recorder),
            Mode::Parsing(_) => None,
        }
    }

    // ========================================================================
    // COMBINATORS
    // ========================================================================

    /// Match one token of `category` (or any descendant of it)
    pub fn consume(&mut self, idx: u32, category: CategoryId) -> RuleResult<Token> {
        if let Some(recorder) = self.recorder() {
            recorder.terminal(category, idx);
            return Ok(Token::placeholder(category, Position::start()));
        }

        let registry = self.registry;
        if registry.model().is_a(self.la(1).category, category) {
            return Ok(self.advance());
        }
        if let Some(token) = self.recover_consume(idx, category) {
            return Ok(token);
        }
        Err(RuleFailure::MismatchedToken {
            expected: vec![category],
            actual: self.la(1).clone(),
        })
    }

    /// Invoke the rule named `name`
    pub fn subrule(&mut self, idx: u32, name: &str) -> RuleResult<V> {
        if let Some(recorder) = self.recorder() {
            recorder.non_terminal(name, idx);
            return Ok(V::default());
        }

        match self.registry.rule_id(name) {
            Some(id) => self.invoke_rule(id),
            None => Err(RuleFailure::UnknownRule {
                name: name.to_string(),
                actual: self.la(1).clone(),
            }),
        }
    }

    /// Zero or one occurrence of `body`
    pub fn option<T>(&mut self, idx: u32, body: impl FnOnce(&mut Self) -> RuleResult<T>) -> RuleResult<Option<T>> {
        if self.is_recording() {
            let (result, recorded) = self.record_nested(body);
            if let Some(recorder) = self.recorder() {
                recorder.option(idx, recorded);
            }
            return result.map(|_| None);
        }

        let decision = self.decision(DecisionKind::Option, idx)?;
        if self.enters(decision) {
            body(self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Zero or more occurrences of `body`
    pub fn many<T>(&mut self, idx: u32, mut body: impl FnMut(&mut Self) -> RuleResult<T>) -> RuleResult<Vec<T>> {
        if self.is_recording() {
            let (result, recorded) = self.record_nested(&mut body);
            if let Some(recorder) = self.recorder() {
                recorder.repetition(idx, false, recorded);
            }
            return result.map(|_| Vec::new());
        }

        let decision = self.decision(DecisionKind::Many, idx)?;
        let mut values = Vec::new();
        self.repeat(decision, &mut body, &mut values)?;
        Ok(values)
    }

    /// One or more occurrences of `body`
    pub fn at_least_one<T>(
        &mut self,
        idx: u32,
        mut body: impl FnMut(&mut Self) -> RuleResult<T>,
    ) -> RuleResult<Vec<T>> {
        if self.is_recording() {
            let (result, recorded) = self.record_nested(&mut body);
            if let Some(recorder) = self.recorder() {
                recorder.repetition(idx, true, recorded);
            }
            return result.map(|_| Vec::new());
        }

        let decision = self.decision(DecisionKind::AtLeastOne, idx)?;
        if !self.enters(decision) {
            let site = RecoverySite::Decision(self.current_rule(), DecisionKind::AtLeastOne, idx);
            let expected = first_categories(&decision.alternatives[..1]);
            let repaired = self.delete_for_decision(site, expected.clone(), |session| {
                session.enters(decision).then_some(())
            });
            if repaired.is_none() {
                return Err(RuleFailure::EarlyExit {
                    expected,
                    actual: self.la(1).clone(),
                });
            }
        }

        let mut values = vec![body(self)?];
        self.repeat(decision, &mut body, &mut values)?;
        Ok(values)
    }

    fn repeat<T>(
        &mut self,
        decision: &Decision,
        body: &mut impl FnMut(&mut Self) -> RuleResult<T>,
        values: &mut Vec<T>,
    ) -> RuleResult<()> {
        while self.enters(decision) {
            let before = self.cursor;
            values.push(body(self)?);
            if self.cursor == before {
                break;
            }
        }
        Ok(())
    }

    /// Choose among `alternatives` using the decision's lookahead table
    pub fn or<T>(&mut self, idx: u32, alternatives: Vec<Alt<'_, 'r, V, T>>) -> RuleResult<T> {
        self.choose(idx, None, alternatives)
    }

    /// Like [`or`](Self::or), with a description used in "no viable alternative" messages
    pub fn or_expecting<T>(
        &mut self,
        idx: u32,
        description: &str,
        alternatives: Vec<Alt<'_, 'r, V, T>>,
    ) -> RuleResult<T> {
        self.choose(idx, Some(description), alternatives)
    }

    fn choose<T>(
        &mut self,
        idx: u32,
        description: Option<&str>,
        alternatives: Vec<Alt<'_, 'r, V, T>>,
    ) -> RuleResult<T> {
        if self.is_recording() {
            return self.record_choice(idx, alternatives);
        }

        let decision = self.decision(DecisionKind::Or, idx)?;
        if decision.alternatives.len() != alternatives.len() {
            return Err(self.unrecorded(DecisionKind::Or, idx));
        }
        let (gates, bodies): (Vec<_>, Vec<_>) = alternatives.into_iter().map(|alt| (alt.gate, alt.body)).unzip();

        let chosen = match self.select(decision, &gates) {
            Some(chosen) => Some(chosen),
            None => {
                let site = RecoverySite::Decision(self.current_rule(), DecisionKind::Or, idx);
                let expected = first_categories(&decision.alternatives);
                self.delete_for_decision(site, expected, |session| session.select(decision, &gates))
            }
        };

        match chosen.and_then(|chosen| bodies.into_iter().nth(chosen)) {
            Some(body) => body(self),
            None => Err(RuleFailure::NoViableAlternative {
                expected: first_categories(&decision.alternatives),
                actual: self.la(1).clone(),
                description: description.map(str::to_string),
            }),
        }
    }

    /// Run a semantic action; skipped while recording
    pub fn action<T: Default>(&self, f: impl FnOnce() -> T) -> T {
        if self.is_recording() {
            T::default()
        } else {
            f()
        }
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    pub(super) fn advance(&mut self) -> Token {
        let token = self.la(1).clone();
        if self.cursor < self.tokens.eof_index() {
            self.cursor += 1;
        }
        token
    }

    fn record_nested<T>(&mut self, body: impl FnOnce(&mut Self) -> RuleResult<T>) -> (RuleResult<T>, Vec<Production>) {
        if let Some(recorder) = self.recorder() {
            recorder.open();
        }
        let result = body(self);
        let recorded = self.recorder().map(Recorder::close).unwrap_or_default();
        (result, recorded)
    }

    fn record_choice<T>(&mut self, idx: u32, alternatives: Vec<Alt<'_, 'r, V, T>>) -> RuleResult<T> {
        let mut recorded = Vec::with_capacity(alternatives.len());
        let mut first: Option<RuleResult<T>> = None;

        for alternative in alternatives {
            let gated = alternative.gate.is_some();
            let (result, body) = self.record_nested(alternative.body);
            recorded.push(Alternative { gated, body });
            // keep the first value, or the first failure
            let keep = match &first {
                None => true,
                Some(Ok(_)) => result.is_err(),
                Some(Err(_)) => false,
            };
            if keep {
                first = Some(result);
            }
        }

        if let Some(recorder) = self.recorder() {
            recorder.alternation(idx, recorded);
        }
        first.unwrap_or_else(|| Err(self.no_alternatives()))
    }

    fn no_alternatives(&self) -> RuleFailure {
        RuleFailure::NoViableAlternative {
            expected: Vec::new(),
            actual: self.la(1).clone(),
            description: Some("a choice without alternatives".to_string()),
        }
    }

    fn decision(&self, kind: DecisionKind, idx: u32) -> RuleResult<&'r Decision> {
        self.analysis()
            .and_then(|analysis| analysis.rule_at(self.current_rule().index()))
            .and_then(|rule| rule.decision(kind, idx))
            .ok_or_else(|| self.unrecorded(kind, idx))
    }

    fn unrecorded(&self, kind: DecisionKind, idx: u32) -> RuleFailure {
        RuleFailure::UnrecordedDecision {
            kind: kind.to_string(),
            idx,
            actual: self.la(1).clone(),
        }
    }

    /// Whether the lookahead selects the body of an option or repetition
    fn enters(&self, decision: &Decision) -> bool {
        decision
            .alternatives
            .first()
            .is_some_and(|alternative| self.matches(alternative))
    }

    /// First alternative whose gate holds and whose lookahead matches
    fn select(&self, decision: &Decision, gates: &[Option<Gate<'_, 'r, V>>]) -> Option<usize> {
        decision
            .alternatives
            .iter()
            .zip(gates)
            .position(|(alternative, gate)| {
                gate.as_ref().map_or(true, |gate| gate(self)) && self.matches(alternative)
            })
    }

    /// Any path matches the upcoming tokens; a short path matches on its prefix
    pub(super) fn matches(&self, alternative: &AlternativeLookahead) -> bool {
        let model = self.registry.model();
        alternative.paths.iter().any(|path| {
            path.iter()
                .enumerate()
                .all(|(offset, expected)| model.is_a(self.la(offset + 1).category, *expected))
        })
    }
}

impl<V> fmt::Debug for ParseSession<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseSession")
            .field("recording", &matches!(self.mode, Mode::Recording(_)))
            .field("cursor", &self.cursor)
            .field("tokens", &self.tokens.len())
            .field("depth", &self.call_stack.len())
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

/// Categories that can start any of the alternatives, deduplicated and ordered
pub(super) fn first_categories(alternatives: &[AlternativeLookahead]) -> Vec<CategoryId> {
    alternatives
        .iter()
        .flat_map(|alternative| alternative.paths.iter().filter_map(|path| path.first().copied()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub(super) fn describe_token(token: &Token) -> String {
    if token.is_eof() {
        "end of input".to_string()
    } else {
        format!("'{}'", token.image)
    }
}
