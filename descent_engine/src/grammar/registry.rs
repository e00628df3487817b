//! Rule registry
//!
//! Holds named rule bodies and the analysis derived from them. Rule bodies are
//! plain closures over a [`ParseSession`]; `finalize` runs each body once in
//! recording mode to obtain its GAST and then analyzes the whole grammar. The
//! analysis is cached until a rule is added or removed.

use super::gast::{RuleGast, RuleId};
use crate::analysis::{self, GrammarAnalysis, StructuralError};
use crate::config::compile_time::analysis::MAX_RULES;
use crate::config::ParserPreferences;
use crate::logging::{codes, Code};
use crate::syntax::{EngineError, ParseOutput, ParseSession, RuleResult};
use crate::tokens::{CategoryId, TokenModel, TokenStream};
use crate::{log_debug, log_error};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Body of a rule: reads tokens through the session and returns the rule value
pub type RuleBody<V> = Arc<dyn for<'r> Fn(&mut ParseSession<'r, V>) -> RuleResult<V> + Send + Sync>;

/// Decides whether recovery may synthesize a missing token of a category
pub type InsertionPolicy = Arc<dyn Fn(CategoryId) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Rule '{name}' is already defined")]
    DuplicateRule { name: String },

    #[error("Rule '{name}' is not defined")]
    UnknownRule { name: String },

    #[error("Registry already holds the maximum of {max} rules")]
    TooManyRules { max: usize },
}

impl RegistryError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::DuplicateRule { .. } => codes::syntax::DUPLICATE_RULE,
            Self::UnknownRule { .. } => codes::syntax::UNKNOWN_RULE_NAME,
            Self::TooManyRules { .. } => codes::syntax::TOO_MANY_RULES,
        }
    }
}

pub(crate) struct RuleDef<V> {
    pub(crate) name: String,
    pub(crate) body: RuleBody<V>,
}

/// Named rules over one token model.
///
/// A finalized registry is immutable and can be shared across threads; every
/// parse runs in its own [`ParseSession`].
pub struct Registry<V> {
    model: Arc<TokenModel>,
    rules: Vec<RuleDef<V>>,
    index: HashMap<String, RuleId>,
    preferences: ParserPreferences,
    insertion_policy: InsertionPolicy,
    /// `None` until analyzed; a broken grammar stays broken until a rule changes
    analysis: Option<Result<Arc<GrammarAnalysis>, StructuralError>>,
}

impl<V: Default + 'static> Registry<V> {
    pub fn new(model: Arc<TokenModel>) -> Self {
        Self::with_preferences(model, ParserPreferences::default())
    }

    pub fn with_preferences(model: Arc<TokenModel>, preferences: ParserPreferences) -> Self {
        Self {
            model,
            rules: Vec::new(),
            index: HashMap::new(),
            preferences,
            insertion_policy: Arc::new(|_| true),
            analysis: None,
        }
    }

    /// Register a named rule
    pub fn define_rule<F>(&mut self, name: &str, body: F) -> Result<RuleId, RegistryError>
    where
        F: for<'r> Fn(&mut ParseSession<'r, V>) -> RuleResult<V> + Send + Sync + 'static,
    {
        if self.index.contains_key(name) {
            let err = RegistryError::DuplicateRule {
                name: name.to_string(),
            };
            log_error!(err.error_code(), "Duplicate rule definition", "rule" => name);
            return Err(err);
        }
        if self.rules.len() >= MAX_RULES {
            return Err(RegistryError::TooManyRules { max: MAX_RULES });
        }

        let id = RuleId(self.rules.len());
        self.rules.push(RuleDef {
            name: name.to_string(),
            body: Arc::new(body),
        });
        self.index.insert(name.to_string(), id);
        self.analysis = None;

        log_debug!("Rule defined", "rule" => name, "id" => id.index());
        Ok(id)
    }

    /// Remove a rule; later rules keep their relative order
    pub fn remove_rule(&mut self, name: &str) -> Result<(), RegistryError> {
        let Some(id) = self.index.remove(name) else {
            return Err(RegistryError::UnknownRule {
                name: name.to_string(),
            });
        };
        self.rules.remove(id.index());
        self.index = self
            .rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule.name.clone(), RuleId(i)))
            .collect();
        self.analysis = None;
        Ok(())
    }

    /// Replace the insertion recovery policy (default: every category)
    pub fn set_insertion_policy(&mut self, policy: impl Fn(CategoryId) -> bool + Send + Sync + 'static) {
        self.insertion_policy = Arc::new(policy);
    }

    /// Whether recovery may insert a missing token of `category`; `EOF` is never inserted
    pub fn can_insert(&self, category: CategoryId) -> bool {
        !category.is_eof() && (self.insertion_policy)(category)
    }

    /// Record and analyze every rule, or return the cached result
    pub fn finalize(&mut self) -> Result<&GrammarAnalysis, StructuralError> {
        let outcome = match self.analysis.take() {
            Some(outcome) => outcome,
            None => self.record_and_analyze().map(Arc::new),
        };
        match self.analysis.insert(outcome) {
            Ok(analysis) => Ok(&**analysis),
            Err(err) => Err(err.clone()),
        }
    }

    fn record_and_analyze(&self) -> Result<GrammarAnalysis, StructuralError> {
        let mut gasts = Vec::with_capacity(self.rules.len());
        for (i, rule) in self.rules.iter().enumerate() {
            let mut session = ParseSession::recording(self, RuleId(i));
            let result = (rule.body)(&mut session);
            let body = session.finish_recording();
            if let Err(failure) = result {
                return Err(StructuralError::RecordingFailed {
                    rule: rule.name.clone(),
                    message: failure.describe(&self.model),
                });
            }
            gasts.push(RuleGast {
                name: rule.name.clone(),
                body,
            });
        }

        analysis::analyze(&self.model, &gasts, self.preferences.effective_max_lookahead()).map_err(|err| {
            log_error!(err.error_code(), "Grammar analysis failed",
                "error" => &err,
                "rule" => err.rule().unwrap_or("-")
            );
            err
        })
    }

    /// Cached analysis, if `finalize` succeeded since the last change
    pub fn analysis(&self) -> Option<&GrammarAnalysis> {
        match &self.analysis {
            Some(Ok(analysis)) => Some(analysis.as_ref()),
            _ => None,
        }
    }

    pub(crate) fn ready_analysis(&self) -> Result<&GrammarAnalysis, EngineError> {
        match &self.analysis {
            None => Err(EngineError::NotFinalized),
            Some(Err(err)) => Err(EngineError::Structural(err.clone())),
            Some(Ok(analysis)) => Ok(analysis.as_ref()),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.analysis().is_some()
    }

    /// Start a parse session over `tokens`
    pub fn session(&self, tokens: impl Into<TokenStream>) -> Result<ParseSession<'_, V>, EngineError> {
        ParseSession::new(self, tokens.into())
    }

    /// Parse `tokens` from the rule named `start`
    pub fn parse(&self, start: &str, tokens: impl Into<TokenStream>) -> Result<ParseOutput<V>, EngineError> {
        self.session(tokens)?.invoke(start)
    }
}

impl<V> Registry<V> {
    pub fn model(&self) -> &Arc<TokenModel> {
        &self.model
    }

    pub fn preferences(&self) -> &ParserPreferences {
        &self.preferences
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.index.get(name).copied()
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn rule(&self, id: RuleId) -> Option<&RuleDef<V>> {
        self.rules.get(id.index())
    }

    pub(crate) fn rule_name(&self, id: RuleId) -> &str {
        self.rule(id).map(|rule| rule.name.as_str()).unwrap_or("?")
    }
}

impl<V> fmt::Debug for Registry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("rules", &self.rules.iter().map(|rule| &rule.name).collect::<Vec<_>>())
            .field("preferences", &self.preferences)
            .field("finalized", &matches!(self.analysis, Some(Ok(_))))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{Group, TokenPattern};
    use assert_matches::assert_matches;

    fn model() -> (Arc<TokenModel>, CategoryId) {
        let mut model = TokenModel::new();
        let num = model
            .define_category("Num", None, TokenPattern::regex("[0-9]+"), Group::Normal)
            .unwrap();
        (Arc::new(model), num)
    }

    #[test]
    fn test_duplicate_and_unknown_rules() {
        let (model, num) = model();
        let mut registry: Registry<u32> = Registry::new(model);

        registry
            .define_rule("value", move |s| {
                s.consume(1, num)?;
                Ok(1)
            })
            .unwrap();
        assert_matches!(
            registry.define_rule("value", |_| Ok(0)),
            Err(RegistryError::DuplicateRule { ref name }) if name == "value"
        );
        assert_matches!(
            registry.remove_rule("missing"),
            Err(RegistryError::UnknownRule { .. })
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_finalize_is_cached_and_invalidated() {
        let (model, num) = model();
        let mut registry: Registry<u32> = Registry::new(model);
        registry
            .define_rule("value", move |s| {
                s.consume(1, num)?;
                Ok(1)
            })
            .unwrap();

        assert_matches!(registry.session(TokenStream::new(Vec::new())), Err(EngineError::NotFinalized));
        registry.finalize().unwrap();
        assert!(registry.is_finalized());

        registry.define_rule("other", |_| Ok(2)).unwrap();
        assert!(!registry.is_finalized());
        registry.finalize().unwrap();
        assert_eq!(registry.analysis().unwrap().rules.len(), 2);

        registry.remove_rule("other").unwrap();
        assert_eq!(registry.rule_id("value"), Some(RuleId(0)));
        assert_eq!(registry.rule_id("other"), None);
    }

    #[test]
    fn test_broken_grammar_stays_broken() {
        let (model, _) = model();
        let mut registry: Registry<u32> = Registry::new(model);
        registry
            .define_rule("loop", |s| {
                s.subrule(1, "loop")?;
                Ok(0)
            })
            .unwrap();

        assert_matches!(registry.finalize(), Err(StructuralError::LeftRecursion { .. }));
        assert_matches!(registry.finalize(), Err(StructuralError::LeftRecursion { .. }));
        assert_matches!(
            registry.parse("loop", TokenStream::new(Vec::new())),
            Err(EngineError::Structural(StructuralError::LeftRecursion { .. }))
        );
    }

    #[test]
    fn test_insertion_policy() {
        let (model, num) = model();
        let mut registry: Registry<u32> = Registry::new(model);

        assert!(registry.can_insert(num));
        assert!(!registry.can_insert(CategoryId::EOF));

        registry.set_insertion_policy(move |category| category != num);
        assert!(!registry.can_insert(num));
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry<f64>>();
    }
}
