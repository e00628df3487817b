//! Token model: category registry and hierarchy
//!
//! The hierarchy is stored as data. Every category keeps its lineage
//! (`[self, parent, grandparent, ...]`) and subtype checks are a lookup in
//! that chain.

use super::category::{CategoryId, CompiledPattern, Group, TokenCategory, TokenPattern};
use crate::logging::{codes, Code};
use regex::Regex;
use std::collections::HashMap;

/// Errors raised while defining token categories
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenModelError {
    #[error("Token category '{name}' is already defined")]
    DuplicateCategory { name: String },

    #[error("Invalid hierarchy for token category '{name}': {reason}")]
    InvalidHierarchy { name: String, reason: String },

    #[error("Invalid pattern for token category '{name}': {message}")]
    InvalidPattern { name: String, message: String },

    #[error("Abstract token category '{name}' has no concrete descendant")]
    AbstractWithoutDescendant { name: String },

    #[error("Unknown token category {id}")]
    UnknownCategory { id: CategoryId },
}

impl TokenModelError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::DuplicateCategory { .. } => codes::model::DUPLICATE_CATEGORY,
            Self::InvalidHierarchy { .. } | Self::UnknownCategory { .. } => {
                codes::model::INVALID_HIERARCHY
            }
            Self::InvalidPattern { .. } => codes::model::INVALID_PATTERN,
            Self::AbstractWithoutDescendant { .. } => codes::model::ABSTRACT_WITHOUT_DESCENDANT,
        }
    }
}

/// Name of the built-in end-of-stream category
pub const EOF_NAME: &str = "EOF";

/// Registry of token categories in registration order
#[derive(Debug, Clone)]
pub struct TokenModel {
    categories: Vec<TokenCategory>,
    by_name: HashMap<String, CategoryId>,
    lineage: Vec<Vec<CategoryId>>,
}

impl TokenModel {
    /// Create a model holding only the built-in `EOF` category
    pub fn new() -> Self {
        let eof = TokenCategory {
            id: CategoryId::EOF,
            name: EOF_NAME.to_string(),
            parent: None,
            pattern: TokenPattern::Abstract,
            compiled: CompiledPattern::None,
            group: Group::Normal,
            leading_chars: None,
        };

        Self {
            categories: vec![eof],
            by_name: HashMap::from([(EOF_NAME.to_string(), CategoryId::EOF)]),
            lineage: vec![vec![CategoryId::EOF]],
        }
    }

    /// Register a category.
    ///
    /// The parent must already be registered, so a fresh definition can never
    /// close a cycle; `set_parent` is where cycles are rejected.
    pub fn define_category(
        &mut self,
        name: &str,
        parent: Option<CategoryId>,
        pattern: TokenPattern,
        group: Group,
    ) -> Result<CategoryId, TokenModelError> {
        if self.by_name.contains_key(name) {
            return Err(TokenModelError::DuplicateCategory {
                name: name.to_string(),
            });
        }

        if let Some(parent_id) = parent {
            self.check_parent(name, parent_id)?;
        }

        let raw_id = u16::try_from(self.categories.len()).map_err(|_| {
            TokenModelError::InvalidHierarchy {
                name: name.to_string(),
                reason: "too many token categories".to_string(),
            }
        })?;
        let id = CategoryId(raw_id);
        let compiled = compile_pattern(name, &pattern)?;

        self.categories.push(TokenCategory {
            id,
            name: name.to_string(),
            parent,
            pattern,
            compiled,
            group,
            leading_chars: None,
        });
        self.by_name.insert(name.to_string(), id);

        let mut chain = vec![id];
        if let Some(parent_id) = parent {
            chain.extend_from_slice(&self.lineage[parent_id.index()]);
        }
        self.lineage.push(chain);

        crate::log_debug!("Token category defined",
            "name" => name,
            "id" => id,
            "parent" => parent.map(|p| self.name(p).to_string()).unwrap_or_default()
        );

        Ok(id)
    }

    /// Re-parent an existing category, rejecting cycles
    pub fn set_parent(
        &mut self,
        id: CategoryId,
        parent: Option<CategoryId>,
    ) -> Result<(), TokenModelError> {
        let name = self.category(id)?.name.clone();
        if let Some(parent_id) = parent {
            self.check_parent(&name, parent_id)?;
            if parent_id == id || self.is_a(parent_id, id) {
                return Err(TokenModelError::InvalidHierarchy {
                    name,
                    reason: format!(
                        "parent '{}' would make the category its own ancestor",
                        self.name(parent_id)
                    ),
                });
            }
        }

        self.categories[id.index()].parent = parent;
        self.rebuild_lineage();
        Ok(())
    }

    /// Attach explicit leading characters to a category
    pub fn set_leading_chars(
        &mut self,
        id: CategoryId,
        chars: &[char],
    ) -> Result<(), TokenModelError> {
        self.category(id)?;
        self.categories[id.index()].leading_chars = Some(chars.to_vec());
        Ok(())
    }

    fn check_parent(&self, name: &str, parent: CategoryId) -> Result<(), TokenModelError> {
        if parent.index() >= self.categories.len() {
            return Err(TokenModelError::InvalidHierarchy {
                name: name.to_string(),
                reason: format!("unknown parent category {}", parent),
            });
        }
        if parent.is_eof() {
            return Err(TokenModelError::InvalidHierarchy {
                name: name.to_string(),
                reason: "EOF cannot be a parent category".to_string(),
            });
        }
        Ok(())
    }

    fn rebuild_lineage(&mut self) {
        self.lineage = self
            .categories
            .iter()
            .map(|category| {
                let mut chain = vec![category.id];
                let mut current = category.parent;
                while let Some(parent) = current {
                    if chain.contains(&parent) {
                        break;
                    }
                    chain.push(parent);
                    current = self.categories[parent.index()].parent;
                }
                chain
            })
            .collect();
    }

    fn category(&self, id: CategoryId) -> Result<&TokenCategory, TokenModelError> {
        self.categories
            .get(id.index())
            .ok_or(TokenModelError::UnknownCategory { id })
    }

    /// Every abstract category must have a concrete descendant
    pub fn validate(&self) -> Result<(), TokenModelError> {
        for category in self.categories.iter().skip(1) {
            if !category.pattern.is_abstract() {
                continue;
            }
            let has_concrete = self
                .concrete_categories()
                .any(|candidate| self.is_a(candidate.id, category.id));
            if !has_concrete {
                return Err(TokenModelError::AbstractWithoutDescendant {
                    name: category.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// `actual` is `expected` or one of its descendants
    pub fn is_a(&self, actual: CategoryId, expected: CategoryId) -> bool {
        self.lineage
            .get(actual.index())
            .is_some_and(|chain| chain.contains(&expected))
    }

    /// Either category is an ancestor-or-self of the other
    pub fn overlaps(&self, a: CategoryId, b: CategoryId) -> bool {
        self.is_a(a, b) || self.is_a(b, a)
    }

    pub fn lineage(&self, id: CategoryId) -> &[CategoryId] {
        self.lineage
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Categories in registration order, `EOF` first
    pub fn all_categories(&self) -> impl Iterator<Item = &TokenCategory> {
        self.categories.iter()
    }

    /// Categories with a real pattern, in registration order
    pub fn concrete_categories(&self) -> impl Iterator<Item = &TokenCategory> {
        self.categories.iter().filter(|c| c.is_concrete())
    }

    pub fn get(&self, id: CategoryId) -> Option<&TokenCategory> {
        self.categories.get(id.index())
    }

    pub fn lookup(&self, name: &str) -> Option<CategoryId> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, id: CategoryId) -> &str {
        self.categories
            .get(id.index())
            .map(|c| c.name.as_str())
            .unwrap_or("<unknown>")
    }

    /// Comma-separated category names
    pub fn describe(&self, ids: &[CategoryId]) -> String {
        ids.iter()
            .map(|id| self.name(*id))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.len() <= 1
    }
}

impl Default for TokenModel {
    fn default() -> Self {
        Self::new()
    }
}

fn compile_pattern(name: &str, pattern: &TokenPattern) -> Result<CompiledPattern, TokenModelError> {
    match pattern {
        TokenPattern::Regex(source) => {
            let anchored = format!("^(?:{})", source);
            Regex::new(&anchored)
                .map(CompiledPattern::Regex)
                .map_err(|e| TokenModelError::InvalidPattern {
                    name: name.to_string(),
                    message: e.to_string(),
                })
        }
        TokenPattern::Literal(text) if text.is_empty() => Err(TokenModelError::InvalidPattern {
            name: name.to_string(),
            message: "literal pattern cannot be empty".to_string(),
        }),
        TokenPattern::Literal(text) => Ok(CompiledPattern::Literal(text.clone())),
        TokenPattern::Custom(matcher) => Ok(CompiledPattern::Custom(matcher.clone())),
        TokenPattern::Abstract => Ok(CompiledPattern::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn operator_model() -> (TokenModel, CategoryId, CategoryId, CategoryId) {
        let mut model = TokenModel::new();
        let operator = model
            .define_category("Operator", None, TokenPattern::Abstract, Group::Normal)
            .unwrap();
        let additive = model
            .define_category(
                "AdditionOperator",
                Some(operator),
                TokenPattern::Abstract,
                Group::Normal,
            )
            .unwrap();
        let plus = model
            .define_category("Plus", Some(additive), TokenPattern::literal("+"), Group::Normal)
            .unwrap();
        (model, operator, additive, plus)
    }

    #[test]
    fn test_is_a_follows_multi_level_lineage() {
        let (model, operator, additive, plus) = operator_model();

        assert!(model.is_a(plus, plus));
        assert!(model.is_a(plus, additive));
        assert!(model.is_a(plus, operator));
        assert!(!model.is_a(operator, plus));
        assert!(!model.is_a(plus, CategoryId::EOF));
        assert_eq!(model.lineage(plus), &[plus, additive, operator]);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_duplicate_category_is_rejected() {
        let (mut model, ..) = operator_model();
        let result = model.define_category("Plus", None, TokenPattern::literal("+"), Group::Normal);
        assert_matches!(result, Err(TokenModelError::DuplicateCategory { name }) if name == "Plus");

        let eof = model.define_category("EOF", None, TokenPattern::literal("$"), Group::Normal);
        assert_matches!(eof, Err(TokenModelError::DuplicateCategory { .. }));
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let mut model = TokenModel::new();
        let result = model.define_category(
            "Orphan",
            Some(CategoryId(42)),
            TokenPattern::literal("o"),
            Group::Normal,
        );
        assert_matches!(result, Err(TokenModelError::InvalidHierarchy { .. }));

        let eof_parent = model.define_category(
            "Child",
            Some(CategoryId::EOF),
            TokenPattern::literal("c"),
            Group::Normal,
        );
        assert_matches!(eof_parent, Err(TokenModelError::InvalidHierarchy { .. }));
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let (mut model, operator, _additive, plus) = operator_model();

        let result = model.set_parent(operator, Some(plus));
        assert_matches!(result, Err(TokenModelError::InvalidHierarchy { .. }));
        let self_parent = model.set_parent(plus, Some(plus));
        assert_matches!(self_parent, Err(TokenModelError::InvalidHierarchy { .. }));

        model.set_parent(plus, Some(operator)).unwrap();
        assert_eq!(model.lineage(plus), &[plus, operator]);
    }

    #[test]
    fn test_abstract_without_descendant_fails_validation() {
        let mut model = TokenModel::new();
        model
            .define_category("Keyword", None, TokenPattern::Abstract, Group::Normal)
            .unwrap();

        assert_matches!(
            model.validate(),
            Err(TokenModelError::AbstractWithoutDescendant { name }) if name == "Keyword"
        );
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let mut model = TokenModel::new();
        let result = model.define_category("Broken", None, TokenPattern::regex("("), Group::Normal);
        assert_matches!(result, Err(TokenModelError::InvalidPattern { .. }));
        assert_eq!(
            result.unwrap_err().error_code(),
            codes::model::INVALID_PATTERN
        );
    }

    #[test]
    fn test_all_categories_in_registration_order() {
        let (model, ..) = operator_model();
        let names: Vec<&str> = model.all_categories().map(|c| c.name()).collect();
        assert_eq!(names, vec!["EOF", "Operator", "AdditionOperator", "Plus"]);

        let concrete: Vec<&str> = model.concrete_categories().map(|c| c.name()).collect();
        assert_eq!(concrete, vec!["Plus"]);
        assert_eq!(model.lookup("Plus").map(|id| model.name(id)), Some("Plus"));
    }
}
