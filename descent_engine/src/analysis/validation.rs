//! Structural checks that run before any set computation

use super::error::StructuralError;
use crate::grammar::{Production, RuleGast};
use crate::tokens::{TokenModel, TokenModelError};
use std::collections::HashSet;

/// Every abstract category resolves and every consumed category exists
pub(crate) fn check_hierarchy(model: &TokenModel, rules: &[RuleGast]) -> Result<(), StructuralError> {
    model.validate().map_err(|err| match err {
        TokenModelError::AbstractWithoutDescendant { name } => StructuralError::UnresolvedHierarchy {
            category: name,
            reason: "abstract category has no concrete descendant".to_string(),
        },
        other => StructuralError::UnresolvedHierarchy {
            category: String::new(),
            reason: other.to_string(),
        },
    })?;

    for rule in rules {
        let mut unknown = None;
        visit(&rule.body, &mut |production| {
            if let Production::Terminal { category, .. } = production {
                if unknown.is_none() && model.get(*category).is_none() {
                    unknown = Some(*category);
                }
            }
        });
        if let Some(category) = unknown {
            return Err(StructuralError::UnresolvedHierarchy {
                category: category.to_string(),
                reason: format!("consumed in rule '{}' but not defined in the token model", rule.name),
            });
        }
    }

    Ok(())
}

/// Every called rule is defined
pub(crate) fn check_references(rules: &[RuleGast]) -> Result<(), StructuralError> {
    let names: HashSet<&str> = rules.iter().map(|rule| rule.name.as_str()).collect();

    for rule in rules {
        let mut missing = None;
        visit(&rule.body, &mut |production| {
            if let Production::NonTerminal { rule: callee, .. } = production {
                if missing.is_none() && !names.contains(callee.as_str()) {
                    missing = Some(callee.clone());
                }
            }
        });
        if let Some(callee) = missing {
            return Err(StructuralError::UnknownRule {
                rule: rule.name.clone(),
                callee,
            });
        }
    }

    Ok(())
}

/// No `(kind, idx)` occurrence appears twice in one rule
pub(crate) fn check_occurrences(model: &TokenModel, rules: &[RuleGast]) -> Result<(), StructuralError> {
    for rule in rules {
        let mut seen: HashSet<(String, u32)> = HashSet::new();
        let mut duplicate = None;
        visit(&rule.body, &mut |production| {
            let kind = match production {
                Production::Terminal { category, .. } => format!("consume of {}", model.name(*category)),
                Production::NonTerminal { rule, .. } => format!("subrule call to {}", rule),
                other => other
                    .decision_kind()
                    .map(|kind| kind.to_string())
                    .unwrap_or_default(),
            };
            let key = (kind, production.idx());
            if !seen.insert(key.clone()) && duplicate.is_none() {
                duplicate = Some(key);
            }
        });
        if let Some((kind, idx)) = duplicate {
            return Err(StructuralError::DuplicateOccurrence {
                rule: rule.name.clone(),
                kind,
                idx,
            });
        }
    }

    Ok(())
}

/// Pre-order visit of every production in `seq`
fn visit(seq: &[Production], f: &mut dyn FnMut(&Production)) {
    for production in seq {
        f(production);
        match production {
            Production::Option { body, .. } | Production::Repetition { body, .. } => visit(body, f),
            Production::Alternation { alternatives, .. } => {
                for alternative in alternatives {
                    visit(&alternative.body, f);
                }
            }
            Production::Terminal { .. } | Production::NonTerminal { .. } => {}
        }
    }
}
