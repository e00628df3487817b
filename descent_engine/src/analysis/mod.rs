//! Grammar self-analysis
//!
//! Runs once per registry state:
//! 1. hierarchy, reference and occurrence checks
//! 2. nullability, FIRST and FOLLOW fixed points
//! 3. left-recursion detection
//! 4. in-rule follows for every consume site
//! 5. lookahead tables for every decision point
//!
//! The result is immutable and serializable; analyzing the same rules twice
//! yields identical tables.

pub mod error;
pub mod left_recursion;
pub mod lookahead;
pub mod sets;
pub mod validation;

use crate::grammar::{DecisionKey, DecisionKind, Production, RuleGast};
use crate::logging::codes;
use crate::tokens::{CategoryId, TokenModel};
use crate::{log_debug, log_success};
use serde::Serialize;
use std::collections::BTreeMap;

pub use error::StructuralError;
pub use lookahead::{Ambiguity, AmbiguityKind, AlternativeLookahead, Decision, LookaheadPath};
pub use sets::{CategorySet, SiteFollow};

/// Analysis of one rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleAnalysis {
    pub name: String,
    pub nullable: bool,
    pub first: CategorySet,
    /// Static FOLLOW set; `EOF` is added only at runtime
    pub follow: CategorySet,
    /// Sorted by `(kind, idx)`
    pub decisions: Vec<Decision>,
    /// Sorted by `(category, idx)`
    pub sites: Vec<SiteFollow>,
    pub gast: Vec<Production>,
}

impl RuleAnalysis {
    pub fn decision(&self, kind: DecisionKind, idx: u32) -> Option<&Decision> {
        self.decisions
            .binary_search_by_key(&(kind, idx), |decision| (decision.kind, decision.idx))
            .ok()
            .map(|position| &self.decisions[position])
    }

    pub fn site(&self, category: CategoryId, idx: u32) -> Option<&SiteFollow> {
        self.sites
            .binary_search_by_key(&(category, idx), |site| (site.category, site.idx))
            .ok()
            .map(|position| &self.sites[position])
    }
}

/// Result of analyzing a registry; rules are in registration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrammarAnalysis {
    pub max_lookahead: usize,
    pub rules: Vec<RuleAnalysis>,
    pub ambiguities: Vec<Ambiguity>,
}

impl GrammarAnalysis {
    pub fn rule(&self, name: &str) -> Option<&RuleAnalysis> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub(crate) fn rule_at(&self, index: usize) -> Option<&RuleAnalysis> {
        self.rules.get(index)
    }

    pub fn decision(&self, rule: &str, kind: DecisionKind, idx: u32) -> Option<&Decision> {
        self.rule(rule)?.decision(kind, idx)
    }

    /// Every decision keyed by `(rule, kind, idx)`
    pub fn decisions(&self) -> BTreeMap<DecisionKey, &Decision> {
        self.rules
            .iter()
            .flat_map(|rule| {
                rule.decisions.iter().map(move |decision| {
                    (DecisionKey::new(rule.name.as_str(), decision.kind, decision.idx), decision)
                })
            })
            .collect()
    }

    pub fn rule_follow(&self, rule: &str) -> Option<&CategorySet> {
        self.rule(rule).map(|analysis| &analysis.follow)
    }

    pub fn site_follow(&self, rule: &str, category: CategoryId, idx: u32) -> Option<&SiteFollow> {
        self.rule(rule)?.site(category, idx)
    }

    pub fn is_ambiguous(&self) -> bool {
        !self.ambiguities.is_empty()
    }

    /// Decision tables as JSON, keyed by `rule.kind#idx`
    pub fn decision_tables_json(&self) -> Result<String, serde_json::Error> {
        let tables: BTreeMap<String, &Decision> = self
            .decisions()
            .into_iter()
            .map(|(key, decision)| (key.to_string(), decision))
            .collect();
        serde_json::to_string_pretty(&tables)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Analyze recorded rules against a token model
pub fn analyze(
    model: &TokenModel,
    rules: &[RuleGast],
    max_lookahead: usize,
) -> Result<GrammarAnalysis, StructuralError> {
    log_debug!("Starting grammar analysis",
        "rules" => rules.len(),
        "max_lookahead" => max_lookahead
    );

    validation::check_hierarchy(model, rules)?;
    validation::check_references(rules)?;
    validation::check_occurrences(model, rules)?;

    let grammar_sets = sets::GrammarSets::compute(rules);
    left_recursion::check_left_recursion(&grammar_sets)?;

    let builder = lookahead::LookaheadBuilder::new(&grammar_sets, model, max_lookahead);
    let mut analyzed = Vec::with_capacity(rules.len());
    let mut ambiguities = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        let (decisions, found) = builder.rule_decisions(rule);
        ambiguities.extend(found);
        analyzed.push(RuleAnalysis {
            name: rule.name.clone(),
            nullable: grammar_sets.nullable[index],
            first: grammar_sets.first[index].clone(),
            follow: grammar_sets.follow[index].clone(),
            decisions,
            sites: grammar_sets.site_follows(rule),
            gast: rule.body.clone(),
        });
    }

    let decision_count: usize = analyzed.iter().map(|rule| rule.decisions.len()).sum();
    log_success!(codes::success::ANALYSIS_COMPLETE, "Grammar analysis complete",
        "rules" => analyzed.len(),
        "decisions" => decision_count,
        "ambiguities" => ambiguities.len()
    );

    Ok(GrammarAnalysis {
        max_lookahead,
        rules: analyzed,
        ambiguities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Alternative;
    use crate::tokens::{Group, TokenPattern};
    use assert_matches::assert_matches;

    fn list_grammar(model: &mut TokenModel) -> Vec<RuleGast> {
        let num = model
            .define_category("Num", None, TokenPattern::regex("[0-9]+"), Group::Normal)
            .unwrap();
        let comma = model
            .define_category("Comma", None, TokenPattern::literal(","), Group::Normal)
            .unwrap();
        let semi = model
            .define_category("Semi", None, TokenPattern::literal(";"), Group::Normal)
            .unwrap();

        vec![
            RuleGast {
                name: "list".into(),
                body: vec![
                    Production::NonTerminal {
                        rule: "item".into(),
                        idx: 1,
                    },
                    Production::Repetition {
                        idx: 1,
                        at_least_one: false,
                        body: vec![
                            Production::Terminal {
                                category: comma,
                                idx: 1,
                            },
                            Production::NonTerminal {
                                rule: "item".into(),
                                idx: 2,
                            },
                        ],
                    },
                    Production::Terminal {
                        category: semi,
                        idx: 1,
                    },
                ],
            },
            RuleGast {
                name: "item".into(),
                body: vec![Production::Alternation {
                    idx: 1,
                    alternatives: vec![
                        Alternative {
                            gated: false,
                            body: vec![Production::Terminal {
                                category: num,
                                idx: 1,
                            }],
                        },
                        Alternative {
                            gated: false,
                            body: vec![],
                        },
                    ],
                }],
            },
        ]
    }

    #[test]
    fn test_analysis_lookups() {
        let mut model = TokenModel::new();
        let rules = list_grammar(&mut model);
        let analysis = analyze(&model, &rules, 4).unwrap();

        let comma = model.lookup("Comma").unwrap();
        let semi = model.lookup("Semi").unwrap();
        let num = model.lookup("Num").unwrap();

        assert!(analysis.rule("item").unwrap().nullable);
        assert_eq!(
            analysis.rule_follow("item").unwrap().iter().copied().collect::<Vec<_>>(),
            vec![comma, semi]
        );
        let site = analysis.site_follow("list", comma, 1).unwrap();
        assert!(site.follows.contains(&num));
        assert!(site.follows.contains(&comma));
        assert!(site.follows.contains(&semi));

        let keys: Vec<String> = analysis.decisions().keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["item.or#1", "list.many#1"]);
    }

    #[test]
    fn test_tables_are_deterministic() {
        let mut model = TokenModel::new();
        let rules = list_grammar(&mut model);

        let first = analyze(&model, &rules, 4).unwrap();
        let second = analyze(&model, &rules, 4).unwrap();
        assert_eq!(
            first.decision_tables_json().unwrap(),
            second.decision_tables_json().unwrap()
        );
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_left_recursion_aborts_analysis() {
        let mut model = TokenModel::new();
        let num = model
            .define_category("Num", None, TokenPattern::regex("[0-9]+"), Group::Normal)
            .unwrap();
        let rules = vec![RuleGast {
            name: "expr".into(),
            body: vec![
                Production::NonTerminal {
                    rule: "expr".into(),
                    idx: 1,
                },
                Production::Terminal {
                    category: num,
                    idx: 1,
                },
            ],
        }];

        assert_matches!(
            analyze(&model, &rules, 4),
            Err(StructuralError::LeftRecursion { .. })
        );
    }
}
