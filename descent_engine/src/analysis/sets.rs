//! Nullability, FIRST and FOLLOW sets
//!
//! All sets are `BTreeSet`s so iteration order, and everything derived from
//! it, is stable across runs.

use crate::grammar::{Production, RuleGast};
use crate::tokens::CategoryId;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

pub type CategorySet = BTreeSet<CategoryId>;

/// One level of continuation while walking a rule body
#[derive(Debug, Clone, Copy)]
pub(crate) enum Frame<'g> {
    /// Remaining productions of an enclosing sequence
    Seq(&'g [Production]),
    /// Body of an enclosing repetition that may run again
    Loop(&'g [Production]),
}

/// Categories that can follow one consume site inside its rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteFollow {
    pub category: CategoryId,
    pub idx: u32,
    pub follows: CategorySet,
    /// The end of the rule can be reached right after this site
    pub reaches_end: bool,
}

/// Rule lookup plus the fixed points computed over it
pub(crate) struct GrammarSets<'g> {
    pub rules: &'g [RuleGast],
    pub index: HashMap<&'g str, usize>,
    pub nullable: Vec<bool>,
    pub first: Vec<CategorySet>,
    pub follow: Vec<CategorySet>,
}

impl<'g> GrammarSets<'g> {
    pub(crate) fn compute(rules: &'g [RuleGast]) -> Self {
        let index = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| (rule.name.as_str(), i))
            .collect();

        let mut sets = Self {
            rules,
            index,
            nullable: vec![false; rules.len()],
            first: vec![CategorySet::new(); rules.len()],
            follow: vec![CategorySet::new(); rules.len()],
        };
        sets.compute_nullable();
        sets.compute_first();
        sets.compute_follow();
        sets
    }

    pub(crate) fn rule_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    // ========================================================================
    // NULLABLE
    // ========================================================================

    fn compute_nullable(&mut self) {
        loop {
            let mut changed = false;
            for (i, rule) in self.rules.iter().enumerate() {
                if !self.nullable[i] && self.seq_nullable(&rule.body) {
                    self.nullable[i] = true;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    pub(crate) fn seq_nullable(&self, seq: &[Production]) -> bool {
        seq.iter().all(|production| self.nullable(production))
    }

    pub(crate) fn nullable(&self, production: &Production) -> bool {
        match production {
            Production::Terminal { .. } => false,
            Production::NonTerminal { rule, .. } => {
                self.rule_index(rule).is_some_and(|i| self.nullable[i])
            }
            Production::Option { .. } => true,
            Production::Repetition {
                at_least_one, body, ..
            } => !at_least_one || self.seq_nullable(body),
            Production::Alternation { alternatives, .. } => alternatives
                .iter()
                .any(|alternative| self.seq_nullable(&alternative.body)),
        }
    }

    // ========================================================================
    // FIRST
    // ========================================================================

    fn compute_first(&mut self) {
        loop {
            let mut changed = false;
            for (i, rule) in self.rules.iter().enumerate() {
                let mut set = CategorySet::new();
                self.seq_first(&rule.body, &mut set);
                if set.len() != self.first[i].len() {
                    self.first[i] = set;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }

    /// Adds FIRST of the sequence to `out`; returns whether the sequence is nullable
    pub(crate) fn seq_first(&self, seq: &[Production], out: &mut CategorySet) -> bool {
        for production in seq {
            if !self.production_first(production, out) {
                return false;
            }
        }
        true
    }

    fn production_first(&self, production: &Production, out: &mut CategorySet) -> bool {
        match production {
            Production::Terminal { category, .. } => {
                out.insert(*category);
                false
            }
            Production::NonTerminal { rule, .. } => match self.rule_index(rule) {
                Some(i) => {
                    out.extend(self.first[i].iter().copied());
                    self.nullable[i]
                }
                None => false,
            },
            Production::Option { body, .. } => {
                self.seq_first(body, out);
                true
            }
            Production::Repetition {
                at_least_one, body, ..
            } => {
                let body_nullable = self.seq_first(body, out);
                !at_least_one || body_nullable
            }
            Production::Alternation { alternatives, .. } => {
                let mut any_nullable = false;
                for alternative in alternatives {
                    any_nullable |= self.seq_first(&alternative.body, out);
                }
                any_nullable
            }
        }
    }

    /// FIRST of a continuation, innermost frame first, and whether it can reach the rule end
    pub(crate) fn frames_first(&self, frames: &[Frame<'_>]) -> (CategorySet, bool) {
        let mut set = CategorySet::new();
        for frame in frames.iter().rev() {
            match frame {
                Frame::Seq(rest) => {
                    if !self.seq_first(rest, &mut set) {
                        return (set, false);
                    }
                }
                Frame::Loop(body) => {
                    self.seq_first(body, &mut set);
                }
            }
        }
        (set, true)
    }

    // ========================================================================
    // FOLLOW
    // ========================================================================

    fn compute_follow(&mut self) {
        let mut calls: Vec<(usize, usize, CategorySet, bool)> = Vec::new();
        for (caller, rule) in self.rules.iter().enumerate() {
            walk(&rule.body, &mut Vec::new(), &mut |production, frames| {
                if let Production::NonTerminal { rule: callee, .. } = production {
                    if let Some(callee) = self.rule_index(callee) {
                        let (set, reaches_end) = self.frames_first(frames);
                        calls.push((caller, callee, set, reaches_end));
                    }
                }
            });
        }

        let mut follow = vec![CategorySet::new(); self.rules.len()];
        loop {
            let mut changed = false;
            for (caller, callee, set, reaches_end) in &calls {
                let before = follow[*callee].len();
                follow[*callee].extend(set.iter().copied());
                if *reaches_end && caller != callee {
                    let inherited: Vec<CategoryId> = follow[*caller].iter().copied().collect();
                    follow[*callee].extend(inherited);
                }
                changed |= follow[*callee].len() != before;
            }
            if !changed {
                break;
            }
        }
        self.follow = follow;
    }

    /// In-rule follows for every consume site of `rule`, sorted by `(category, idx)`
    pub(crate) fn site_follows(&self, rule: &RuleGast) -> Vec<SiteFollow> {
        let mut sites = Vec::new();
        walk(&rule.body, &mut Vec::new(), &mut |production, frames| {
            if let Production::Terminal { category, idx } = production {
                let (follows, reaches_end) = self.frames_first(frames);
                sites.push(SiteFollow {
                    category: *category,
                    idx: *idx,
                    follows,
                    reaches_end,
                });
            }
        });
        sites.sort_by_key(|site| (site.category, site.idx));
        sites.dedup_by_key(|site| (site.category, site.idx));
        sites
    }
}

/// Visit every production of `seq` with the continuation that follows it.
///
/// The top frame handed to `visit` is the rest of the sequence after the
/// visited production; repetition bodies also see a loop frame for the next
/// iteration.
pub(crate) fn walk<'g>(
    seq: &'g [Production],
    frames: &mut Vec<Frame<'g>>,
    visit: &mut dyn FnMut(&'g Production, &[Frame<'g>]),
) {
    for (i, production) in seq.iter().enumerate() {
        frames.push(Frame::Seq(&seq[i + 1..]));
        visit(production, frames);
        match production {
            Production::Option { body, .. } => walk(body, frames, visit),
            Production::Repetition { body, .. } => {
                frames.push(Frame::Loop(body));
                walk(body, frames, visit);
                frames.pop();
            }
            Production::Alternation { alternatives, .. } => {
                for alternative in alternatives {
                    walk(&alternative.body, frames, visit);
                }
            }
            Production::Terminal { .. } | Production::NonTerminal { .. } => {}
        }
        frames.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Alternative;

    fn t(category: u16, idx: u32) -> Production {
        Production::Terminal {
            category: CategoryId(category),
            idx,
        }
    }

    fn nt(rule: &str, idx: u32) -> Production {
        Production::NonTerminal {
            rule: rule.into(),
            idx,
        }
    }

    fn rule(name: &str, body: Vec<Production>) -> RuleGast {
        RuleGast {
            name: name.into(),
            body,
        }
    }

    fn ids(raw: &[u16]) -> CategorySet {
        raw.iter().map(|id| CategoryId(*id)).collect()
    }

    // sum := term (PLUS term)*
    // term := NUM | LPAREN sum RPAREN
    fn arithmetic() -> Vec<RuleGast> {
        vec![
            rule(
                "sum",
                vec![
                    nt("term", 1),
                    Production::Repetition {
                        idx: 1,
                        at_least_one: false,
                        body: vec![t(3, 1), nt("term", 2)],
                    },
                ],
            ),
            rule(
                "term",
                vec![Production::Alternation {
                    idx: 1,
                    alternatives: vec![
                        Alternative {
                            gated: false,
                            body: vec![t(1, 1)],
                        },
                        Alternative {
                            gated: false,
                            body: vec![t(4, 1), nt("sum", 1), t(5, 1)],
                        },
                    ],
                }],
            ),
        ]
    }

    #[test]
    fn test_first_and_follow() {
        let rules = arithmetic();
        let sets = GrammarSets::compute(&rules);

        assert_eq!(sets.first[0], ids(&[1, 4]));
        assert_eq!(sets.first[1], ids(&[1, 4]));
        assert_eq!(sets.follow[0], ids(&[5]));
        assert_eq!(sets.follow[1], ids(&[3, 5]));
        assert!(!sets.nullable[0]);
    }

    #[test]
    fn test_nullable_fixed_point() {
        let rules = vec![
            rule("a", vec![nt("b", 1)]),
            rule(
                "b",
                vec![Production::Option {
                    idx: 1,
                    body: vec![t(1, 1)],
                }],
            ),
            rule("c", vec![nt("a", 1), t(2, 1)]),
        ];
        let sets = GrammarSets::compute(&rules);

        assert_eq!(sets.nullable, vec![true, true, false]);
        assert_eq!(sets.first[2], ids(&[1, 2]));
    }

    #[test]
    fn test_site_follows_include_loop_back() {
        let rules = arithmetic();
        let sets = GrammarSets::compute(&rules);
        let sites = sets.site_follows(&rules[0]);

        // PLUS inside the loop is followed by term
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].follows, ids(&[1, 4]));
        assert!(!sites[0].reaches_end);

        let term_sites = sets.site_follows(&rules[1]);
        let rparen = term_sites.iter().find(|s| s.category == CategoryId(5)).unwrap();
        assert!(rparen.follows.is_empty());
        assert!(rparen.reaches_end);
        let lparen = term_sites.iter().find(|s| s.category == CategoryId(4)).unwrap();
        assert_eq!(lparen.follows, ids(&[1, 4]));
    }
}
