//! LL(k) lookahead tables
//!
//! Each alternative of a decision is expanded into token-category paths.
//! Expansion inlines sub-rule calls and may enter or skip optional parts, but
//! never loops back into a repetition. Depth starts at one and only the paths
//! that still collide with another alternative are grown, up to the configured
//! maximum. Paths that reach the end of the rule early stay short; at runtime a
//! short path matches on its prefix and the first declared alternative wins.

use super::sets::{walk, Frame, GrammarSets};
use crate::config::compile_time::analysis::MAX_PATHS_PER_DECISION;
use crate::config::compile_time::syntax::MAX_PARSE_DEPTH;
use crate::grammar::{DecisionKey, DecisionKind, Production, RuleGast};
use crate::logging::codes;
use crate::log_warning;
use crate::tokens::{CategoryId, TokenModel};
use serde::Serialize;
use std::collections::BTreeSet;

/// A category sequence, one entry per lookahead position
pub type LookaheadPath = Vec<CategoryId>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlternativeLookahead {
    pub paths: Vec<LookaheadPath>,
    pub gated: bool,
}

/// Lookahead table for one decision point.
///
/// Option and repetition decisions have two alternatives: entering the body
/// and leaving it. Only the first is consulted at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub kind: DecisionKind,
    pub idx: u32,
    /// Deepest lookahead examined
    pub depth: usize,
    pub alternatives: Vec<AlternativeLookahead>,
    pub ambiguous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityKind {
    /// Alternatives share a path at the maximum depth
    Collision,
    /// An earlier alternative ends on a prefix of a later one's path
    Prefix,
    /// Expansion stopped at the path limit
    PathLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ambiguity {
    pub key: DecisionKey,
    pub kind: AmbiguityKind,
    /// Conflicting alternative indices, ascending
    pub alternatives: Vec<usize>,
    pub depth: usize,
    pub example: LookaheadPath,
}

/// Paths produced at one depth; the flag marks paths that hit the rule end early
struct Expansion {
    paths: BTreeSet<(LookaheadPath, bool)>,
    truncated: bool,
}

struct Start<'g> {
    stack: Vec<&'g [Production]>,
    gated: bool,
}

pub(crate) struct LookaheadBuilder<'a, 'g> {
    sets: &'a GrammarSets<'g>,
    model: &'a TokenModel,
    max_k: usize,
}

impl<'a, 'g> LookaheadBuilder<'a, 'g> {
    pub(crate) fn new(sets: &'a GrammarSets<'g>, model: &'a TokenModel, max_k: usize) -> Self {
        Self {
            sets,
            model,
            max_k: max_k.max(1),
        }
    }

    /// Decisions of `rule` sorted by `(kind, idx)`, plus any ambiguities found
    pub(crate) fn rule_decisions(&self, rule: &'g RuleGast) -> (Vec<Decision>, Vec<Ambiguity>) {
        let mut pending: Vec<(DecisionKind, u32, Vec<Start<'g>>)> = Vec::new();

        walk(&rule.body, &mut Vec::new(), &mut |production, frames| {
            let Some(kind) = production.decision_kind() else {
                return;
            };
            let continuation: Vec<&'g [Production]> = frames
                .iter()
                .filter_map(|frame| match frame {
                    Frame::Seq(rest) => Some(*rest),
                    Frame::Loop(_) => None,
                })
                .collect();
            let with = |body: &'g [Production], gated: bool| {
                let mut stack = continuation.clone();
                stack.push(body);
                Start { stack, gated }
            };

            let starts = match production {
                Production::Option { body, .. } | Production::Repetition { body, .. } => vec![
                    with(body, false),
                    Start {
                        stack: continuation.clone(),
                        gated: false,
                    },
                ],
                Production::Alternation { alternatives, .. } => alternatives
                    .iter()
                    .map(|alternative| with(&alternative.body, alternative.gated))
                    .collect(),
                Production::Terminal { .. } | Production::NonTerminal { .. } => return,
            };
            pending.push((kind, production.idx(), starts));
        });

        let mut decisions = Vec::new();
        let mut ambiguities = Vec::new();
        for (kind, idx, starts) in pending {
            let key = DecisionKey::new(rule.name.as_str(), kind, idx);
            decisions.push(self.build_decision(key, &starts, &mut ambiguities));
        }
        decisions.sort_by_key(|decision| (decision.kind, decision.idx));
        decisions.dedup_by_key(|decision| (decision.kind, decision.idx));
        (decisions, ambiguities)
    }

    fn build_decision(
        &self,
        key: DecisionKey,
        starts: &[Start<'g>],
        ambiguities: &mut Vec<Ambiguity>,
    ) -> Decision {
        let count = starts.len();
        let mut finals: Vec<BTreeSet<LookaheadPath>> = vec![BTreeSet::new(); count];
        let mut active: Vec<BTreeSet<LookaheadPath>> = vec![BTreeSet::from([Vec::new()]); count];
        let mut report = AmbiguityReport::default();
        let mut depth_used = 1;

        for depth in 1..=self.max_k {
            depth_used = depth;

            let mut current: Vec<Vec<(LookaheadPath, bool)>> = Vec::with_capacity(count);
            let mut truncated = false;
            for (i, start) in starts.iter().enumerate() {
                if active[i].is_empty() {
                    current.push(Vec::new());
                    continue;
                }
                let expansion = self.expand(&start.stack, depth);
                truncated |= expansion.truncated;
                current.push(
                    expansion
                        .paths
                        .into_iter()
                        .filter(|(path, _)| {
                            path.len() + 1 >= depth && active[i].contains(&path[..depth - 1])
                        })
                        .collect(),
                );
            }

            if truncated {
                for (i, prefixes) in active.iter().enumerate() {
                    finals[i].extend(prefixes.iter().cloned());
                }
                let involved = (0..count).filter(|i| !active[*i].is_empty()).collect();
                report.note(AmbiguityKind::PathLimit, involved, Vec::new());
                break;
            }

            let mut next_active: Vec<BTreeSet<LookaheadPath>> = vec![BTreeSet::new(); count];
            for i in 0..count {
                for (path, terminated) in &current[i] {
                    let mut colliding = Vec::new();
                    for j in (0..count).filter(|j| *j != i) {
                        if starts[i].gated || starts[j].gated {
                            continue;
                        }
                        for (other, other_terminated) in &current[j] {
                            if !self.paths_overlap(path, other) {
                                continue;
                            }
                            match (*terminated, *other_terminated) {
                                (false, false) => colliding.push(j),
                                (true, true) if path.len() == other.len() && i < j => {
                                    report.note(AmbiguityKind::Collision, vec![i, j], path.clone());
                                }
                                (true, _) if path.len() < other.len() && i < j => {
                                    report.note(AmbiguityKind::Prefix, vec![i, j], other.clone());
                                }
                                _ => {}
                            }
                        }
                    }

                    if colliding.is_empty() {
                        finals[i].insert(path.clone());
                    } else if depth < self.max_k {
                        next_active[i].insert(path.clone());
                    } else {
                        finals[i].insert(path.clone());
                        if let Some(first) = colliding.iter().copied().find(|j| *j > i) {
                            report.note(AmbiguityKind::Collision, vec![i, first], path.clone());
                        }
                    }
                }
            }

            active = next_active;
            if active.iter().all(BTreeSet::is_empty) {
                break;
            }
        }

        let ambiguous = !report.is_empty();
        for (kind, alternatives, example) in report.entries {
            self.log_ambiguity(&key, kind, &alternatives, depth_used);
            ambiguities.push(Ambiguity {
                key: key.clone(),
                kind,
                alternatives,
                depth: depth_used,
                example,
            });
        }

        Decision {
            kind: key.kind,
            idx: key.idx,
            depth: depth_used,
            alternatives: finals
                .into_iter()
                .zip(starts)
                .map(|(paths, start)| AlternativeLookahead {
                    paths: paths.into_iter().collect(),
                    gated: start.gated,
                })
                .collect(),
            ambiguous,
        }
    }

    /// All paths of length `depth` (or shorter when the rule ends first) from `start`
    fn expand(&self, start: &[&'g [Production]], depth: usize) -> Expansion {
        let mut paths = BTreeSet::new();
        let mut work: Vec<(LookaheadPath, Vec<&'g [Production]>)> = vec![(Vec::new(), start.to_vec())];

        while let Some((mut path, mut stack)) = work.pop() {
            loop {
                if paths.len() + work.len() > MAX_PATHS_PER_DECISION || stack.len() > MAX_PARSE_DEPTH {
                    return Expansion {
                        paths,
                        truncated: true,
                    };
                }
                if path.len() == depth {
                    paths.insert((path, false));
                    break;
                }
                while stack.last().is_some_and(|rest| rest.is_empty()) {
                    stack.pop();
                }
                let Some(top) = stack.last_mut() else {
                    paths.insert((path, true));
                    break;
                };
                let slice: &'g [Production] = *top;
                let Some((production, rest)) = slice.split_first() else {
                    break;
                };
                *top = rest;

                match production {
                    Production::Terminal { category, .. } => path.push(*category),
                    Production::NonTerminal { rule, .. } => match self.sets.rule_index(rule) {
                        Some(callee) => stack.push(&self.sets.rules[callee].body),
                        None => {
                            paths.insert((path, true));
                            break;
                        }
                    },
                    Production::Option { body, .. }
                    | Production::Repetition {
                        at_least_one: false,
                        body,
                        ..
                    } => {
                        let mut entered = stack.clone();
                        entered.push(body);
                        work.push((path.clone(), entered));
                    }
                    Production::Repetition {
                        at_least_one: true,
                        body,
                        ..
                    } => stack.push(body),
                    Production::Alternation { alternatives, .. } => {
                        let mut bodies = alternatives.iter().map(|alternative| &alternative.body);
                        let Some(first) = bodies.next() else {
                            continue;
                        };
                        for body in bodies {
                            let mut forked = stack.clone();
                            forked.push(body);
                            work.push((path.clone(), forked));
                        }
                        stack.push(first);
                    }
                }
            }
        }

        Expansion {
            paths,
            truncated: false,
        }
    }

    /// Two paths conflict when every shared position is related by the hierarchy
    fn paths_overlap(&self, a: &[CategoryId], b: &[CategoryId]) -> bool {
        a.iter().zip(b).all(|(x, y)| self.model.overlaps(*x, *y))
    }

    fn log_ambiguity(&self, key: &DecisionKey, kind: AmbiguityKind, alternatives: &[usize], depth: usize) {
        let listed = alternatives
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        match kind {
            AmbiguityKind::PathLimit => log_warning!(codes::analysis::PATH_LIMIT_REACHED,
                "Lookahead path limit reached",
                "decision" => key,
                "limit" => MAX_PATHS_PER_DECISION
            ),
            AmbiguityKind::Collision | AmbiguityKind::Prefix => log_warning!(
                codes::analysis::AMBIGUOUS_DECISION,
                "Ambiguous alternatives, first declared wins",
                "decision" => key,
                "alternatives" => listed,
                "depth" => depth
            ),
        }
    }
}

/// One entry per ambiguity kind, merging the alternatives involved
#[derive(Default)]
struct AmbiguityReport {
    entries: Vec<(AmbiguityKind, Vec<usize>, LookaheadPath)>,
}

impl AmbiguityReport {
    fn note(&mut self, kind: AmbiguityKind, alternatives: Vec<usize>, example: LookaheadPath) {
        match self.entries.iter_mut().find(|(existing, _, _)| *existing == kind) {
            Some((_, known, _)) => {
                known.extend(alternatives);
                known.sort_unstable();
                known.dedup();
            }
            None => {
                let mut alternatives = alternatives;
                alternatives.sort_unstable();
                alternatives.dedup();
                self.entries.push((kind, alternatives, example));
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Alternative;
    use crate::tokens::{Group, TokenPattern};

    struct Cats {
        model: TokenModel,
        a: CategoryId,
        b: CategoryId,
        c: CategoryId,
        op: CategoryId,
        plus: CategoryId,
    }

    fn cats() -> Cats {
        let mut model = TokenModel::new();
        let a = model.define_category("A", None, TokenPattern::literal("a"), Group::Normal).unwrap();
        let b = model.define_category("B", None, TokenPattern::literal("b"), Group::Normal).unwrap();
        let c = model.define_category("C", None, TokenPattern::literal("c"), Group::Normal).unwrap();
        let op = model.define_category("Op", None, TokenPattern::Abstract, Group::Normal).unwrap();
        let plus = model
            .define_category("Plus", Some(op), TokenPattern::literal("+"), Group::Normal)
            .unwrap();
        Cats { model, a, b, c, op, plus }
    }

    fn t(category: CategoryId, idx: u32) -> Production {
        Production::Terminal { category, idx }
    }

    fn alt(body: Vec<Production>) -> Alternative {
        Alternative { gated: false, body }
    }

    fn or(alternatives: Vec<Alternative>) -> Production {
        Production::Alternation { idx: 1, alternatives }
    }

    fn analyze_one(model: &TokenModel, rules: Vec<RuleGast>, max_k: usize) -> (Vec<Decision>, Vec<Ambiguity>) {
        let sets = GrammarSets::compute(&rules);
        let builder = LookaheadBuilder::new(&sets, model, max_k);
        builder.rule_decisions(&rules[0])
    }

    fn rule(name: &str, body: Vec<Production>) -> RuleGast {
        RuleGast { name: name.into(), body }
    }

    #[test]
    fn test_ll1_choice() {
        let cats = cats();
        let rules = vec![rule("r", vec![or(vec![alt(vec![t(cats.a, 1)]), alt(vec![t(cats.b, 1)])])])];
        let (decisions, ambiguities) = analyze_one(&cats.model, rules, 4);

        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].depth, 1);
        assert_eq!(decisions[0].alternatives[0].paths, vec![vec![cats.a]]);
        assert_eq!(decisions[0].alternatives[1].paths, vec![vec![cats.b]]);
        assert!(ambiguities.is_empty());
    }

    #[test]
    fn test_ll2_extends_only_colliding_paths() {
        let cats = cats();
        // r := A B | A C | C
        let rules = vec![rule(
            "r",
            vec![or(vec![
                alt(vec![t(cats.a, 1), t(cats.b, 1)]),
                alt(vec![t(cats.a, 2), t(cats.c, 1)]),
                alt(vec![t(cats.c, 2)]),
            ])],
        )];
        let (decisions, ambiguities) = analyze_one(&cats.model, rules, 4);
        let decision = &decisions[0];

        assert_eq!(decision.depth, 2);
        assert_eq!(decision.alternatives[0].paths, vec![vec![cats.a, cats.b]]);
        assert_eq!(decision.alternatives[1].paths, vec![vec![cats.a, cats.c]]);
        assert_eq!(decision.alternatives[2].paths, vec![vec![cats.c]]);
        assert!(ambiguities.is_empty());
    }

    #[test]
    fn test_hierarchy_collision_is_ambiguous_at_ceiling() {
        let cats = cats();
        // r := Op A | Plus A ; Plus is an Op
        let rules = vec![rule(
            "r",
            vec![or(vec![
                alt(vec![t(cats.op, 1), t(cats.a, 1)]),
                alt(vec![t(cats.plus, 1), t(cats.a, 2)]),
            ])],
        )];
        let (decisions, ambiguities) = analyze_one(&cats.model, rules, 2);

        assert!(decisions[0].ambiguous);
        assert_eq!(ambiguities.len(), 1);
        assert_eq!(ambiguities[0].kind, AmbiguityKind::Collision);
        assert_eq!(ambiguities[0].alternatives, vec![0, 1]);
        assert_eq!(ambiguities[0].depth, 2);
    }

    #[test]
    fn test_gated_alternatives_do_not_collide() {
        let cats = cats();
        let rules = vec![rule(
            "r",
            vec![or(vec![
                Alternative {
                    gated: true,
                    body: vec![t(cats.a, 1)],
                },
                alt(vec![t(cats.a, 2)]),
            ])],
        )];
        let (decisions, ambiguities) = analyze_one(&cats.model, rules, 4);

        assert_eq!(decisions[0].depth, 1);
        assert!(ambiguities.is_empty());
    }

    #[test]
    fn test_many_at_rule_end_is_ll1() {
        let cats = cats();
        // r := A (Plus A)*
        let rules = vec![rule(
            "r",
            vec![
                t(cats.a, 1),
                Production::Repetition {
                    idx: 1,
                    at_least_one: false,
                    body: vec![t(cats.plus, 1), t(cats.a, 2)],
                },
            ],
        )];
        let (decisions, ambiguities) = analyze_one(&cats.model, rules, 4);

        assert_eq!(decisions[0].kind, DecisionKind::Many);
        assert_eq!(decisions[0].alternatives[0].paths, vec![vec![cats.plus]]);
        assert_eq!(decisions[0].alternatives[1].paths, vec![Vec::<CategoryId>::new()]);
        assert!(ambiguities.is_empty());
    }

    #[test]
    fn test_earlier_short_alternative_shadows_later() {
        let cats = cats();
        // r := A | A B
        let rules = vec![rule(
            "r",
            vec![or(vec![alt(vec![t(cats.a, 1)]), alt(vec![t(cats.a, 2), t(cats.b, 1)])])],
        )];
        let (_, ambiguities) = analyze_one(&cats.model, rules, 4);

        assert_eq!(ambiguities.len(), 1);
        assert_eq!(ambiguities[0].kind, AmbiguityKind::Prefix);
    }

    #[test]
    fn test_subrule_calls_are_inlined() {
        let cats = cats();
        // r := s B | s C ; s := A
        let rules = vec![
            rule(
                "r",
                vec![or(vec![
                    alt(vec![Production::NonTerminal { rule: "s".into(), idx: 1 }, t(cats.b, 1)]),
                    alt(vec![Production::NonTerminal { rule: "s".into(), idx: 2 }, t(cats.c, 1)]),
                ])],
            ),
            rule("s", vec![t(cats.a, 1)]),
        ];
        let (decisions, _) = analyze_one(&cats.model, rules, 4);

        assert_eq!(decisions[0].alternatives[0].paths, vec![vec![cats.a, cats.b]]);
        assert_eq!(decisions[0].alternatives[1].paths, vec![vec![cats.a, cats.c]]);
    }
}
