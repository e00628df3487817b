//! Left-recursion detection
//!
//! An edge `A -> B` exists when rule `A` can call `B` before consuming any
//! token. Any cycle in that graph is left recursion.

use super::error::StructuralError;
use super::sets::GrammarSets;
use crate::grammar::Production;
use crate::log_debug;
use std::collections::HashSet;

/// Fail with the first left-recursive cycle, searching rules in registration order
pub(crate) fn check_left_recursion(sets: &GrammarSets<'_>) -> Result<(), StructuralError> {
    let adjacency: Vec<Vec<usize>> = sets
        .rules
        .iter()
        .map(|rule| {
            let mut callees = Vec::new();
            leading_calls(&rule.body, sets, &mut callees);
            let mut seen = HashSet::new();
            callees.retain(|callee| seen.insert(*callee));
            callees
        })
        .collect();

    log_debug!("Left recursion graph",
        "rules" => adjacency.len(),
        "edges" => adjacency.iter().map(Vec::len).sum::<usize>()
    );

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for start in 0..adjacency.len() {
        if visited.contains(&start) {
            continue;
        }
        if let Some(cycle) =
            find_cycle_dfs(start, &adjacency, &mut visited, &mut rec_stack, &mut path)
        {
            let mut names: Vec<String> = cycle
                .iter()
                .map(|index| sets.rules[*index].name.clone())
                .collect();
            let rule = names[0].clone();
            names.push(rule.clone());
            return Err(StructuralError::LeftRecursion { rule, path: names });
        }
    }

    Ok(())
}

/// Collect rules callable before the first token of `seq`; returns whether `seq` is nullable
fn leading_calls(seq: &[Production], sets: &GrammarSets<'_>, out: &mut Vec<usize>) -> bool {
    for production in seq {
        let nullable = match production {
            Production::Terminal { .. } => false,
            Production::NonTerminal { rule, .. } => match sets.rule_index(rule) {
                Some(callee) => {
                    out.push(callee);
                    sets.nullable[callee]
                }
                None => false,
            },
            Production::Option { body, .. } => {
                leading_calls(body, sets, out);
                true
            }
            Production::Repetition {
                at_least_one, body, ..
            } => leading_calls(body, sets, out) || !at_least_one,
            Production::Alternation { alternatives, .. } => {
                let mut any = false;
                for alternative in alternatives {
                    any |= leading_calls(&alternative.body, sets, out);
                }
                any
            }
        };
        if !nullable {
            return false;
        }
    }
    true
}

/// DFS helper; returns the rules on the first cycle found
fn find_cycle_dfs(
    node: usize,
    adjacency: &[Vec<usize>],
    visited: &mut HashSet<usize>,
    rec_stack: &mut HashSet<usize>,
    path: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    for neighbor in &adjacency[node] {
        if rec_stack.contains(neighbor) {
            if let Some(cycle_start) = path.iter().position(|n| n == neighbor) {
                return Some(path[cycle_start..].to_vec());
            }
        } else if !visited.contains(neighbor) {
            if let Some(cycle) = find_cycle_dfs(*neighbor, adjacency, visited, rec_stack, path) {
                return Some(cycle);
            }
        }
    }

    rec_stack.remove(&node);
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::RuleGast;
    use crate::tokens::CategoryId;
    use assert_matches::assert_matches;

    fn t(category: u16) -> Production {
        Production::Terminal {
            category: CategoryId(category),
            idx: 1,
        }
    }

    fn nt(rule: &str) -> Production {
        Production::NonTerminal {
            rule: rule.into(),
            idx: 1,
        }
    }

    fn rule(name: &str, body: Vec<Production>) -> RuleGast {
        RuleGast {
            name: name.into(),
            body,
        }
    }

    #[test]
    fn test_direct_left_recursion() {
        let rules = vec![rule("expr", vec![nt("expr"), t(1), t(2)])];
        let sets = GrammarSets::compute(&rules);

        let err = check_left_recursion(&sets).unwrap_err();
        assert_matches!(err, StructuralError::LeftRecursion { ref rule, ref path }
            if rule == "expr" && path == &["expr", "expr"]);
    }

    #[test]
    fn test_indirect_through_nullable_prefix() {
        let rules = vec![
            rule("a", vec![nt("opt"), nt("b")]),
            rule(
                "opt",
                vec![Production::Option {
                    idx: 1,
                    body: vec![t(1)],
                }],
            ),
            rule("b", vec![nt("a"), t(2)]),
        ];
        let sets = GrammarSets::compute(&rules);

        let err = check_left_recursion(&sets).unwrap_err();
        assert_matches!(err, StructuralError::LeftRecursion { ref path, .. }
            if path == &["a", "b", "a"]);
    }

    #[test]
    fn test_right_recursion_is_fine() {
        let rules = vec![rule(
            "list",
            vec![
                t(1),
                Production::Option {
                    idx: 1,
                    body: vec![t(2), nt("list")],
                },
            ],
        )];
        let sets = GrammarSets::compute(&rules);
        assert!(check_left_recursion(&sets).is_ok());
    }
}
