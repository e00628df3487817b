//! Grammar abstract syntax tree
//!
//! Recording a rule body produces a `Vec<Production>`; sequence is implicit in
//! the vector order. Every node carries the occurrence index the grammar author
//! passed to the combinator, so two calls to the same rule (or two choices) in
//! one body stay distinct decision points.

use crate::tokens::CategoryId;
use serde::Serialize;
use std::fmt;

/// Position of a rule in its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleId(pub(crate) usize);

impl RuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Production {
    Terminal {
        category: CategoryId,
        idx: u32,
    },
    NonTerminal {
        rule: String,
        idx: u32,
    },
    Option {
        idx: u32,
        body: Vec<Production>,
    },
    Repetition {
        idx: u32,
        at_least_one: bool,
        body: Vec<Production>,
    },
    Alternation {
        idx: u32,
        alternatives: Vec<Alternative>,
    },
}

impl Production {
    pub fn idx(&self) -> u32 {
        match self {
            Self::Terminal { idx, .. }
            | Self::NonTerminal { idx, .. }
            | Self::Option { idx, .. }
            | Self::Repetition { idx, .. }
            | Self::Alternation { idx, .. } => *idx,
        }
    }

    /// Decision kind for nodes that are decision points
    pub fn decision_kind(&self) -> Option<DecisionKind> {
        match self {
            Self::Option { .. } => Some(DecisionKind::Option),
            Self::Repetition {
                at_least_one: false,
                ..
            } => Some(DecisionKind::Many),
            Self::Repetition {
                at_least_one: true, ..
            } => Some(DecisionKind::AtLeastOne),
            Self::Alternation { .. } => Some(DecisionKind::Or),
            Self::Terminal { .. } | Self::NonTerminal { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alternative {
    /// Guarded by a gate predicate at runtime
    pub gated: bool,
    pub body: Vec<Production>,
}

/// Recorded body of one named rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleGast {
    pub name: String,
    pub body: Vec<Production>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DecisionKind {
    Option,
    Many,
    AtLeastOne,
    Or,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Option => "option",
            Self::Many => "many",
            Self::AtLeastOne => "at_least_one",
            Self::Or => "or",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one decision point: `(rule, kind, idx)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DecisionKey {
    pub rule: String,
    pub kind: DecisionKind,
    pub idx: u32,
}

impl DecisionKey {
    pub fn new(rule: impl Into<String>, kind: DecisionKind, idx: u32) -> Self {
        Self {
            rule: rule.into(),
            kind,
            idx,
        }
    }
}

impl fmt::Display for DecisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}#{}", self.rule, self.kind, self.idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_kind_of_nodes() {
        let many = Production::Repetition {
            idx: 2,
            at_least_one: false,
            body: vec![],
        };
        let plus = Production::Repetition {
            idx: 2,
            at_least_one: true,
            body: vec![],
        };
        let terminal = Production::Terminal {
            category: CategoryId::EOF,
            idx: 1,
        };

        assert_eq!(many.decision_kind(), Some(DecisionKind::Many));
        assert_eq!(plus.decision_kind(), Some(DecisionKind::AtLeastOne));
        assert_eq!(terminal.decision_kind(), None);
        assert_eq!(many.idx(), 2);
    }

    #[test]
    fn test_decision_key_ordering_and_display() {
        let a = DecisionKey::new("expr", DecisionKind::Or, 2);
        let b = DecisionKey::new("expr", DecisionKind::Many, 1);
        let c = DecisionKey::new("atom", DecisionKind::Or, 1);

        let mut keys = vec![a.clone(), b.clone(), c.clone()];
        keys.sort();
        assert_eq!(keys, vec![c, b, a.clone()]);
        assert_eq!(a.to_string(), "expr.or#2");
    }
}
