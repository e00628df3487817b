//! Recording state used while a rule body runs in recording mode

use super::gast::{Alternative, Production};
use crate::tokens::CategoryId;

/// Stack of open sequences; the bottom frame is the rule body itself
#[derive(Debug)]
pub(crate) struct Recorder {
    frames: Vec<Vec<Production>>,
}

impl Recorder {
    pub(crate) fn new() -> Self {
        Self {
            frames: vec![Vec::new()],
        }
    }

    fn push(&mut self, production: Production) {
        if let Some(top) = self.frames.last_mut() {
            top.push(production);
        }
    }

    pub(crate) fn terminal(&mut self, category: CategoryId, idx: u32) {
        self.push(Production::Terminal { category, idx });
    }

    pub(crate) fn non_terminal(&mut self, rule: &str, idx: u32) {
        self.push(Production::NonTerminal {
            rule: rule.to_string(),
            idx,
        });
    }

    /// Start recording a nested body
    pub(crate) fn open(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Finish the innermost nested body
    pub(crate) fn close(&mut self) -> Vec<Production> {
        if self.frames.len() > 1 {
            self.frames.pop().unwrap_or_default()
        } else {
            Vec::new()
        }
    }

    pub(crate) fn option(&mut self, idx: u32, body: Vec<Production>) {
        self.push(Production::Option { idx, body });
    }

    pub(crate) fn repetition(&mut self, idx: u32, at_least_one: bool, body: Vec<Production>) {
        self.push(Production::Repetition {
            idx,
            at_least_one,
            body,
        });
    }

    pub(crate) fn alternation(&mut self, idx: u32, alternatives: Vec<Alternative>) {
        self.push(Production::Alternation { idx, alternatives });
    }

    /// The recorded rule body
    pub(crate) fn finish(mut self) -> Vec<Production> {
        self.frames.truncate(1);
        self.frames.pop().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_frames() {
        let mut recorder = Recorder::new();
        recorder.terminal(CategoryId(1), 1);
        recorder.open();
        recorder.non_terminal("term", 2);
        let body = recorder.close();
        recorder.repetition(1, false, body);

        let gast = recorder.finish();
        assert_eq!(gast.len(), 2);
        assert_eq!(
            gast[1],
            Production::Repetition {
                idx: 1,
                at_least_one: false,
                body: vec![Production::NonTerminal {
                    rule: "term".into(),
                    idx: 2
                }],
            }
        );
    }

    #[test]
    fn test_close_never_pops_root() {
        let mut recorder = Recorder::new();
        recorder.terminal(CategoryId(1), 1);
        assert!(recorder.close().is_empty());
        assert_eq!(recorder.finish().len(), 1);
    }
}
