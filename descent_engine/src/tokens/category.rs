//! Token category definitions

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Handle to a registered token category
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CategoryId(pub(crate) u16);

impl CategoryId {
    /// Built-in end-of-stream category, present in every model
    pub const EOF: CategoryId = CategoryId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_eof(self) -> bool {
        self == Self::EOF
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Matcher over the remaining input; returns the matched length in bytes
pub type CustomMatcher = Arc<dyn Fn(&str) -> Option<usize> + Send + Sync>;

/// How a category recognizes text
#[derive(Clone)]
pub enum TokenPattern {
    /// Regular expression, implicitly anchored at the current position
    Regex(String),
    /// Exact text
    Literal(String),
    /// Arbitrary matcher; needs explicit leading characters to take part in dispatch
    Custom(CustomMatcher),
    /// Never matches text directly; used for parent categories
    Abstract,
}

impl TokenPattern {
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex(pattern.into())
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn custom(matcher: impl Fn(&str) -> Option<usize> + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(matcher))
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, Self::Abstract)
    }
}

impl fmt::Debug for TokenPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex(source) => f.debug_tuple("Regex").field(source).finish(),
            Self::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Abstract => f.write_str("Abstract"),
        }
    }
}

/// Which output stream a category's tokens land in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    /// Primary token sequence handed to the parser
    Normal,
    /// Recognized and dropped
    Skipped,
    /// Kept aside under the given group name
    Named(String),
}

/// Pattern ready for matching
#[derive(Clone)]
pub(crate) enum CompiledPattern {
    Regex(Regex),
    Literal(String),
    Custom(CustomMatcher),
    None,
}

impl CompiledPattern {
    /// Length in bytes of the match starting at `text[pos..]`, if any
    pub(crate) fn match_at(&self, text: &str, pos: usize) -> Option<usize> {
        let rest = &text[pos..];
        match self {
            Self::Regex(regex) => regex.find(rest).map(|m| m.end()),
            Self::Literal(literal) => rest.starts_with(literal.as_str()).then(|| literal.len()),
            Self::Custom(matcher) => matcher(rest).filter(|len| rest.is_char_boundary(*len)),
            Self::None => None,
        }
    }
}

/// A registered token category
#[derive(Clone)]
pub struct TokenCategory {
    pub(crate) id: CategoryId,
    pub(crate) name: String,
    pub(crate) parent: Option<CategoryId>,
    pub(crate) pattern: TokenPattern,
    pub(crate) compiled: CompiledPattern,
    pub(crate) group: Group,
    pub(crate) leading_chars: Option<Vec<char>>,
}

impl TokenCategory {
    pub fn id(&self) -> CategoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<CategoryId> {
        self.parent
    }

    pub fn pattern(&self) -> &TokenPattern {
        &self.pattern
    }

    pub fn group(&self) -> &Group {
        &self.group
    }

    /// Explicit leading characters, when attached
    pub fn leading_chars(&self) -> Option<&[char]> {
        self.leading_chars.as_deref()
    }

    /// Has a real pattern (not abstract, not the end-of-stream marker)
    pub fn is_concrete(&self) -> bool {
        !self.id.is_eof() && !self.pattern.is_abstract()
    }

    pub(crate) fn match_at(&self, text: &str, pos: usize) -> Option<usize> {
        self.compiled.match_at(text, pos)
    }
}

impl fmt::Debug for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCategory")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("pattern", &self.pattern)
            .field("group", &self.group)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compiled_literal_and_regex() {
        let literal = CompiledPattern::Literal("+".to_string());
        assert_eq!(literal.match_at("1 + 2", 2), Some(1));
        assert_eq!(literal.match_at("1 + 2", 0), None);

        let regex = CompiledPattern::Regex(Regex::new(r"^(?:[1-9]\d*)").unwrap());
        assert_eq!(regex.match_at("x 120 y", 2), Some(3));
        assert_eq!(regex.match_at("x 120 y", 0), None);
    }

    #[test]
    fn test_custom_matcher_rejects_split_characters() {
        let custom = CompiledPattern::Custom(Arc::new(|_rest: &str| Some(1)));
        assert_eq!(custom.match_at("é", 0), None);
        assert_eq!(custom.match_at("ab", 0), Some(1));
    }
}
