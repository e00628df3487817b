//! Token occurrences

use super::category::CategoryId;
use crate::utils::{Position, Span};
use serde::{Deserialize, Serialize};

/// An immutable, classified slice of input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub category: CategoryId,
    pub image: String,
    pub span: Span,
    /// Synthesized by insertion recovery rather than read from input
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inserted: bool,
}

impl Token {
    pub fn new(category: CategoryId, image: impl Into<String>, span: Span) -> Self {
        Self {
            category,
            image: image.into(),
            span,
            inserted: false,
        }
    }

    /// End-of-stream marker at the given position
    pub fn eof(at: Position) -> Self {
        Self::new(CategoryId::EOF, "", Span::point(at))
    }

    /// Zero-width placeholder used when recovery inserts a missing token
    pub fn placeholder(category: CategoryId, at: Position) -> Self {
        Self {
            category,
            image: String::new(),
            span: Span::point(at),
            inserted: true,
        }
    }

    pub fn category(&self) -> CategoryId {
        self.category
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn is_eof(&self) -> bool {
        self.category.is_eof()
    }

    pub fn offset(&self) -> usize {
        self.span.start.offset
    }

    pub fn len(&self) -> usize {
        self.span.len()
    }

    pub fn is_empty(&self) -> bool {
        self.span.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_zero_width() {
        let at = Position::new(6, 1, 7);
        let token = Token::placeholder(CategoryId(3), at);

        assert!(token.inserted);
        assert!(token.is_empty());
        assert_eq!(token.offset(), 6);
        assert_eq!(token.image(), "");
    }

    #[test]
    fn test_eof_token() {
        let token = Token::eof(Position::new(5, 1, 6));
        assert!(token.is_eof());
        assert!(!token.inserted);

        let json = serde_json::to_string(&token).unwrap();
        assert!(!json.contains("inserted"));
    }
}
