//! EOF-terminated token sequence consumed by a parse session

use super::token::Token;
use crate::utils::Position;

/// Read-only token sequence that always ends with an `EOF` token.
///
/// Reads past the end clamp to that final `EOF`, so lookahead never has to
/// special-case the end of input.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    eof: Token,
}

impl TokenStream {
    /// Wrap tokens, appending an `EOF` marker when the sequence lacks one
    pub fn new(mut tokens: Vec<Token>) -> Self {
        let eof = match tokens.last() {
            Some(last) if last.is_eof() => last.clone(),
            Some(last) => {
                let eof = Token::eof(last.span.end);
                tokens.push(eof.clone());
                eof
            }
            None => {
                let eof = Token::eof(Position::start());
                tokens.push(eof.clone());
                eof
            }
        };

        Self { tokens, eof }
    }

    /// Token at `index`, or the final `EOF` when out of range
    pub fn get(&self, index: usize) -> &Token {
        self.tokens.get(index).unwrap_or(&self.eof)
    }

    /// Index of the `EOF` token
    pub fn eof_index(&self) -> usize {
        self.tokens.len() - 1
    }

    pub fn end_position(&self) -> Position {
        self.eof.span.start
    }

    /// Number of tokens including the trailing `EOF`
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.len() <= 1
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }
}

impl From<Vec<Token>> for TokenStream {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::CategoryId;
    use crate::utils::Span;

    #[test]
    fn test_eof_appended_and_reads_clamp() {
        let span = Span::new(Position::new(0, 1, 1), Position::new(1, 1, 2));
        let stream = TokenStream::new(vec![Token::new(CategoryId(1), "1", span)]);

        assert_eq!(stream.len(), 2);
        assert!(stream.get(1).is_eof());
        assert!(stream.get(99).is_eof());
        assert_eq!(stream.end_position().offset, 1);
        assert_eq!(stream.eof_index(), 1);
    }

    #[test]
    fn test_existing_eof_is_kept() {
        let stream = TokenStream::new(vec![Token::eof(Position::new(3, 1, 4))]);
        assert_eq!(stream.len(), 1);
        assert!(stream.is_empty());
        assert_eq!(stream.end_position().offset, 3);
    }
}
