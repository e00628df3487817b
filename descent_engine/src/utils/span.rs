//! Source location tracking
//!
//! Positions carry a byte offset together with a 1-based line and column so
//! that tokens and diagnostics can be reported without rescanning the input.
use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in source text with line, column, and byte offset.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// Byte offset from start of input (0-based)
    pub offset: usize,
    /// Line number (1-based)
    pub line: u32,
    /// Column number in characters (1-based)
    pub column: u32,
}

impl Position {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Create the starting position (offset 0, line 1, column 1)
    pub fn start() -> Self {
        Self::new(0, 1, 1)
    }

    /// Advance position by one character.
    ///
    /// `\n` starts a new line. A lone `\r` does too, while the `\r` of a `\r\n`
    /// pair only moves the column so the pair counts as one line break.
    pub fn advance(self, ch: char, next: Option<char>) -> Self {
        let offset = self.offset + ch.len_utf8();
        match ch {
            '\n' => Self::new(offset, self.line + 1, 1),
            '\r' if next != Some('\n') => Self::new(offset, self.line + 1, 1),
            _ => Self::new(offset, self.line, self.column + 1),
        }
    }

    /// Advance position over a string
    pub fn advance_str(self, s: &str) -> Self {
        let mut pos = self;
        let mut chars = s.chars().peekable();
        while let Some(ch) = chars.next() {
            pos = pos.advance(ch, chars.peek().copied());
        }
        pos
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A span of source text from start to end position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start position (inclusive)
    pub start: Position,
    /// End position (exclusive)
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(
            start.offset <= end.offset,
            "Span start must not be after end"
        );
        Self { start, end }
    }

    /// Zero-length span at a position
    pub fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    /// Merge two spans into one covering both
    pub fn merge(self, other: Self) -> Self {
        let start = if self.start.offset <= other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset >= other.end.offset {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    /// Byte length of this span
    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Get the source text for this span from the input
    pub fn slice<'a>(&self, input: &'a str) -> &'a str {
        input.get(self.start.offset..self.end.offset).unwrap_or("")
    }

    /// Create an unknown/dummy span (useful for generated tokens)
    pub fn dummy() -> Self {
        Self::point(Position::start())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{}-{}",
                self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Line index over source text for rendering diagnostics with context
#[derive(Debug, Clone)]
pub struct SourceMap<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceMap<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (offset, ch) in source.char_indices() {
            if ch == '\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            source,
            line_starts,
        }
    }

    /// Get a line of text by line number (1-based)
    pub fn get_line(&self, line_num: u32) -> Option<&'a str> {
        let line_idx = (line_num as usize).checked_sub(1)?;
        let start = *self.line_starts.get(line_idx)?;
        let end = self
            .line_starts
            .get(line_idx + 1)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());

        Some(self.source[start..end].trim_end_matches('\r'))
    }

    /// Format a message with the offending line and a caret underline
    pub fn format_error(&self, span: &Span, message: &str) -> String {
        let mut result = format!("error: {}\n  --> {}\n", message, span.start);

        if let Some(line) = self.get_line(span.start.line) {
            let line_num = span.start.line.to_string();
            let padding = " ".repeat(line_num.len());
            let width = if span.start.line == span.end.line {
                span.end.column.saturating_sub(span.start.column) as usize
            } else {
                line.chars().count().saturating_sub(span.start.column as usize - 1)
            };

            result.push_str(&format!("{} |\n", padding));
            result.push_str(&format!("{} | {}\n", line_num, line));
            result.push_str(&format!(
                "{} | {}{}\n",
                padding,
                " ".repeat(span.start.column.saturating_sub(1) as usize),
                "^".repeat(width.max(1))
            ));
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_tracks_lines_and_columns() {
        let pos = Position::start().advance_str("ab\ncd");
        assert_eq!(pos, Position::new(5, 2, 3));

        let crlf = Position::start().advance_str("a\r\nb");
        assert_eq!(crlf.line, 2);
        assert_eq!(crlf.column, 2);

        let cr = Position::start().advance_str("a\rb");
        assert_eq!(cr.line, 2);
    }

    #[test]
    fn test_advance_counts_multibyte_as_one_column() {
        let pos = Position::start().advance_str("é+");
        assert_eq!(pos.offset, 3);
        assert_eq!(pos.column, 3);
    }

    #[test]
    fn test_span_merge_and_slice() {
        let source = "(2 + 3)";
        let left = Span::new(Position::new(0, 1, 1), Position::new(1, 1, 2));
        let right = Span::new(Position::new(6, 1, 7), Position::new(7, 1, 8));
        let merged = left.merge(right);

        assert_eq!(merged.slice(source), source);
        assert_eq!(merged.len(), 7);
        assert!(Span::point(Position::start()).is_empty());
    }

    #[test]
    fn test_source_map_format_error() {
        let source = "1 + 2\n(3 * 4";
        let map = SourceMap::new(source);
        assert_eq!(map.get_line(2), Some("(3 * 4"));
        assert_eq!(map.get_line(3), None);

        let span = Span::new(Position::new(8, 2, 3), Position::new(9, 2, 4));
        let rendered = map.format_error(&span, "unexpected '3'");
        assert!(rendered.contains("--> 2:3"));
        assert!(rendered.contains("2 | (3 * 4"));
        assert!(rendered.contains("  ^"));
    }
}
