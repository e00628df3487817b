//! Leading-character analysis of token patterns
//!
//! Derives a conservative superset of the characters a pattern's non-empty
//! matches can start with. Anything the analysis does not understand makes the
//! pattern underivable (`None`), which pushes the tokenizer onto its fallback
//! scan. A too-large set only costs speed; a too-small set would drop tokens,
//! so every uncertain construct widens the set or gives up.

use crate::tokens::{TokenCategory, TokenPattern};

/// Set of leading characters: one bit per ASCII code plus a shared non-ASCII flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharSet {
    ascii: u128,
    non_ascii: bool,
}

impl CharSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            ascii: u128::MAX,
            non_ascii: true,
        }
    }

    pub fn insert(&mut self, ch: char) {
        if ch.is_ascii() {
            self.ascii |= 1u128 << (ch as u32);
        } else {
            self.non_ascii = true;
        }
    }

    pub fn insert_range(&mut self, lo: char, hi: char) {
        if hi < lo {
            return;
        }
        let ascii_hi = (hi as u32).min(127);
        for code in (lo as u32)..=ascii_hi {
            self.ascii |= 1u128 << code;
        }
        if !hi.is_ascii() {
            self.non_ascii = true;
        }
    }

    pub fn union(&mut self, other: &CharSet) {
        self.ascii |= other.ascii;
        self.non_ascii |= other.non_ascii;
    }

    /// Complement within ASCII; the non-ASCII bucket is always kept
    fn negated(&self) -> Self {
        Self {
            ascii: !self.ascii,
            non_ascii: true,
        }
    }

    pub fn contains(&self, ch: char) -> bool {
        if ch.is_ascii() {
            self.ascii & (1u128 << (ch as u32)) != 0
        } else {
            self.non_ascii
        }
    }

    pub fn has_non_ascii(&self) -> bool {
        self.non_ascii
    }

    pub fn is_empty(&self) -> bool {
        self.ascii == 0 && !self.non_ascii
    }

    /// ASCII members in code order
    pub fn ascii_chars(&self) -> impl Iterator<Item = char> + '_ {
        (0u8..128)
            .filter(move |code| self.ascii & (1u128 << code) != 0)
            .map(char::from)
    }
}

/// Leading characters of a category, when derivable
pub fn leading_chars(category: &TokenCategory) -> Option<CharSet> {
    if let Some(chars) = category.leading_chars() {
        let mut set = CharSet::empty();
        chars.iter().for_each(|ch| set.insert(*ch));
        return Some(set);
    }

    match category.pattern() {
        TokenPattern::Literal(text) => {
            let mut set = CharSet::empty();
            set.insert(text.chars().next()?);
            Some(set)
        }
        TokenPattern::Regex(source) => regex_leading_chars(source),
        TokenPattern::Custom(_) | TokenPattern::Abstract => None,
    }
}

/// Leading characters of a regular expression source
pub fn regex_leading_chars(source: &str) -> Option<CharSet> {
    let mut parser = PatternScanner {
        chars: source.chars().collect(),
        pos: 0,
    };
    let first = parser.alternation()?;
    if parser.pos != parser.chars.len() {
        return None;
    }
    Some(first.set)
}

/// First characters of a sub-expression and whether it can match empty
#[derive(Debug, Clone, Copy)]
struct First {
    set: CharSet,
    nullable: bool,
}

impl First {
    fn epsilon() -> Self {
        Self {
            set: CharSet::empty(),
            nullable: true,
        }
    }

    fn of(set: CharSet) -> Self {
        Self {
            set,
            nullable: false,
        }
    }
}

struct PatternScanner {
    chars: Vec<char>,
    pos: usize,
}

impl PatternScanner {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn alternation(&mut self) -> Option<First> {
        let mut result = self.sequence()?;
        while self.eat('|') {
            let branch = self.sequence()?;
            result.set.union(&branch.set);
            result.nullable |= branch.nullable;
        }
        Some(result)
    }

    fn sequence(&mut self) -> Option<First> {
        let mut result = First::epsilon();
        while let Some(ch) = self.peek() {
            if ch == '|' || ch == ')' {
                break;
            }
            let mut atom = self.atom()?;
            if self.quantifier()? {
                atom.nullable = true;
            }
            if result.nullable {
                result.set.union(&atom.set);
                result.nullable = atom.nullable;
            }
        }
        Some(result)
    }

    /// Consume an optional quantifier; `Some(true)` when it allows zero repetitions
    fn quantifier(&mut self) -> Option<bool> {
        let zero_allowed = match self.peek() {
            Some('*') | Some('?') => {
                self.pos += 1;
                true
            }
            Some('+') => {
                self.pos += 1;
                false
            }
            Some('{') => {
                self.pos += 1;
                let mut digits = String::new();
                while let Some(ch) = self.peek().filter(|c| c.is_ascii_digit()) {
                    digits.push(ch);
                    self.pos += 1;
                }
                while self.peek().is_some_and(|c| c != '}') {
                    self.pos += 1;
                }
                if !self.eat('}') {
                    return None;
                }
                digits.parse::<u32>().ok()? == 0
            }
            _ => return Some(false),
        };
        // lazy / possessive suffix
        if !self.eat('?') {
            self.eat('+');
        }
        Some(zero_allowed)
    }

    fn atom(&mut self) -> Option<First> {
        match self.next()? {
            '(' => self.group(),
            '[' => self.class().map(First::of),
            '\\' => self.escape(),
            '.' => {
                let mut set = CharSet::all();
                set.ascii &= !(1u128 << ('\n' as u32));
                Some(First::of(set))
            }
            '^' | '$' => Some(First::epsilon()),
            '*' | '+' | '?' | '{' => None,
            ch => {
                let mut set = CharSet::empty();
                set.insert(ch);
                Some(First::of(set))
            }
        }
    }

    fn group(&mut self) -> Option<First> {
        if self.eat('?') {
            match self.next()? {
                ':' => {}
                'P' if self.eat('<') => self.skip_group_name()?,
                '<' => self.skip_group_name()?,
                // inline flags such as (?i) change which characters match
                _ => return None,
            }
        }
        let inner = self.alternation()?;
        if !self.eat(')') {
            return None;
        }
        Some(inner)
    }

    fn skip_group_name(&mut self) -> Option<()> {
        while let Some(ch) = self.next() {
            if ch == '>' {
                return Some(());
            }
        }
        None
    }

    fn escape(&mut self) -> Option<First> {
        let ch = self.next()?;
        if matches!(ch, 'b' | 'B' | 'A' | 'z') {
            return Some(First::epsilon());
        }
        self.escape_class(ch).map(First::of)
    }

    /// Character set for the escape following a backslash
    fn escape_class(&mut self, ch: char) -> Option<CharSet> {
        let mut set = CharSet::empty();
        match ch {
            // \d is Unicode-aware in the regex crate
            'd' => {
                set.insert_range('0', '9');
                set.non_ascii = true;
            }
            'w' => {
                set.insert_range('a', 'z');
                set.insert_range('A', 'Z');
                set.insert_range('0', '9');
                set.insert('_');
                set.non_ascii = true;
            }
            's' => {
                for space in [' ', '\t', '\n', '\r', '\x0B', '\x0C'] {
                    set.insert(space);
                }
                set.non_ascii = true;
            }
            'D' | 'W' | 'S' => {
                let positive = self.escape_class(ch.to_ascii_lowercase())?;
                set = CharSet {
                    ascii: !positive.ascii,
                    non_ascii: true,
                };
            }
            'n' => set.insert('\n'),
            't' => set.insert('\t'),
            'r' => set.insert('\r'),
            'f' => set.insert('\x0C'),
            'v' => set.insert('\x0B'),
            'x' => set.insert(self.hex_escape()?),
            'p' | 'P' => {
                // unicode classes: skip the class name and accept anything
                if self.eat('{') {
                    while self.next()? != '}' {}
                } else {
                    self.next()?;
                }
                set = CharSet::all();
            }
            c if c.is_ascii_alphanumeric() => return None,
            c => set.insert(c),
        }
        Some(set)
    }

    fn hex_escape(&mut self) -> Option<char> {
        let mut digits = String::new();
        if self.eat('{') {
            loop {
                match self.next()? {
                    '}' => break,
                    d => digits.push(d),
                }
            }
        } else {
            digits.push(self.next()?);
            digits.push(self.next()?);
        }
        char::from_u32(u32::from_str_radix(&digits, 16).ok()?)
    }

    fn class(&mut self) -> Option<CharSet> {
        let negated = self.eat('^');
        let mut set = CharSet::empty();
        let mut first = true;

        loop {
            let ch = self.next()?;
            match ch {
                ']' if !first => break,
                '[' if self.peek() == Some(':') => {
                    // POSIX class such as [:alpha:]; widen to everything
                    while self.next()? != ']' {}
                    set = CharSet::all();
                }
                '[' => return None,
                '&' | '-' | '~' if self.peek() == Some(ch) => return None,
                _ => {
                    let start = if ch == '\\' {
                        let escaped = self.next()?;
                        let class = self.escape_class(escaped)?;
                        if matches!(escaped, 'd' | 'w' | 's' | 'D' | 'W' | 'S' | 'p' | 'P') {
                            set.union(&class);
                            first = false;
                            continue;
                        }
                        single_member(&class)?
                    } else {
                        ch
                    };

                    if self.peek() == Some('-') && self.chars.get(self.pos + 1) != Some(&']') {
                        self.pos += 1;
                        let end = match self.next()? {
                            '\\' => {
                                let escaped = self.next()?;
                                single_member(&self.escape_class(escaped)?)?
                            }
                            c => c,
                        };
                        set.insert_range(start, end);
                    } else {
                        set.insert(start);
                    }
                }
            }
            first = false;
        }

        Some(if negated { set.negated() } else { set })
    }
}

/// The only character in a set produced by a single-character escape
fn single_member(set: &CharSet) -> Option<char> {
    let mut chars = set.ascii_chars();
    let ch = chars.next()?;
    if chars.next().is_some() || set.non_ascii {
        return None;
    }
    Some(ch)
}
