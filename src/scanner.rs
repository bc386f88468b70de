//! Reads a circuit definition source and translates its characters into
//! symbols usable by the parser.
//!
//! The scanner buffers the whole source as a sequence of `\n`-terminated
//! lines, tracks the line and column of every character it reads, and skips
//! comments (`#` to end of line) and whitespace. Lexically unknown characters
//! are not errors here: they surface as [`SymbolKind::Unknown`] and the
//! parser reports them.

use log::trace;

use crate::names::{NameId, NameTable};

/// The reserved statement keywords of the definition language.
///
/// The positional words `TO`, `IN`, `OUT` and `PERIOD` are not keywords;
/// they lex to dedicated symbols of their own.
pub const KEYWORDS: [&str; 14] = [
    "AND", "OR", "NAND", "NOR", "XOR", "NOT", "DTYPE", "CLOCK", "SWITCH", "CONNECT", "CIRCUIT",
    "MONITOR", "INPUT", "OUTPUT",
];

/// What a symbol is, with its payload where one exists.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SymbolKind {
    /// A reserved statement keyword, by interned name ID.
    Keyword(NameId),
    /// A user identifier, by interned name ID.
    Name(NameId),
    /// An unsigned integer literal.
    Number(u32),
    Comma,
    Semicolon,
    Equals,
    /// The `->` connection arrow.
    Connection,
    Fullstop,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    To,
    In,
    Out,
    Period,
    /// End of input; returned forever once reached.
    Eof,
    /// A character sequence the language has no token for.
    Unknown,
}

/// A scanned symbol and the position of its first character.
#[derive(Clone, Copy, Debug)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// 0-based line index.
    pub line: usize,
    /// 0-based column index.
    pub column: usize,
}

/// Translates a definition source into a stream of [`Symbol`]s.
pub struct Scanner {
    /// Source lines, each kept with its `\n` terminator.
    lines: Vec<String>,
    chars: Vec<Vec<char>>,
    line: usize,
    column: usize,
    current: Option<char>,
    /// Start position of the most recently returned symbol.
    last_symbol: (usize, usize),
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        let mut lines: Vec<String> = source.split_inclusive('\n').map(str::to_string).collect();
        if let Some(last) = lines.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }
        let chars = lines.iter().map(|line| line.chars().collect()).collect();
        let mut scanner = Self {
            lines,
            chars,
            line: 0,
            column: 0,
            current: None,
            last_symbol: (0, 0),
        };
        scanner.current = scanner.char_at(0, 0);
        scanner
    }

    /// Translates the next sequence of characters into a symbol.
    pub fn next_symbol(&mut self, names: &mut NameTable) -> Symbol {
        self.skip_formatting();
        let (line, column) = (self.line, self.column);
        let kind = match self.current {
            None => SymbolKind::Eof,
            Some(c) if c.is_ascii_alphabetic() => {
                let word = self.read_name();
                match word.as_str() {
                    "TO" => SymbolKind::To,
                    "IN" => SymbolKind::In,
                    "OUT" => SymbolKind::Out,
                    "PERIOD" => SymbolKind::Period,
                    _ if KEYWORDS.contains(&word.as_str()) => {
                        SymbolKind::Keyword(names.intern(&word))
                    }
                    _ => SymbolKind::Name(names.intern(&word)),
                }
            }
            Some(c) if c.is_ascii_digit() => SymbolKind::Number(self.read_number()),
            Some(',') => self.take(SymbolKind::Comma),
            Some(';') => self.take(SymbolKind::Semicolon),
            Some('=') => self.take(SymbolKind::Equals),
            Some('.') => self.take(SymbolKind::Fullstop),
            Some('(') => self.take(SymbolKind::OpenParen),
            Some(')') => self.take(SymbolKind::CloseParen),
            Some('[') => self.take(SymbolKind::OpenBracket),
            Some(']') => self.take(SymbolKind::CloseBracket),
            Some('{') => self.take(SymbolKind::OpenBrace),
            Some('}') => self.take(SymbolKind::CloseBrace),
            Some(first) => {
                // Two-character probe: `->` is the only multi-character token.
                self.advance();
                let second = self.current;
                self.advance();
                if first == '-' && second == Some('>') {
                    SymbolKind::Connection
                } else {
                    SymbolKind::Unknown
                }
            }
        };
        self.last_symbol = (line, column);
        trace!("symbol {:?} at {}:{}", kind, line + 1, column);
        Symbol { kind, line, column }
    }

    /// Line number, line text and column for a diagnostic.
    ///
    /// With `line_number = None` the position of the most recently returned
    /// symbol is described; with `Some(line)` the requested line is returned
    /// with no column. Line numbers are 1-based in the result.
    pub fn line_details(&self, line_number: Option<usize>) -> (usize, String, Option<usize>) {
        match line_number {
            Some(line) => (line + 1, self.line_text(line), None),
            None => {
                let (line, column) = self.last_symbol;
                (line + 1, self.line_text(line), Some(column))
            }
        }
    }

    fn line_text(&self, line: usize) -> String {
        self.lines
            .get(line)
            .map(|text| text.trim_end_matches(['\n', '\r']).to_string())
            .unwrap_or_default()
    }

    fn char_at(&self, line: usize, column: usize) -> Option<char> {
        self.chars.get(line)?.get(column).copied()
    }

    fn advance(&mut self) {
        if self.line >= self.chars.len() {
            self.current = None;
            return;
        }
        self.column += 1;
        if self.column >= self.chars[self.line].len() {
            self.line += 1;
            self.column = 0;
        }
        self.current = self.char_at(self.line, self.column);
    }

    /// Skips whitespace and comments until neither applies.
    fn skip_formatting(&mut self) {
        while let Some(c) = self.current {
            if c == '#' {
                // Comment runs to end of line; the terminator itself is
                // whitespace and falls to the next arm.
                while matches!(self.current, Some(c) if c != '\n') {
                    self.advance();
                }
            } else if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Maximal alphanumeric run starting at an alphabetic character.
    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.current {
            if !c.is_ascii_alphanumeric() {
                break;
            }
            name.push(c);
            self.advance();
        }
        name
    }

    /// Maximal digit run, saturating on absurd literals.
    fn read_number(&mut self) -> u32 {
        let mut value: u32 = 0;
        while let Some(digit) = self.current.and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(digit);
            self.advance();
        }
        value
    }

    fn take(&mut self, kind: SymbolKind) -> SymbolKind {
        self.advance();
        kind
    }
}
