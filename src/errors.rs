//! Tracks and renders the syntactic and semantic errors produced while
//! parsing a definition file and building the logic network.
//!
//! A single [`ErrorBus`] is threaded through every stage that can fail.
//! Errors are collected, never thrown: the parser records a diagnostic and
//! keeps going, and the driver refuses to simulate when any were recorded.
//!
//! Two namespaces share the bus. The fixed syntax codes live in
//! [`SyntaxCodes`]; the semantic side starts with the parser-owned codes in
//! [`SemanticCodes`] and grows as [`Devices`], [`Network`] and [`Monitors`]
//! register their own codes and messages at construction time.
//!
//! [`Devices`]: crate::device::Devices
//! [`Network`]: crate::network::Network
//! [`Monitors`]: crate::monitor::Monitors

use std::collections::HashMap;
use std::fmt::Write;

use crate::names::{ErrorCode, NameTable};

/// A single recorded diagnostic: what went wrong and where.
#[derive(Clone, Debug)]
pub struct ErrorRecord {
    pub code: ErrorCode,
    /// 1-based line number of the offending source line.
    pub line_number: usize,
    /// The offending line, without its terminator.
    pub line: String,
    /// 0-based column of the offending token; `None` suppresses the caret.
    pub column: Option<usize>,
}

/// Error codes for malformed tokens and missing punctuation or keywords.
pub struct SyntaxCodes {
    pub missing_semicolon: ErrorCode,
    pub missing_equals: ErrorCode,
    pub missing_port: ErrorCode,
    pub missing_open_paren: ErrorCode,
    pub missing_close_paren: ErrorCode,
    pub missing_close_bracket: ErrorCode,
    pub missing_to: ErrorCode,
    pub missing_in: ErrorCode,
    pub missing_connection: ErrorCode,
    pub missing_period: ErrorCode,
    pub not_name: ErrorCode,
    pub not_number: ErrorCode,
    pub not_binary_digit: ErrorCode,
    pub reserved_name: ErrorCode,
    pub missing_keyword: ErrorCode,
    pub missing_out: ErrorCode,
    pub missing_comma: ErrorCode,
    pub missing_open_brace: ErrorCode,
    pub missing_close_brace: ErrorCode,
    pub invalid_circuit_keyword: ErrorCode,
    pub empty_file: ErrorCode,
}

/// Semantic codes owned by the parser itself. Device-, network- and
/// monitor-level codes are registered by their components.
pub struct SemanticCodes {
    pub invalid_pins: ErrorCode,
    pub loop_index_bad_order: ErrorCode,
}

/// Accumulates diagnostics with source locations and renders them.
pub struct ErrorBus {
    pub syntax: SyntaxCodes,
    pub semantic: SemanticCodes,
    syntax_messages: HashMap<ErrorCode, String>,
    semantic_messages: HashMap<ErrorCode, String>,
    errors: Vec<ErrorRecord>,
    syntax_error_count: usize,
}

impl ErrorBus {
    pub fn new(names: &mut NameTable) -> Self {
        let mut codes = names.reserve_error_codes(21);
        let mut next = || codes.next().expect("error code range exhausted");
        let syntax = SyntaxCodes {
            missing_semicolon: next(),
            missing_equals: next(),
            missing_port: next(),
            missing_open_paren: next(),
            missing_close_paren: next(),
            missing_close_bracket: next(),
            missing_to: next(),
            missing_in: next(),
            missing_connection: next(),
            missing_period: next(),
            not_name: next(),
            not_number: next(),
            not_binary_digit: next(),
            reserved_name: next(),
            missing_keyword: next(),
            missing_out: next(),
            missing_comma: next(),
            missing_open_brace: next(),
            missing_close_brace: next(),
            invalid_circuit_keyword: next(),
            empty_file: next(),
        };
        let syntax_messages = [
            (syntax.missing_semicolon, "Missing comma or semicolon"),
            (syntax.missing_equals, "Missing equals"),
            (syntax.missing_port, "Missing port"),
            (syntax.missing_open_paren, "Missing open parenthesis"),
            (syntax.missing_close_paren, "Missing close parenthesis"),
            (syntax.missing_close_bracket, "Missing close square bracket"),
            (syntax.missing_to, "Missing TO"),
            (syntax.missing_in, "Missing IN"),
            (syntax.missing_connection, "Missing -> connection"),
            (syntax.missing_period, "Missing clock PERIOD"),
            (
                syntax.not_name,
                "Expected a name, must be alphanumeric and begin with an alphabet",
            ),
            (syntax.not_number, "Expected a number"),
            (syntax.not_binary_digit, "Expected a binary digit 0 or 1"),
            (
                syntax.reserved_name,
                "This cannot be used as a name since it is a keyword",
            ),
            (
                syntax.missing_keyword,
                "Expected a keyword such as NAND, MONITOR etc",
            ),
            (syntax.missing_out, "Missing OUT"),
            (syntax.missing_comma, "Missing \",\" COMMA"),
            (syntax.missing_open_brace, "Missing open curly bracket"),
            (syntax.missing_close_brace, "Missing close curly bracket"),
            (
                syntax.invalid_circuit_keyword,
                "Can only create gates and connections in a circuit",
            ),
            (syntax.empty_file, "The definition file must not be empty"),
        ]
        .into_iter()
        .map(|(code, msg)| (code, msg.to_string()))
        .collect();

        let mut codes = names.reserve_error_codes(2);
        let mut next = || codes.next().expect("error code range exhausted");
        let semantic = SemanticCodes {
            invalid_pins: next(),
            loop_index_bad_order: next(),
        };
        let semantic_messages = [
            (
                semantic.invalid_pins,
                "Device must have inputs between 1 and 16",
            ),
            (semantic.loop_index_bad_order, "Need loop index1 <= index2"),
        ]
        .into_iter()
        .map(|(code, msg)| (code, msg.to_string()))
        .collect();

        Self {
            syntax,
            semantic,
            syntax_messages,
            semantic_messages,
            errors: Vec::new(),
            syntax_error_count: 0,
        }
    }

    /// Registers semantic codes contributed by another component.
    pub fn define_semantic_messages<I, S>(&mut self, messages: I)
    where
        I: IntoIterator<Item = (ErrorCode, S)>,
        S: Into<String>,
    {
        self.semantic_messages
            .extend(messages.into_iter().map(|(code, msg)| (code, msg.into())));
    }

    /// Records an error and the details of its location.
    ///
    /// The column is recorded exactly as given: the precise position of the
    /// offending token, or `None` for errors reported after the statement has
    /// been consumed.
    pub fn add_error(
        &mut self,
        code: ErrorCode,
        line_number: usize,
        line: String,
        column: Option<usize>,
    ) {
        if self.is_syntactic(code) {
            self.syntax_error_count += 1;
        }
        self.errors.push(ErrorRecord {
            code,
            line_number,
            line,
            column,
        });
    }

    pub fn is_syntactic(&self, code: ErrorCode) -> bool {
        self.syntax_messages.contains_key(&code)
    }

    pub fn is_semantic(&self, code: ErrorCode) -> bool {
        self.semantic_messages.contains_key(&code)
    }

    /// The message registered for `code`, if any.
    pub fn message(&self, code: ErrorCode) -> Option<&str> {
        self.syntax_messages
            .get(&code)
            .or_else(|| self.semantic_messages.get(&code))
            .map(String::as_str)
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn syntax_error_count(&self) -> usize {
        self.syntax_error_count
    }

    /// Renders every recorded error in reading order.
    pub fn display(&self) -> String {
        let mut out = format!("{} errors detected:\n", self.errors.len());
        for error in &self.errors {
            out.push_str("ERROR: ");
            out.push_str(&self.build_error(error));
        }
        out
    }

    fn build_error(&self, error: &ErrorRecord) -> String {
        let kind = if self.is_syntactic(error.code) {
            "Syntax"
        } else {
            "Semantic"
        };
        let message = self.message(error.code).unwrap_or("Unknown error");
        let mut out = String::new();
        let _ = writeln!(out, "{} Error on line {}:", kind, error.line_number);
        let _ = writeln!(out, "{}", error.line.trim_end_matches('\n'));
        if let Some(column) = error.column {
            let _ = writeln!(out, "{}^", " ".repeat(column));
        }
        let _ = writeln!(out, "{}", message);
        out
    }
}
