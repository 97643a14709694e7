//! Syntax errors produced while tokenizing or parsing Turtle.

use std::ops::Range;

/// A recoverable syntax problem at a byte span.
///
/// The parser never aborts on these; they are collected and turned into
/// editor diagnostics while parsing continues after the broken statement.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at byte {}", .span.start)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub span: Range<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxErrorKind {
    #[error("unterminated IRI")]
    UnterminatedIri,
    #[error("invalid character {0:?} in IRI")]
    InvalidIriChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence {0:?}")]
    InvalidEscape(String),
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },
    #[error("expected {0}, found end of input")]
    UnexpectedEof(String),
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// Whether this error stopped tokenization. Everything after the error
    /// span is unreadable, so the lexer gives up there.
    pub fn is_fatal(&self) -> bool {
        self.kind == SyntaxErrorKind::UnterminatedString
    }
}
