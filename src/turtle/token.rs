//! Turtle token types.
//!
//! Tokens keep their byte span into the document so every IRI, literal and
//! punctuation mark can be mapped back to an exact editor range.

use std::fmt;
use std::ops::Range;

/// A token with its source span.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range into the source text.
    pub span: Range<usize>,
}

impl Token {
    pub fn new(kind: TokenKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }

    /// The exact source text of the token.
    pub fn raw<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.span.clone()).unwrap_or_default()
    }

    pub fn category(&self) -> TokenCategory {
        self.kind.category()
    }
}

/// Token kinds for Turtle.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// `<http://example.org/>`, content with `\u` escapes decoded.
    IriRef(String),
    /// `prefix:local`, `:local` or `prefix:` (empty local).
    PrefixedName { prefix: String, local: String },
    /// `_:label`
    BlankNodeLabel(String),
    /// `[]`
    Anon,

    /// String literal, unescaped content.
    String(String),
    /// Integer, decimal or double, kept lexical.
    Number(String),
    Boolean(bool),
    /// `@en`, stored without the `@`.
    LangTag(String),

    /// `@prefix` or SPARQL `PREFIX`
    Prefix { sparql: bool },
    /// `@base` or SPARQL `BASE`
    Base { sparql: bool },
    /// `a`, shorthand for `rdf:type`
    A,

    Dot,
    Comma,
    Semicolon,
    /// `^^`
    DoubleCaret,
    LBracket,
    RBracket,
    LParen,
    RParen,

    /// Text that is not a Turtle token, such as a half-typed keyword.
    Unknown(String),
}

/// Coarse classification of a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenCategory {
    IriRef,
    PrefixedName,
    Literal,
    Directive,
    Punctuation,
}

impl TokenKind {
    pub fn category(&self) -> TokenCategory {
        match self {
            TokenKind::IriRef(_) => TokenCategory::IriRef,
            TokenKind::PrefixedName { .. } => TokenCategory::PrefixedName,
            TokenKind::String(_)
            | TokenKind::Number(_)
            | TokenKind::Boolean(_)
            | TokenKind::LangTag(_) => TokenCategory::Literal,
            TokenKind::Prefix { .. } | TokenKind::Base { .. } => TokenCategory::Directive,
            // `a` and blank nodes are structural: they never produce an IRI occurrence.
            TokenKind::A
            | TokenKind::BlankNodeLabel(_)
            | TokenKind::Anon
            | TokenKind::Dot
            | TokenKind::Comma
            | TokenKind::Semicolon
            | TokenKind::DoubleCaret
            | TokenKind::LBracket
            | TokenKind::RBracket
            | TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::Unknown(_) => TokenCategory::Punctuation,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IriRef(s) => write!(f, "<{}>", s),
            TokenKind::PrefixedName { prefix, local } => write!(f, "{}:{}", prefix, local),
            TokenKind::BlankNodeLabel(s) => write!(f, "_:{}", s),
            TokenKind::Anon => write!(f, "[]"),
            TokenKind::String(s) => write!(f, "\"{}\"", s),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::Boolean(b) => write!(f, "{}", b),
            TokenKind::LangTag(s) => write!(f, "@{}", s),
            TokenKind::Prefix { sparql: false } => write!(f, "@prefix"),
            TokenKind::Prefix { sparql: true } => write!(f, "PREFIX"),
            TokenKind::Base { sparql: false } => write!(f, "@base"),
            TokenKind::Base { sparql: true } => write!(f, "BASE"),
            TokenKind::A => write!(f, "a"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::DoubleCaret => write!(f, "'^^'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Unknown(s) => write!(f, "`{}`", s),
        }
    }
}
