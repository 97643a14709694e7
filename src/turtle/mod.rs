//! Turtle tokenizer and parser.
//!
//! [`parse`] is best-effort: it always returns whatever it could read, plus
//! the syntax errors it met on the way. The output keeps IRIs exactly as
//! written (see [`IriForm`]); [`crate::iri`] expands them in a second pass.

mod chars;
mod error;
mod lexer;
mod parser;
mod token;

pub use error::{SyntaxError, SyntaxErrorKind};
pub use lexer::{tokenize, Lexed, Lexer};
pub use parser::{
    Directive, DirectiveKind, IriForm, IriRef, LiteralRef, Mention, Node, ParseOutput, Parser,
    RawTriple, Role,
};
pub use token::{Token, TokenCategory, TokenKind};

/// Tokens and statements of one document.
#[derive(Clone, Debug, Default)]
pub struct ParsedDocument {
    pub tokens: Vec<Token>,
    pub triples: Vec<RawTriple>,
    pub directives: Vec<Directive>,
    pub mentions: Vec<Mention>,
    /// Lexical and grammatical errors, sorted by position.
    pub errors: Vec<SyntaxError>,
}

pub fn parse(source: &str) -> ParsedDocument {
    let Lexed {
        tokens,
        errors: lex_errors,
    } = tokenize(source);
    let ParseOutput {
        triples,
        directives,
        mentions,
        errors: parse_errors,
    } = Parser::new(&tokens, source.len()).parse();

    let fatal_at = lex_errors
        .iter()
        .find(|e| e.is_fatal())
        .map(|e| e.span.start);

    // A lexical error already explains the grammar error it causes.
    let mut errors: Vec<SyntaxError> = parse_errors
        .into_iter()
        .filter(|p| fatal_at.map_or(true, |at| p.span.start < at))
        .filter(|p| !lex_errors.iter().any(|l| overlaps(&l.span, &p.span)))
        .chain(lex_errors.iter().cloned())
        .collect();
    errors.sort_by_key(|e| e.span.start);

    ParsedDocument {
        tokens,
        triples,
        directives,
        mentions,
        errors,
    }
}

fn overlaps(a: &std::ops::Range<usize>, b: &std::ops::Range<usize>) -> bool {
    a.start < b.end.max(b.start + 1) && b.start < a.end.max(a.start + 1)
}
