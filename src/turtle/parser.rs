//! Recursive-descent Turtle parser.
//!
//! The parser does not expand prefixed names; it records every IRI in the
//! form it was written together with its span. Expansion happens afterwards
//! in [`crate::iri`], once all directives of the document are known.
//!
//! A malformed statement produces one [`SyntaxError`]; the parser then skips
//! to the next top-level `.` and carries on. Triples completed before the
//! error are kept.

use std::ops::Range;

use super::error::{SyntaxError, SyntaxErrorKind};
use super::token::{Token, TokenKind};

/// Nesting limit for `[ ... ]` and `( ... )`.
const MAX_DEPTH: usize = 128;

type PResult<T> = Result<T, SyntaxError>;

/// How an IRI was written in the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IriForm {
    /// `<...>`, possibly relative.
    Ref(String),
    /// `prefix:local`, local still escaped.
    Prefixed { prefix: String, local: String },
    /// The `a` keyword.
    RdfType,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IriRef {
    pub form: IriForm,
    pub span: Range<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiteralRef {
    pub lexical: String,
    pub language: Option<String>,
    pub datatype: Option<IriRef>,
    pub span: Range<usize>,
}

/// A node in subject or object position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Iri(IriRef),
    Literal(LiteralRef),
    /// `_:x`, `[]`, `[ ... ]` or a collection.
    Blank(Range<usize>),
}

impl Node {
    pub fn span(&self) -> Range<usize> {
        match self {
            Node::Iri(iri) => iri.span.clone(),
            Node::Literal(lit) => lit.span.clone(),
            Node::Blank(span) => span.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawTriple {
    pub subject: Node,
    pub predicate: IriRef,
    pub object: Node,
}

impl RawTriple {
    pub fn span(&self) -> Range<usize> {
        self.subject.span().start.min(self.object.span().start)
            ..self.subject.span().end.max(self.object.span().end)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveKind {
    Prefix { name: String },
    Base,
}

/// An `@prefix`/`PREFIX` or `@base`/`BASE` directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    pub kind: DirectiveKind,
    /// The `<...>` operand, unresolved.
    pub iri: IriRef,
    pub span: Range<usize>,
}

/// Syntactic position an IRI was written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Subject,
    Predicate,
    Object,
    Datatype,
    Namespace,
}

/// One IRI as written in the source, with the position it appeared in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mention {
    pub iri: IriRef,
    pub role: Role,
}

/// Everything the parser extracted from one document.
#[derive(Clone, Debug, Default)]
pub struct ParseOutput {
    pub triples: Vec<RawTriple>,
    pub directives: Vec<Directive>,
    pub mentions: Vec<Mention>,
    pub errors: Vec<SyntaxError>,
}

pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Byte offset reported for errors at end of input.
    eof: usize,
    depth: usize,
    out: ParseOutput,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token], source_len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            eof: source_len,
            depth: 0,
            out: ParseOutput::default(),
        }
    }

    pub fn parse(mut self) -> ParseOutput {
        while self.pos < self.tokens.len() {
            let statement_start = self.pos;
            self.depth = 0;
            if let Err(err) = self.parse_statement() {
                self.out.errors.push(err);
                self.recover(statement_start);
            }
        }
        self.out
    }

    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<&'t TokenKind> {
        self.current().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn error(&self, expected: &str) -> SyntaxError {
        match self.current() {
            Some(token) => SyntaxError::new(
                SyntaxErrorKind::Unexpected {
                    expected: expected.to_string(),
                    found: token.kind.to_string(),
                },
                token.span.clone(),
            ),
            None => SyntaxError::new(
                SyntaxErrorKind::UnexpectedEof(expected.to_string()),
                self.eof..self.eof,
            ),
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> PResult<&'t Token> {
        match self.current() {
            Some(token) if &token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error(expected)),
        }
    }

    /// Skip to just past the next `.` outside brackets, or to the next
    /// directive, always making progress.
    fn recover(&mut self, statement_start: usize) {
        let mut depth = 0usize;
        if self.pos == statement_start {
            self.advance();
        }
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::Dot if depth == 0 => {
                    self.pos += 1;
                    return;
                }
                TokenKind::Prefix { .. } | TokenKind::Base { .. } if depth == 0 => return,
                TokenKind::LBracket | TokenKind::LParen => depth += 1,
                TokenKind::RBracket | TokenKind::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn parse_statement(&mut self) -> PResult<()> {
        match self.current_kind() {
            Some(TokenKind::Prefix { sparql }) => self.parse_prefix(*sparql),
            Some(TokenKind::Base { sparql }) => self.parse_base(*sparql),
            _ => self.parse_triples(),
        }
    }

    fn parse_prefix(&mut self, sparql: bool) -> PResult<()> {
        let start = self.advance().map(|t| t.span.start).unwrap_or(self.eof);

        let name = match self.current_kind() {
            Some(TokenKind::PrefixedName { prefix, local }) if local.is_empty() => prefix.clone(),
            _ => return Err(self.error("prefix name ending in ':'")),
        };
        self.pos += 1;

        let iri = self.parse_directive_iri()?;
        self.out.mentions.push(Mention {
            iri: iri.clone(),
            role: Role::Namespace,
        });
        // Recorded before the closing `.` is checked so that a declaration
        // being typed still applies to the rest of the document.
        self.out.directives.push(Directive {
            kind: DirectiveKind::Prefix { name },
            span: start..iri.span.end,
            iri,
        });
        self.finish_directive(sparql)
    }

    fn finish_directive(&mut self, sparql: bool) -> PResult<()> {
        if sparql {
            return Ok(());
        }
        let end = self.expect(&TokenKind::Dot, "'.'")?.span.end;
        if let Some(directive) = self.out.directives.last_mut() {
            directive.span.end = end;
        }
        Ok(())
    }

    fn parse_base(&mut self, sparql: bool) -> PResult<()> {
        let start = self.advance().map(|t| t.span.start).unwrap_or(self.eof);
        let iri = self.parse_directive_iri()?;
        self.out.directives.push(Directive {
            kind: DirectiveKind::Base,
            span: start..iri.span.end,
            iri,
        });
        self.finish_directive(sparql)
    }

    fn parse_directive_iri(&mut self) -> PResult<IriRef> {
        match self.current() {
            Some(Token {
                kind: TokenKind::IriRef(value),
                span,
            }) => {
                self.pos += 1;
                Ok(IriRef {
                    form: IriForm::Ref(value.clone()),
                    span: span.clone(),
                })
            }
            _ => Err(self.error("IRI in '<...>'")),
        }
    }

    fn parse_triples(&mut self) -> PResult<()> {
        match self.current_kind() {
            Some(TokenKind::LBracket) => {
                let subject = self.parse_blank_property_list()?;
                // `[ ex:p ex:o ] .` is a complete statement on its own.
                if self.current_kind() != Some(&TokenKind::Dot) {
                    self.parse_predicate_object_list(&subject)?;
                }
            }
            _ => {
                let subject = self.parse_subject()?;
                self.parse_predicate_object_list(&subject)?;
            }
        }
        self.expect(&TokenKind::Dot, "'.'")?;
        Ok(())
    }

    /// Take the current token as an IRI if it is one.
    fn take_iri(&mut self, role: Role) -> Option<IriRef> {
        let token = self.current()?;
        let form = match &token.kind {
            TokenKind::IriRef(value) => IriForm::Ref(value.clone()),
            TokenKind::PrefixedName { prefix, local } => IriForm::Prefixed {
                prefix: prefix.clone(),
                local: local.clone(),
            },
            _ => return None,
        };
        self.pos += 1;
        let iri = IriRef {
            form,
            span: token.span.clone(),
        };
        self.out.mentions.push(Mention {
            iri: iri.clone(),
            role,
        });
        Some(iri)
    }

    fn parse_subject(&mut self) -> PResult<Node> {
        if let Some(iri) = self.take_iri(Role::Subject) {
            return Ok(Node::Iri(iri));
        }
        match self.current() {
            Some(Token {
                kind: TokenKind::BlankNodeLabel(_) | TokenKind::Anon,
                span,
            }) => {
                self.pos += 1;
                Ok(Node::Blank(span.clone()))
            }
            Some(Token {
                kind: TokenKind::LParen,
                ..
            }) => self.parse_collection(),
            _ => Err(self.error("subject")),
        }
    }

    fn parse_predicate(&mut self) -> PResult<IriRef> {
        if let Some(iri) = self.take_iri(Role::Predicate) {
            return Ok(iri);
        }
        match self.current() {
            Some(Token {
                kind: TokenKind::A,
                span,
            }) => {
                self.pos += 1;
                Ok(IriRef {
                    form: IriForm::RdfType,
                    span: span.clone(),
                })
            }
            _ => Err(self.error("predicate")),
        }
    }

    fn parse_predicate_object_list(&mut self, subject: &Node) -> PResult<()> {
        loop {
            let predicate = self.parse_predicate()?;
            self.parse_object_list(subject, &predicate)?;

            if self.current_kind() != Some(&TokenKind::Semicolon) {
                return Ok(());
            }
            while self.current_kind() == Some(&TokenKind::Semicolon) {
                self.pos += 1;
            }
            // A trailing `;` may close the list.
            if matches!(
                self.current_kind(),
                None | Some(TokenKind::Dot) | Some(TokenKind::RBracket)
            ) {
                return Ok(());
            }
        }
    }

    fn parse_object_list(&mut self, subject: &Node, predicate: &IriRef) -> PResult<()> {
        loop {
            let object = self.parse_object()?;
            self.out.triples.push(RawTriple {
                subject: subject.clone(),
                predicate: predicate.clone(),
                object,
            });
            if self.current_kind() != Some(&TokenKind::Comma) {
                return Ok(());
            }
            self.pos += 1;
        }
    }

    fn parse_object(&mut self) -> PResult<Node> {
        if let Some(iri) = self.take_iri(Role::Object) {
            return Ok(Node::Iri(iri));
        }
        match self.current_kind() {
            Some(TokenKind::BlankNodeLabel(_)) | Some(TokenKind::Anon) => {
                let span = self.advance().map(|t| t.span.clone()).unwrap_or_default();
                Ok(Node::Blank(span))
            }
            Some(TokenKind::LBracket) => self.parse_blank_property_list(),
            Some(TokenKind::LParen) => self.parse_collection(),
            Some(TokenKind::String(_) | TokenKind::Number(_) | TokenKind::Boolean(_)) => {
                self.parse_literal().map(Node::Literal)
            }
            _ => Err(self.error("object")),
        }
    }

    fn parse_literal(&mut self) -> PResult<LiteralRef> {
        let Some(token) = self.advance() else {
            return Err(self.error("literal"));
        };
        let lexical = match &token.kind {
            TokenKind::String(value) => value.clone(),
            TokenKind::Number(value) => value.clone(),
            TokenKind::Boolean(value) => value.to_string(),
            _ => {
                self.pos -= 1;
                return Err(self.error("literal"));
            }
        };
        let mut literal = LiteralRef {
            lexical,
            language: None,
            datatype: None,
            span: token.span.clone(),
        };
        if !matches!(token.kind, TokenKind::String(_)) {
            return Ok(literal);
        }

        match self.current() {
            Some(Token {
                kind: TokenKind::LangTag(tag),
                span,
            }) => {
                self.pos += 1;
                literal.language = Some(tag.clone());
                literal.span.end = span.end;
            }
            Some(Token {
                kind: TokenKind::DoubleCaret,
                ..
            }) => {
                self.pos += 1;
                let datatype = self
                    .take_iri(Role::Datatype)
                    .ok_or_else(|| self.error("datatype IRI"))?;
                literal.span.end = datatype.span.end;
                literal.datatype = Some(datatype);
            }
            _ => {}
        }
        Ok(literal)
    }

    fn enter(&mut self) -> PResult<()> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("shallower nesting"));
        }
        self.depth += 1;
        Ok(())
    }

    /// `[ predicateObjectList ]`
    fn parse_blank_property_list(&mut self) -> PResult<Node> {
        self.enter()?;
        let start = self
            .expect(&TokenKind::LBracket, "'['")?
            .span
            .start;
        let placeholder = Node::Blank(start..start + 1);
        self.parse_predicate_object_list(&placeholder)?;
        let end = self.expect(&TokenKind::RBracket, "']'")?.span.end;
        self.depth -= 1;
        Ok(Node::Blank(start..end))
    }

    /// `( object* )`
    fn parse_collection(&mut self) -> PResult<Node> {
        self.enter()?;
        let start = self.expect(&TokenKind::LParen, "'('")?.span.start;
        loop {
            match self.current_kind() {
                Some(TokenKind::RParen) => break,
                None => return Err(self.error("')'")),
                _ => {
                    self.parse_object()?;
                }
            }
        }
        let end = self.expect(&TokenKind::RParen, "')'")?.span.end;
        self.depth -= 1;
        Ok(Node::Blank(start..end))
    }
}
