//! Hand-written Turtle lexer.
//!
//! Works directly on the source string and records byte spans for every
//! token. An unterminated string stops tokenization, since everything after
//! it is ambiguous. Other problems are recorded and lexing continues so the
//! rest of a document being edited stays usable.

use super::chars::{
    is_delimiter, is_iri_char, is_local_escape, is_pn_chars, is_pn_chars_base, is_pn_chars_u,
    is_ws,
};
use super::error::{SyntaxError, SyntaxErrorKind};
use super::token::{Token, TokenKind};

/// Output of a lexer run.
#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    /// Recorded problems, in source order. At most one is fatal and, if
    /// present, it is the last one.
    pub errors: Vec<SyntaxError>,
}

pub struct Lexer<'src> {
    source: &'src str,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Lexed {
        let mut tokens = Vec::new();
        loop {
            self.skip_ws_and_comments();
            let Some(ch) = self.peek() else {
                break;
            };
            let start = self.pos;
            match self.next_kind(ch) {
                Ok(kind) => tokens.push(Token::new(kind, start..self.pos)),
                Err(err) => {
                    self.errors.push(err);
                    break;
                }
            }
        }
        Lexed {
            tokens,
            errors: self.errors,
        }
    }

    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(is_ws) {
                self.bump();
            }
            if self.peek() == Some('#') {
                while self.peek().is_some_and(|c| c != '\n' && c != '\r') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn next_kind(&mut self, ch: char) -> Result<TokenKind, SyntaxError> {
        let kind = match ch {
            '<' => return self.scan_iri(),
            '"' | '\'' => return self.scan_string(ch),
            '@' => self.scan_at_word(),
            '_' if self.peek_nth(1) == Some(':') => self.scan_blank_node_label(),
            '[' => {
                self.bump();
                let after_bracket = self.pos;
                while self.peek().is_some_and(is_ws) {
                    self.bump();
                }
                if self.peek() == Some(']') {
                    self.bump();
                    TokenKind::Anon
                } else {
                    self.pos = after_bracket;
                    TokenKind::LBracket
                }
            }
            ']' => self.single(TokenKind::RBracket),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            '^' if self.peek_nth(1) == Some('^') => {
                self.bump();
                self.single(TokenKind::DoubleCaret)
            }
            '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            '.' => self.single(TokenKind::Dot),
            '0'..='9' | '+' | '-' => self.scan_number(),
            ':' => {
                let local = self.scan_pn_local_after_colon();
                TokenKind::PrefixedName {
                    prefix: String::new(),
                    local,
                }
            }
            c if is_pn_chars_base(c) => self.scan_name(),
            _ => self.scan_unknown(),
        };
        Ok(kind)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn scan_iri(&mut self) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek() {
                Some(c) if is_ws(c) || c == '<' => return Ok(self.unterminated_iri(start)),
                None => return Ok(self.unterminated_iri(start)),
                Some('>') => {
                    self.bump();
                    return Ok(TokenKind::IriRef(value));
                }
                Some('\\') => {
                    let escape_start = self.pos;
                    self.bump();
                    match self.peek() {
                        Some('u') => self.push_unicode_escape(&mut value, 4, escape_start),
                        Some('U') => self.push_unicode_escape(&mut value, 8, escape_start),
                        _ => {
                            self.errors.push(SyntaxError::new(
                                SyntaxErrorKind::InvalidEscape("\\".to_string()),
                                escape_start..self.pos,
                            ));
                        }
                    }
                }
                Some(c) => {
                    if !is_iri_char(c) {
                        self.errors.push(SyntaxError::new(
                            SyntaxErrorKind::InvalidIriChar(c),
                            self.pos..self.pos + c.len_utf8(),
                        ));
                    }
                    value.push(c);
                    self.bump();
                }
            }
        }
    }

    /// An IRI cut short by whitespace or end of input. Lexing resumes right
    /// after the partial text, which becomes an `Unknown` token.
    fn unterminated_iri(&mut self, start: usize) -> TokenKind {
        self.errors.push(SyntaxError::new(
            SyntaxErrorKind::UnterminatedIri,
            start..self.pos,
        ));
        TokenKind::Unknown(self.source[start..self.pos].to_string())
    }

    /// Decode `\uXXXX` / `\UXXXXXXXX`; the cursor sits on the `u`/`U`.
    fn push_unicode_escape(&mut self, out: &mut String, digits: usize, escape_start: usize) {
        self.bump();
        let hex: String = self.rest().chars().take(digits).collect();
        let decoded = (hex.len() == digits && hex.chars().all(|c| c.is_ascii_hexdigit()))
            .then(|| u32::from_str_radix(&hex, 16).ok())
            .flatten()
            .and_then(char::from_u32);
        match decoded {
            Some(c) => {
                self.pos += hex.len();
                out.push(c);
            }
            None => {
                self.errors.push(SyntaxError::new(
                    SyntaxErrorKind::InvalidEscape(self.source[escape_start..self.pos].to_string()),
                    escape_start..self.pos,
                ));
            }
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<TokenKind, SyntaxError> {
        let start = self.pos;
        let triple: String = std::iter::repeat(quote).take(3).collect();
        let long = self.rest().starts_with(&triple);
        self.pos += if long { 3 } else { 1 };

        let mut value = String::new();
        loop {
            if long && self.rest().starts_with(&triple) {
                self.pos += 3;
                return Ok(TokenKind::String(value));
            }
            match self.peek() {
                None => {
                    return Err(SyntaxError::new(
                        SyntaxErrorKind::UnterminatedString,
                        start..self.pos,
                    ));
                }
                Some('\n') | Some('\r') if !long => {
                    return Err(SyntaxError::new(
                        SyntaxErrorKind::UnterminatedString,
                        start..self.pos,
                    ));
                }
                Some(c) if c == quote && !long => {
                    self.bump();
                    return Ok(TokenKind::String(value));
                }
                Some('\\') => self.scan_string_escape(&mut value),
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
            }
        }
    }

    fn scan_string_escape(&mut self, out: &mut String) {
        let escape_start = self.pos;
        self.bump();
        let simple = match self.peek() {
            Some('t') => Some('\t'),
            Some('b') => Some('\u{0008}'),
            Some('n') => Some('\n'),
            Some('r') => Some('\r'),
            Some('f') => Some('\u{000C}'),
            Some('"') => Some('"'),
            Some('\'') => Some('\''),
            Some('\\') => Some('\\'),
            Some('u') => return self.push_unicode_escape(out, 4, escape_start),
            Some('U') => return self.push_unicode_escape(out, 8, escape_start),
            _ => None,
        };
        match simple {
            Some(c) => {
                self.bump();
                out.push(c);
            }
            None => {
                self.errors.push(SyntaxError::new(
                    SyntaxErrorKind::InvalidEscape("\\".to_string()),
                    escape_start..self.pos,
                ));
                out.push('\\');
            }
        }
    }

    fn scan_at_word(&mut self) -> TokenKind {
        self.bump();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            self.bump();
        }
        match &self.source[start..self.pos] {
            "" => TokenKind::Unknown("@".to_string()),
            "prefix" => TokenKind::Prefix { sparql: false },
            "base" => TokenKind::Base { sparql: false },
            tag => TokenKind::LangTag(tag.to_string()),
        }
    }

    fn scan_blank_node_label(&mut self) -> TokenKind {
        self.pos += 2;
        let start = self.pos;
        if self
            .peek()
            .is_some_and(|c| is_pn_chars_u(c) || c.is_ascii_digit())
        {
            self.bump();
            self.take_name_tail();
        }
        TokenKind::BlankNodeLabel(self.source[start..self.pos].to_string())
    }

    /// Consume `PN_CHARS` with inner dots; a trailing dot is left alone since
    /// it ends the statement.
    fn take_name_tail(&mut self) {
        loop {
            match self.peek() {
                Some(c) if is_pn_chars(c) => {
                    self.bump();
                }
                Some('.') if self.peek_nth(1).is_some_and(is_pn_chars) => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;
        if matches!(self.peek(), Some('+') | Some('-')) {
            self.bump();
        }
        let mut digits = self.take_digits();
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            digits += self.take_digits();
        }
        if digits == 0 {
            return self.scan_unknown_from(start);
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let exponent_digits_at = match self.peek_nth(1) {
                Some('+') | Some('-') => 2,
                _ => 1,
            };
            if self
                .peek_nth(exponent_digits_at)
                .is_some_and(|c| c.is_ascii_digit())
            {
                self.pos += exponent_digits_at;
                self.take_digits();
            }
        }
        TokenKind::Number(self.source[start..self.pos].to_string())
    }

    fn take_digits(&mut self) -> usize {
        let mut count = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            count += 1;
        }
        count
    }

    fn scan_name(&mut self) -> TokenKind {
        let start = self.pos;
        self.bump();
        self.take_name_tail();
        let word = &self.source[start..self.pos];

        if self.peek() == Some(':') {
            let local = self.scan_pn_local_after_colon();
            return TokenKind::PrefixedName {
                prefix: word.to_string(),
                local,
            };
        }

        match word {
            "a" => TokenKind::A,
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            w if w.eq_ignore_ascii_case("prefix") => TokenKind::Prefix { sparql: true },
            w if w.eq_ignore_ascii_case("base") => TokenKind::Base { sparql: true },
            _ => self.scan_unknown_from(start),
        }
    }

    /// Consume `:` and a (possibly empty) `PN_LOCAL`, returned raw with its
    /// `\` escapes and `%XX` sequences intact.
    fn scan_pn_local_after_colon(&mut self) -> String {
        self.bump();
        let start = self.pos;
        let mut first = true;
        loop {
            match self.peek() {
                Some(c)
                    if (first && (is_pn_chars_u(c) || c == ':' || c.is_ascii_digit()))
                        || (!first && (is_pn_chars(c) || c == ':')) =>
                {
                    self.bump();
                }
                Some('%')
                    if self.peek_nth(1).is_some_and(|c| c.is_ascii_hexdigit())
                        && self.peek_nth(2).is_some_and(|c| c.is_ascii_hexdigit()) =>
                {
                    self.pos += 3;
                }
                Some('\\') if self.peek_nth(1).is_some_and(is_local_escape) => {
                    self.bump();
                    self.bump();
                }
                Some('.') if !first && self.continues_local(1) => {
                    self.bump();
                }
                _ => break,
            }
            first = false;
        }
        self.source[start..self.pos].to_string()
    }

    fn continues_local(&self, offset: usize) -> bool {
        match self.peek_nth(offset) {
            Some(c) if is_pn_chars(c) || c == ':' => true,
            Some('%') | Some('\\') => true,
            Some('.') => self.continues_local(offset + 1),
            _ => false,
        }
    }

    fn scan_unknown(&mut self) -> TokenKind {
        let start = self.pos;
        self.bump();
        self.scan_unknown_from(start)
    }

    fn scan_unknown_from(&mut self, start: usize) -> TokenKind {
        while self.peek().is_some_and(|c| !is_delimiter(c)) {
            self.bump();
        }
        TokenKind::Unknown(self.source[start..self.pos].to_string())
    }
}

/// Tokenize a whole document.
pub fn tokenize(source: &str) -> Lexed {
    Lexer::new(source).tokenize()
}
