//! Prefix table and IRI expansion.
//!
//! Turtle lets `@prefix` and `@base` appear anywhere, so a document is read
//! in two passes: [`PrefixMap::build`] collects every directive first, then
//! [`resolve`] expands each IRI as written against the complete table.
//!
//! When a prefix is declared more than once, a use resolves against the
//! closest declaration before it. A use with no earlier declaration takes
//! the first one that follows, so `ex:Foo` means the same thing wherever the
//! single `@prefix ex:` line sits. `@base` follows the same rule.

use std::collections::HashMap;
use std::ops::Range;

use tower_lsp::lsp_types::Url;

use crate::turtle::{Directive, DirectiveKind, IriForm, IriRef};

/// The label predicate. Fixed, used identically for documents and fetched
/// descriptions.
pub const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown prefix `{0}:`")]
    UnknownPrefix(String),
    #[error("cannot resolve relative IRI <{0}>")]
    Relative(String),
}

/// One declaration and where it was made.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Declared {
    offset: usize,
    iri: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixMap {
    document: Url,
    prefixes: HashMap<String, Vec<Declared>>,
    bases: Vec<Declared>,
}

impl PrefixMap {
    /// An empty table for `document`.
    pub fn new(document: Url) -> Self {
        Self {
            document,
            prefixes: HashMap::new(),
            bases: Vec::new(),
        }
    }

    /// Collect `directives` (in source order). Directives whose IRI cannot be
    /// made absolute are skipped and returned as errors with their span.
    pub fn build(
        directives: &[Directive],
        document: &Url,
    ) -> (Self, Vec<(Range<usize>, ResolveError)>) {
        let mut map = Self::new(document.clone());
        let mut errors = Vec::new();

        // Bases first: a relative base is read against the one before it.
        for directive in directives {
            if directive.kind != DirectiveKind::Base {
                continue;
            }
            let IriForm::Ref(raw) = &directive.iri.form else {
                continue;
            };
            match map.join(raw, directive.span.start) {
                Ok(iri) => map.bases.push(Declared {
                    offset: directive.span.start,
                    iri,
                }),
                Err(err) => errors.push((directive.iri.span.clone(), err)),
            }
        }

        for directive in directives {
            let DirectiveKind::Prefix { name } = &directive.kind else {
                continue;
            };
            let IriForm::Ref(raw) = &directive.iri.form else {
                continue;
            };
            match map.join(raw, directive.span.start) {
                Ok(iri) => map.prefixes.entry(name.clone()).or_default().push(Declared {
                    offset: directive.span.start,
                    iri,
                }),
                Err(err) => errors.push((directive.iri.span.clone(), err)),
            }
        }

        (map, errors)
    }

    /// Declare `prefix` at the end of the table.
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        let declarations = self.prefixes.entry(prefix.into()).or_default();
        let offset = declarations.last().map_or(0, |d| d.offset + 1);
        declarations.push(Declared {
            offset,
            iri: namespace.into(),
        });
    }

    /// The namespace `prefix` stands for at byte `offset`.
    pub fn namespace(&self, prefix: &str, offset: usize) -> Option<&str> {
        self.prefixes
            .get(prefix)
            .and_then(|declared| effective(declared, offset))
    }

    /// The base in effect at byte `offset`, if any `@base` was declared.
    pub fn base(&self, offset: usize) -> Option<&str> {
        effective(&self.bases, offset)
    }

    /// Render `iri` as `prefix:local` when a declared namespace is a prefix of
    /// it, preferring the longest namespace; otherwise as `<iri>`.
    pub fn compact(&self, iri: &str) -> String {
        self.prefixes
            .iter()
            .flat_map(|(prefix, declared)| declared.iter().map(move |d| (prefix, d.iri.as_str())))
            .filter(|(_, namespace)| !namespace.is_empty() && iri.starts_with(namespace))
            .max_by(|(pa, a), (pb, b)| a.len().cmp(&b.len()).then_with(|| pb.cmp(pa)))
            .map(|(prefix, namespace)| format!("{}:{}", prefix, &iri[namespace.len()..]))
            .unwrap_or_else(|| format!("<{}>", iri))
    }

    /// Resolve a possibly relative reference written at `offset`.
    fn join(&self, reference: &str, offset: usize) -> Result<String, ResolveError> {
        if has_scheme(reference) {
            return Ok(reference.to_string());
        }
        let base = match self.base(offset) {
            Some(base) => {
                Url::parse(base).map_err(|_| ResolveError::Relative(reference.to_string()))?
            }
            None => self.document.clone(),
        };
        if base.cannot_be_a_base() {
            return Err(ResolveError::Relative(reference.to_string()));
        }
        base.join(reference)
            .map(String::from)
            .map_err(|_| ResolveError::Relative(reference.to_string()))
    }
}

/// Closest declaration at or before `offset`, else the first one after it.
fn effective(declared: &[Declared], offset: usize) -> Option<&str> {
    declared
        .iter()
        .rev()
        .find(|d| d.offset <= offset)
        .or_else(|| declared.first())
        .map(|d| d.iri.as_str())
}

/// `scheme ":"` per RFC 3986.
fn has_scheme(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Drop the `\` from local-name escapes (`ex:a\-b` is `a-b`); `%XX` stays.
fn unescape_local(local: &str) -> String {
    let mut out = String::with_capacity(local.len());
    let mut chars = local.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Expand an IRI as written into an absolute IRI.
pub fn resolve(term: &IriRef, prefixes: &PrefixMap) -> Result<String, ResolveError> {
    let offset = term.span.start;
    match &term.form {
        IriForm::RdfType => Ok(RDF_TYPE.to_string()),
        IriForm::Prefixed { prefix, local } => prefixes
            .namespace(prefix, offset)
            .map(|namespace| format!("{}{}", namespace, unescape_local(local)))
            .ok_or_else(|| ResolveError::UnknownPrefix(prefix.clone())),
        IriForm::Ref(reference) => prefixes.join(reference, offset),
    }
}
