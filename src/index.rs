//! Resolved triples, IRI occurrences and the prefLabel index of a document.
//!
//! Everything here is rebuilt from scratch on each parse. A
//! [`DocumentAnalysis`] is immutable once built; the workspace swaps whole
//! analyses behind an `Arc`, so readers never see a half-built index.

use std::collections::HashMap;
use std::ops::Range;

use itertools::Itertools;
use tower_lsp::lsp_types::Url;
use tracing::debug;

use crate::iri::{resolve, PrefixMap, ResolveError, SKOS_PREF_LABEL};
use crate::turtle::{self, LiteralRef, Node, Role, SyntaxError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Literal {
    pub lexical: String,
    pub language: Option<String>,
    pub datatype: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    Iri(String),
    Literal(Literal),
}

/// A triple with absolute IRIs. Statements involving blank nodes are not
/// represented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Object,
    pub span: Range<usize>,
}

/// Where an IRI was written in the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IriOccurrence {
    pub iri: String,
    pub span: Range<usize>,
    pub role: Role,
}

impl IriOccurrence {
    /// Whether `offset` touches the occurrence, its end included.
    pub fn contains(&self, offset: usize) -> bool {
        self.span.start <= offset && offset <= self.span.end
    }
}

/// A prefLabel that lost to an earlier one for the same subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateLabel {
    pub iri: String,
    pub label: String,
    pub span: Range<usize>,
}

/// `subject -> prefLabel` pairs of `triples`, in order, duplicates included.
pub fn extract_labels<'a>(
    triples: impl IntoIterator<Item = &'a Triple>,
) -> impl Iterator<Item = (&'a Triple, &'a str)> {
    triples
        .into_iter()
        .filter(|triple| triple.predicate == SKOS_PREF_LABEL)
        .filter_map(|triple| match &triple.object {
            Object::Literal(literal) => Some((triple, literal.lexical.as_str())),
            Object::Iri(_) => None,
        })
}

/// Subject IRI to its first prefLabel in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelIndex {
    labels: HashMap<String, String>,
    duplicates: Vec<DuplicateLabel>,
}

impl LabelIndex {
    pub fn build(triples: &[Triple]) -> Self {
        let mut index = LabelIndex::default();
        for (triple, label) in extract_labels(triples) {
            if index.labels.contains_key(&triple.subject) {
                index.duplicates.push(DuplicateLabel {
                    iri: triple.subject.clone(),
                    label: label.to_string(),
                    span: triple.span.clone(),
                });
            } else {
                index
                    .labels
                    .insert(triple.subject.clone(), label.to_string());
            }
        }
        index
    }

    pub fn get(&self, iri: &str) -> Option<&str> {
        self.labels.get(iri).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels
            .iter()
            .map(|(iri, label)| (iri.as_str(), label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn duplicates(&self) -> &[DuplicateLabel] {
        &self.duplicates
    }
}

/// An IRI that could not be expanded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedIri {
    pub span: Range<usize>,
    pub error: ResolveError,
}

/// Everything derived from one version of a document's text.
#[derive(Clone, Debug)]
pub struct DocumentAnalysis {
    pub prefixes: PrefixMap,
    pub triples: Vec<Triple>,
    /// Sorted by start offset.
    pub occurrences: Vec<IriOccurrence>,
    pub index: LabelIndex,
    pub syntax_errors: Vec<SyntaxError>,
    pub unresolved: Vec<UnresolvedIri>,
}

impl DocumentAnalysis {
    pub fn analyze(text: &str, uri: &Url) -> Self {
        let parsed = turtle::parse(text);
        let (prefixes, directive_errors) = PrefixMap::build(&parsed.directives, uri);

        let mut unresolved: Vec<UnresolvedIri> = directive_errors
            .into_iter()
            .map(|(span, error)| UnresolvedIri { span, error })
            .collect();
        let mut occurrences = Vec::with_capacity(parsed.mentions.len());
        for mention in &parsed.mentions {
            if mention.role == Role::Namespace {
                continue;
            }
            match resolve(&mention.iri, &prefixes) {
                Ok(iri) => occurrences.push(IriOccurrence {
                    iri,
                    span: mention.iri.span.clone(),
                    role: mention.role,
                }),
                Err(error) => unresolved.push(UnresolvedIri {
                    span: mention.iri.span.clone(),
                    error,
                }),
            }
        }
        occurrences.sort_by_key(|o| o.span.start);
        unresolved.sort_by_key(|u| u.span.start);

        let triples: Vec<Triple> = parsed
            .triples
            .iter()
            .filter_map(|raw| lower_triple(raw, &prefixes))
            .collect();
        let index = LabelIndex::build(&triples);

        debug!(
            %uri,
            iris = occurrences.iter().map(|o| &o.iri).unique().count(),
            labels = index.len(),
            errors = parsed.errors.len(),
            "indexed document"
        );

        Self {
            prefixes,
            triples,
            occurrences,
            index,
            syntax_errors: parsed.errors,
            unresolved,
        }
    }

    /// Innermost occurrence touching `offset`.
    pub fn occurrence_at(&self, offset: usize) -> Option<&IriOccurrence> {
        self.occurrences
            .iter()
            .filter(|o| o.contains(offset))
            .min_by_key(|o| o.span.len())
    }

    /// Occurrences overlapping the byte range, in document order.
    pub fn occurrences_in(&self, range: Range<usize>) -> impl Iterator<Item = &IriOccurrence> {
        self.occurrences
            .iter()
            .filter(move |o| o.span.start <= range.end && o.span.end >= range.start)
    }

    /// Each distinct subject IRI with the span of its first subject position.
    ///
    /// Read from the occurrences rather than the triples, so a subject whose
    /// statements only point at blank nodes or unresolvable IRIs still counts.
    pub fn subjects(&self) -> impl Iterator<Item = (&str, Range<usize>)> {
        self.occurrences
            .iter()
            .filter(|o| o.role == Role::Subject)
            .map(|o| (o.iri.as_str(), o.span.clone()))
            .unique_by(|(iri, _)| *iri)
    }

    /// Distinct IRIs of the document without a label of their own.
    pub fn unlabeled_iris(&self) -> impl Iterator<Item = &str> {
        self.occurrences
            .iter()
            .map(|o| o.iri.as_str())
            .unique()
            .filter(|iri| self.index.get(iri).is_none())
    }
}

fn lower_triple(raw: &turtle::RawTriple, prefixes: &PrefixMap) -> Option<Triple> {
    let Node::Iri(subject) = &raw.subject else {
        return None;
    };
    let object = match &raw.object {
        Node::Iri(object) => Object::Iri(resolve(object, prefixes).ok()?),
        Node::Literal(literal) => Object::Literal(lower_literal(literal, prefixes)),
        Node::Blank(_) => return None,
    };
    Some(Triple {
        subject: resolve(subject, prefixes).ok()?,
        predicate: resolve(&raw.predicate, prefixes).ok()?,
        object,
        span: raw.span(),
    })
}

fn lower_literal(literal: &LiteralRef, prefixes: &PrefixMap) -> Literal {
    Literal {
        lexical: literal.lexical.clone(),
        language: literal.language.clone(),
        datatype: literal
            .datatype
            .as_ref()
            .and_then(|datatype| resolve(datatype, prefixes).ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKOS: &str = "@prefix skos: <http://www.w3.org/2004/02/skos/core#> .\n";

    fn analyze(body: &str) -> DocumentAnalysis {
        let uri = Url::parse("file:///tmp/test.ttl").unwrap();
        DocumentAnalysis::analyze(&format!("{}{}", SKOS, body), &uri)
    }

    #[test]
    fn indexes_pref_labels() {
        let analysis =
            analyze("<urn:uuid:1> skos:prefLabel \"Alice\" .\n<urn:uuid:2> a <urn:uuid:1> .");
        assert_eq!(analysis.index.get("urn:uuid:1"), Some("Alice"));
        assert_eq!(analysis.index.get("urn:uuid:2"), None);
        assert_eq!(analysis.index.len(), 1);
    }

    #[test]
    fn first_label_wins_and_duplicates_are_noted() {
        let analysis = analyze(
            "<urn:a> skos:prefLabel \"One\" .\n<urn:a> skos:prefLabel \"Two\"@en .",
        );
        assert_eq!(analysis.index.get("urn:a"), Some("One"));
        assert_eq!(analysis.index.duplicates().len(), 1);
        assert_eq!(analysis.index.duplicates()[0].label, "Two");
    }

    #[test]
    fn iri_objects_of_pref_label_are_ignored() {
        let analysis = analyze("<urn:a> skos:prefLabel <urn:b> .");
        assert!(analysis.index.is_empty());
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let analysis = analyze(
            "<urn:a> skos:prefLabel \"A\" ; skos:prefLabel \"B\" .\n<urn:c> skos:prefLabel \"C\" .",
        );
        assert_eq!(LabelIndex::build(&analysis.triples), analysis.index);
        assert_eq!(
            LabelIndex::build(&analysis.triples),
            LabelIndex::build(&analysis.triples)
        );
    }

    #[test]
    fn blank_node_statements_keep_inner_occurrences() {
        let analysis =
            analyze("<urn:a> <urn:p> [ skos:prefLabel \"anon\" ; <urn:q> <urn:inner> ] .");
        assert!(analysis.index.is_empty());
        assert!(analysis.occurrences.iter().any(|o| o.iri == "urn:inner"));
        assert!(analysis.triples.iter().all(|t| t.subject == "urn:a"));
    }

    #[test]
    fn subjects_include_statements_without_triples() {
        let analysis = analyze(
            "<urn:a> <urn:p> [ <urn:q> \"x\" ] .\n<urn:b> <urn:p> ( <urn:c> ) .\n\
             <urn:d> <urn:p> _:x .\n<urn:e> <urn:p> nope:f .\n<urn:a> <urn:p> <urn:g> .",
        );
        let subjects: Vec<&str> = analysis.subjects().map(|(iri, _)| iri).collect();
        assert_eq!(subjects, vec!["urn:a", "urn:b", "urn:d", "urn:e"]);

        let (_, first_a) = analysis.subjects().next().unwrap();
        assert_eq!(first_a, SKOS.len()..SKOS.len() + 7);
    }

    #[test]
    fn unknown_prefix_is_recorded_and_excluded() {
        let analysis = analyze("nope:x skos:prefLabel \"X\" .");
        assert!(analysis.index.is_empty());
        assert_eq!(analysis.unresolved.len(), 1);
        assert_eq!(
            analysis.unresolved[0].error,
            ResolveError::UnknownPrefix("nope".into())
        );
    }

    #[test]
    fn occurrence_lookup_by_offset() {
        let analysis = analyze("<urn:uuid:2> a <urn:uuid:1> .");
        let base = SKOS.len();
        let hit = analysis.occurrence_at(base + 3).unwrap();
        assert_eq!(hit.iri, "urn:uuid:2");
        assert_eq!(hit.role, Role::Subject);
        // the closing `>` still counts
        assert_eq!(
            analysis.occurrence_at(base + 12).map(|o| o.iri.as_str()),
            Some("urn:uuid:2")
        );
        assert!(analysis.occurrence_at(base + 13).is_none());
    }

    #[test]
    fn distinct_subjects_in_first_position_order() {
        let analysis = analyze("<urn:b> a <urn:x> .\n<urn:a> a <urn:x> .\n<urn:b> a <urn:y> .");
        let subjects: Vec<&str> = analysis.subjects().map(|(iri, _)| iri).collect();
        assert_eq!(subjects, vec!["urn:b", "urn:a"]);
    }
}
