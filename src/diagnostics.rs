use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity};

use crate::{
    config::Settings,
    fetch::Fetcher,
    index::DocumentAnalysis,
    iri::ResolveError,
    labels,
    workspace::Snapshot,
};

const SOURCE: &str = "skoslens";

/// One hint per distinct subject IRI that has neither a label in the
/// document nor a cached external one, at its first subject position.
pub fn unlabeled(snapshot: &Snapshot, fetcher: &Fetcher) -> Vec<Diagnostic> {
    let analysis = &snapshot.analysis;
    analysis
        .subjects()
        .filter(|(iri, _)| !has_label(analysis, fetcher, iri))
        .map(|(iri, span)| Diagnostic {
            range: snapshot.document.range(span),
            message: format!(
                "no prefLabel available for {}",
                analysis.prefixes.compact(iri)
            ),
            source: Some(SOURCE.into()),
            severity: Some(DiagnosticSeverity::HINT),
            ..Default::default()
        })
        .collect()
}

fn has_label(analysis: &DocumentAnalysis, fetcher: &Fetcher, iri: &str) -> bool {
    labels::known(analysis, fetcher, iri).is_some_and(|entry| entry.is_resolved())
}

/// Syntax errors, unresolvable IRIs and duplicate labels.
pub fn problems(snapshot: &Snapshot) -> Vec<Diagnostic> {
    let analysis = &snapshot.analysis;
    let document = &snapshot.document;

    let syntax = analysis.syntax_errors.iter().map(|err| Diagnostic {
        range: document.range(err.span.clone()),
        message: err.kind.to_string(),
        source: Some(SOURCE.into()),
        severity: Some(DiagnosticSeverity::ERROR),
        ..Default::default()
    });

    let unresolved = analysis.unresolved.iter().map(|unresolved| Diagnostic {
        range: document.range(unresolved.span.clone()),
        message: match &unresolved.error {
            ResolveError::UnknownPrefix(prefix) => format!("undeclared prefix `{}:`", prefix),
            err => err.to_string(),
        },
        source: Some(SOURCE.into()),
        severity: Some(DiagnosticSeverity::WARNING),
        ..Default::default()
    });

    let duplicates = analysis.index.duplicates().iter().map(|duplicate| Diagnostic {
        range: document.range(duplicate.span.clone()),
        message: format!(
            "{} already has a prefLabel; \"{}\" is ignored",
            analysis.prefixes.compact(&duplicate.iri),
            duplicate.label
        ),
        source: Some(SOURCE.into()),
        severity: Some(DiagnosticSeverity::INFORMATION),
        ..Default::default()
    });

    syntax.chain(unresolved).chain(duplicates).collect()
}

/// Everything published for a document.
pub fn diagnostics(
    snapshot: &Snapshot,
    fetcher: &Fetcher,
    settings: &Settings,
) -> Vec<Diagnostic> {
    let mut diags = problems(snapshot);
    if settings.unlabeled_diagnostics {
        diags.extend(unlabeled(snapshot, fetcher));
    }
    diags
}
