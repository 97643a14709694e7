//! Labels shown inline after each IRI that has one.

use tower_lsp::lsp_types::{InlayHint, InlayHintLabel, InlayHintTooltip, Range};

use crate::config::Settings;
use crate::fetch::Fetcher;
use crate::labels;
use crate::workspace::Snapshot;

/// A hint after every IRI occurrence in `range` with a local or cached
/// external label. Never waits on the network.
pub fn inlay_hints(snapshot: &Snapshot, fetcher: &Fetcher, range: Range) -> Vec<InlayHint> {
    let document = &snapshot.document;
    let analysis = &snapshot.analysis;

    let start = document.offset(range.start).unwrap_or(document.len());
    let end = document.offset(range.end).unwrap_or(document.len());

    analysis
        .occurrences_in(start..end)
        .filter_map(|occurrence| {
            let label = labels::known(analysis, fetcher, &occurrence.iri)?.label?;
            Some(InlayHint {
                position: document.position(occurrence.span.end),
                label: InlayHintLabel::String(label),
                kind: None,
                text_edits: None,
                tooltip: Some(InlayHintTooltip::String(occurrence.iri.clone())),
                padding_left: Some(true),
                padding_right: None,
                data: None,
            })
        })
        .collect()
}

pub fn inlay_hints_response(
    snapshot: &Snapshot,
    fetcher: &Fetcher,
    range: Range,
    settings: &Settings,
) -> Option<Vec<InlayHint>> {
    if !settings.inlay_hints {
        return None;
    }
    Some(inlay_hints(snapshot, fetcher, range))
}
