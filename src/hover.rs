//! Hover provider.
//!
//! Hovering an IRI shows its prefLabel and the IRI itself, compacted with
//! the document's prefixes when possible:
//!
//! ```text
//! **prefLabel:** Alice
//!
//! `ex:alice`
//! ```
//!
//! # Configuration
//!
//! Hover can be disabled via [`Settings::hover`]:
//!
//! ```toml
//! hover = false
//! ```

use std::time::Duration;

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Range};

use crate::config::Settings;
use crate::fetch::Fetcher;
use crate::labels::{self, LabelSource};
use crate::workspace::Snapshot;

/// What a hover shows for one IRI occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelHover {
    /// Absolute IRI.
    pub iri: String,
    /// `prefix:local` or `<iri>`.
    pub display: String,
    pub label: Option<String>,
    pub source: LabelSource,
    pub range: Range,
}

impl LabelHover {
    pub fn markdown(&self) -> String {
        match &self.label {
            Some(label) => format!("**prefLabel:** {}\n\n`{}`", label, self.display),
            None => format!("_no label available_\n\n`{}`", self.display),
        }
    }
}

impl From<LabelHover> for Hover {
    fn from(hover: LabelHover) -> Self {
        Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: hover.markdown(),
            }),
            range: Some(hover.range),
        }
    }
}

/// Label of the innermost IRI at `position`, waiting at most `timeout` for
/// an external lookup. `None` when the position is not on an IRI.
pub async fn hover(
    snapshot: &Snapshot,
    fetcher: &Fetcher,
    position: Position,
    timeout: Duration,
) -> Option<LabelHover> {
    let document = &snapshot.document;
    let analysis = &snapshot.analysis;

    let offset = document.offset(position)?;
    let occurrence = analysis.occurrence_at(offset)?;
    let entry = labels::lookup(analysis, fetcher, &occurrence.iri, timeout).await;

    Some(LabelHover {
        display: analysis.prefixes.compact(&occurrence.iri),
        iri: occurrence.iri.clone(),
        label: entry.label,
        source: entry.source,
        range: document.range(occurrence.span.clone()),
    })
}

/// The `textDocument/hover` answer, honouring [`Settings::hover`].
pub async fn hover_response(
    snapshot: &Snapshot,
    fetcher: &Fetcher,
    position: Position,
    settings: &Settings,
) -> Option<Hover> {
    if !settings.hover {
        return None;
    }
    hover(snapshot, fetcher, position, settings.hover_timeout())
        .await
        .map(Hover::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::test_utils::{open_document, stub_fetcher, StubSource, SKOS_PREFIX};

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn local_label_and_missing_label() {
        let (_ws, snapshot) = open_document(&format!(
            "{}<urn:uuid:1> skos:prefLabel \"Alice\" .\n<urn:uuid:2> a <urn:uuid:1> .",
            SKOS_PREFIX
        ));
        let fetcher = Fetcher::disabled();

        let alice = hover(&snapshot, &fetcher, Position::new(1, 4), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(alice.label.as_deref(), Some("Alice"));
        assert_eq!(alice.source, LabelSource::Local);
        assert_eq!(alice.range, Range::new(Position::new(1, 0), Position::new(1, 12)));

        let typed = hover(&snapshot, &fetcher, Position::new(2, 20), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(typed.iri, "urn:uuid:1");
        assert_eq!(typed.label.as_deref(), Some("Alice"));

        let bob = hover(&snapshot, &fetcher, Position::new(2, 3), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(bob.label, None);
        assert_eq!(bob.markdown(), "_no label available_\n\n`<urn:uuid:2>`");
    }

    #[tokio::test]
    async fn nothing_outside_iris() {
        let (_ws, snapshot) = open_document("<urn:a> a <urn:b> .\n\n# comment");
        let fetcher = Fetcher::disabled();
        assert!(hover(&snapshot, &fetcher, Position::new(0, 8), TIMEOUT).await.is_none());
        assert!(hover(&snapshot, &fetcher, Position::new(2, 3), TIMEOUT).await.is_none());
        assert!(hover(&snapshot, &fetcher, Position::new(9, 0), TIMEOUT).await.is_none());
    }

    #[tokio::test]
    async fn external_label_with_compact_display() {
        let source = Arc::new(StubSource::new().with_document(
            "http://ex/",
            "<http://ex/42> <http://www.w3.org/2004/02/skos/core#prefLabel> \"Answer\" .",
        ));
        let (_ws, snapshot) = open_document("@prefix ex: <http://ex/> .\nex:42 a ex:Thing .");
        let fetcher = stub_fetcher(source);

        let hovered = hover(&snapshot, &fetcher, Position::new(1, 1), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(hovered.source, LabelSource::External);
        assert_eq!(hovered.markdown(), "**prefLabel:** Answer\n\n`ex:42`");
    }

    #[tokio::test]
    async fn disabled_by_settings() {
        let (_ws, snapshot) = open_document("<urn:a> a <urn:b> .");
        let settings = Settings {
            hover: false,
            ..Default::default()
        };
        let response =
            hover_response(&snapshot, &Fetcher::disabled(), Position::new(0, 2), &settings).await;
        assert!(response.is_none());
    }
}
