//! Editor-level scenarios: open, edit, hover and hint a Turtle document
//! with a stubbed network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tower_lsp::lsp_types::{
    InlayHintLabel, Position, Range, TextDocumentContentChangeEvent, Url,
};

use skoslens::diagnostics::unlabeled;
use skoslens::fetch::{FetchCache, FetchError, Fetcher, NamespaceSource, DEFAULT_TTL};
use skoslens::hover::hover;
use skoslens::index::DocumentAnalysis;
use skoslens::inlay_hints::inlay_hints;
use skoslens::labels::LabelSource;
use skoslens::workspace::Workspace;

const SKOS: &str = "@prefix skos: <http://www.w3.org/2004/02/skos/core#> .\n";
const TIMEOUT: Duration = Duration::from_secs(2);

/// Serves fixed bodies by URL and counts requests.
#[derive(Default)]
struct Namespaces {
    bodies: HashMap<String, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl Namespaces {
    fn serving(url: &str, body: &str) -> Self {
        Self {
            bodies: HashMap::from([(url.to_string(), body.to_string())]),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NamespaceSource for Namespaces {
    async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut url = url.clone();
        url.set_fragment(None);
        self.bodies
            .get(url.as_str())
            .cloned()
            .ok_or(FetchError::Status(404))
    }
}

fn fetcher(source: Arc<Namespaces>) -> Fetcher {
    Fetcher::new(Arc::new(FetchCache::new(DEFAULT_TTL)), source)
}

fn uri() -> Url {
    Url::parse("file:///project/people.ttl").unwrap()
}

fn whole_document() -> Range {
    Range::new(Position::new(0, 0), Position::new(100, 0))
}

fn hint_labels(hints: &[tower_lsp::lsp_types::InlayHint]) -> Vec<(Position, String)> {
    hints
        .iter()
        .filter_map(|hint| match &hint.label {
            InlayHintLabel::String(label) => Some((hint.position, label.clone())),
            InlayHintLabel::LabelParts(_) => None,
        })
        .collect()
}

#[tokio::test]
async fn hover_and_hints_on_a_fresh_document() {
    let workspace = Workspace::new();
    let snapshot = workspace.open(
        uri(),
        &format!("{SKOS}<urn:uuid:1> skos:prefLabel \"Alice\" .\n<urn:uuid:2> a <urn:uuid:1> ."),
        1,
    );
    let fetcher = Fetcher::disabled();

    let on_two = hover(&snapshot, &fetcher, Position::new(2, 3), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(on_two.iri, "urn:uuid:2");
    assert_eq!(on_two.label, None);
    assert_eq!(on_two.source, LabelSource::Unresolved);

    let on_one = hover(&snapshot, &fetcher, Position::new(1, 3), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(on_one.label.as_deref(), Some("Alice"));
    assert!(on_one.markdown().starts_with("**prefLabel:** Alice"));

    let hints = unlabeled(&snapshot, &fetcher);
    assert_eq!(hints.len(), 1);
    assert_eq!(
        hints[0].range,
        Range::new(Position::new(2, 0), Position::new(2, 12))
    );
}

#[tokio::test]
async fn labelling_a_subject_clears_its_hint() {
    let workspace = Workspace::new();
    workspace.open(
        uri(),
        &format!("{SKOS}<urn:uuid:1> skos:prefLabel \"Alice\" .\n<urn:uuid:2> a <urn:uuid:1> ."),
        1,
    );
    let fetcher = Fetcher::disabled();

    let snapshot = workspace
        .change(
            &uri(),
            2,
            &[TextDocumentContentChangeEvent {
                range: Some(Range::new(Position::new(2, 29), Position::new(2, 29))),
                range_length: None,
                text: "\n<urn:uuid:2> skos:prefLabel \"Bob\" .".to_string(),
            }],
        )
        .unwrap();

    assert_eq!(snapshot.version(), 2);
    assert!(unlabeled(&snapshot, &fetcher).is_empty());
    let labels = hint_labels(&inlay_hints(&snapshot, &fetcher, whole_document()));
    assert!(labels.contains(&(Position::new(3, 12), "Bob".to_string())));
    assert!(labels.contains(&(Position::new(2, 27), "Alice".to_string())));
}

#[test]
fn stale_edits_are_ignored() {
    let workspace = Workspace::new();
    workspace.open(uri(), "<urn:a> a <urn:b> .", 3);

    let stale = workspace.change(
        &uri(),
        2,
        &[TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: String::new(),
        }],
    );

    assert!(stale.is_err());
    assert_eq!(workspace.snapshot(&uri()).unwrap().document.text(), "<urn:a> a <urn:b> .");
}

#[tokio::test]
async fn failed_namespace_is_not_fetched_twice() {
    let source = Arc::new(Namespaces::default());
    let fetcher = fetcher(source.clone());
    let workspace = Workspace::new();
    let snapshot = workspace.open(uri(), "@prefix ex: <http://ex/> .\nex:1 a ex:C .", 1);

    let first = hover(&snapshot, &fetcher, Position::new(1, 1), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(first.label, None);
    assert_eq!(first.display, "ex:1");
    assert_eq!(source.calls(), 1);

    let second = hover(&snapshot, &fetcher, Position::new(1, 1), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(second.label, None);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn external_label_reaches_hints_after_lookup() {
    let source = Arc::new(Namespaces::serving(
        "http://ex/",
        "<http://ex/1> <http://www.w3.org/2004/02/skos/core#prefLabel> \"One\" .",
    ));
    let fetcher = fetcher(source.clone());
    let workspace = Workspace::new();
    let snapshot = workspace.open(uri(), "@prefix ex: <http://ex/> .\nex:1 a ex:C .", 1);

    assert!(inlay_hints(&snapshot, &fetcher, whole_document()).is_empty());

    let resolved = fetcher
        .prefetch(snapshot.analysis.unlabeled_iris())
        .await;
    assert_eq!(resolved, 1);
    assert_eq!(
        hint_labels(&inlay_hints(&snapshot, &fetcher, whole_document())),
        vec![(Position::new(1, 4), "One".to_string())]
    );
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn concurrent_hovers_share_one_fetch() {
    let source = Arc::new(Namespaces {
        delay: Duration::from_millis(50),
        ..Namespaces::serving(
            "http://ex/",
            "<http://ex/1> <http://www.w3.org/2004/02/skos/core#prefLabel> \"One\" .",
        )
    });
    let fetcher = fetcher(source.clone());
    let workspace = Workspace::new();
    let snapshot = workspace.open(uri(), "@prefix ex: <http://ex/> .\nex:1 a ex:C .", 1);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let snapshot = snapshot.clone();
            let fetcher = fetcher.clone();
            tokio::spawn(async move {
                hover(&snapshot, &fetcher, Position::new(1, 1), TIMEOUT)
                    .await
                    .and_then(|hover| hover.label)
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap().as_deref(), Some("One"));
    }
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn document_label_shadows_namespace_label() {
    let source = Arc::new(Namespaces::serving(
        "http://ex/",
        "<http://ex/1> <http://www.w3.org/2004/02/skos/core#prefLabel> \"Remote\" .",
    ));
    let fetcher = fetcher(source.clone());
    let workspace = Workspace::new();
    let snapshot = workspace.open(
        uri(),
        &format!("{SKOS}@prefix ex: <http://ex/> .\nex:1 skos:prefLabel \"Local\" ."),
        1,
    );

    let shown = hover(&snapshot, &fetcher, Position::new(2, 1), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(shown.label.as_deref(), Some("Local"));
    assert_eq!(shown.source, LabelSource::Local);
    assert_eq!(source.calls(), 0);
}

#[test]
fn prefixes_may_follow_their_use() {
    let uri = uri();
    let before = DocumentAnalysis::analyze(
        &format!("{SKOS}@prefix ex: <http://ex/> .\nex:1 skos:prefLabel \"One\" ."),
        &uri,
    );
    let after = DocumentAnalysis::analyze(
        &format!("ex:1 skos:prefLabel \"One\" .\n@prefix ex: <http://ex/> .\n{SKOS}"),
        &uri,
    );

    assert_eq!(before.index.get("http://ex/1"), Some("One"));
    assert_eq!(after.index, before.index);
    assert!(after.unresolved.is_empty());
}

#[test]
fn analysis_is_deterministic() {
    let text = format!(
        "{SKOS}<urn:a> skos:prefLabel \"A\" .\n<urn:b> skos:prefLabel \"B\" ; a <urn:a> ."
    );
    let first = DocumentAnalysis::analyze(&text, &uri());
    let second = DocumentAnalysis::analyze(&text, &uri());

    assert_eq!(first.index, second.index);
    assert_eq!(first.occurrences, second.occurrences);
    assert_eq!(first.index.len(), 2);
}
