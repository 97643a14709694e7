//! External label lookup.
//!
//! IRIs without a label in their own document are looked up in the
//! description of their namespace, fetched over the network at most once
//! per namespace at a time. Every lookup degrades to an unresolved entry on
//! failure; nothing here reports an error to the editor.
//!
//! Fetches run as spawned tasks, so a caller that stops waiting (hover
//! timeout, cancelled request) never aborts the fetch: the result still
//! lands in the cache for the next lookup.

mod cache;
mod namespace;
mod source;

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tower_lsp::lsp_types::Url;
use tracing::{debug, warn};

pub use cache::{FetchCache, NamespaceState, DEFAULT_TTL};
pub use namespace::Namespace;
pub use source::{HttpSource, NamespaceSource};

use crate::index::{DocumentAnalysis, LabelIndex};
use crate::labels::LabelEntry;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
    #[error("<{0}> has no http(s) namespace to fetch")]
    Unfetchable(String),
    #[error("description has no usable prefLabel: {0}")]
    Parse(String),
}

/// Set to `true` once the namespace outcome is in the cache.
type DoneSender = Arc<watch::Sender<bool>>;
type InFlightMap = DashMap<String, DoneSender>;

/// Marks the fetch done and removes its in-flight entry when the fetch task
/// ends, even by panic, so waiters never hang.
struct InFlightGuard<'a> {
    key: String,
    map: &'a InFlightMap,
    tx: DoneSender,
}

impl<'a> InFlightGuard<'a> {
    fn new(key: String, map: &'a InFlightMap, tx: DoneSender) -> Self {
        Self { key, map, tx }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        // Send before removing so late subscribers still observe completion.
        self.tx.send_replace(true);
        self.map.remove(&self.key);
    }
}

struct Inner {
    cache: Arc<FetchCache>,
    source: Arc<dyn NamespaceSource>,
    in_flight: InFlightMap,
    fetch_timeout: Duration,
}

/// Cheap to clone; clones share the cache and the in-flight table.
#[derive(Clone)]
pub struct Fetcher {
    inner: Option<Arc<Inner>>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Some(inner) => f
                .debug_struct("Fetcher")
                .field("cached", &inner.cache.len())
                .field("in_flight", &inner.in_flight.len())
                .field("fetch_timeout", &inner.fetch_timeout)
                .finish(),
            None => f.write_str("Fetcher(disabled)"),
        }
    }
}

/// Answer to [`Fetcher::request`].
#[derive(Debug)]
pub enum LabelRequest {
    Ready(LabelEntry),
    Pending {
        iri: String,
        namespace: String,
        done: watch::Receiver<bool>,
        cache: Arc<FetchCache>,
    },
}

impl LabelRequest {
    /// Wait at most `timeout` for the answer. An elapsed wait gives an
    /// unresolved entry that is not cached; the fetch keeps running.
    pub async fn wait(self, timeout: Duration) -> LabelEntry {
        match self {
            LabelRequest::Ready(entry) => entry,
            LabelRequest::Pending {
                iri,
                namespace,
                mut done,
                cache,
            } => {
                // A closed channel also means the fetch is over.
                if tokio::time::timeout(timeout, done.wait_for(|done| *done))
                    .await
                    .is_err()
                {
                    debug!(%iri, ?timeout, "gave up waiting for label");
                    return LabelEntry::unresolved(iri);
                }
                cache
                    .settle(&iri, &namespace)
                    .unwrap_or_else(|| LabelEntry::unresolved(iri))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LabelRequest::Ready(_))
    }
}

impl Fetcher {
    pub fn new(cache: Arc<FetchCache>, source: Arc<dyn NamespaceSource>) -> Self {
        Self {
            inner: Some(Arc::new(Inner {
                cache,
                source,
                in_flight: DashMap::new(),
                fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            })),
        }
    }

    /// Network timeout applied to each namespace fetch.
    pub fn with_fetch_timeout(self, fetch_timeout: Duration) -> Self {
        Self {
            inner: self.inner.map(|inner| {
                Arc::new(Inner {
                    cache: inner.cache.clone(),
                    source: inner.source.clone(),
                    in_flight: DashMap::new(),
                    fetch_timeout,
                })
            }),
        }
    }

    /// A fetcher that never goes to the network: every IRI is unresolved.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn cache(&self) -> Option<&Arc<FetchCache>> {
        self.inner.as_ref().map(|inner| &inner.cache)
    }

    /// Cached answer for `iri`, never touching the network.
    pub fn cached(&self, iri: &str) -> Option<LabelEntry> {
        self.inner.as_ref()?.cache.get(iri)
    }

    /// Cached answer, or a handle on the (possibly shared) fetch of the
    /// namespace of `iri`.
    pub fn request(&self, iri: &str) -> LabelRequest {
        let Some(inner) = &self.inner else {
            return LabelRequest::Ready(LabelEntry::unresolved(iri));
        };
        if let Some(entry) = inner.cache.get(iri) {
            return LabelRequest::Ready(entry);
        }
        let namespace = match Namespace::of(iri) {
            Ok(namespace) => namespace,
            Err(_) => return LabelRequest::Ready(inner.cache.insert_unresolved(iri)),
        };
        if let Some(entry) = inner.cache.settle(iri, &namespace.key) {
            return LabelRequest::Ready(entry);
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(%iri, "no async runtime, skipping external lookup");
            return LabelRequest::Ready(LabelEntry::unresolved(iri));
        };

        let key = namespace.key.clone();
        let done = match inner.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => entry.get().subscribe(),
            Entry::Vacant(entry) => {
                // The previous fetch may have finished since the check above.
                if let Some(settled) = inner.cache.settle(iri, &key) {
                    return LabelRequest::Ready(settled);
                }
                let (tx, rx) = watch::channel(false);
                let tx = Arc::new(tx);
                entry.insert(tx.clone());

                let task_inner = inner.clone();
                runtime.spawn(async move {
                    let _guard =
                        InFlightGuard::new(namespace.key.clone(), &task_inner.in_flight, tx);
                    task_inner.load(&namespace).await;
                });
                rx
            }
        };

        LabelRequest::Pending {
            iri: iri.to_string(),
            namespace: key,
            done,
            cache: inner.cache.clone(),
        }
    }

    /// `request(iri).wait(timeout)`.
    pub async fn lookup(&self, iri: &str, timeout: Duration) -> LabelEntry {
        self.request(iri).wait(timeout).await
    }

    /// Start fetches for every IRI of `iris` that has no cached answer and
    /// wait for them. Returns how many IRIs gained a label.
    pub async fn prefetch<'a>(&self, iris: impl IntoIterator<Item = &'a str>) -> usize {
        let Some(inner) = &self.inner else {
            return 0;
        };
        let pending: Vec<LabelRequest> = iris
            .into_iter()
            .map(|iri| self.request(iri))
            .filter(|request| !request.is_ready())
            .collect();

        let mut resolved = 0;
        for request in pending {
            // The fetch itself is bounded; this only guards against a stuck source.
            if request.wait(inner.fetch_timeout * 2).await.is_resolved() {
                resolved += 1;
            }
        }
        resolved
    }
}

impl Inner {
    /// Fetch one namespace and record the outcome in the cache.
    async fn load(&self, namespace: &Namespace) {
        match self.fetch_labels(namespace).await {
            Ok(index) => {
                debug!(namespace = %namespace.key, labels = index.len(), "namespace loaded");
                // Every label in the description is kept, not only the one asked for.
                self.cache.insert_namespace(&namespace.key, index.iter());
            }
            Err(err) => {
                debug!(namespace = %namespace.key, "namespace fetch failed: {err}");
                self.cache.mark_failed(&namespace.key);
            }
        }
    }

    async fn fetch_labels(&self, namespace: &Namespace) -> Result<LabelIndex, FetchError> {
        let text = tokio::time::timeout(
            self.fetch_timeout,
            self.source.fetch(&namespace.url, self.fetch_timeout),
        )
        .await
        .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;

        parse_labels(&text, &namespace.url)
    }
}

/// Labels of a fetched description, using the same rule as for documents.
fn parse_labels(text: &str, url: &Url) -> Result<LabelIndex, FetchError> {
    let analysis = DocumentAnalysis::analyze(text, url);
    if analysis.index.is_empty() {
        let reason = match analysis.syntax_errors.first() {
            Some(err) => err.to_string(),
            None => "no skos:prefLabel triples".to_string(),
        };
        return Err(FetchError::Parse(reason));
    }
    Ok(analysis.index)
}
