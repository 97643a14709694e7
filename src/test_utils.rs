//! Shared test utilities for skoslens.
//!
//! This module provides common helpers used across multiple test modules.
//! It is only compiled when running tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tower_lsp::lsp_types::Url;

use crate::fetch::{FetchCache, FetchError, Fetcher, NamespaceSource};
use crate::workspace::{Snapshot, Workspace};

/// The skos prefix line most fixtures start with.
pub const SKOS_PREFIX: &str = "@prefix skos: <http://www.w3.org/2004/02/skos/core#> .\n";

/// A [`NamespaceSource`] answering from a fixed table.
///
/// Every call is counted, including failed ones, so tests can assert how
/// often the network would have been hit. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct StubSource {
    responses: HashMap<String, Result<String, FetchError>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for the namespace `url`.
    pub fn with_document(mut self, url: &str, body: &str) -> Self {
        self.responses
            .insert(normalize(url), Ok(body.to_string()));
        self
    }

    /// Fail every fetch of `url` with `error`.
    pub fn with_failure(mut self, url: &str, error: FetchError) -> Self {
        self.responses.insert(normalize(url), Err(error));
        self
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// The form [`crate::fetch::Namespace`] requests: parsed, fragment dropped.
fn normalize(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => url.to_string(),
    }
}

#[async_trait]
impl NamespaceSource for StubSource {
    async fn fetch(&self, url: &Url, _timeout: Duration) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.responses
            .get(url.as_str())
            .cloned()
            .unwrap_or(Err(FetchError::Status(404)))
    }
}

/// A fetcher over `source` with an empty cache.
pub fn stub_fetcher(source: Arc<StubSource>) -> Fetcher {
    Fetcher::new(Arc::new(FetchCache::default()), source)
}

pub fn test_uri() -> Url {
    Url::parse("file:///workspace/test.ttl").expect("valid test uri")
}

/// Open `text` as version 1 of [`test_uri`] in a fresh workspace.
pub fn open_document(text: &str) -> (Workspace, Arc<Snapshot>) {
    let workspace = Workspace::new();
    let snapshot = workspace.open(test_uri(), text, 1);
    (workspace, snapshot)
}
