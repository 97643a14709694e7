//! Open documents and their current analysis.
//!
//! Every accepted edit re-parses the whole document before the call
//! returns. Parsing happens outside the lock; the result is installed only
//! if nothing newer was installed meanwhile.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};
use tracing::{debug, warn};

pub use crate::document::ChangeError;
use crate::document::Document;
use crate::index::DocumentAnalysis;

/// A document version together with the analysis of exactly that text.
#[derive(Debug)]
pub struct Snapshot {
    pub document: Document,
    pub analysis: DocumentAnalysis,
}

impl Snapshot {
    fn build(document: Document) -> Self {
        let analysis = DocumentAnalysis::analyze(&document.text(), &document.uri);
        Self { document, analysis }
    }

    pub fn version(&self) -> i32 {
        self.document.version
    }
}

#[derive(Debug, Default)]
pub struct Workspace {
    documents: RwLock<HashMap<Url, Arc<Snapshot>>>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `uri`, replacing whatever was there.
    pub fn open(&self, uri: Url, text: &str, version: i32) -> Arc<Snapshot> {
        let snapshot = Arc::new(Snapshot::build(Document::new(uri.clone(), text, version)));
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri, snapshot.clone());
        snapshot
    }

    /// Apply `changes` in order and re-analyze.
    ///
    /// A `version` that is not newer than the current one is rejected with
    /// [`ChangeError::StaleVersion`] and leaves the document untouched, as
    /// does an edit whose range does not fit the text.
    pub fn change(
        &self,
        uri: &Url,
        version: i32,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Result<Arc<Snapshot>, ChangeError> {
        let current = self.snapshot(uri).ok_or(ChangeError::NotOpen)?;
        if version <= current.version() {
            debug!(%uri, current = current.version(), received = version, "dropping stale change");
            return Err(ChangeError::StaleVersion {
                current: current.version(),
                received: version,
            });
        }

        let mut document = current.document.clone();
        for change in changes {
            if let Err(err) = document.apply(change) {
                warn!(%uri, version, "rejecting change: {err}");
                return Err(err);
            }
        }
        document.version = version;
        let snapshot = Arc::new(Snapshot::build(document));

        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match documents.get(uri) {
            None => Err(ChangeError::NotOpen),
            Some(installed) if installed.version() >= version => {
                debug!(%uri, version, "discarding superseded analysis");
                Err(ChangeError::StaleVersion {
                    current: installed.version(),
                    received: version,
                })
            }
            Some(_) => {
                documents.insert(uri.clone(), snapshot.clone());
                Ok(snapshot)
            }
        }
    }

    /// Stop tracking `uri`. Returns whether it was open.
    pub fn close(&self, uri: &Url) -> bool {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(uri)
            .is_some()
    }

    pub fn snapshot(&self, uri: &Url) -> Option<Arc<Snapshot>> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    pub fn uris(&self) -> Vec<Url> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
