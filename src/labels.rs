//! Label lookup across the local index and the external cache.
//!
//! A label defined in the document always wins; the fetcher is only asked
//! about IRIs the document does not label itself.

use std::time::{Duration, Instant};

use crate::fetch::Fetcher;
use crate::index::DocumentAnalysis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LabelSource {
    Local,
    External,
    Unresolved,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelEntry {
    pub iri: String,
    pub label: Option<String>,
    pub source: LabelSource,
    /// When an external entry was fetched.
    pub fetched_at: Option<Instant>,
}

impl LabelEntry {
    pub fn local(iri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            label: Some(label.into()),
            source: LabelSource::Local,
            fetched_at: None,
        }
    }

    pub fn external(iri: impl Into<String>, label: impl Into<String>, fetched_at: Instant) -> Self {
        Self {
            iri: iri.into(),
            label: Some(label.into()),
            source: LabelSource::External,
            fetched_at: Some(fetched_at),
        }
    }

    pub fn unresolved(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            label: None,
            source: LabelSource::Unresolved,
            fetched_at: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.label.is_some()
    }

    /// Unresolved entries never expire; external ones do after `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        match (self.source, self.fetched_at) {
            (LabelSource::External, Some(at)) => at.elapsed() < ttl,
            _ => true,
        }
    }
}

pub fn local(analysis: &DocumentAnalysis, iri: &str) -> Option<LabelEntry> {
    analysis
        .index
        .get(iri)
        .map(|label| LabelEntry::local(iri, label))
}

/// What is known right now, without touching the network.
pub fn known(analysis: &DocumentAnalysis, fetcher: &Fetcher, iri: &str) -> Option<LabelEntry> {
    local(analysis, iri).or_else(|| fetcher.cached(iri))
}

/// Local label, else the fetcher's answer within `timeout`.
pub async fn lookup(
    analysis: &DocumentAnalysis,
    fetcher: &Fetcher,
    iri: &str,
    timeout: Duration,
) -> LabelEntry {
    match local(analysis, iri) {
        Some(entry) => entry,
        None => fetcher.lookup(iri, timeout).await,
    }
}
