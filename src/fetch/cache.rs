//! Process-wide store of fetched labels.
//!
//! Two tables: labels per IRI and the outcome of each namespace fetch.
//! External labels and loaded namespaces expire after the TTL; unresolved
//! IRIs and failed namespaces stay memoized until [`FetchCache::clear`].

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::labels::LabelEntry;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamespaceState {
    Loaded(Instant),
    Failed,
}

#[derive(Debug)]
pub struct FetchCache {
    entries: DashMap<String, LabelEntry>,
    namespaces: DashMap<String, NamespaceState>,
    ttl: Duration,
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl FetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            namespaces: DashMap::new(),
            ttl,
        }
    }

    /// A non-expired entry for `iri`.
    pub fn get(&self, iri: &str) -> Option<LabelEntry> {
        let entry = self.entries.get(iri)?;
        entry.is_fresh(self.ttl).then(|| entry.value().clone())
    }

    /// Record a successful fetch of `namespace` with all of its labels.
    /// The labels and the namespace share one timestamp, so they expire
    /// together.
    pub fn insert_namespace<'a>(
        &self,
        namespace: &str,
        labels: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        let fetched_at = Instant::now();
        for (iri, label) in labels {
            self.entries
                .insert(iri.to_string(), LabelEntry::external(iri, label, fetched_at));
        }
        self.namespaces
            .insert(namespace.to_string(), NamespaceState::Loaded(fetched_at));
    }

    pub fn insert_unresolved(&self, iri: &str) -> LabelEntry {
        let entry = LabelEntry::unresolved(iri);
        self.entries.insert(iri.to_string(), entry.clone());
        entry
    }

    /// Outcome of the last fetch of `namespace`, unless it has expired.
    pub fn namespace_state(&self, namespace: &str) -> Option<NamespaceState> {
        let state = *self.namespaces.get(namespace)?;
        match state {
            NamespaceState::Loaded(at) if at.elapsed() >= self.ttl => None,
            state => Some(state),
        }
    }

    pub fn mark_failed(&self, namespace: &str) {
        self.namespaces
            .insert(namespace.to_string(), NamespaceState::Failed);
    }

    /// Answer for `iri` once its namespace has a known outcome: the cached
    /// label, or a memoized unresolved entry. `None` while the namespace
    /// outcome is still unknown.
    ///
    /// An expired label is only replaced by a later outcome of its
    /// namespace: a failure, or a reload that no longer labels `iri`.
    pub fn settle(&self, iri: &str, namespace: &str) -> Option<LabelEntry> {
        let cached = self.entries.get(iri).map(|entry| entry.value().clone());
        let expired_at = match cached {
            Some(entry) if entry.is_fresh(self.ttl) => return Some(entry),
            Some(entry) => entry.fetched_at,
            None => None,
        };
        match self.namespace_state(namespace)? {
            NamespaceState::Loaded(at) if expired_at.is_some_and(|fetched| fetched >= at) => None,
            _ => Some(self.insert_unresolved(iri)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.namespaces.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    use crate::labels::LabelSource;

    const NS: &str = "http://ex/";

    #[test]
    fn external_entries_expire_unresolved_do_not() {
        let cache = FetchCache::new(Duration::ZERO);
        cache.insert_namespace(NS, [("http://ex/1", "One")]);
        cache.insert_unresolved("http://ex/2");
        assert!(cache.get("http://ex/1").is_none());
        assert_eq!(
            cache.get("http://ex/2").map(|e| e.source),
            Some(LabelSource::Unresolved)
        );
    }

    #[test]
    fn failed_namespace_settles_as_unresolved() {
        let cache = FetchCache::default();
        assert!(cache.settle("http://ex/1", NS).is_none());
        cache.mark_failed(NS);
        let entry = cache.settle("http://ex/1", NS).unwrap();
        assert_eq!(entry.source, LabelSource::Unresolved);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn loaded_namespace_settles_unlisted_iris() {
        let cache = FetchCache::default();
        cache.insert_namespace(NS, [("http://ex/1", "One")]);
        assert_eq!(
            cache.settle("http://ex/1", NS).and_then(|e| e.label),
            Some("One".to_string())
        );
        assert_eq!(
            cache.settle("http://ex/9", NS).map(|e| e.source),
            Some(LabelSource::Unresolved)
        );
    }

    #[test]
    fn expired_label_waits_for_a_new_fetch() {
        let cache = FetchCache::new(Duration::from_millis(50));
        cache.insert_namespace(NS, [("http://ex/1", "One")]);
        thread::sleep(Duration::from_millis(80));

        assert!(cache.settle("http://ex/1", NS).is_none());
        assert!(cache.get("http://ex/1").is_none());
        assert_eq!(
            cache.entries.get("http://ex/1").map(|e| e.source),
            Some(LabelSource::External)
        );

        cache.insert_namespace(NS, [("http://ex/1", "One again")]);
        assert_eq!(
            cache.settle("http://ex/1", NS).and_then(|e| e.label),
            Some("One again".to_string())
        );
    }

    #[test]
    fn expired_label_dropped_by_a_reload_becomes_unresolved() {
        let cache = FetchCache::new(Duration::from_millis(50));
        cache.insert_namespace(NS, [("http://ex/1", "One")]);
        thread::sleep(Duration::from_millis(80));

        cache.insert_namespace(NS, [("http://ex/2", "Two")]);
        assert_eq!(
            cache.settle("http://ex/1", NS).map(|e| e.source),
            Some(LabelSource::Unresolved)
        );
    }

    #[test]
    fn expired_label_of_failed_namespace_is_unresolved() {
        let cache = FetchCache::new(Duration::from_millis(50));
        cache.insert_namespace(NS, [("http://ex/1", "One")]);
        thread::sleep(Duration::from_millis(80));

        cache.mark_failed(NS);
        assert_eq!(
            cache.settle("http://ex/1", NS).map(|e| e.source),
            Some(LabelSource::Unresolved)
        );
    }

    #[test]
    fn loaded_namespace_expires_with_ttl() {
        let cache = FetchCache::new(Duration::ZERO);
        cache.insert_namespace(NS, std::iter::empty());
        assert!(cache.namespace_state(NS).is_none());
        cache.mark_failed(NS);
        assert_eq!(cache.namespace_state(NS), Some(NamespaceState::Failed));
    }

    #[test]
    fn clear_forgets_everything() {
        let cache = FetchCache::default();
        cache.insert_namespace(NS, [("http://ex/1", "One")]);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.namespace_state(NS).is_none());
    }
}
