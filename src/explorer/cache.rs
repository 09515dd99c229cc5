//! Process-wide cache of mandala hymn indexes.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::backend::{MandalaIndex, VedaBackend, error::Result};

/// Cached `GET /index/{mandala}` responses.
///
/// A hit never touches the backend. Failures are not cached, so the next
/// selection of the same mandala retries.
#[derive(Debug, Clone, Default)]
pub struct HymnIndexCache {
    inner: Arc<RwLock<HashMap<u32, MandalaIndex>>>,
}

impl HymnIndexCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached index, if present.
    pub fn get(&self, mandala: u32) -> Option<MandalaIndex> {
        self.inner.read().unwrap().get(&mandala).cloned()
    }

    /// Store an index.
    pub fn insert(&self, mandala: u32, index: MandalaIndex) {
        self.inner.write().unwrap().insert(mandala, index);
    }

    /// Number of cached mandalas.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached index, or fetch and remember it.
    ///
    /// Two concurrent misses may both fetch; the later insert wins and both
    /// values are identical.
    pub async fn get_or_fetch(
        &self,
        backend: &dyn VedaBackend,
        mandala: u32,
    ) -> Result<MandalaIndex> {
        if let Some(index) = self.get(mandala) {
            tracing::debug!(name: "explorer.index.hit", mandala, "Hymn index cache hit");
            return Ok(index);
        }

        let index = backend.mandala_index(mandala).await?;
        tracing::debug!(
            name: "explorer.index.fetched",
            mandala,
            hymns = index.hymns.len(),
            "Hymn index fetched"
        );
        self.insert(mandala, index.clone());
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let backend = InMemoryBackend::new().with_mandala(1, &[3, 5]);
        let cache = HymnIndexCache::new();

        let first = cache.get_or_fetch(&backend, 1).await.unwrap();
        let second = cache.get_or_fetch(&backend, 1).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.index_calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let backend = InMemoryBackend::new();
        let cache = HymnIndexCache::new();

        assert!(cache.get_or_fetch(&backend, 4).await.is_err());
        assert!(cache.get_or_fetch(&backend, 4).await.is_err());

        assert!(cache.is_empty());
        assert_eq!(backend.index_calls(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let backend = InMemoryBackend::new().with_mandala(2, &[1]);
        let cache = HymnIndexCache::new();
        let shared = cache.clone();

        cache.get_or_fetch(&backend, 2).await.unwrap();
        assert!(shared.get(2).is_some());
    }
}
