//! In-memory cache and blob store for testing and development.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::CacheResult;
use crate::traits::cache::{BlobStore, CacheEntry, CacheGateway};

/// In-memory cache gateway.
///
/// Clones share storage. Entries are replaced whole, so concurrent writers
/// to one key leave the last completed write.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl CacheGateway for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> CacheResult<()> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        Ok(self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some())
    }
}

/// In-memory blob store keyed by path.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<BTreeMap<String, Bytes>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    /// Stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_blob(&self, path: &str, data: Bytes) -> CacheResult<()> {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), data);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> CacheResult<bool> {
        let mut blobs = self.blobs.write().unwrap_or_else(PoisonError::into_inner);
        let before = blobs.len();
        blobs.retain(|path, _| !path.starts_with(prefix));
        Ok(blobs.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FetchPropertyResult, MlsInfo, PropertyRecord};

    fn entry(price: &str) -> CacheEntry {
        let record = PropertyRecord::from_mls(
            "k",
            "1 Main St",
            "Zillow",
            MlsInfo::new().with_price(price),
            vec![],
        );
        CacheEntry::new(FetchPropertyResult::success("r", record, "Zillow"), vec![])
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let cache = MemoryCache::new();
        assert!(cache.get("k").await.unwrap().is_none());

        cache.put("k", &entry("$1")).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_some());

        assert!(cache.delete("k").await.unwrap());
        assert!(!cache.delete("k").await.unwrap());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_entry() {
        let cache = MemoryCache::new();
        cache.put("k", &entry("$1")).await.unwrap();
        cache.put("k", &entry("$2")).await.unwrap();

        let stored = cache.get("k").await.unwrap().unwrap();
        let price = stored.result.property().and_then(|p| p.list_price.clone());
        assert_eq!(price.as_deref(), Some("$2"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let blobs = MemoryBlobStore::new();
        blobs.put_blob("p1/images/image0.jpg", Bytes::from_static(b"a")).await.unwrap();
        blobs.put_blob("p1/images/image1.jpg", Bytes::from_static(b"b")).await.unwrap();
        blobs.put_blob("p2/images/image0.jpg", Bytes::from_static(b"c")).await.unwrap();

        assert!(blobs.delete_prefix("p1/").await.unwrap());
        assert_eq!(blobs.paths(), vec!["p2/images/image0.jpg".to_string()]);
        assert!(!blobs.delete_prefix("p1/").await.unwrap());
    }
}
