//! Persistence seams for resolved records and archived media.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CacheResult;
use crate::types::FetchPropertyResult;

/// What the cache stores per fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub result: FetchPropertyResult,

    /// Blob paths of archived media, in record order
    #[serde(default)]
    pub media_manifest: Vec<String>,

    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(result: FetchPropertyResult, media_manifest: Vec<String>) -> Self {
        Self {
            result,
            media_manifest,
            stored_at: Utc::now(),
        }
    }

    /// Whether the entry is older than `max_age`.
    pub fn is_stale(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> bool {
        now - self.stored_at > max_age
    }
}

/// Key-value store for cache entries.
///
/// A `put` replaces the whole entry; readers never observe a partial write.
#[async_trait]
pub trait CacheGateway: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    async fn put(&self, key: &str, entry: &CacheEntry) -> CacheResult<()>;

    /// Returns whether an entry existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;
}

/// Blob storage for archived media.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put_blob(&self, path: &str, data: Bytes) -> CacheResult<()>;

    /// Delete every blob under `prefix`. Returns whether anything was deleted.
    async fn delete_prefix(&self, prefix: &str) -> CacheResult<bool>;
}
