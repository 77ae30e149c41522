//! Media archival into the blob store.
//!
//! Accepted media is downloaded with bounded concurrency and stored under
//! `{property_id}/images/image{n}{ext}`. A failed download is logged and
//! skipped; archival never changes a resolution outcome.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engines::SiteClient;
use crate::error::FetchResult;
use crate::traits::BlobStore;
use crate::validation::ImageUrlValidator;

/// Parallel downloads per record.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Where media bytes come from.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn download(&self, url: &str) -> FetchResult<Bytes>;
}

/// Downloads over HTTP with the engines' client.
#[derive(Clone, Default)]
pub struct HttpMediaSource {
    client: SiteClient,
}

impl HttpMediaSource {
    pub fn new(client: SiteClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaSource for HttpMediaSource {
    async fn download(&self, url: &str) -> FetchResult<Bytes> {
        self.client.get_bytes(url).await
    }
}

/// Blob prefix holding everything archived for a property.
pub fn media_prefix(property_id: &str) -> String {
    format!("{property_id}/images")
}

pub struct MediaArchiver {
    source: Arc<dyn MediaSource>,
    blobs: Arc<dyn BlobStore>,
    validator: ImageUrlValidator,
    concurrency: usize,
    download_timeout: Duration,
}

impl MediaArchiver {
    pub fn new(source: Arc<dyn MediaSource>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            source,
            blobs,
            validator: ImageUrlValidator::default(),
            concurrency: DEFAULT_CONCURRENCY,
            download_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_validator(mut self, validator: ImageUrlValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Archive `media` for a property, replacing anything archived for it
    /// before. Returns stored paths in media order.
    pub async fn archive(&self, property_id: &str, media: &[String]) -> Vec<String> {
        let prefix = media_prefix(property_id);
        if let Err(e) = self.blobs.delete_prefix(&format!("{prefix}/")).await {
            warn!(property_id = %property_id, error = %e, "Failed to clear previously archived media");
        }
        debug!(property_id = %property_id, count = media.len(), "Archiving media (max {} concurrent)", self.concurrency);

        let jobs: Vec<_> = media
            .iter()
            .enumerate()
            .map(|(index, url)| {
                let prefix = prefix.clone();
                async move { self.archive_one(&prefix, index, url).await.map(|path| (index, path)) }
            })
            .collect();

        let mut stored: Vec<(usize, String)> = stream::iter(jobs)
            .buffer_unordered(self.concurrency)
            .filter_map(|r| async move { r })
            .collect()
            .await;
        stored.sort_by_key(|(index, _)| *index);

        info!(property_id = %property_id, stored = stored.len(), requested = media.len(), "Media archived");
        stored.into_iter().map(|(_, path)| path).collect()
    }

    async fn archive_one(&self, prefix: &str, index: usize, url: &str) -> Option<String> {
        let extension = match self.validator.file_extension(url) {
            Ok(ext) => ext,
            Err(e) => {
                warn!(url = %url, error = %e, "Skipping media without extension");
                return None;
            }
        };
        let path = format!("{prefix}/image{}{extension}", index + 1);

        let bytes = match tokio::time::timeout(self.download_timeout, self.source.download(url)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                warn!(url = %url, error = %e, "Media download failed");
                return None;
            }
            Err(_) => {
                warn!(url = %url, timeout = ?self.download_timeout, "Media download timed out");
                return None;
            }
        };

        if let Err(e) = self.blobs.put_blob(&path, bytes).await {
            warn!(path = %path, error = %e, "Failed to store media");
            return None;
        }
        Some(path)
    }
}
