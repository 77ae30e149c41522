//! Property resolution manager.
//!
//! Walks a tenant's engine chain behind a fingerprint-keyed cache:
//!
//! ```text
//! Started → CacheCheck → CacheHit → Done
//!                      → CacheMiss → EngineAttempt(i) → Accepted → Done
//!                                                     → Rejected → EngineAttempt(i + 1)
//!                                  → ChainExhausted → Done(Failure)
//! ```
//!
//! Engine and cache errors are absorbed here. Callers only ever see a
//! `Success`/`Failure` result, a validation error, or `Cancelled`.

mod attempt;

pub use attempt::{Attempt, EngineVerdict};

use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{ResolveError, Result};
use crate::media::{media_prefix, MediaArchiver, MediaSource};
use crate::normalize::normalize;
use crate::registry::EngineRegistry;
use crate::traits::{BlobStore, CacheEntry, CacheGateway};
use crate::types::{
    Address, AddressInputType, FetchPropertyRequest, FetchPropertyResponse, FetchPropertyResult, PropertyRecord,
    PurgeOutcome, PurgeRequest, PurgeResponse, ResolveRequest, ResolverConfig, CACHE_SOURCE,
};
use crate::validation::{ImageUrlValidator, StatusValidator};

/// Reason given when the scraping feature flag is off.
pub const SCRAPING_DISABLED: &str = "web scraping is disabled";

/// Cache key for a resolution: sha256 over tenant, normalized address
/// (country suffix dropped) and title, all case-folded.
///
/// Exact place ids are case-sensitive and go in as given.
pub fn fingerprint(tenant: &str, address: &Address, title: Option<&str>) -> String {
    let location = match address.input_type() {
        AddressInputType::ExactPlaceId => address.place_id().to_string(),
        _ => normalize(address.formatted_without_country()).key(),
    };
    let material = format!(
        "{}|{}|{}",
        tenant.trim().to_lowercase(),
        location,
        title.map(|t| t.trim().to_lowercase()).unwrap_or_default()
    );
    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Resolves addresses to property records for any tenant.
///
/// Shares nothing mutable between requests except the cache gateway, so
/// one resolver can serve concurrent requests behind an `Arc`.
pub struct PropertyResolver<C, B> {
    registry: Arc<EngineRegistry>,
    statuses: Arc<StatusValidator>,
    images: ImageUrlValidator,
    cache: C,
    blobs: Arc<B>,
    archiver: Option<MediaArchiver>,
    config: ResolverConfig,
}

impl<C, B> PropertyResolver<C, B>
where
    C: CacheGateway,
    B: BlobStore + 'static,
{
    pub fn new(
        registry: Arc<EngineRegistry>,
        statuses: Arc<StatusValidator>,
        cache: C,
        blobs: B,
        config: ResolverConfig,
    ) -> Self {
        Self {
            registry,
            statuses,
            images: ImageUrlValidator::default(),
            cache,
            blobs: Arc::new(blobs),
            archiver: None,
            config,
        }
    }

    pub fn with_image_validator(mut self, images: ImageUrlValidator) -> Self {
        self.images = images;
        self
    }

    /// Archive accepted media into the blob store, downloading from `source`.
    pub fn with_media_source(mut self, source: Arc<dyn MediaSource>) -> Self {
        let blobs: Arc<dyn BlobStore> = self.blobs.clone();
        self.archiver = Some(
            MediaArchiver::new(source, blobs)
                .with_validator(self.images.clone())
                .with_download_timeout(self.config.attempt_timeout()),
        );
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub async fn resolve(&self, request: &ResolveRequest) -> Result<FetchPropertyResult> {
        self.resolve_with_cancel(request, &CancellationToken::new()).await
    }

    /// Resolve with cancellation. A cancelled resolve never writes the cache.
    pub async fn resolve_with_cancel(
        &self,
        request: &ResolveRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchPropertyResult> {
        request.validate()?;

        let tenant = request.tenant.as_str();
        let title = request.title();
        let address = match request.address.trim() {
            "" => Address::new(title.unwrap_or_default(), AddressInputType::PropertyTitle, Some(tenant)),
            raw => Address::new(raw, request.input_type, Some(tenant)),
        };
        let key = fingerprint(tenant, &address, title);

        info!(
            request_id = %request.request_id,
            tenant = %tenant,
            address = %address,
            title = ?title,
            force_refresh = request.force_refresh,
            "Resolving property"
        );

        if !request.force_refresh {
            if let Some(hit) = self.cached(&key, cancel).await? {
                info!(request_id = %request.request_id, fingerprint = %key, "Served from cache");
                return Ok(hit.reissued(&request.request_id, CACHE_SOURCE));
            }
        }

        if !self.config.scraping_enabled {
            warn!(request_id = %request.request_id, "Scraping disabled, skipping engines");
            return Ok(FetchPropertyResult::failure(&request.request_id, SCRAPING_DISABLED)?);
        }

        let chain = self.registry.engines_for(tenant);
        debug!(tenant = %tenant, chain = ?chain.names(), "Engine chain");

        let attempt = Attempt {
            address: &address,
            title,
            debug: request.debug,
            config: &self.config,
            statuses: &self.statuses,
            images: &self.images,
            cancel,
        };

        let mut winner = None;
        for engine in chain.iter() {
            match attempt.run(engine.as_ref()).await? {
                EngineVerdict::Accepted { info, media } => {
                    winner = Some((engine.name().to_string(), info, media));
                    break;
                }
                verdict => debug!(engine = engine.name(), verdict = ?verdict, "Engine rejected, moving on"),
            }
        }

        let Some((engine_name, info, media)) = winner else {
            let reason = failure_reason(tenant, &address, title, &chain.names());
            warn!(request_id = %request.request_id, reason = %reason, "Chain exhausted");
            return Ok(FetchPropertyResult::failure(&request.request_id, reason)?);
        };

        let mut record = PropertyRecord::from_mls(&key, address.formatted(), &engine_name, info, media);
        let manifest = match &self.archiver {
            Some(archiver) => cancellable(cancel, archiver.archive(&key, &record.media)).await?,
            None => Vec::new(),
        };
        if !manifest.is_empty() {
            record.media_storage_path = Some(media_prefix(&key));
        }

        info!(
            request_id = %request.request_id,
            engine = %engine_name,
            images = record.media.len(),
            subtitle = %record.subtitle(),
            "Property resolved"
        );
        let result = FetchPropertyResult::success(&request.request_id, record, &engine_name);

        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }
        let entry = CacheEntry::new(result.clone(), manifest);
        if let Err(e) = cancellable(cancel, self.cache.put(&key, &entry)).await? {
            warn!(fingerprint = %key, error = %e, "Cache write failed, returning uncached result");
        }

        Ok(result)
    }

    /// Fresh cached result, if any. Cache faults read as a miss.
    async fn cached(&self, key: &str, cancel: &CancellationToken) -> Result<Option<FetchPropertyResult>> {
        match cancellable(cancel, self.cache.get(key)).await? {
            Ok(Some(entry)) if entry.is_stale(self.config.rescrape_after(), chrono::Utc::now()) => {
                debug!(fingerprint = %key, stored_at = %entry.stored_at, "Cached entry is stale");
                Ok(None)
            }
            Ok(Some(entry)) => Ok(Some(entry.result)),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(fingerprint = %key, error = %e, "Cache read failed, treating as miss");
                Ok(None)
            }
        }
    }

    /// Remove a property's cached record and archived media.
    ///
    /// Each half is reported on its own; neither failing stops the other.
    pub async fn purge(&self, property_id: &str) -> PurgeOutcome {
        let record_deleted = match self.cache.delete(property_id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                error!(property_id = %property_id, error = %e, "Failed to delete cached record");
                false
            }
        };

        let media_deleted = match self.blobs.delete_prefix(&format!("{property_id}/")).await {
            Ok(deleted) => deleted,
            Err(e) => {
                error!(property_id = %property_id, error = %e, "Failed to delete archived media");
                false
            }
        };

        info!(property_id = %property_id, record_deleted, media_deleted, "Purge finished");
        PurgeOutcome {
            record_deleted,
            media_deleted,
        }
    }

    /// Transport adapter for fetch requests.
    pub async fn fetch(&self, request: FetchPropertyRequest, tenant: &str) -> Result<FetchPropertyResponse> {
        let request = request.into_resolve_request(tenant);
        Ok(self.resolve(&request).await?.into())
    }

    /// Transport adapter for purge requests.
    pub async fn purge_request(&self, request: PurgeRequest) -> PurgeResponse {
        let outcome = self.purge(&request.property_id).await;
        PurgeResponse::new(request.property_id, outcome)
    }
}

async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output> {
    tokio::select! {
        output = fut => Ok(output),
        _ = cancel.cancelled() => Err(ResolveError::Cancelled),
    }
}

fn failure_reason(tenant: &str, address: &Address, title: Option<&str>, engines: &[String]) -> String {
    let title = title.map(|t| format!(", title '{t}'")).unwrap_or_default();
    format!(
        "No listing found for '{}' (tenant '{tenant}'{title}) after trying {}",
        address.formatted(),
        engines.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryBlobStore;
    use crate::testing::{listing_with_images, MockEngine, MockOutcome, RecordingCache};
    use crate::traits::SharedEngine;
    use crate::types::ActionState;
    use std::time::Duration;

    fn resolver(engines: Vec<MockEngine>, cache: RecordingCache) -> PropertyResolver<RecordingCache, MemoryBlobStore> {
        let engines: Vec<SharedEngine> = engines.into_iter().map(|e| Arc::new(e) as SharedEngine).collect();
        PropertyResolver::new(
            Arc::new(EngineRegistry::new(engines).unwrap()),
            Arc::new(StatusValidator::embedded()),
            cache,
            MemoryBlobStore::new(),
            ResolverConfig::default().with_retry_delay(Duration::from_millis(1)),
        )
    }

    #[test]
    fn test_fingerprint_is_stable_across_spellings() {
        let a = Address::new("3144 Nichols Canyon Rd", AddressInputType::FreeForm, None);
        let b = Address::new("3144  nichols canyon road", AddressInputType::FreeForm, None);
        assert_eq!(fingerprint("Zillow", &a, None), fingerprint("zillow", &b, None));
        assert_ne!(fingerprint("zillow", &a, None), fingerprint("zillow", &a, Some("Canyon House")));
        assert_ne!(fingerprint("zillow", &a, None), fingerprint("compass", &a, None));

        let with_country = Address::new("3144 Nichols Canyon Rd, USA", AddressInputType::AutoComplete, None);
        let without = Address::new("3144 Nichols Canyon Road", AddressInputType::AutoComplete, None);
        assert_eq!(fingerprint("zillow", &with_country, None), fingerprint("zillow", &without, None));
    }

    #[test]
    fn test_fingerprint_keeps_place_id_case() {
        let lower = Address::new("ChIJabc123", AddressInputType::ExactPlaceId, None);
        let upper = Address::new("CHIJABC123", AddressInputType::ExactPlaceId, None);
        assert_ne!(fingerprint("zillow", &lower, None), fingerprint("zillow", &upper, None));

        let again = Address::new(" ChIJabc123 ", AddressInputType::ExactPlaceId, None);
        assert_eq!(fingerprint("zillow", &lower, None), fingerprint("zillow", &again, None));
    }

    #[tokio::test]
    async fn test_falls_back_along_chain() {
        let compass = MockEngine::new("Compass").always(MockOutcome::NotFound);
        let coldwell = MockEngine::new("ColdwellBanker").always(MockOutcome::Found(listing_with_images(4)));
        let cache = RecordingCache::new();
        let resolver = resolver(
            vec![MockEngine::new("Zillow"), compass.clone(), coldwell.clone()],
            cache.clone(),
        );

        let request = ResolveRequest::new("compass", "1 Main St, Springfield");
        let result = resolver.resolve(&request).await.unwrap();

        assert!(result.is_success());
        assert_eq!(result.source(), Some("ColdwellBanker"));
        assert_eq!(compass.call_count(), 1);
        assert_eq!(cache.puts(), 1);
        assert_eq!(result.property().unwrap().media.len(), 4);
    }

    #[tokio::test]
    async fn test_scraping_disabled() {
        let zillow = MockEngine::new("Zillow").always(MockOutcome::Found(listing_with_images(1)));
        let mut resolver = resolver(vec![zillow.clone()], RecordingCache::new());
        resolver.config = resolver.config.clone().with_scraping_enabled(false);

        let result = resolver.resolve(&ResolveRequest::new("acme", "1 Main St")).await.unwrap();
        assert_eq!(result.status().reason(), Some(SCRAPING_DISABLED));
        assert_eq!(zillow.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_outage_degrades_to_miss() {
        let zillow = MockEngine::new("Zillow").always(MockOutcome::Found(listing_with_images(2)));
        let resolver = resolver(vec![zillow], RecordingCache::failing());

        let result = resolver.resolve(&ResolveRequest::new("acme", "1 Main St")).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.source(), Some("Zillow"));
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let zillow = MockEngine::new("Zillow").always(MockOutcome::Found(listing_with_images(2)));
        let cache = RecordingCache::new();
        let resolver = resolver(vec![zillow.clone()], cache.clone());
        let request = ResolveRequest::new("acme", "1 Main St");

        resolver.resolve(&request).await.unwrap();
        let address = Address::new("1 Main St", AddressInputType::AutoComplete, Some("acme"));
        let key = fingerprint("acme", &address, None);
        let mut entry = cache.store().get(&key).await.unwrap().unwrap();
        entry.stored_at -= chrono::Duration::hours(25);
        cache.store().put(&key, &entry).await.unwrap();

        let again = resolver.resolve(&request).await.unwrap();
        assert_eq!(again.source(), Some("Zillow"));
        assert_eq!(zillow.call_count(), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_skips_cache() {
        let zillow = MockEngine::new("Zillow").always(MockOutcome::Found(listing_with_images(2)));
        let resolver = resolver(vec![zillow.clone()], RecordingCache::new());

        resolver.resolve(&ResolveRequest::new("acme", "1 Main St")).await.unwrap();
        let forced = resolver
            .resolve(&ResolveRequest::new("acme", "1 Main St").with_force_refresh(true))
            .await
            .unwrap();
        assert_eq!(forced.source(), Some("Zillow"));
        assert_eq!(zillow.call_count(), 2);
    }

    #[tokio::test]
    async fn test_validation_error_reaches_no_engine() {
        let zillow = MockEngine::new("Zillow");
        let resolver = resolver(vec![zillow.clone()], RecordingCache::new());

        let err = resolver.resolve(&ResolveRequest::new("acme", " ")).await.unwrap_err();
        assert!(matches!(err, ResolveError::Validation(_)));
        assert_eq!(zillow.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_resolve_writes_nothing() {
        let zillow = MockEngine::new("Zillow").always(MockOutcome::Hang(Duration::from_secs(5)));
        let cache = RecordingCache::new();
        let resolver = resolver(vec![zillow], cache.clone());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = resolver
            .resolve_with_cancel(&ResolveRequest::new("acme", "1 Main St"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Cancelled));
        assert_eq!(cache.puts(), 0);
    }

    #[tokio::test]
    async fn test_title_only_request() {
        let jenna = MockEngine::new("JennaCooperLA").with_direct_title(listing_with_images(3));
        let resolver = resolver(vec![MockEngine::new("Zillow"), jenna.clone()], RecordingCache::new());

        let request = ResolveRequest::new("jenna_cooper_la", "").with_title("Croft House");
        let result = resolver.resolve(&request).await.unwrap();
        assert_eq!(result.status().state(), ActionState::Success);
        assert_eq!(result.source(), Some("JennaCooperLA"));
    }
}
