//! End-to-end resolution scenarios against mock engines.
//!
//! These tests verify the resolution workflow:
//! 1. Chain lookup for the tenant
//! 2. Engine attempts and validation
//! 3. Cache writes and cache hits
//! 4. Purge of records and archived media

use std::sync::Arc;
use std::time::Duration;

use property_resolver::{
    testing::{listing_with_images, MockEngine, MockEngineCall, MockMediaSource, MockOutcome, RecordingCache},
    ActionState, Engine, EngineRegistry, FetchPropertyRequest, MemoryBlobStore, PropertyResolver, PurgeRequest,
    ResolveRequest, ResolverConfig, SharedEngine, StatusValidator, CACHE_SOURCE,
};

const ENGINE_NAMES: &[&str] = &["Zillow", "Corcoran", "ColdwellBanker", "Compass", "JennaCooperLA", "DanielGale"];

/// Helper holding the mocks so tests can assert on them after resolving.
struct Harness {
    engines: Vec<MockEngine>,
    cache: RecordingCache,
    blobs: MemoryBlobStore,
    resolver: PropertyResolver<RecordingCache, MemoryBlobStore>,
}

impl Harness {
    fn new(configure: impl Fn(MockEngine) -> MockEngine) -> Self {
        let engines: Vec<MockEngine> = ENGINE_NAMES.iter().map(|n| configure(MockEngine::new(*n))).collect();
        let shared: Vec<SharedEngine> = engines.iter().map(|e| Arc::new(e.clone()) as SharedEngine).collect();
        let cache = RecordingCache::new();
        let blobs = MemoryBlobStore::new();
        let resolver = PropertyResolver::new(
            Arc::new(EngineRegistry::new(shared).unwrap()),
            Arc::new(StatusValidator::embedded()),
            cache.clone(),
            blobs.clone(),
            ResolverConfig::default().with_retry_delay(Duration::from_millis(1)),
        );
        Self {
            engines,
            cache,
            blobs,
            resolver,
        }
    }

    fn engine(&self, name: &str) -> &MockEngine {
        self.engines
            .iter()
            .find(|e| e.name() == name)
            .unwrap()
    }
}

#[tokio::test]
async fn test_jenna_cooper_primary_engine_answers() {
    let harness = Harness::new(|engine| {
        if engine.name() == "JennaCooperLA" {
            engine.always(MockOutcome::Found(listing_with_images(6)))
        } else {
            engine
        }
    });

    let request = ResolveRequest::new("jenna_cooper_la", "337 NORTH CROFT AVENUE");
    let result = harness.resolver.resolve(&request).await.unwrap();

    assert_eq!(result.status().state(), ActionState::Success);
    assert_eq!(result.source(), Some("JennaCooperLA"));
    assert_eq!(result.property().unwrap().media.len(), 6);
    assert_eq!(harness.engine("Compass").call_count(), 0);
}

#[tokio::test]
async fn test_unknown_tenant_failure_is_not_cached() {
    let harness = Harness::new(|engine| engine);

    let request = ResolveRequest::new("acme", "1600 Amphitheatre Pkwy, Mountain View, CA");
    let result = harness.resolver.resolve(&request).await.unwrap();

    assert_eq!(result.status().state(), ActionState::Failure);
    assert!(!result.status().reason().unwrap().is_empty());
    assert!(result.property().is_none());
    assert_eq!(harness.cache.puts(), 0);
    assert!(harness.cache.store().is_empty());

    // Only the default chain was consulted
    assert_eq!(harness.engine("Zillow").call_count(), 1);
    for name in ENGINE_NAMES.iter().filter(|n| **n != "Zillow") {
        assert_eq!(harness.engine(name).call_count(), 0, "{name} should not be called");
    }
}

#[tokio::test]
async fn test_second_resolve_is_served_from_cache() {
    let harness = Harness::new(|engine| engine.always(MockOutcome::Found(listing_with_images(3))));

    let request = ResolveRequest::new("zillow", "3144 Nichols Canyon Rd, Los Angeles, CA").with_request_id("req-1");
    let first = harness.resolver.resolve(&request).await.unwrap();
    let second = harness.resolver.resolve(&request).await.unwrap();

    assert_eq!(first.source(), Some("Zillow"));
    assert_eq!(second.source(), Some(CACHE_SOURCE));
    assert_eq!(second.request_id(), first.request_id());
    assert_eq!(second.status(), first.status());
    assert_eq!(second.last_updated(), first.last_updated());
    assert_eq!(second.property(), first.property());
    assert_eq!(harness.engine("Zillow").call_count(), 1);
}

#[tokio::test]
async fn test_inactive_primary_falls_through_to_fallback() {
    let harness = Harness::new(|engine| match engine.name().to_string().as_str() {
        "Compass" => engine.always(MockOutcome::Found(listing_with_images(4).with_status("Sold"))),
        "ColdwellBanker" => engine.always(MockOutcome::Found(listing_with_images(2))),
        _ => engine,
    });

    let result = harness
        .resolver
        .resolve(&ResolveRequest::new("compass", "245 East 93rd Street, New York, NY"))
        .await
        .unwrap();

    assert_eq!(result.source(), Some("ColdwellBanker"));
    assert_eq!(harness.engine("Compass").call_count(), 1);
}

#[tokio::test]
async fn test_title_hint_is_passed_to_engines() {
    let harness = Harness::new(|engine| engine.always(MockOutcome::Found(listing_with_images(1))));

    let request = ResolveRequest::new("zillow", "1 Main St").with_title("  Canyon House ");
    harness.resolver.resolve(&request).await.unwrap();

    assert_eq!(
        harness.engine("Zillow").calls(),
        vec![MockEngineCall::GetPropertyInfo {
            address: "1 Main St".into(),
            title: Some("Canyon House".into()),
        }]
    );
}

#[tokio::test]
async fn test_purge_without_media() {
    let harness = Harness::new(|engine| engine.always(MockOutcome::Found(listing_with_images(2))));
    let result = harness
        .resolver
        .resolve(&ResolveRequest::new("zillow", "1 Main St"))
        .await
        .unwrap();
    let property_id = result.property().unwrap().id.clone();

    let outcome = harness.resolver.purge(&property_id).await;
    assert!(outcome.record_deleted);
    assert!(!outcome.media_deleted);

    let again = harness.resolver.purge(&property_id).await;
    assert!(!again.record_deleted);
    assert!(!again.media_deleted);
}

#[tokio::test]
async fn test_purge_survives_cache_outage() {
    let harness = Harness::new(|engine| engine);
    harness.cache.set_failing(true);

    let response = harness
        .resolver
        .purge_request(PurgeRequest {
            property_id: "missing".into(),
        })
        .await;
    assert!(!response.record_deleted);
    assert_eq!(response.message, "No cache was purged for property missing");
}

#[tokio::test]
async fn test_archived_media_is_purged_with_record() {
    let images = listing_with_images(2);
    let source = images
        .media
        .iter()
        .fold(MockMediaSource::new(), |source, url| source.with_file(url.clone(), "jpeg-bytes"));

    let mut harness = Harness::new(|engine| engine.always(MockOutcome::Found(listing_with_images(2))));
    harness.resolver = harness.resolver.with_media_source(Arc::new(source));

    let result = harness
        .resolver
        .resolve(&ResolveRequest::new("zillow", "1 Main St"))
        .await
        .unwrap();
    let record = result.property().unwrap();
    assert_eq!(record.media_storage_path.as_deref(), Some(format!("{}/images", record.id).as_str()));
    assert_eq!(harness.blobs.paths().len(), 2);

    let response = harness
        .resolver
        .purge_request(PurgeRequest {
            property_id: record.id.clone(),
        })
        .await;
    assert!(response.record_deleted);
    assert!(response.media_deleted);
    assert!(harness.blobs.paths().is_empty());
    assert!(response.message.starts_with("Cache purge completed"));
}

#[tokio::test]
async fn test_fetch_request_round_trip() {
    let harness = Harness::new(|engine| engine.always(MockOutcome::Found(listing_with_images(2))));

    let request: FetchPropertyRequest = serde_json::from_value(serde_json::json!({
        "request_id": "abc-123",
        "property_address": "14 Shorecliff Place, Great Neck, NY, USA",
        "address_input_type": "AutoComplete",
    }))
    .unwrap();
    let response = harness.resolver.fetch(request, "daniel_gale").await.unwrap();

    assert_eq!(response.request_id, "abc-123");
    assert_eq!(response.result.state(), ActionState::Success);
    assert_eq!(response.source.as_deref(), Some("DanielGale"));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["result"]["state"], "Success");
    assert_eq!(json["property_details"]["extraction_engine"], "DanielGale");
}
