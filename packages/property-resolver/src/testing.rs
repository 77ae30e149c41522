//! Test doubles for the resolver seams.
//!
//! Useful for exercising resolution logic without touching real listing
//! sites or storage backends.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::error::{CacheError, CacheResult, FetchError, FetchResult};
use crate::media::MediaSource;
use crate::stores::MemoryCache;
use crate::traits::{CacheEntry, CacheGateway, Engine};
use crate::types::{Address, MlsInfo};

/// Scripted answer for one [`MockEngine`] call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Found(MlsInfo),
    NoMatch,
    NotFound,
    /// Recoverable 503 from the source
    Unavailable,
    /// Recoverable timeout
    Timeout,
    /// Sleep before answering `NoMatch`; drives timeout and cancel tests
    Hang(Duration),
}

impl MockOutcome {
    async fn play(self, name: &str) -> FetchResult<Option<MlsInfo>> {
        let url = format!("mock://{name}");
        match self {
            MockOutcome::Found(info) => Ok(Some(info)),
            MockOutcome::NoMatch => Ok(None),
            MockOutcome::NotFound => Err(FetchError::NotFound { url }),
            MockOutcome::Unavailable => Err(FetchError::Status { url, status: 503 }),
            MockOutcome::Timeout => Err(FetchError::Timeout {
                url,
                after: Duration::from_secs(30),
            }),
            MockOutcome::Hang(delay) => {
                tokio::time::sleep(delay).await;
                Ok(None)
            }
        }
    }
}

/// Record of a call made to a mock engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEngineCall {
    GetPropertyInfo { address: String, title: Option<String> },
    DirectTitle { title: String },
}

/// A mock engine that plays back scripted outcomes in order.
///
/// Once the script runs out every call gets the fallback outcome
/// (`NoMatch` unless set with [`MockEngine::always`]).
pub struct MockEngine {
    name: String,
    script: Arc<RwLock<VecDeque<MockOutcome>>>,
    fallback: Arc<RwLock<MockOutcome>>,
    direct_title: Option<MlsInfo>,
    calls: Arc<RwLock<Vec<MockEngineCall>>>,
}

impl MockEngine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Arc::default(),
            fallback: Arc::new(RwLock::new(MockOutcome::NoMatch)),
            direct_title: None,
            calls: Arc::default(),
        }
    }

    /// Queue an outcome for the next unanswered call.
    pub fn with_outcome(self, outcome: MockOutcome) -> Self {
        self.script
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
        self
    }

    /// Outcome for every call once the script is exhausted.
    pub fn always(self, outcome: MockOutcome) -> Self {
        *self.fallback.write().unwrap_or_else(PoisonError::into_inner) = outcome;
        self
    }

    /// Enable direct-by-title lookups answering with `info`.
    pub fn with_direct_title(mut self, info: MlsInfo) -> Self {
        self.direct_title = Some(info);
        self
    }

    pub fn calls(&self) -> Vec<MockEngineCall> {
        self.calls.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn record(&self, call: MockEngineCall) {
        self.calls.write().unwrap_or_else(PoisonError::into_inner).push(call);
    }

    fn next_outcome(&self) -> MockOutcome {
        let scripted = self
            .script
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        scripted.unwrap_or_else(|| self.fallback.read().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

impl Clone for MockEngine {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            script: Arc::clone(&self.script),
            fallback: Arc::clone(&self.fallback),
            direct_title: self.direct_title.clone(),
            calls: Arc::clone(&self.calls),
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_property_info(
        &self,
        address: &Address,
        title: Option<&str>,
        _debug: bool,
    ) -> FetchResult<Option<MlsInfo>> {
        self.record(MockEngineCall::GetPropertyInfo {
            address: address.formatted().to_string(),
            title: title.map(str::to_string),
        });
        self.next_outcome().play(&self.name).await
    }

    fn supports_direct_title(&self) -> bool {
        self.direct_title.is_some()
    }

    async fn try_direct_url_by_title(&self, title: &str) -> FetchResult<Option<MlsInfo>> {
        self.record(MockEngineCall::DirectTitle {
            title: title.to_string(),
        });
        Ok(self.direct_title.clone())
    }
}

/// Record of a call made to a [`RecordingCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCall {
    Get(String),
    Put(String),
    Delete(String),
}

/// Memory cache that records every call and can be switched to fail.
#[derive(Clone, Default)]
pub struct RecordingCache {
    inner: MemoryCache,
    failing: Arc<RwLock<bool>>,
    calls: Arc<RwLock<Vec<CacheCall>>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation fails with [`CacheError::Unavailable`].
    pub fn failing() -> Self {
        let cache = Self::default();
        cache.set_failing(true);
        cache
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.write().unwrap_or_else(PoisonError::into_inner) = failing;
    }

    pub fn calls(&self) -> Vec<CacheCall> {
        self.calls.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn puts(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CacheCall::Put(_)))
            .count()
    }

    /// Backing storage, for seeding and inspection.
    pub fn store(&self) -> &MemoryCache {
        &self.inner
    }

    fn enter(&self, call: CacheCall) -> CacheResult<()> {
        self.calls.write().unwrap_or_else(PoisonError::into_inner).push(call);
        if *self.failing.read().unwrap_or_else(PoisonError::into_inner) {
            return Err(CacheError::Unavailable("cache offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheGateway for RecordingCache {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        self.enter(CacheCall::Get(key.to_string()))?;
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, entry: &CacheEntry) -> CacheResult<()> {
        self.enter(CacheCall::Put(key.to_string()))?;
        self.inner.put(key, entry).await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.enter(CacheCall::Delete(key.to_string()))?;
        self.inner.delete(key).await
    }
}

/// Media source serving canned bytes by URL; anything else is a 404.
#[derive(Clone, Default)]
pub struct MockMediaSource {
    files: Arc<RwLock<HashMap<String, Bytes>>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, url: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), data.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn download(&self, url: &str) -> FetchResult<Bytes> {
        self.requests
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound { url: url.to_string() })
    }
}

/// Listing with `count` valid jpeg URLs and an active status.
pub fn listing_with_images(count: usize) -> MlsInfo {
    MlsInfo::new()
        .with_price("$1,000,000")
        .with_status("Active")
        .with_media((1..=count).map(|i| format!("https://photos.example.com/listing/{i}.jpg")))
}
