//! Property Resolution Library
//!
//! Turns a free-text address or a listing title into a validated property
//! record (price, specs, description and a bounded set of media URLs) by
//! walking a tenant-specific chain of listing sources until one answers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use property_resolver::engines::{default_engines, SiteClient};
//! use property_resolver::{EngineRegistry, MemoryBlobStore, MemoryCache, PropertyResolver};
//! use property_resolver::{ResolveRequest, ResolverConfig, StatusValidator};
//! use std::sync::Arc;
//!
//! let config = ResolverConfig::default();
//! let registry = EngineRegistry::new(default_engines(SiteClient::new(), &config, None))?;
//! let resolver = PropertyResolver::new(
//!     Arc::new(registry),
//!     Arc::new(StatusValidator::embedded()),
//!     MemoryCache::new(),
//!     MemoryBlobStore::new(),
//!     config,
//! );
//!
//! let request = ResolveRequest::new("jenna_cooper_la", "337 N Croft Ave, Los Angeles, CA");
//! let result = resolver.resolve(&request).await?;
//! ```
//!
//! # Modules
//!
//! - [`normalize`] - Address canonicalization and alternate spellings
//! - [`validation`] - Listing status and media URL checks
//! - [`engines`] - One scraper per listing platform
//! - [`registry`] - Tenant → engine chain table
//! - [`resolver`] - The resolution manager
//! - [`media`] - Media archival into the blob store
//! - [`stores`] - In-memory cache and blob store
//! - [`testing`] - Mock engines, caches and media sources

pub mod engines;
pub mod error;
pub mod media;
pub mod normalize;
pub mod registry;
pub mod resolver;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;
pub mod validation;

pub use error::{CacheError, ConfigError, FetchError, ImageUrlError, ResolveError, Result, ValidationError};
pub use media::{HttpMediaSource, MediaArchiver, MediaSource};
pub use normalize::{normalize, plausible_matches, NormalizedAddress};
pub use registry::{EngineChain, EngineRegistry, TenantConfig, TenantSummary};
pub use resolver::{fingerprint, PropertyResolver};
pub use stores::{MemoryBlobStore, MemoryCache};
pub use traits::{BlobStore, CacheEntry, CacheGateway, Engine, SharedEngine, StatusSource};
pub use types::{
    spec_keys, ActionState, ActionStatus, Address, AddressInputType, FetchPropertyRequest, FetchPropertyResponse,
    FetchPropertyResult, MlsInfo, PropertyRecord, PurgeOutcome, PurgeRequest, PurgeResponse, ResolveRequest,
    ResolverConfig, CACHE_SOURCE,
};
pub use validation::{ImageUrlValidator, StatusValidator};
