//! Trait seams between the resolver and its collaborators.
//!
//! - [`engine::Engine`]: one listing source
//! - [`cache::CacheGateway`] / [`cache::BlobStore`]: persistence for records and media
//! - [`status::StatusSource`]: where the status vocabulary comes from

pub mod cache;
pub mod engine;
pub mod status;

pub use cache::{BlobStore, CacheEntry, CacheGateway};
pub use engine::{Engine, SharedEngine};
pub use status::{PlatformStatuses, StatusSource, StatusVocabulary};
