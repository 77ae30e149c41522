//! Typed errors for the property resolver.
//!
//! Uses `thiserror` for library errors (not `anyhow`). Engine and cache
//! errors are absorbed by the resolver; only [`ResolveError::Validation`]
//! and [`ResolveError::Cancelled`] ever reach a caller of `resolve`.
//! [`ResolveError::InactiveListing`] is logged as an engine's rejection reason.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the resolution manager.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Malformed request, rejected before any engine is consulted
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Listing exists but its status is stale for the platform
    #[error("listing on {platform} is inactive (status '{status}')")]
    InactiveListing { platform: String, status: String },

    /// Operation was cancelled
    #[error("operation cancelled")]
    Cancelled,
}

/// Construction-time validation failures for requests and result types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("property address is required")]
    MissingAddress,

    #[error("request id is required")]
    MissingRequestId,

    #[error("failed action needs a reason")]
    FailureWithoutReason,

    #[error("successful action needs property details")]
    SuccessWithoutRecord,

    #[error("only a successful action may carry property details")]
    RecordWithoutSuccess,

    #[error("unknown action state: {0}")]
    UnknownState(String),

    #[error("unknown address input type: {0}")]
    UnknownInputType(String),

    #[error("engine chain must not be empty")]
    EmptyChain,
}

/// Errors produced while an engine talks to its source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, connection reset, TLS)
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Source answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Source refused the request (403, bot protection)
    #[error("blocked by {url} (HTTP {status})")]
    Blocked { url: String, status: u16 },

    /// Request or attempt exceeded its deadline
    #[error("timed out after {after:?}: {url}")]
    Timeout { url: String, after: Duration },

    /// Payload could not be understood
    #[error("parse error for {url}: {reason}")]
    Parse { url: String, reason: String },

    /// Source affirmatively has no such listing
    #[error("not found: {url}")]
    NotFound { url: String },
}

impl FetchError {
    /// Whether the resolver may retry the same engine after this error.
    ///
    /// Timeouts, transport failures, rate limiting and 5xx answers are
    /// transient. Parse failures are retried too since scraped pages are
    /// sometimes served half-rendered.
    pub fn is_recoverable(&self) -> bool {
        match self {
            FetchError::Http { .. } | FetchError::Timeout { .. } | FetchError::Parse { .. } => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Blocked { .. } | FetchError::NotFound { .. } => false,
        }
    }

    /// Classify a reqwest error for a URL.
    pub fn from_reqwest(url: impl Into<String>, error: reqwest::Error) -> Self {
        let url = url.into();
        if error.is_timeout() {
            return FetchError::Timeout {
                url,
                after: Duration::ZERO,
            };
        }
        if error.is_decode() {
            return FetchError::Parse {
                url,
                reason: error.to_string(),
            };
        }
        FetchError::Http {
            url,
            source: Box::new(error),
        }
    }

    pub fn parse(url: impl Into<String>, reason: impl Into<String>) -> Self {
        FetchError::Parse {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Cache gateway and blob store failures.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend unreachable or rejected the operation
    #[error("cache backend unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Entry could not be (de)serialized
    #[error("cache entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Media URL inspection failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageUrlError {
    #[error("file extension cannot be extracted from URL {url}")]
    NoExtension { url: String },
}

/// Failures loading static configuration artifacts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for resolver operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Result type alias for engine fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;
