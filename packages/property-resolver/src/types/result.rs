//! Requests, results and their wire shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::AddressInputType;
use super::listing::PropertyRecord;
use super::status::{ActionState, ActionStatus};
use crate::error::ValidationError;

/// Source tag for results served from the cache.
pub const CACHE_SOURCE: &str = "cache";

/// A request to resolve one property for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub request_id: String,
    pub tenant: String,
    pub address: String,
    #[serde(default)]
    pub input_type: AddressInputType,
    pub title: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub debug: bool,
}

impl ResolveRequest {
    /// New request with a generated request id.
    pub fn new(tenant: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            tenant: tenant.into(),
            address: address.into(),
            input_type: AddressInputType::default(),
            title: None,
            force_refresh: false,
            debug: false,
        }
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    pub fn with_input_type(mut self, input_type: AddressInputType) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Non-blank title, trimmed.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Reject requests no engine could act on.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_id.trim().is_empty() {
            return Err(ValidationError::MissingRequestId);
        }
        if self.address.trim().is_empty() && self.title().is_none() {
            return Err(ValidationError::MissingAddress);
        }
        Ok(())
    }
}

/// Outcome of a resolution. Carries a record exactly when it succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFetchPropertyResult")]
pub struct FetchPropertyResult {
    request_id: String,
    status: ActionStatus,
    last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    property: Option<PropertyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

#[derive(Deserialize)]
struct RawFetchPropertyResult {
    request_id: String,
    status: ActionStatus,
    last_updated: DateTime<Utc>,
    #[serde(default)]
    property: Option<PropertyRecord>,
    #[serde(default)]
    source: Option<String>,
}

impl TryFrom<RawFetchPropertyResult> for FetchPropertyResult {
    type Error = ValidationError;

    fn try_from(raw: RawFetchPropertyResult) -> Result<Self, Self::Error> {
        let mut result = FetchPropertyResult::new(raw.request_id, raw.status, raw.property, raw.source)?;
        result.last_updated = raw.last_updated;
        Ok(result)
    }
}

impl FetchPropertyResult {
    pub fn new(
        request_id: impl Into<String>,
        status: ActionStatus,
        property: Option<PropertyRecord>,
        source: Option<String>,
    ) -> Result<Self, ValidationError> {
        match (status.state(), property.is_some()) {
            (ActionState::Success, false) => return Err(ValidationError::SuccessWithoutRecord),
            (ActionState::Pending | ActionState::Failure, true) => {
                return Err(ValidationError::RecordWithoutSuccess)
            }
            _ => {}
        }
        Ok(Self {
            request_id: request_id.into(),
            status,
            last_updated: Utc::now(),
            property,
            source,
        })
    }

    pub fn success(request_id: impl Into<String>, record: PropertyRecord, source: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: ActionStatus::success(),
            last_updated: Utc::now(),
            property: Some(record),
            source: Some(source.into()),
        }
    }

    pub fn failure(request_id: impl Into<String>, reason: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(request_id, ActionStatus::failure(reason)?, None, None)
    }

    /// Same result re-tagged for another request and source.
    pub fn reissued(&self, request_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            source: Some(source.into()),
            ..self.clone()
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn status(&self) -> &ActionStatus {
        &self.status
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn property(&self) -> Option<&PropertyRecord> {
        self.property.as_ref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Inbound fetch request from the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPropertyRequest {
    pub request_id: String,
    pub property_address: String,
    #[serde(default)]
    pub address_input_type: AddressInputType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}

impl FetchPropertyRequest {
    pub fn into_resolve_request(self, tenant: impl Into<String>) -> ResolveRequest {
        ResolveRequest {
            request_id: self.request_id,
            tenant: tenant.into(),
            address: self.property_address,
            input_type: self.address_input_type,
            title: self.title,
            force_refresh: self.force_refresh,
            debug: false,
        }
    }
}

/// Outbound fetch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchPropertyResponse {
    pub request_id: String,
    pub result: ActionStatus,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_details: Option<PropertyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl From<FetchPropertyResult> for FetchPropertyResponse {
    fn from(result: FetchPropertyResult) -> Self {
        Self {
            request_id: result.request_id,
            result: result.status,
            last_updated: result.last_updated,
            property_details: result.property,
            source: result.source,
        }
    }
}

/// What a purge removed. Either half may be false independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
    pub record_deleted: bool,
    pub media_deleted: bool,
}

impl PurgeOutcome {
    pub fn any(&self) -> bool {
        self.record_deleted || self.media_deleted
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeRequest {
    pub property_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub message: String,
    pub property_id: String,
    pub record_deleted: bool,
    pub media_deleted: bool,
}

impl PurgeResponse {
    pub fn new(property_id: impl Into<String>, outcome: PurgeOutcome) -> Self {
        let property_id = property_id.into();
        let message = if outcome.any() {
            format!("Cache purge completed for property {property_id}")
        } else {
            format!("No cache was purged for property {property_id}")
        };
        Self {
            message,
            property_id,
            record_deleted: outcome.record_deleted,
            media_deleted: outcome.media_deleted,
        }
    }
}
