//! Action status reported to callers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Lifecycle state of a fetch or purge action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionState {
    Pending,
    Success,
    Failure,
}

impl ActionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionState::Pending => "Pending",
            ActionState::Success => "Success",
            ActionState::Failure => "Failure",
        }
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State names compare case-insensitively.
impl FromStr for ActionState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ActionState::Pending),
            "success" => Ok(ActionState::Success),
            "failure" => Ok(ActionState::Failure),
            _ => Err(ValidationError::UnknownState(s.to_string())),
        }
    }
}

impl Serialize for ActionState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// State plus an optional reason. A `Failure` always carries a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawActionStatus")]
pub struct ActionStatus {
    state: ActionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Deserialize)]
struct RawActionStatus {
    state: ActionState,
    #[serde(default)]
    reason: Option<String>,
}

impl TryFrom<RawActionStatus> for ActionStatus {
    type Error = ValidationError;

    fn try_from(raw: RawActionStatus) -> Result<Self, Self::Error> {
        ActionStatus::new(raw.state, raw.reason)
    }
}

impl ActionStatus {
    pub fn new(state: ActionState, reason: Option<String>) -> Result<Self, ValidationError> {
        let reason = reason.filter(|r| !r.trim().is_empty());
        if state == ActionState::Failure && reason.is_none() {
            return Err(ValidationError::FailureWithoutReason);
        }
        Ok(Self { state, reason })
    }

    pub fn pending() -> Self {
        Self {
            state: ActionState::Pending,
            reason: None,
        }
    }

    pub fn success() -> Self {
        Self {
            state: ActionState::Success,
            reason: None,
        }
    }

    pub fn failure(reason: impl Into<String>) -> Result<Self, ValidationError> {
        Self::new(ActionState::Failure, Some(reason.into()))
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.state == ActionState::Success
    }
}
