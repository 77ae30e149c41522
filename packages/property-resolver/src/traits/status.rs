//! Status vocabulary source.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConfigError;

/// Known statuses for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStatuses {
    #[serde(rename = "Active", default)]
    pub active: Vec<String>,

    #[serde(rename = "Inactive", default)]
    pub inactive: Vec<String>,
}

/// Platform name → statuses.
pub type StatusVocabulary = HashMap<String, PlatformStatuses>;

/// Loads the status vocabulary once at startup.
pub trait StatusSource: Send + Sync {
    fn load(&self) -> Result<StatusVocabulary, ConfigError>;
}
