//! Platform-specific listing status checks.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, error, warn};

use crate::error::ConfigError;
use crate::traits::status::{PlatformStatuses, StatusSource, StatusVocabulary};

const EMBEDDED_VOCABULARY: &str = include_str!("../../config/platforms.statuses.json");

/// Vocabulary compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedStatusSource;

impl StatusSource for EmbeddedStatusSource {
    fn load(&self) -> Result<StatusVocabulary, ConfigError> {
        Ok(serde_json::from_str(EMBEDDED_VOCABULARY)?)
    }
}

/// Vocabulary read from a JSON file.
#[derive(Debug, Clone)]
pub struct FileStatusSource {
    path: PathBuf,
}

impl FileStatusSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatusSource for FileStatusSource {
    fn load(&self) -> Result<StatusVocabulary, ConfigError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Decides whether a scraped status means the listing is gone.
///
/// Read-only after construction; share it behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct StatusValidator {
    /// Lower-cased platform → lower-cased statuses
    platforms: HashMap<String, PlatformStatuses>,
}

impl StatusValidator {
    /// Load from a source. A failed load is logged and leaves the
    /// vocabulary empty, so nothing is ever considered inactive.
    pub fn from_source(source: &dyn StatusSource) -> Self {
        match source.load() {
            Ok(vocabulary) => Self::from_vocabulary(vocabulary),
            Err(e) => {
                error!(error = %e, "Failed to load status vocabulary");
                Self::default()
            }
        }
    }

    pub fn embedded() -> Self {
        Self::from_source(&EmbeddedStatusSource)
    }

    pub fn from_vocabulary(vocabulary: StatusVocabulary) -> Self {
        let lower = |statuses: Vec<String>| statuses.into_iter().map(|s| s.trim().to_lowercase()).collect();
        let platforms = vocabulary
            .into_iter()
            .map(|(platform, statuses)| {
                (
                    platform.to_lowercase(),
                    PlatformStatuses {
                        active: lower(statuses.active),
                        inactive: lower(statuses.inactive),
                    },
                )
            })
            .collect();
        Self { platforms }
    }

    /// True only when the status is listed as inactive for the platform.
    pub fn is_inactive(&self, status: Option<&str>, platform: &str) -> bool {
        let status = match status.map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => return false,
        };
        if platform.is_empty() {
            return false;
        }

        let Some(statuses) = self.platforms.get(&platform.to_lowercase()) else {
            warn!(platform = %platform, "No status configuration for platform");
            return false;
        };

        let inactive = statuses.inactive.contains(&status.to_lowercase());
        debug!(platform = %platform, status = %status, inactive, "Checked listing status");
        inactive
    }

    pub fn platform_statuses(&self, platform: &str) -> Option<&PlatformStatuses> {
        self.platforms.get(&platform.to_lowercase())
    }

    /// Configured platform keys (lower-cased), sorted.
    pub fn platforms(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.platforms.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSource;

    impl StatusSource for BrokenSource {
        fn load(&self) -> Result<StatusVocabulary, ConfigError> {
            Err(ConfigError::Json(serde_json::from_str::<StatusVocabulary>("{").unwrap_err()))
        }
    }

    fn validator() -> StatusValidator {
        let mut vocabulary = StatusVocabulary::new();
        vocabulary.insert(
            "Compass".into(),
            PlatformStatuses {
                active: vec!["Active".into()],
                inactive: vec!["Sold".into(), "Off Market".into()],
            },
        );
        StatusValidator::from_vocabulary(vocabulary)
    }

    #[test]
    fn test_case_insensitive() {
        let v = validator();
        assert!(v.is_inactive(Some("SOLD"), "Compass"));
        assert!(v.is_inactive(Some("sold"), "Compass"));
        assert!(v.is_inactive(Some("off market"), "compass"));
        assert!(!v.is_inactive(Some("Active"), "Compass"));
    }

    #[test]
    fn test_absent_status_or_unknown_platform() {
        let v = validator();
        assert!(!v.is_inactive(None, "Compass"));
        assert!(!v.is_inactive(Some(""), "Compass"));
        assert!(!v.is_inactive(Some("Sold"), "Nowhere"));
        assert!(!v.is_inactive(Some("Sold"), ""));
    }

    #[test]
    fn test_load_failure_is_permissive() {
        let v = StatusValidator::from_source(&BrokenSource);
        assert!(v.platforms().is_empty());
        assert!(!v.is_inactive(Some("Sold"), "Compass"));
    }

    #[test]
    fn test_embedded_vocabulary_covers_engines() {
        let v = StatusValidator::embedded();
        for platform in ["Compass", "ColdwellBanker", "Corcoran", "Zillow", "JennaCooperLA", "DanielGale"] {
            assert!(v.platform_statuses(platform).is_some(), "missing {platform}");
        }
        assert!(v.is_inactive(Some("recently_sold"), "Zillow"));
    }

    #[test]
    fn test_missing_file_is_permissive() {
        let v = StatusValidator::from_source(&FileStatusSource::new("/nonexistent/statuses.json"));
        assert!(!v.is_inactive(Some("Sold"), "Compass"));
    }
}
