//! Listing data: raw engine output and the validated record built from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known keys in `MlsInfo::specs`.
pub mod spec_keys {
    pub const BEDS: &str = "beds";
    pub const BATH: &str = "bath";
    pub const LIVING_SIZE: &str = "living_size";
    pub const LOT_SIZE: &str = "lot_size";
    pub const PROPERTY_TYPE: &str = "property_type";
}

/// Listing data as an engine scraped it, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlsInfo {
    pub mls_id: Option<String>,

    /// Price exactly as the source rendered it
    pub list_price: Option<String>,

    pub description: Option<String>,

    #[serde(default)]
    pub specs: BTreeMap<String, String>,

    /// Media URLs in source order; may contain `srcset` strings
    #[serde(default)]
    pub media: Vec<String>,

    /// Listing status as reported by the source
    pub status: Option<String>,

    /// Page the data came from
    pub source_url: Option<String>,

    /// Display address as the source spells it
    pub address: Option<String>,
}

impl MlsInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mls_id(mut self, id: impl Into<String>) -> Self {
        self.mls_id = Some(id.into());
        self
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.list_price = Some(price.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_spec(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.specs.insert(key.into(), value.into());
        self
    }

    pub fn with_media(mut self, media: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.media = media.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Add a spec only when the source had a value for it.
    pub fn set_spec_opt(&mut self, key: &str, value: Option<String>) {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            self.specs.insert(key.to_string(), value);
        }
    }
}

/// A validated property record.
///
/// Every media URL has passed image validation and the list is bounded by
/// the configured maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Cache fingerprint; also the id used to purge
    pub id: String,

    pub address: String,

    pub mls_id: Option<String>,
    pub list_price: Option<String>,
    pub description: Option<String>,

    #[serde(default)]
    pub specs: BTreeMap<String, String>,

    #[serde(default)]
    pub media: Vec<String>,

    pub status: Option<String>,

    /// Engine that produced the data
    pub extraction_engine: String,

    pub extraction_time: DateTime<Utc>,

    /// Blob store prefix holding archived media, once archived
    pub media_storage_path: Option<String>,
}

impl PropertyRecord {
    /// Build a record from engine output whose media has already been filtered.
    pub fn from_mls(
        id: impl Into<String>,
        address: impl Into<String>,
        engine: impl Into<String>,
        info: MlsInfo,
        media: Vec<String>,
    ) -> Self {
        let address = address.into();
        Self {
            id: id.into(),
            address: info.address.unwrap_or(address),
            mls_id: info.mls_id,
            list_price: info.list_price,
            description: info.description,
            specs: info.specs,
            media,
            status: info.status,
            extraction_engine: engine.into(),
            extraction_time: Utc::now(),
            media_storage_path: None,
        }
    }

    /// One-line summary: `"3 BED 2 BATH 1691 SF 5600 SF Lot $3288000"`.
    ///
    /// Missing values are skipped.
    pub fn subtitle(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let spec = |key: &str| self.specs.get(key).filter(|v| !v.trim().is_empty());

        if let Some(beds) = spec(spec_keys::BEDS) {
            parts.push(format!("{beds} BED"));
        }
        if let Some(bath) = spec(spec_keys::BATH) {
            parts.push(format!("{bath} BATH"));
        }
        if let Some(living) = spec(spec_keys::LIVING_SIZE) {
            parts.push(format!("{living} SF"));
        }
        if let Some(lot) = spec(spec_keys::LOT_SIZE) {
            parts.push(format!("{lot} SF Lot"));
        }
        if let Some(price) = self.list_price.as_deref().filter(|p| !p.trim().is_empty()) {
            if price.starts_with('$') {
                parts.push(price.to_string());
            } else {
                parts.push(format!("${price}"));
            }
        }

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(info: MlsInfo) -> PropertyRecord {
        let media = info.media.clone();
        PropertyRecord::from_mls("id", "1 Main St", "Zillow", info, media)
    }

    #[test]
    fn test_subtitle_full() {
        let info = MlsInfo::new()
            .with_price("3288000")
            .with_spec(spec_keys::BEDS, "3")
            .with_spec(spec_keys::BATH, "2")
            .with_spec(spec_keys::LIVING_SIZE, "1691")
            .with_spec(spec_keys::LOT_SIZE, "5600");
        assert_eq!(record(info).subtitle(), "3 BED 2 BATH 1691 SF 5600 SF Lot $3288000");
    }

    #[test]
    fn test_subtitle_skips_missing() {
        let info = MlsInfo::new()
            .with_price("$1,250,000")
            .with_spec(spec_keys::BEDS, "4");
        assert_eq!(record(info).subtitle(), "4 BED $1,250,000");
    }

    #[test]
    fn test_source_address_preferred() {
        let info = MlsInfo::new().with_address("337 N Croft Ave, Los Angeles");
        assert_eq!(record(info).address, "337 N Croft Ave, Los Angeles");
    }

    #[test]
    fn test_set_spec_opt_ignores_blank() {
        let mut info = MlsInfo::new();
        info.set_spec_opt(spec_keys::BEDS, Some(" ".into()));
        info.set_spec_opt(spec_keys::BATH, None);
        info.set_spec_opt(spec_keys::LOT_SIZE, Some("5600".into()));
        assert_eq!(info.specs.len(), 1);
    }
}
