//! Coldwell Banker: suggest API, then the listing page's `__NEXT_DATA__`.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::common::{first_pointer_text, next_data, pointer_text, status_or_active, value_text, SiteClient};
use crate::error::{FetchError, FetchResult};
use crate::normalize::abbreviate;
use crate::traits::Engine;
use crate::types::{spec_keys, Address, MlsInfo};

const BASE_URL: &str = "https://www.coldwellbanker.com";

pub struct ColdwellBanker {
    client: SiteClient,
    base_url: String,
}

impl Default for ColdwellBanker {
    fn default() -> Self {
        Self::new(SiteClient::new())
    }
}

impl ColdwellBanker {
    pub const NAME: &'static str = "ColdwellBanker";

    pub fn new(client: SiteClient) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Suggestion for the first candidate the API recognises as a property.
    async fn find_suggestion(&self, address: &Address) -> FetchResult<Option<Value>> {
        let mut candidates = address.plausible_matches();
        for extra in [abbreviate(address.formatted()), abbreviate(address.input())] {
            let extra = extra.to_lowercase();
            if !candidates.iter().any(|c| c.to_lowercase() == extra) {
                candidates.push(extra);
            }
        }

        for candidate in candidates {
            debug!(engine = Self::NAME, candidate = %candidate, "Searching");
            let url = format!(
                "{}/api/suggest/property,listing/{}",
                self.base(),
                urlencoding::encode(&candidate)
            );
            let response = match self.client.get_json(&url).await {
                Ok(response) => response,
                Err(FetchError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            };

            if response.pointer("/results/0/entityType").and_then(Value::as_str) == Some("property") {
                return Ok(response.pointer("/results/0/suggestions/0").cloned());
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Engine for ColdwellBanker {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn get_property_info(
        &self,
        address: &Address,
        _title: Option<&str>,
        _debug: bool,
    ) -> FetchResult<Option<MlsInfo>> {
        info!(engine = Self::NAME, address = %address, "Fetching listing");

        let Some(suggestion) = self.find_suggestion(address).await? else {
            warn!(engine = Self::NAME, address = %address, "No listing found");
            return Ok(None);
        };
        let Some(path) = pointer_text(&suggestion, "/canonicalListingURL") else {
            return Ok(None);
        };
        let search_status = pointer_text(&suggestion, "/status");

        let url = format!("{}{}", self.base(), path);
        let html = self.client.get_text(&url).await?;
        let data = next_data(&html).ok_or_else(|| FetchError::parse(&url, "listing page has no __NEXT_DATA__"))?;
        let Some(details) = data.pointer("/props/pageProps/propertyDetails") else {
            return Ok(None);
        };

        Ok(Some(extract_details(details, search_status).with_source_url(url)))
    }
}

/// Search-result status wins over anything on the page.
pub fn extract_details(details: &Value, search_status: Option<String>) -> MlsInfo {
    let price = pointer_text(details, "/finances/finances/listPrice");
    let status = search_status.or_else(|| {
        first_pointer_text(
            details,
            &["/about/status", "/about/listingStatus", "/finances/status", "/summary/status"],
        )
    });

    let media = details
        .pointer("/media/images")
        .and_then(Value::as_array)
        .map(|images| images.iter().filter_map(|i| i.get("mediaUrl").and_then(value_text)).collect())
        .unwrap_or_default();

    let mut info = MlsInfo {
        mls_id: pointer_text(details, "/about/mlsListingId"),
        status: status_or_active(status, price.as_deref()),
        list_price: price,
        description: pointer_text(details, "/about/description"),
        media,
        ..MlsInfo::default()
    };
    info.set_spec_opt(spec_keys::PROPERTY_TYPE, pointer_text(details, "/about/homeFacts/propertyType"));
    info.set_spec_opt(spec_keys::BEDS, pointer_text(details, "/summary/bedroomsTotal"));
    info.set_spec_opt(spec_keys::BATH, pointer_text(details, "/summary/bathroomsTotal"));
    info.set_spec_opt(spec_keys::LIVING_SIZE, pointer_text(details, "/summary/listingSqFt"));
    info.set_spec_opt(spec_keys::LOT_SIZE, pointer_text(details, "/lot/lotSizeSquareFeet"));
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_status_takes_precedence() {
        let details = json!({
            "about": {"mlsListingId": "CB-1", "status": "Active", "description": "Colonial"},
            "finances": {"finances": {"listPrice": "$849,000"}},
            "summary": {"bedroomsTotal": 4, "bathroomsTotal": 2.5, "listingSqFt": 2400},
            "lot": {"lotSizeSquareFeet": 8712},
            "media": {"images": [{"mediaUrl": "https://m.cbhomes.com/p/1.jpg"}, {"mediaUrl": "https://m.cbhomes.com/p/2.jpg"}]}
        });

        let info = extract_details(&details, Some("Sold".into()));
        assert_eq!(info.status.as_deref(), Some("Sold"));
        assert_eq!(info.media.len(), 2);
        assert_eq!(info.specs.get("bath").map(String::as_str), Some("2.5"));

        let info = extract_details(&details, None);
        assert_eq!(info.status.as_deref(), Some("Active"));
    }
}
