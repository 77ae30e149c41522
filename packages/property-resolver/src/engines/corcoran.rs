//! Corcoran: autocomplete API, then the listing page's `__NEXT_DATA__`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::common::{first_pointer_text, next_data, pointer_text, status_or_active, value_text, SiteClient};
use crate::error::{FetchError, FetchResult};
use crate::traits::Engine;
use crate::types::{spec_keys, Address, MlsInfo};

const API_BASE: &str = "https://backendapi.corcoranlabs.com";
const SITE_BASE: &str = "https://www.corcoran.com";
const SQ_FT_PER_ACRE: f64 = 43_560.0;

pub struct Corcoran {
    client: SiteClient,
    api_base: String,
    site_base: String,
    api_key: Option<String>,
}

impl Default for Corcoran {
    fn default() -> Self {
        Self::new(SiteClient::new())
    }
}

impl Corcoran {
    pub const NAME: &'static str = "Corcoran";

    pub fn new(client: SiteClient) -> Self {
        Self {
            client,
            api_base: API_BASE.to_string(),
            site_base: SITE_BASE.to_string(),
            api_key: None,
        }
    }

    /// Point both the API and the site at one host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.api_base = base_url.clone();
        self.site_base = base_url;
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    async fn search(&self, keyword: &str) -> FetchResult<Option<Value>> {
        let url = format!("{}/api/search/autocomplete/poc", self.api_base.trim_end_matches('/'));
        let payload = json!({
            "page": 1,
            "pageSize": 10,
            "mode": "buy",
            "keywordSearch": keyword,
        });
        let headers: Vec<(&str, &str)> = self
            .api_key
            .as_deref()
            .map(|key| vec![("Be-Api-Key", key)])
            .unwrap_or_default();

        let response = self.client.post_json(&url, &payload, &headers).await?;
        Ok(response.pointer("/listings/items/0").cloned())
    }

    fn listing_url(&self, item: &Value) -> Option<String> {
        let slug = parameterize(
            &["/address1", "/address2", "/borough", "/state", "/zipCode"]
                .iter()
                .filter_map(|p| pointer_text(item, p))
                .collect::<Vec<_>>()
                .join(" "),
        );
        if slug.is_empty() {
            return None;
        }
        let id = pointer_text(item, "/id")?;
        let region = pointer_text(item, "/regionId")?;
        Some(format!(
            "{}/listing/for-sale/{slug}/{id}/regionId/{region}",
            self.site_base.trim_end_matches('/')
        ))
    }
}

#[async_trait]
impl Engine for Corcoran {
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

        for candidate in address.plausible_matches() {
            debug!(engine = Self::NAME, candidate = %candidate, "Searching");
            let Some(item) = self.search(&candidate).await? else {
                continue;
            };
            let Some(url) = self.listing_url(&item) else {
                warn!(engine = Self::NAME, candidate = %candidate, "Could not build listing URL");
                continue;
            };

            let html = match self.client.get_text(&url).await {
                Ok(html) => html,
                Err(FetchError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            };
            let Some(data) = next_data(&html) else {
                warn!(engine = Self::NAME, url = %url, "Listing page has no embedded data");
                continue;
            };
            let Some(listing) = data.pointer("/props/pageProps/listing") else {
                continue;
            };

            let info = extract_listing(listing);
            if info.media.is_empty() {
                warn!(engine = Self::NAME, url = %url, "Listing has no media");
                continue;
            }
            return Ok(Some(info.with_source_url(url)));
        }

        warn!(engine = Self::NAME, address = %address, "No listing found");
        Ok(None)
    }
}

pub fn extract_listing(listing: &Value) -> MlsInfo {
    let price = pointer_text(listing, "/price");
    let status = first_pointer_text(listing, &["/status", "/listingStatus", "/mlsStatus", "/marketingStatus"]);

    let media = listing
        .get("media")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|m| m.get("url").and_then(value_text)).collect())
        .unwrap_or_default();

    let lot_size = listing
        .get("acreage")
        .and_then(|a| a.as_f64().or_else(|| a.as_str().and_then(|s| s.parse().ok())))
        .map(|acres| format!("{}", (acres * SQ_FT_PER_ACRE).round() as u64));

    let mut info = MlsInfo {
        mls_id: pointer_text(listing, "/leadListingId"),
        status: status_or_active(status, price.as_deref()),
        list_price: price,
        description: pointer_text(listing, "/description"),
        media,
        ..MlsInfo::default()
    };
    info.set_spec_opt(spec_keys::PROPERTY_TYPE, pointer_text(listing, "/propertyType"));
    info.set_spec_opt(spec_keys::BEDS, pointer_text(listing, "/bedrooms"));
    info.set_spec_opt(spec_keys::BATH, pointer_text(listing, "/bathrooms"));
    info.set_spec_opt(spec_keys::LIVING_SIZE, pointer_text(listing, "/squareFootage"));
    info.set_spec_opt(spec_keys::LOT_SIZE, lot_size);
    info
}

/// Lower-case, runs of non-alphanumerics collapsed to single hyphens.
fn parameterize(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AddressInputType;
    use httpmock::prelude::*;

    #[test]
    fn test_parameterize() {
        assert_eq!(parameterize("245 East 93rd St, #12B New York NY 10128"), "245-east-93rd-st-12b-new-york-ny-10128");
    }

    #[test]
    fn test_extract_listing_acreage() {
        let listing = json!({
            "leadListingId": "RLS1234",
            "price": 1250000,
            "acreage": 0.25,
            "bedrooms": 2,
            "media": [{"url": "https://media-cloud.corcoranlabs.com/ListingFullAPI/a"}]
        });
        let info = extract_listing(&listing);
        assert_eq!(info.specs.get("lot_size").map(String::as_str), Some("10890"));
        assert_eq!(info.status.as_deref(), Some("Active"));
        assert_eq!(info.media.len(), 1);
    }

    #[tokio::test]
    async fn test_search_then_listing_page() {
        let server = MockServer::start_async().await;
        let search = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/search/autocomplete/poc")
                    .header("Be-Api-Key", "test-key");
                then.status(200).json_body(json!({
                    "listings": {"items": [{
                        "id": 7788,
                        "regionId": 1,
                        "address1": "245 East 93rd Street",
                        "borough": "Manhattan",
                        "state": "NY",
                        "zipCode": "10128"
                    }]}
                }));
            })
            .await;
        let listing_data = json!({"props": {"pageProps": {"listing": {
            "leadListingId": "RLS7788",
            "price": "$995,000",
            "status": "Active",
            "media": [{"url": "https://media-cloud.corcoranlabs.com/ListingFullAPI/x"}]
        }}}});
        let page = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/listing/for-sale/245-east-93rd-street-manhattan-ny-10128/7788/regionId/1");
                then.status(200).body(format!(
                    r#"<script id="__NEXT_DATA__" type="application/json">{listing_data}</script>"#
                ));
            })
            .await;

        let engine = Corcoran::default()
            .with_base_url(server.base_url())
            .with_api_key("test-key");
        let address = Address::new("245 East 93rd Street, New York, NY", AddressInputType::FreeForm, None);
        let info = engine.get_property_info(&address, None, false).await.unwrap().unwrap();

        search.assert_async().await;
        page.assert_async().await;
        assert_eq!(info.mls_id.as_deref(), Some("RLS7788"));
        assert_eq!(info.list_price.as_deref(), Some("$995,000"));
    }
}
