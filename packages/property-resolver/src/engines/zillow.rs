//! Zillow: listing pages addressed by search slug, data in embedded JSON.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::common::{
    first_pointer_text, next_data, pointer_text, select_text, status_or_active, value_text, SiteClient,
};
use crate::error::{FetchError, FetchResult};
use crate::traits::Engine;
use crate::types::{spec_keys, Address, MlsInfo};

const BASE_URL: &str = "https://www.zillow.com";

pub struct Zillow {
    client: SiteClient,
    base_url: String,
}

impl Default for Zillow {
    fn default() -> Self {
        Self::new(SiteClient::new())
    }
}

impl Zillow {
    pub const NAME: &'static str = "Zillow";

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

    fn search_url(&self, candidate: &str) -> String {
        format!(
            "{}/homes/for_sale/{}/",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(candidate)
        )
    }
}

#[async_trait]
impl Engine for Zillow {
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
            let url = self.search_url(&candidate);
            debug!(engine = Self::NAME, candidate = %candidate, "Trying address variation");

            let html = match self.client.get_text(&url).await {
                Ok(html) => html,
                Err(FetchError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            };

            if let Some(info) = parse_listing_page(&html, &url)? {
                return Ok(Some(info.with_source_url(url)));
            }
        }

        warn!(engine = Self::NAME, address = %address, "No listing found");
        Ok(None)
    }
}

/// Pull the property object out of a listing page.
///
/// Newer pages keep it in `__NEXT_DATA__` under a JSON-encoded
/// `gdpClientCache`; older ones in the Apollo preload cache.
pub fn parse_listing_page(html: &str, url: &str) -> FetchResult<Option<MlsInfo>> {
    if let Some(data) = next_data(html) {
        let Some(cache) = data
            .pointer("/props/pageProps/componentProps/gdpClientCache")
            .and_then(Value::as_str)
        else {
            return Ok(None);
        };
        let cache: Value =
            serde_json::from_str(cache).map_err(|e| FetchError::parse(url, format!("gdpClientCache: {e}")))?;
        let property = cache
            .as_object()
            .and_then(|entries| entries.values().next())
            .and_then(|entry| entry.get("property"));
        return Ok(property.map(extract_property));
    }

    let Some(apollo) = select_text(html, "script#hdpApolloPreloadedData").into_iter().next() else {
        return Ok(None);
    };
    let outer: Value =
        serde_json::from_str(&apollo).map_err(|e| FetchError::parse(url, format!("apollo preload: {e}")))?;
    let Some(api_cache) = outer.get("apiCache").and_then(Value::as_str) else {
        return Ok(None);
    };
    let api_cache: Value =
        serde_json::from_str(api_cache).map_err(|e| FetchError::parse(url, format!("apiCache: {e}")))?;

    let property = api_cache.as_object().and_then(|entries| {
        entries
            .iter()
            .find(|(key, _)| key.contains("ForSale"))
            .and_then(|(_, entry)| entry.get("property"))
    });
    Ok(property.map(extract_property))
}

pub fn extract_property(property: &Value) -> MlsInfo {
    let price = pointer_text(property, "/price");
    let status = first_pointer_text(
        property,
        &["/homeStatus", "/listingStatus", "/mlsStatus", "/marketingStatus"],
    );

    let media = property
        .get("responsivePhotos")
        .and_then(Value::as_array)
        .map(|photos| photos.iter().filter_map(largest_jpeg).collect())
        .unwrap_or_default();

    let mut info = MlsInfo {
        mls_id: pointer_text(property, "/attributionInfo/mlsId"),
        status: status_or_active(status, price.as_deref()),
        list_price: price,
        description: pointer_text(property, "/description"),
        media,
        address: display_address(property),
        ..MlsInfo::default()
    };
    info.set_spec_opt(spec_keys::PROPERTY_TYPE, pointer_text(property, "/homeType"));
    info.set_spec_opt(spec_keys::BEDS, pointer_text(property, "/bedrooms"));
    info.set_spec_opt(spec_keys::BATH, pointer_text(property, "/bathrooms"));
    info.set_spec_opt(spec_keys::LIVING_SIZE, pointer_text(property, "/livingArea"));
    info.set_spec_opt(spec_keys::LOT_SIZE, pointer_text(property, "/lotSize"));
    info
}

fn largest_jpeg(photo: &Value) -> Option<String> {
    photo
        .pointer("/mixedSources/jpeg")?
        .as_array()?
        .iter()
        .max_by_key(|source| source.get("width").and_then(Value::as_u64).unwrap_or(0))
        .and_then(|source| source.get("url"))
        .and_then(value_text)
}

fn display_address(property: &Value) -> Option<String> {
    let street = pointer_text(property, "/address/streetAddress")?;
    let city = pointer_text(property, "/address/city");
    let state = pointer_text(property, "/address/state");
    let zip = pointer_text(property, "/address/zipcode");

    let region = [state, zip].into_iter().flatten().collect::<Vec<_>>().join(" ");
    let parts: Vec<String> = [Some(street), city, Some(region).filter(|r| !r.is_empty())]
        .into_iter()
        .flatten()
        .collect();
    Some(parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AddressInputType;
    use httpmock::prelude::*;
    use serde_json::json;

    fn property_json() -> Value {
        json!({
            "attributionInfo": {"mlsId": "24-401122"},
            "price": 3288000,
            "description": "Mid-century retreat",
            "homeStatus": "FOR_SALE",
            "homeType": "SINGLE_FAMILY",
            "bedrooms": 3,
            "bathrooms": 2,
            "livingArea": 1691,
            "lotSize": 5600,
            "address": {"streetAddress": "3144 Nichols Canyon Rd", "city": "Los Angeles", "state": "CA", "zipcode": "90046"},
            "responsivePhotos": [
                {"mixedSources": {"jpeg": [
                    {"url": "https://photos.zillowstatic.com/a_384.jpg", "width": 384},
                    {"url": "https://photos.zillowstatic.com/a_1536.jpg", "width": 1536}
                ]}},
                {"mixedSources": {"jpeg": [
                    {"url": "https://photos.zillowstatic.com/b_1536.jpg", "width": 1536}
                ]}}
            ]
        })
    }

    fn page(property: &Value) -> String {
        let cache = json!({"ForSaleShopperPlatformFullRenderQuery{}": {"property": property}});
        let next = json!({"props": {"pageProps": {"componentProps": {"gdpClientCache": cache.to_string()}}}});
        format!(r#"<html><script id="__NEXT_DATA__" type="application/json">{next}</script></html>"#)
    }

    #[test]
    fn test_extract_property() {
        let info = extract_property(&property_json());
        assert_eq!(info.mls_id.as_deref(), Some("24-401122"));
        assert_eq!(info.list_price.as_deref(), Some("3288000"));
        assert_eq!(info.status.as_deref(), Some("FOR_SALE"));
        assert_eq!(
            info.media,
            vec![
                "https://photos.zillowstatic.com/a_1536.jpg",
                "https://photos.zillowstatic.com/b_1536.jpg"
            ]
        );
        assert_eq!(info.specs.get("beds").map(String::as_str), Some("3"));
        assert_eq!(info.specs.get("lot_size").map(String::as_str), Some("5600"));
        assert_eq!(info.address.as_deref(), Some("3144 Nichols Canyon Rd, Los Angeles, CA 90046"));
    }

    #[test]
    fn test_missing_status_defaults_to_active() {
        let mut property = property_json();
        property.as_object_mut().unwrap().remove("homeStatus");
        assert_eq!(extract_property(&property).status.as_deref(), Some("Active"));
    }

    #[test]
    fn test_parse_listing_page() {
        let info = parse_listing_page(&page(&property_json()), "u").unwrap().unwrap();
        assert_eq!(info.media.len(), 2);
        assert!(parse_listing_page("<html></html>", "u").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_falls_through_404_candidates() {
        let server = MockServer::start_async().await;
        let hit = server
            .mock_async(|when, then| {
                when.method(GET).path_includes("ROAD");
                then.status(200).body(page(&property_json()));
            })
            .await;
        // Any other candidate falls through to httpmock's default 404.
        let engine = Zillow::default().with_base_url(server.base_url());
        let address = Address::new("3144 Nichols Canyon Rd", AddressInputType::FreeForm, None);
        let info = engine.get_property_info(&address, None, false).await.unwrap().unwrap();

        hit.assert_async().await;
        assert_eq!(info.mls_id.as_deref(), Some("24-401122"));
        assert!(info.source_url.unwrap().contains("NICHOLS"));
    }
}
