//! Compass: omnisuggest autocomplete, then the listing page.
//!
//! Listing data is read from `__NEXT_DATA__`, falling back to JSON-LD.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::common::{alnum_key, first_pointer_text, json_ld, next_data, pointer_text, status_or_active, value_text, SiteClient};
use crate::error::{FetchError, FetchResult};
use crate::traits::Engine;
use crate::types::{spec_keys, Address, MlsInfo};

const BASE_URL: &str = "https://www.compass.com";

/// Photo fields, best quality first.
const PHOTO_FIELDS: &[&str] = &["originalUrl", "fullUrl", "largeUrl", "highResUrl", "url", "src", "imageUrl"];

const LISTING_LD_TYPES: &[&str] = &["Product", "House", "RealEstateListing", "SingleFamilyResidence", "Residence"];

pub struct Compass {
    client: SiteClient,
    base_url: String,
}

impl Default for Compass {
    fn default() -> Self {
        Self::new(SiteClient::new())
    }
}

impl Compass {
    pub const NAME: &'static str = "Compass";

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

    /// Redirect path of the suggestion whose text matches `candidate` exactly
    /// (ignoring case and punctuation).
    async fn suggest(&self, candidate: &str) -> FetchResult<Option<String>> {
        let url = format!("{}/api/v3/omnisuggest/autocomplete", self.base());
        let payload = json!({"q": candidate, "infoFields": [2], "listingTypes": [2]});
        let response = self.client.post_json(&url, &payload, &[]).await?;

        let wanted = alnum_key(candidate);
        let hit = response
            .pointer("/categories/0/items")
            .and_then(Value::as_array)
            .and_then(|items| {
                items.iter().find(|item| {
                    item.get("text")
                        .and_then(Value::as_str)
                        .map(|text| alnum_key(text) == wanted)
                        .unwrap_or(false)
                })
            })
            .and_then(|item| pointer_text(item, "/redirectUrl"));
        Ok(hit)
    }
}

#[async_trait]
impl Engine for Compass {
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
            let Some(path) = self.suggest(&candidate).await? else {
                continue;
            };

            let url = format!("{}{}", self.base(), path);
            let html = match self.client.get_text(&url).await {
                Ok(html) => html,
                Err(FetchError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            };
            if let Some(info) = parse_listing_page(&html) {
                return Ok(Some(info.with_source_url(url)));
            }
        }

        warn!(engine = Self::NAME, address = %address, "No listing found");
        Ok(None)
    }
}

pub fn parse_listing_page(html: &str) -> Option<MlsInfo> {
    if let Some(data) = next_data(html) {
        let listing = data
            .pointer("/props/pageProps/listing")
            .or_else(|| data.pointer("/props/listingRelation/listing"));
        if let Some(listing) = listing {
            return Some(extract_listing(listing));
        }
    }

    json_ld(html)
        .iter()
        .flat_map(|block| match block {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        })
        .find(|block| {
            block
                .get("@type")
                .and_then(Value::as_str)
                .map(|t| LISTING_LD_TYPES.contains(&t))
                .unwrap_or(false)
        })
        .map(|block| extract_json_ld(&block))
}

pub fn extract_listing(listing: &Value) -> MlsInfo {
    let price = pointer_text(listing, "/price/lastKnown");
    let status = first_pointer_text(listing, &["/status", "/listingStatus", "/mlsStatus", "/state"])
        .or_else(|| key_detail(listing, &["Status", "Listing Status"]));

    let photos = listing
        .pointer("/media/photoGallery")
        .or_else(|| listing.get("media"))
        .or_else(|| listing.get("photos"))
        .and_then(Value::as_array);
    let media = photos
        .map(|photos| photos.iter().filter_map(best_photo_url).collect())
        .unwrap_or_default();

    let mut info = MlsInfo {
        mls_id: pointer_text(listing, "/externalId"),
        status: status_or_active(status, price.as_deref()),
        list_price: price,
        description: pointer_text(listing, "/description"),
        media,
        address: pointer_text(listing, "/location/prettyAddress"),
        ..MlsInfo::default()
    };
    info.set_spec_opt(spec_keys::PROPERTY_TYPE, key_detail(listing, &["Compass Type"]));
    info.set_spec_opt(spec_keys::BEDS, pointer_text(listing, "/size/bedrooms"));
    info.set_spec_opt(spec_keys::BATH, pointer_text(listing, "/size/bathrooms"));
    info.set_spec_opt(spec_keys::LIVING_SIZE, pointer_text(listing, "/size/squareFeet"));
    info.set_spec_opt(spec_keys::LOT_SIZE, pointer_text(listing, "/size/lotSizeInSquareFeet"));
    info
}

fn extract_json_ld(block: &Value) -> MlsInfo {
    let price = first_pointer_text(block, &["/offers/price", "/price"]);
    let media = match block.get("image") {
        Some(Value::Array(images)) => images
            .iter()
            .filter_map(|i| value_text(i).or_else(|| pointer_text(i, "/url")))
            .collect(),
        Some(image) => value_text(image).into_iter().collect(),
        None => Vec::new(),
    };

    MlsInfo {
        status: status_or_active(None, price.as_deref()),
        list_price: price,
        description: pointer_text(block, "/description"),
        media,
        ..MlsInfo::default()
    }
}

fn key_detail(listing: &Value, keys: &[&str]) -> Option<String> {
    listing
        .pointer("/detailedInfo/keyDetails")?
        .as_array()?
        .iter()
        .find(|d| {
            d.get("key")
                .and_then(Value::as_str)
                .map(|k| keys.contains(&k))
                .unwrap_or(false)
        })
        .and_then(|d| pointer_text(d, "/value"))
}

fn best_photo_url(photo: &Value) -> Option<String> {
    if let Some(url) = value_text(photo) {
        return Some(url);
    }
    PHOTO_FIELDS
        .iter()
        .filter_map(|field| photo.get(*field).and_then(value_text))
        .find(|url| url.starts_with("http"))
}
