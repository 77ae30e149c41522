//! Daniel Gale Sotheby's: keyword search page, then the listing detail page.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::common::{
    absolute_url, best_match, first_pointer_text, first_text, gallery_images, next_data, parse_spec_line,
    select_links, select_text, status_or_active, value_text, SiteClient,
};
use crate::error::{FetchError, FetchResult};
use crate::traits::Engine;
use crate::types::{spec_keys, Address, MlsInfo};
use crate::validation::ImageUrlValidator;

const ORIGIN: &str = "https://www.sothebysrealty.com";
const SITE_PATH: &str = "/danielgalesir";

const GALLERY_STRATEGIES: &[&str] = &[
    ".m-ldp-hero__fullscreen-swiper .swiper-slide img",
    "#js-container-to-fullscreen .swiper-slide img",
    ".swiper .swiper-slide img",
    ".swiper-wrapper .swiper-slide img",
    "[class*='swiper'] [class*='slide'] img",
    ".gallery .gallery-item img",
];

const PROPERTY_POINTERS: &[&str] = &[
    "/props/pageProps/property",
    "/props/pageProps/listing",
    "/props/pageProps/initialState/property",
    "/props/pageProps/initialState/listing",
];

pub struct DanielGale {
    client: SiteClient,
    origin: String,
    early_return: usize,
}

impl Default for DanielGale {
    fn default() -> Self {
        Self::new(SiteClient::new())
    }
}

impl DanielGale {
    pub const NAME: &'static str = "DanielGale";

    pub fn new(client: SiteClient) -> Self {
        Self {
            client,
            origin: ORIGIN.to_string(),
            early_return: 5,
        }
    }

    /// Origin the `/danielgalesir` site lives under.
    pub fn with_base_url(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_early_return(mut self, threshold: usize) -> Self {
        self.early_return = threshold.max(1);
        self
    }

    fn origin(&self) -> &str {
        self.origin.trim_end_matches('/')
    }

    fn search_url(&self, address: &str) -> String {
        format!("{}{SITE_PATH}/eng/sales/int/{}-keyword", self.origin(), keyword_slug(address))
    }

    async fn find_listing_url(&self, address: &Address) -> FetchResult<Option<String>> {
        let url = self.search_url(address.input());
        let html = match self.client.get_text(&url).await {
            Ok(html) => html,
            Err(FetchError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let links: Vec<String> = select_links(&html, "a[href*='/sales/detail/']")
            .into_iter()
            .map(|(href, _)| href)
            .collect();
        debug!(engine = Self::NAME, url = %url, links = links.len(), "Keyword search");
        if links.is_empty() {
            return Ok(None);
        }

        let slugs: Vec<String> = links.iter().map(|l| link_slug(l)).collect();
        let pick = best_match(address.formatted(), slugs.iter().map(String::as_str), 0.0).unwrap_or(0);
        Ok(links.get(pick).map(|href| absolute_url(self.origin(), href)))
    }
}

#[async_trait]
impl Engine for DanielGale {
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

        let Some(url) = self.find_listing_url(address).await? else {
            warn!(engine = Self::NAME, address = %address, "No search results");
            return Ok(None);
        };

        let html = match self.client.get_text(&url).await {
            Ok(html) => html,
            Err(FetchError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let info = parse_property_page(&html, self.origin(), self.early_return);
        if info.is_none() {
            warn!(engine = Self::NAME, url = %url, "Listing page had no listing data");
        }
        Ok(info.map(|i| i.with_source_url(url)))
    }
}

/// `"14 Shorecliff Place, Great Neck"` → `"14+shorecliff+place+great+neck"`.
fn keyword_slug(address: &str) -> String {
    address
        .to_lowercase()
        .replace(',', "")
        .split_whitespace()
        .map(|word| urlencoding::encode(word).into_owned())
        .collect::<Vec<_>>()
        .join("+")
}

/// Last path segment of a detail link with dashes as spaces.
fn link_slug(link: &str) -> String {
    link.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(link)
        .replace('-', " ")
}

pub fn parse_property_page(html: &str, origin: &str, early_return: usize) -> Option<MlsInfo> {
    if let Some(data) = next_data(html) {
        if let Some(property) = PROPERTY_POINTERS.iter().find_map(|p| data.pointer(p)) {
            return Some(extract_property(property));
        }
    }

    let address = first_text(html, &[".c-ldp-hero-info__address", "[class*='address']"]);
    let price = first_text(html, &["[class*='price']", "[class*='Price']"]);
    let description = first_text(html, &["[class*='description']", "[class*='Description']"]);
    let images = ImageUrlValidator::default();
    let media = gallery_images(html, origin, GALLERY_STRATEGIES, early_return, |src| {
        images.is_valid_image_url(src)
    });

    if media.is_empty() && address.is_none() && price.is_none() && description.is_none() {
        return None;
    }

    let spec_line = ["[class*='bed']", "[class*='bath']", "[class*='sqft']", "[class*='square']"]
        .iter()
        .flat_map(|s| select_text(html, s).into_iter().take(1))
        .collect::<Vec<_>>()
        .join(" | ");

    let mut info = MlsInfo {
        status: status_or_active(None, price.as_deref()),
        list_price: price,
        description,
        media,
        address,
        ..MlsInfo::default()
    };
    for (key, value) in parse_spec_line(&spec_line) {
        info.specs.insert(key.to_string(), value);
    }
    Some(info)
}

/// Listing fields from an embedded property object.
pub fn extract_property(property: &Value) -> MlsInfo {
    let price = first_pointer_text(property, &["/price", "/listPrice"]);
    let status = first_pointer_text(property, &["/status", "/listingStatus", "/mlsStatus", "/marketingStatus"]);

    let media = ["/images", "/media_urls", "/photos"]
        .iter()
        .filter_map(|p| property.pointer(p).and_then(Value::as_array))
        .find(|items| !items.is_empty())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| value_text(item).or_else(|| first_pointer_text(item, &["/url", "/src"])))
                .collect()
        })
        .unwrap_or_default();

    let mut info = MlsInfo {
        mls_id: first_pointer_text(property, &["/mls_id", "/mlsId", "/id"]),
        status: status_or_active(status, price.as_deref()),
        list_price: price,
        description: first_pointer_text(property, &["/description"]),
        media,
        address: first_pointer_text(property, &["/address/full", "/address"]),
        ..MlsInfo::default()
    };
    info.set_spec_opt(spec_keys::BEDS, first_pointer_text(property, &["/bedrooms", "/beds"]));
    info.set_spec_opt(spec_keys::BATH, first_pointer_text(property, &["/bathrooms", "/baths"]));
    info.set_spec_opt(spec_keys::LIVING_SIZE, first_pointer_text(property, &["/livingArea", "/squareFootage"]));
    info.set_spec_opt(spec_keys::LOT_SIZE, first_pointer_text(property, &["/lotSize"]));
    info.set_spec_opt(spec_keys::PROPERTY_TYPE, first_pointer_text(property, &["/propertyType", "/homeType"]));
    info
}
