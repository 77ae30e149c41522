//! Jenna Cooper LA: a Shopify storefront with one `/pages/{slug}` per listing.
//!
//! Lookup order: predictive search by title, predictive search by address,
//! slug pages built from the street, then a search on the fully expanded
//! street name.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::common::{absolute_url, best_match, first_text, gallery_images, parse_spec_line, select_links, SiteClient};
use crate::error::{FetchError, FetchResult};
use crate::normalize::{abbreviation_variants, normalize, url_slugs};
use crate::traits::Engine;
use crate::types::{Address, MlsInfo};
use crate::validation::ImageUrlValidator;

const BASE_URL: &str = "https://jennacooperla.com";
const SEARCH_SECTION: &str = "sections--18776913772799__search-drawer";

/// Stock image Shopify serves when a listing has no photos.
pub const PLACEHOLDER_IMAGE_PATH: &str =
    "/cdn/shop/files/IMAGE_1_-_CORRECT_SHOPIFY_SIZE_9bf6c5ec-cdd0-464f-ad3a-12723735ff3d.jpg";

const GALLERY_STRATEGIES: &[&str] = &[
    ".xo-gallery .swiper-slide img",
    ".swiper-slide img",
    "[class*='gallery'] img",
    "img[src*='/cdn/shop/files/']",
];

/// Minimum similarity for a search hit to count as the listing.
const MATCH_THRESHOLD: f64 = 0.5;

pub struct JennaCooperLa {
    client: SiteClient,
    base_url: String,
    early_return: usize,
}

impl Default for JennaCooperLa {
    fn default() -> Self {
        Self::new(SiteClient::new())
    }
}

impl JennaCooperLa {
    pub const NAME: &'static str = "JennaCooperLA";

    pub fn new(client: SiteClient) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
            early_return: 5,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Gallery strategies stop once one yields this many images.
    pub fn with_early_return(mut self, threshold: usize) -> Self {
        self.early_return = threshold.max(1);
        self
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search/suggest?q={}&section_id={SEARCH_SECTION}&resources[limit]=10&resources[limit_scope]=each",
            self.base(),
            urlencoding::encode(query)
        )
    }

    /// Listing page link from the predictive search, best text match first.
    async fn predictive_search(&self, query: &str, match_against: &str) -> FetchResult<Option<String>> {
        let url = self.search_url(query);
        let html = match self.client.get_text(&url).await {
            Ok(html) => html,
            Err(FetchError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let links = select_links(&html, "a[href*='/pages/']");
        debug!(engine = Self::NAME, query = %query, links = links.len(), "Predictive search");
        if links.is_empty() {
            return Ok(None);
        }

        let pick = best_match(match_against, links.iter().map(|(_, text)| text.as_str()), MATCH_THRESHOLD).unwrap_or(0);
        Ok(links.get(pick).map(|(href, _)| absolute_url(self.base(), href)))
    }

    async fn fetch_page(&self, url: &str) -> FetchResult<Option<MlsInfo>> {
        let html = match self.client.get_text(url).await {
            Ok(html) => html,
            Err(FetchError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(parse_property_page(&html, self.base(), self.early_return).map(|info| info.with_source_url(url)))
    }

    async fn try_slugs(&self, slugs: Vec<String>) -> FetchResult<Option<MlsInfo>> {
        for slug in slugs {
            let url = format!("{}/pages/{slug}", self.base());
            debug!(engine = Self::NAME, url = %url, "Trying direct page");
            if let Some(info) = self.fetch_page(&url).await? {
                return Ok(Some(info));
            }
        }
        Ok(None)
    }

    async fn search_and_fetch(&self, query: &str, match_against: &str) -> FetchResult<Option<MlsInfo>> {
        match self.predictive_search(query, match_against).await? {
            Some(url) => self.fetch_page(&url).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Engine for JennaCooperLa {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn get_property_info(
        &self,
        address: &Address,
        title: Option<&str>,
        _debug: bool,
    ) -> FetchResult<Option<MlsInfo>> {
        info!(engine = Self::NAME, address = %address, title = ?title, "Fetching listing");

        if let Some(title) = title {
            if let Some(info) = self.search_and_fetch(title, title).await? {
                info!(engine = Self::NAME, title = %title, "Found listing by title search");
                return Ok(Some(info));
            }
        }

        let street = address.street().to_string();
        if street.is_empty() {
            return Ok(None);
        }

        for query in abbreviation_variants(&street) {
            if let Some(info) = self.search_and_fetch(&query, &street).await? {
                info!(engine = Self::NAME, query = %query, "Found listing by address search");
                return Ok(Some(info));
            }
        }

        let slugs = dedupe_slugs(abbreviation_variants(&street).iter().flat_map(|v| url_slugs(v)));
        if let Some(info) = self.try_slugs(slugs).await? {
            return Ok(Some(info));
        }

        let expanded = normalize(&street);
        if let Some(info) = self.search_and_fetch(expanded.canonical(), &street).await? {
            info!(engine = Self::NAME, "Found listing by expanded address search");
            return Ok(Some(info));
        }

        warn!(engine = Self::NAME, address = %address, "No listing found");
        Ok(None)
    }

    fn supports_direct_title(&self) -> bool {
        true
    }

    async fn try_direct_url_by_title(&self, title: &str) -> FetchResult<Option<MlsInfo>> {
        let mut slugs = url_slugs(title);
        slugs.extend(abbreviation_variants(title).iter().flat_map(|v| url_slugs(v)));
        self.try_slugs(dedupe_slugs(slugs)).await
    }
}

fn dedupe_slugs(slugs: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique = Vec::new();
    for slug in slugs {
        if !unique.contains(&slug) {
            unique.push(slug);
        }
    }
    unique
}

pub fn is_placeholder_image(url: &str) -> bool {
    let path = url.split('?').next().unwrap_or(url);
    path.ends_with(PLACEHOLDER_IMAGE_PATH)
}

/// Read a listing page. `None` when the page carries no listing content.
pub fn parse_property_page(html: &str, base_url: &str, early_return: usize) -> Option<MlsInfo> {
    let price_status = first_text(html, &[".house_property_details h3", "h3"]);
    let spec_line = first_text(html, &[".house_property_details h4", "h4"]);
    let description = first_text(
        html,
        &[
            ".house_property_details .old_text p",
            ".house_property_details .old_text",
            ".old_text p",
            ".old_text",
        ],
    );

    let images = ImageUrlValidator::default();
    let media = gallery_images(html, base_url, GALLERY_STRATEGIES, early_return, |src| {
        !is_placeholder_image(src) && images.is_valid_image_url(src)
    });

    // "JUST LISTED | $5,399,000"
    let (mut price, mut status) = (None, None);
    if let Some(line) = &price_status {
        for part in line.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            if part.contains('$') {
                price = Some(part.to_string());
            } else if status.is_none() {
                status = Some(part.to_string());
            }
        }
    }

    if media.is_empty() && price.is_none() && description.is_none() {
        return None;
    }

    let mut info = MlsInfo {
        list_price: price,
        status,
        description,
        media,
        ..MlsInfo::default()
    };
    if let Some(line) = &spec_line {
        for (key, value) in parse_spec_line(line) {
            info.specs.insert(key.to_string(), value);
        }
    }
    Some(info)
}
