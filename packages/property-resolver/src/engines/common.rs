//! HTTP client and page-parsing helpers shared by every engine.
//!
//! Parsed `scraper::Html` documents are not `Send`, so every helper here
//! parses and extracts in one synchronous call and returns owned data.

use bytes::Bytes;
use regex::Regex;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::types::spec_keys;
use crate::validation::best_srcset_url;

/// Browser-like user agent; listing sites reject obvious bots.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Thin reqwest wrapper mapping HTTP outcomes onto [`FetchError`].
#[derive(Clone)]
pub struct SiteClient {
    client: reqwest::Client,
    user_agent: String,
}

impl Default for SiteClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });
        Self {
            client,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// GET a page body as text.
    pub async fn get_text(&self, url: &str) -> FetchResult<String> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        check_status(url, response.status())?;
        response.text().await.map_err(|e| FetchError::from_reqwest(url, e))
    }

    /// GET and decode a JSON body.
    pub async fn get_json(&self, url: &str) -> FetchResult<Value> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::parse(url, e.to_string()))
    }

    /// POST a JSON body and decode a JSON answer.
    pub async fn post_json(&self, url: &str, body: &Value, headers: &[(&str, &str)]) -> FetchResult<Value> {
        debug!(url = %url, "POST");
        let mut request = self
            .client
            .post(url)
            .header("User-Agent", &self.user_agent)
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        check_status(url, response.status())?;

        let text = response.text().await.map_err(|e| FetchError::from_reqwest(url, e))?;
        serde_json::from_str(&text).map_err(|e| FetchError::parse(url, e.to_string()))
    }

    /// GET raw bytes (media downloads).
    pub async fn get_bytes(&self, url: &str) -> FetchResult<Bytes> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        check_status(url, response.status())?;
        response.bytes().await.map_err(|e| FetchError::from_reqwest(url, e))
    }
}

/// Map a response status onto the fetch taxonomy.
pub fn check_status(url: &str, status: StatusCode) -> FetchResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let url = url.to_string();
    match status.as_u16() {
        404 | 410 => Err(FetchError::NotFound { url }),
        401 | 403 => Err(FetchError::Blocked {
            url,
            status: status.as_u16(),
        }),
        code => Err(FetchError::Status { url, status: code }),
    }
}

/// Contents of `<script id="__NEXT_DATA__">`.
pub fn next_data(html: &str) -> Option<Value> {
    script_json(html, "script#__NEXT_DATA__").into_iter().next()
}

/// Every parseable `application/ld+json` block.
pub fn json_ld(html: &str) -> Vec<Value> {
    script_json(html, r#"script[type="application/ld+json"]"#)
}

fn script_json(html: &str, selector: &str) -> Vec<Value> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|script| {
            let raw: String = script.text().collect();
            serde_json::from_str(raw.trim()).ok()
        })
        .collect()
}

/// Attribute values of every element matching `selector`, in document order.
pub fn select_attr(html: &str, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Whitespace-collapsed text of every element matching `selector`.
pub fn select_text(html: &str, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| !t.is_empty())
        .collect()
}

/// `(href, link text)` for anchors matching `selector`.
pub fn select_links(html: &str, selector: &str) -> Vec<(String, String)> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim().to_string();
            let text = el.text().collect::<Vec<_>>().join(" ");
            Some((href, text.split_whitespace().collect::<Vec<_>>().join(" ")))
        })
        .collect()
}

/// First match of the first selector that yields anything.
pub fn first_text(html: &str, selectors: &[&str]) -> Option<String> {
    selectors
        .iter()
        .find_map(|s| select_text(html, s).into_iter().next())
}

/// Image URLs from gallery selectors, trying each strategy in order.
///
/// Only URLs accepted by `keep` are counted or returned. A strategy with at
/// least `enough` kept images wins outright; otherwise the largest kept yield
/// does. Each `img` contributes its widest `srcset` candidate, else
/// `data-src`, else `src`, resolved against `base`.
pub fn gallery_images(
    html: &str,
    base: &str,
    strategies: &[&str],
    enough: usize,
    keep: impl Fn(&str) -> bool,
) -> Vec<String> {
    let mut best: Vec<String> = Vec::new();

    for strategy in strategies {
        let mut scraped: Vec<String> = select_attr(html, strategy, "srcset")
            .into_iter()
            .map(|s| best_srcset_url(&s).unwrap_or(s))
            .collect();
        if scraped.is_empty() {
            scraped = select_attr(html, strategy, "data-src");
        }
        if scraped.is_empty() {
            scraped = select_attr(html, strategy, "src");
        }

        let found: Vec<String> = scraped
            .iter()
            .map(|u| absolute_url(base, u))
            .filter(|u| keep(u))
            .collect();

        debug!(selector = %strategy, scraped = scraped.len(), kept = found.len(), "Gallery strategy");
        if found.len() >= enough {
            return found;
        }
        if found.len() > best.len() {
            best = found;
        }
    }

    best
}

/// Resolve a possibly relative or protocol-relative link against `base`.
///
/// Protocol-relative links become https. Links that cannot be resolved are
/// returned as given.
pub fn absolute_url(base: &str, link: &str) -> String {
    let link = link.trim();
    if let Some(rest) = link.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if Url::parse(link).is_ok() {
        return link.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(link))
        .map(String::from)
        .unwrap_or_else(|_| link.to_string())
}

/// Scalar JSON value as text. Numbers keep their JSON rendering.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text at a JSON pointer (`/a/b/0`).
pub fn pointer_text(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(value_text)
}

/// First non-empty text among several pointers.
pub fn first_pointer_text(value: &Value, pointers: &[&str]) -> Option<String> {
    pointers.iter().find_map(|p| pointer_text(value, p))
}

/// Listings with a price but no status are live.
pub fn status_or_active(status: Option<String>, price: Option<&str>) -> Option<String> {
    status.or_else(|| price.map(|_| "Active".to_string()))
}

/// Lower-case alphanumerics only, for loose comparisons.
pub fn alnum_key(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Index of the candidate most similar to `target`, if any scores above
/// `threshold`.
pub fn best_match<'a>(target: &str, candidates: impl IntoIterator<Item = &'a str>, threshold: f64) -> Option<usize> {
    let target = alnum_key(target);
    candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| (i, strsim::normalized_levenshtein(&target, &alnum_key(c))))
        .filter(|(_, score)| *score >= threshold)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

static RE_BEDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:BEDS?|BR|BEDROOMS?)\b").expect("beds pattern"));
static RE_BATHS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:BATHS?|BA|BATHROOMS?)\b").expect("baths pattern"));
static RE_LIVING_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3}(?:,\d{3})+|\d+)\s*(?:SF|SQ\.?\s*FT\.?)(?:\s|$|\|)").expect("living size pattern")
});

/// Parse `"6 BEDS | 5.5 BATHS | POOL | 4,696 SF"` style spec lines.
pub fn parse_spec_line(text: &str) -> Vec<(&'static str, String)> {
    let patterns: [(&'static str, &LazyLock<Regex>); 3] = [
        (spec_keys::BEDS, &RE_BEDS),
        (spec_keys::BATH, &RE_BATHS),
        (spec_keys::LIVING_SIZE, &RE_LIVING_SIZE),
    ];

    patterns
        .iter()
        .filter_map(|(key, re)| {
            let captures = re.captures(text)?;
            let value = captures.get(1)?.as_str().replace(',', "");
            Some((*key, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ImageUrlValidator;
    use httpmock::prelude::*;

    #[test]
    fn test_check_status_mapping() {
        assert!(check_status("u", StatusCode::OK).is_ok());
        assert!(matches!(
            check_status("u", StatusCode::NOT_FOUND),
            Err(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            check_status("u", StatusCode::FORBIDDEN),
            Err(FetchError::Blocked { status: 403, .. })
        ));
        let err = check_status("u", StatusCode::SERVICE_UNAVAILABLE).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_next_data() {
        let html = r#"<html><body><script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"x":1}}}</script></body></html>"#;
        let data = next_data(html).unwrap();
        assert_eq!(pointer_text(&data, "/props/pageProps/x").as_deref(), Some("1"));
        assert!(next_data("<html></html>").is_none());
    }

    #[test]
    fn test_select_helpers() {
        let html = r#"<div class="results">
            <a href="/pages/brentwood-estate"><span>Brentwood  Estate</span></a>
            <a href="/collections/all">All</a>
        </div>"#;
        let links = select_links(html, "a[href*='/pages/']");
        assert_eq!(links, vec![("/pages/brentwood-estate".into(), "Brentwood Estate".into())]);
    }

    #[test]
    fn test_gallery_prefers_srcset_and_early_return() {
        let html = r#"<div class="swiper"><div class="swiper-slide">
            <img srcset="//cdn.example.com/a_400.jpg 400w, //cdn.example.com/a_1600.jpg 1600w" src="/a_400.jpg">
        </div></div>
        <div class="grid"><img src="https://x.com/1.jpg"><img src="https://x.com/2.jpg"></div>"#;

        let strategies = [".swiper-slide img", ".grid img"];

        let one = gallery_images(html, "https://x.com", &strategies, 1, |_| true);
        assert_eq!(one, vec!["https://cdn.example.com/a_1600.jpg"]);

        let best = gallery_images(html, "https://x.com", &strategies, 5, |_| true);
        assert_eq!(best, vec!["https://x.com/1.jpg", "https://x.com/2.jpg"]);
    }

    #[test]
    fn test_gallery_counts_only_kept_images() {
        let icons: String = (1..=5)
            .map(|i| format!(r#"<div class="swiper-slide"><img src="/icons/i{i}.svg"></div>"#))
            .collect();
        let html = format!(
            r#"{icons}<div class="grid"><img src="/photos/1.jpg"><img src="/photos/2.jpg"><img src="/photos/3.jpg"></div>"#
        );
        let images = ImageUrlValidator::default();

        let found = gallery_images(&html, "https://x.com", &[".swiper-slide img", ".grid img"], 5, |u| {
            images.is_valid_image_url(u)
        });
        assert_eq!(
            found,
            vec!["https://x.com/photos/1.jpg", "https://x.com/photos/2.jpg", "https://x.com/photos/3.jpg"]
        );
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(absolute_url("https://x.com/pages/croft", "img.jpg"), "https://x.com/pages/img.jpg");
        assert_eq!(absolute_url("https://x.com/pages/a/b", "../c.jpg"), "https://x.com/pages/c.jpg");
        assert_eq!(absolute_url("https://x.com/pages/croft", "/cdn/1.jpg"), "https://x.com/cdn/1.jpg");
        assert_eq!(absolute_url("http://127.0.0.1:8080", "//cdn.x.com/1.jpg"), "https://cdn.x.com/1.jpg");
        assert_eq!(absolute_url("https://x.com/a", "https://y.com/b.jpg"), "https://y.com/b.jpg");
        assert_eq!(absolute_url("", "photo.jpg"), "photo.jpg");
    }

    #[test]
    fn test_best_match() {
        let candidates = ["Sherman Oaks Retreat", "337 North Croft Avenue", "Bel Air Modern"];
        assert_eq!(best_match("337 N Croft Avenue", candidates, 0.5), Some(1));
        assert_eq!(best_match("zzzz", candidates, 0.9), None);
    }

    #[test]
    fn test_parse_spec_line() {
        let specs = parse_spec_line("6 BEDS | 5.5 BATHS |  POOL | 4,696 SF");
        assert_eq!(
            specs,
            vec![
                ("beds", "6".to_string()),
                ("bath", "5.5".to_string()),
                ("living_size", "4696".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_json_and_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/ok");
                then.status(200).json_body(serde_json::json!({"a": 1}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/garbled");
                then.status(200).body("{not json");
            })
            .await;

        let client = SiteClient::new();
        let ok = client.get_json(&server.url("/ok")).await.unwrap();
        assert_eq!(ok["a"], 1);

        let missing = client.get_json(&server.url("/missing")).await.unwrap_err();
        assert!(matches!(missing, FetchError::NotFound { .. }));

        let garbled = client.get_json(&server.url("/garbled")).await.unwrap_err();
        assert!(matches!(garbled, FetchError::Parse { .. }));
        assert!(garbled.is_recoverable());
    }
}
