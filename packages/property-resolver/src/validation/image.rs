//! Media URL policy.

use std::collections::HashSet;

use tracing::debug;
use url::Url;

use crate::error::ImageUrlError;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// CDN hosts that serve images without a file extension.
///
/// An entry with a path matches that path prefix on the host; a bare host
/// also matches its subdomains.
pub const DEFAULT_CDN_DOMAINS: &[&str] = &[
    "cdn.shopify.com",
    "jennacooperla.com/cdn/shop",
    "corcoranlabs.com",
    "media-cloud.corcoranlabs.com",
];

/// Decides which media URLs may appear on a record.
#[derive(Debug, Clone)]
pub struct ImageUrlValidator {
    cdn_domains: Vec<String>,
}

impl Default for ImageUrlValidator {
    fn default() -> Self {
        Self::new(DEFAULT_CDN_DOMAINS.iter().copied())
    }
}

impl ImageUrlValidator {
    pub fn new(cdn_domains: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            cdn_domains: cdn_domains
                .into_iter()
                .map(|d| d.into().trim_end_matches('/').to_lowercase())
                .collect(),
        }
    }

    /// Absolute http(s) URL whose path ends in an image extension, or any
    /// URL on an allowlisted CDN.
    pub fn is_valid_image_url(&self, url: &str) -> bool {
        let Some(parsed) = parse_absolute(url) else {
            debug!(url = %url, "Rejected media URL: not absolute");
            return false;
        };

        if path_extension(&parsed)
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
        {
            return true;
        }

        if self.is_cdn(&parsed) {
            return true;
        }

        debug!(url = %url, "Rejected media URL: no image extension");
        false
    }

    /// File extension (with leading dot) to store the media under.
    ///
    /// Allowlisted CDN URLs without one default to `.jpg`.
    pub fn file_extension(&self, url: &str) -> Result<String, ImageUrlError> {
        let no_extension = || ImageUrlError::NoExtension { url: url.to_string() };
        let parsed = parse_absolute(url).ok_or_else(no_extension)?;

        match path_extension(&parsed) {
            Some(ext) => Ok(format!(".{ext}")),
            None if self.is_cdn(&parsed) => Ok(".jpg".to_string()),
            None => Err(no_extension()),
        }
    }

    /// Reduce, validate and de-duplicate media, keeping source order and
    /// stopping at `max`. `srcset` entries collapse to their widest URL.
    pub fn filter_media(&self, media: &[String], max: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();

        for raw in media {
            if accepted.len() >= max {
                break;
            }
            let candidate = if is_srcset(raw) {
                match best_srcset_url(raw) {
                    Some(url) => url,
                    None => continue,
                }
            } else {
                absolutize(raw.trim())
            };

            if self.is_valid_image_url(&candidate) && seen.insert(candidate.clone()) {
                accepted.push(candidate);
            }
        }

        accepted
    }

    fn is_cdn(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let path = url.path();

        self.cdn_domains.iter().any(|entry| {
            let (domain, prefix) = match entry.split_once('/') {
                Some((d, p)) => (d, Some(p)),
                None => (entry.as_str(), None),
            };
            let host_matches = host == domain || host.ends_with(&format!(".{domain}"));
            match prefix {
                Some(p) => host_matches && path.trim_start_matches('/').starts_with(p),
                None => host_matches,
            }
        })
    }
}

/// Widest candidate of a `srcset` string, protocol-relative URLs made https.
pub fn best_srcset_url(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split_whitespace();
            let url = absolutize(pieces.next()?);
            let width: u32 = pieces
                .next()
                .map(|d| d.chars().take_while(|c| c.is_ascii_digit()).collect::<String>())
                .and_then(|digits| digits.parse().ok())
                .unwrap_or(0);
            url.starts_with("http").then_some((url, width))
        })
        .max_by_key(|(_, width)| *width)
        .map(|(url, _)| url)
}

fn is_srcset(raw: &str) -> bool {
    raw.contains(',') && raw.split(',').any(|part| part.split_whitespace().count() >= 2)
}

fn absolutize(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

fn parse_absolute(url: &str) -> Option<Url> {
    if url.is_empty() || url.chars().any(char::is_whitespace) {
        return None;
    }
    let parsed = Url::parse(url).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

fn path_extension(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    let (stem, ext) = last.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions_accepted_case_insensitive() {
        let v = ImageUrlValidator::default();
        for ext in ["jpg", "JPEG", "png", "Gif", "webp"] {
            let url = format!("https://photos.example.com/a/b/photo.{ext}");
            assert!(v.is_valid_image_url(&url), "{url}");
        }
        assert!(v.is_valid_image_url("https://photos.example.com/photo.jpg?width=1200"));
    }

    #[test]
    fn test_rejects_non_images() {
        let v = ImageUrlValidator::default();
        assert!(!v.is_valid_image_url(""));
        assert!(!v.is_valid_image_url("/relative/photo.jpg"));
        assert!(!v.is_valid_image_url("ftp://example.com/photo.jpg"));
        assert!(!v.is_valid_image_url("https://example.com/listing"));
        assert!(!v.is_valid_image_url("https://example.com/photo.pdf"));
        assert!(!v.is_valid_image_url("https://example.com/my photo.jpg"));
    }

    #[test]
    fn test_cdn_allowlist() {
        let v = ImageUrlValidator::default();
        assert!(v.is_valid_image_url("https://cdn.shopify.com/s/files/1/abc"));
        assert!(v.is_valid_image_url("https://jennacooperla.com/cdn/shop/files/abc"));
        assert!(v.is_valid_image_url("https://media-cloud.corcoranlabs.com/ListingFullAPI/xyz"));
        assert!(!v.is_valid_image_url("https://jennacooperla.com/pages/abc"));
        assert!(!v.is_valid_image_url("https://notshopify.com/s/files/abc"));
    }

    #[test]
    fn test_file_extension() {
        let v = ImageUrlValidator::default();
        assert_eq!(v.file_extension("https://x.com/a/photo.PNG").unwrap(), ".png");
        assert_eq!(v.file_extension("https://cdn.shopify.com/s/files/1/abc").unwrap(), ".jpg");
        assert_eq!(
            v.file_extension("https://example.com/listing"),
            Err(ImageUrlError::NoExtension {
                url: "https://example.com/listing".into()
            })
        );
    }

    #[test]
    fn test_best_srcset_url() {
        let srcset = "//cdn.shopify.com/a_400x.jpg 400w, //cdn.shopify.com/a_1600x.jpg 1600w, //cdn.shopify.com/a_800x.jpg 800w";
        assert_eq!(
            best_srcset_url(srcset).as_deref(),
            Some("https://cdn.shopify.com/a_1600x.jpg")
        );
    }

    #[test]
    fn test_filter_media_preserves_order_and_bounds() {
        let v = ImageUrlValidator::default();
        let media: Vec<String> = vec![
            "https://x.com/1.jpg".into(),
            "https://x.com/not-an-image".into(),
            "https://x.com/2.png".into(),
            "https://x.com/1.jpg".into(),
            "//x.com/3.webp".into(),
            "https://x.com/4.gif".into(),
        ];
        assert_eq!(
            v.filter_media(&media, 3),
            vec!["https://x.com/1.jpg", "https://x.com/2.png", "https://x.com/3.webp"]
        );
    }
}
