//! Post-fetch validation: listing status and media URLs.

pub mod image;
pub mod status;

pub use image::{best_srcset_url, ImageUrlValidator, DEFAULT_CDN_DOMAINS};
pub use status::{EmbeddedStatusSource, FileStatusSource, StatusValidator};
