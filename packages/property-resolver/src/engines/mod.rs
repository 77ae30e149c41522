//! Scraping engines, one per listing platform.
//!
//! # Available Engines
//!
//! - `Zillow` - search page redirect, `__NEXT_DATA__` / Apollo cache
//! - `Corcoran` - autocomplete API, then the listing page
//! - `ColdwellBanker` - suggest API, then the canonical listing page
//! - `Compass` - omnisuggest, then `__NEXT_DATA__` or JSON-LD
//! - `JennaCooperLa` - Shopify predictive search and slug pages
//! - `DanielGale` - keyword search, then the detail page
//!
//! # Example
//!
//! ```rust,ignore
//! use property_resolver::engines::{default_engines, SiteClient};
//! use property_resolver::ResolverConfig;
//!
//! let engines = default_engines(SiteClient::new(), &ResolverConfig::default(), None);
//! ```

mod coldwell_banker;
mod common;
mod compass;
mod corcoran;
mod daniel_gale;
mod jenna_cooper_la;
mod zillow;

use std::sync::Arc;

pub use coldwell_banker::ColdwellBanker;
pub use common::{SiteClient, DEFAULT_USER_AGENT};
pub use compass::Compass;
pub use corcoran::Corcoran;
pub use daniel_gale::DanielGale;
pub use jenna_cooper_la::JennaCooperLa;
pub use zillow::Zillow;

use crate::traits::SharedEngine;
use crate::types::ResolverConfig;

/// Every built-in engine sharing one HTTP client.
pub fn default_engines(
    client: SiteClient,
    config: &ResolverConfig,
    corcoran_api_key: Option<String>,
) -> Vec<SharedEngine> {
    let mut corcoran = Corcoran::new(client.clone());
    if let Some(key) = corcoran_api_key {
        corcoran = corcoran.with_api_key(key);
    }

    vec![
        Arc::new(Zillow::new(client.clone())),
        Arc::new(corcoran),
        Arc::new(ColdwellBanker::new(client.clone())),
        Arc::new(Compass::new(client.clone())),
        Arc::new(JennaCooperLa::new(client.clone()).with_early_return(config.min_images_for_early_return)),
        Arc::new(DanielGale::new(client).with_early_return(config.min_images_for_early_return)),
    ]
}
