//! Engine trait: a single listing source.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::FetchResult;
use crate::types::{Address, MlsInfo};

/// A source that can turn an address into raw listing data.
///
/// `Ok(None)` is a genuine no-match. Errors are either recoverable
/// (transport, timeout, parse) and retried by the resolver, or definitive
/// ([`FetchError::NotFound`](crate::error::FetchError::NotFound)).
#[async_trait]
pub trait Engine: Send + Sync {
    /// Engine name. Doubles as the platform key in the status vocabulary.
    fn name(&self) -> &str;

    /// Look up a property, optionally steered by a listing title.
    async fn get_property_info(
        &self,
        address: &Address,
        title: Option<&str>,
        debug: bool,
    ) -> FetchResult<Option<MlsInfo>>;

    /// Whether listing pages live at URLs predictable from a title.
    fn supports_direct_title(&self) -> bool {
        false
    }

    /// Fetch a listing straight from its slug URL.
    async fn try_direct_url_by_title(&self, _title: &str) -> FetchResult<Option<MlsInfo>> {
        Ok(None)
    }
}

pub type SharedEngine = Arc<dyn Engine>;
