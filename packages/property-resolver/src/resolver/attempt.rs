//! One engine's turn in the chain: retries, timeouts and validation.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{FetchError, FetchResult, ResolveError, Result};
use crate::traits::Engine;
use crate::types::{Address, MlsInfo, ResolverConfig};
use crate::validation::{ImageUrlValidator, StatusValidator};

/// How an engine's turn ended.
#[derive(Debug)]
pub enum EngineVerdict {
    /// Usable listing; `media` is already validated and bounded
    Accepted { info: MlsInfo, media: Vec<String> },
    /// Engine had nothing for the address
    NoMatch,
    /// Source answered with a definitive error
    NotFound(FetchError),
    /// Listing exists but its status is stale for the platform
    Inactive { status: String },
    /// Listing had no media left after validation
    NoMedia,
    /// Recoverable errors used up the retry budget
    Exhausted(FetchError),
}

impl EngineVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EngineVerdict::Accepted { .. })
    }
}

/// Inputs shared by every engine turn of one resolution.
pub struct Attempt<'a> {
    pub address: &'a Address,
    pub title: Option<&'a str>,
    pub debug: bool,
    pub config: &'a ResolverConfig,
    pub statuses: &'a StatusValidator,
    pub images: &'a ImageUrlValidator,
    pub cancel: &'a CancellationToken,
}

impl Attempt<'_> {
    /// Run `engine` until it answers definitively or its retries run out.
    pub async fn run(&self, engine: &dyn Engine) -> Result<EngineVerdict> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            debug!(engine = engine.name(), attempt, max_attempts, "Engine attempt");

            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ResolveError::Cancelled),
                outcome = tokio::time::timeout(self.config.attempt_timeout(), self.lookup(engine)) => outcome,
            };

            let error = match outcome {
                Ok(Ok(Some(info))) => return Ok(self.validate(engine.name(), info)),
                Ok(Ok(None)) => {
                    info!(engine = engine.name(), "No match");
                    return Ok(EngineVerdict::NoMatch);
                }
                Ok(Err(e)) if !e.is_recoverable() => {
                    info!(engine = engine.name(), error = %e, "Definitive miss");
                    return Ok(EngineVerdict::NotFound(e));
                }
                Ok(Err(e)) => e,
                Err(_) => FetchError::Timeout {
                    url: engine.name().to_string(),
                    after: self.config.attempt_timeout(),
                },
            };

            if attempt == max_attempts {
                warn!(engine = engine.name(), attempts = max_attempts, error = %error, "Retries exhausted");
                return Ok(EngineVerdict::Exhausted(error));
            }

            warn!(
                engine = engine.name(),
                attempt,
                error = %error,
                "Recoverable failure, retrying in {:?}",
                self.config.retry_delay()
            );
            self.pause(self.config.retry_delay()).await?;
        }

        // max_attempts >= 1, so the loop always returns
        Ok(EngineVerdict::NoMatch)
    }

    /// Direct title URL first when the engine has one, then search.
    async fn lookup(&self, engine: &dyn Engine) -> FetchResult<Option<MlsInfo>> {
        if let Some(title) = self.title.filter(|_| engine.supports_direct_title()) {
            match engine.try_direct_url_by_title(title).await {
                Ok(Some(info)) => {
                    info!(engine = engine.name(), title = %title, "Found listing by direct title URL");
                    return Ok(Some(info));
                }
                Ok(None) | Err(FetchError::NotFound { .. }) => {
                    debug!(engine = engine.name(), title = %title, "No direct title page, searching");
                }
                Err(e) => return Err(e),
            }
        }

        engine.get_property_info(self.address, self.title, self.debug).await
    }

    fn validate(&self, platform: &str, info: MlsInfo) -> EngineVerdict {
        if self.statuses.is_inactive(info.status.as_deref(), platform) {
            let status = info.status.unwrap_or_default();
            let reason = ResolveError::InactiveListing {
                platform: platform.to_string(),
                status: status.clone(),
            };
            info!(engine = platform, "{reason}");
            return EngineVerdict::Inactive { status };
        }

        let media = self.images.filter_media(&info.media, self.config.max_images);
        if media.is_empty() {
            info!(engine = platform, scraped = info.media.len(), "Listing has no valid media");
            return EngineVerdict::NoMedia;
        }

        info!(engine = platform, images = media.len(), scraped = info.media.len(), "Listing accepted");
        EngineVerdict::Accepted { info, media }
    }

    async fn pause(&self, delay: Duration) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ResolveError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
