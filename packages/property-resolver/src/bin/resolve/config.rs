use anyhow::{Context, Result};
use dotenvy::dotenv;
use property_resolver::ResolverConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub status_config_path: Option<String>,
    pub default_tenant: String,
    pub corcoran_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = ResolverConfig::default();
        let resolver = ResolverConfig::default()
            .with_max_images(var_or("RESOLVER_MAX_IMAGES", defaults.max_images)?)
            .with_early_return(var_or("RESOLVER_EARLY_RETURN_IMAGES", defaults.min_images_for_early_return)?)
            .with_attempt_timeout(Duration::from_secs(var_or(
                "RESOLVER_ATTEMPT_TIMEOUT_SECS",
                defaults.attempt_timeout().as_secs(),
            )?))
            .with_max_attempts(var_or("RESOLVER_MAX_ATTEMPTS", defaults.max_attempts)?)
            .with_retry_delay(Duration::from_millis(var_or("RESOLVER_RETRY_DELAY_MS", defaults.retry_delay_ms)?))
            .with_rescrape_after_hours(var_or("RESOLVER_RESCRAPE_AFTER_HOURS", defaults.rescrape_after_hours)?)
            .with_scraping_enabled(var_or("ENABLE_WEB_SCRAPING", defaults.scraping_enabled)?);

        Ok(Self {
            resolver,
            status_config_path: env::var("STATUS_CONFIG_PATH").ok().filter(|p| !p.trim().is_empty()),
            default_tenant: env::var("DEFAULT_TENANT").unwrap_or_else(|_| "editora".to_string()),
            corcoran_api_key: env::var("CORCORAN_API_KEY").ok().filter(|k| !k.trim().is_empty()),
        })
    }
}

fn var_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a valid value, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
