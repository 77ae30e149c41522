//! Resolver configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the resolution manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Most media URLs kept on a record.
    ///
    /// Default: 36.
    pub max_images: usize,

    /// Stop collecting media from an engine once this many are accepted.
    ///
    /// Only bounds work inside one engine; it never ends the chain early.
    /// Default: 5.
    pub min_images_for_early_return: usize,

    /// Deadline for one engine attempt, in milliseconds. Default: 30000.
    pub attempt_timeout_ms: u64,

    /// Attempts per engine for recoverable errors. Default: 3.
    pub max_attempts: u32,

    /// Fixed pause between attempts, in milliseconds. Default: 1000.
    pub retry_delay_ms: u64,

    /// Cached entries older than this are treated as a miss. Default: 24.
    pub rescrape_after_hours: i64,

    /// When false no engine is consulted. Default: true.
    pub scraping_enabled: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_images: 36,
            min_images_for_early_return: 5,
            attempt_timeout_ms: 30_000,
            max_attempts: 3,
            retry_delay_ms: 1000,
            rescrape_after_hours: 24,
            scraping_enabled: true,
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Saturates instead of overflowing; negative hours count as zero.
    pub fn rescrape_after(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.rescrape_after_hours.max(0)).unwrap_or(chrono::Duration::MAX)
    }

    pub fn with_max_images(mut self, max: usize) -> Self {
        self.max_images = max;
        self
    }

    pub fn with_early_return(mut self, threshold: usize) -> Self {
        self.min_images_for_early_return = threshold;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_ms = (timeout.as_millis() as u64).max(1);
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_rescrape_after_hours(mut self, hours: i64) -> Self {
        self.rescrape_after_hours = hours;
        self
    }

    pub fn with_scraping_enabled(mut self, enabled: bool) -> Self {
        self.scraping_enabled = enabled;
        self
    }
}
