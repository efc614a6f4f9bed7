use crate::ConfigError;
use chrono::NaiveTime;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the resolver
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

/// Property feed and cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Fixed URL of the externally hosted XML feed
    pub url: String,

    /// Maximum age of the cached feed before it is considered stale (hours)
    #[serde(rename = "ttl-hours", default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// Local wall-clock times ("HH:MM") at which the feed is refreshed
    #[serde(rename = "refresh-times", default = "default_refresh_times")]
    pub refresh_times: Vec<String>,

    /// Request timeout for scheduled refreshes (seconds)
    #[serde(
        rename = "scheduled-timeout-secs",
        default = "default_scheduled_timeout_secs"
    )]
    pub scheduled_timeout_secs: u64,

    /// Request timeout for on-demand refreshes from `get()` (seconds)
    #[serde(
        rename = "fallback-timeout-secs",
        default = "default_fallback_timeout_secs"
    )]
    pub fallback_timeout_secs: u64,

    /// Attempts per refresh before giving up
    #[serde(rename = "max-attempts", default = "default_feed_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds), doubled per attempt
    #[serde(rename = "backoff-ms", default = "default_feed_backoff_ms")]
    pub backoff_ms: u64,
}

impl FeedConfig {
    /// Creates a feed configuration with default timings for the given URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ttl_hours: default_ttl_hours(),
            refresh_times: default_refresh_times(),
            scheduled_timeout_secs: default_scheduled_timeout_secs(),
            fallback_timeout_secs: default_fallback_timeout_secs(),
            max_attempts: default_feed_attempts(),
            backoff_ms: default_feed_backoff_ms(),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }

    pub fn scheduled_timeout(&self) -> Duration {
        Duration::from_secs(self.scheduled_timeout_secs)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.fallback_timeout_secs)
    }

    /// Parses `refresh-times` into wall-clock times
    pub fn parsed_refresh_times(&self) -> Result<Vec<NaiveTime>, ConfigError> {
        self.refresh_times
            .iter()
            .map(|raw| {
                NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
                    ConfigError::Validation(format!("Invalid refresh time '{}': {}", raw, e))
                })
            })
            .collect()
    }
}

/// Headless browser fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Attempts per fetch, each in a fresh browsing context
    #[serde(rename = "max-attempts", default = "default_fetch_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds), doubled per attempt
    #[serde(rename = "backoff-ms", default = "default_fetch_backoff_ms")]
    pub backoff_ms: u64,

    /// Upper bound for one attempt: navigation, interaction and capture (seconds)
    #[serde(
        rename = "navigation-timeout-secs",
        default = "default_navigation_timeout_secs"
    )]
    pub navigation_timeout_secs: u64,

    /// Wait after the content-loaded milestone before interacting (milliseconds)
    #[serde(rename = "settle-ms", default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Shortest pause between synthetic interactions (milliseconds)
    #[serde(rename = "pause-min-ms", default = "default_pause_min_ms")]
    pub pause_min_ms: u64,

    /// Longest pause between synthetic interactions (milliseconds)
    #[serde(rename = "pause-max-ms", default = "default_pause_max_ms")]
    pub pause_max_ms: u64,

    /// Explicit Chromium executable; auto-detected when absent
    #[serde(rename = "chrome-path", default)]
    pub chrome_path: Option<String>,

    /// Run the browser without a window
    #[serde(default = "default_headless")]
    pub headless: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_fetch_attempts(),
            backoff_ms: default_fetch_backoff_ms(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_ms: default_settle_ms(),
            pause_min_ms: default_pause_min_ms(),
            pause_max_ms: default_pause_max_ms(),
            chrome_path: None,
            headless: default_headless(),
        }
    }
}

impl FetcherConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }
}

fn default_ttl_hours() -> u64 {
    12
}

fn default_refresh_times() -> Vec<String> {
    vec!["06:00".to_string(), "18:00".to_string()]
}

fn default_scheduled_timeout_secs() -> u64 {
    60
}

fn default_fallback_timeout_secs() -> u64 {
    120
}

fn default_feed_attempts() -> u32 {
    2
}

fn default_feed_backoff_ms() -> u64 {
    5000
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_fetch_backoff_ms() -> u64 {
    2000
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_settle_ms() -> u64 {
    5000
}

fn default_pause_min_ms() -> u64 {
    800
}

fn default_pause_max_ms() -> u64 {
    3000
}

fn default_headless() -> bool {
    true
}
