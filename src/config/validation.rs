use crate::config::types::{Config, FeedConfig, FetcherConfig};
use crate::ConfigError;
use url::Url;

/// One year; anything longer means the feed is effectively never refreshed
const MAX_TTL_HOURS: u64 = 24 * 365;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_feed_config(&config.feed)?;
    validate_fetcher_config(&config.fetcher)?;
    Ok(())
}

/// Validates feed configuration
fn validate_feed_config(config: &FeedConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid feed url '{}': {}", config.url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Feed url '{}' must use http or https",
            config.url
        )));
    }

    if config.ttl_hours == 0 {
        return Err(ConfigError::Validation(
            "ttl_hours must be >= 1".to_string(),
        ));
    }

    if config.ttl_hours > MAX_TTL_HOURS {
        return Err(ConfigError::Validation(format!(
            "ttl_hours must be <= {}, got {}",
            MAX_TTL_HOURS, config.ttl_hours
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "feed max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.scheduled_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "scheduled_timeout_secs must be >= 1".to_string(),
        ));
    }

    // The on-demand path is the caller's last resort
    if config.fallback_timeout_secs < config.scheduled_timeout_secs {
        return Err(ConfigError::Validation(format!(
            "fallback_timeout_secs ({}) must not be shorter than scheduled_timeout_secs ({})",
            config.fallback_timeout_secs, config.scheduled_timeout_secs
        )));
    }

    config.parsed_refresh_times()?;

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "fetcher max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.navigation_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "navigation_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.pause_min_ms > config.pause_max_ms {
        return Err(ConfigError::Validation(format!(
            "pause_min_ms ({}) must not exceed pause_max_ms ({})",
            config.pause_min_ms, config.pause_max_ms
        )));
    }

    if let Some(path) = &config.chrome_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "chrome_path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            feed: FeedConfig::with_url("https://feeds.example.com/listings.xml"),
            fetcher: FetcherConfig::default(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_rejects_non_http_feed() {
        let mut config = valid_config();
        config.feed.url = "ftp://feeds.example.com/listings.xml".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));

        config.feed.url = "not a url".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let mut config = valid_config();
        config.feed.ttl_hours = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_huge_ttl() {
        let mut config = valid_config();
        config.feed.ttl_hours = u64::MAX;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));

        config.feed.ttl_hours = MAX_TTL_HOURS;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let mut config = valid_config();
        config.feed.ttl_hours = u64::MAX;
        assert_eq!(config.feed.ttl(), std::time::Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_rejects_bad_refresh_time() {
        let mut config = valid_config();
        config.feed.refresh_times = vec!["25:00".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_fallback_shorter_than_scheduled() {
        let mut config = valid_config();
        config.feed.scheduled_timeout_secs = 120;
        config.feed.fallback_timeout_secs = 60;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_inverted_pause_range() {
        let mut config = valid_config();
        config.fetcher.pause_min_ms = 500;
        config.fetcher.pause_max_ms = 100;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_attempt_bounds() {
        let mut config = valid_config();
        config.fetcher.max_attempts = 0;
        assert!(validate(&config).is_err());

        config.fetcher.max_attempts = 11;
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.feed.max_attempts = 0;
        assert!(validate(&config).is_err());
    }
}
