//! Listing-Resolver: classified-ad URL to broker contact
//!
//! This crate resolves a real-estate listing from a free-form message to a
//! structured contact record. It classifies the ad's source site, renders the
//! page in a stealth headless browser, extracts the site's listing code and
//! looks that code up in a cached copy of the external property feed.

pub mod config;
pub mod extract;
pub mod feed;
pub mod fetcher;
pub mod pipeline;
pub mod retry;
pub mod site;

use std::fmt;
use thiserror::Error;

/// Main error type for listing resolution
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Page blocked by anti-bot challenge at {url} (marker: {marker})")]
    Blocked { url: String, marker: String },

    #[error("Failed to fetch {url} after {attempts} attempt(s): {reason}")]
    FetchFailed {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("No listing code found in {source_name}")]
    CodeNotFound { source_name: String },

    #[error("Property feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Listing not found in feed: {code}")]
    ListingNotFound { code: String },

    #[error("Malformed feed document: {0}")]
    MalformedFeed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable identifiers for the failure classes a caller can see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidUrl,
    Blocked,
    FetchFailed,
    CodeNotFound,
    FeedUnavailable,
    ListingNotFound,
    MalformedFeed,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::Blocked => "blocked",
            Self::FetchFailed => "fetch_failed",
            Self::CodeNotFound => "code_not_found",
            Self::FeedUnavailable => "feed_unavailable",
            Self::ListingNotFound => "listing_not_found",
            Self::MalformedFeed => "malformed_feed",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResolverError {
    /// Maps the error onto its caller-visible kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::Blocked { .. } => ErrorKind::Blocked,
            Self::FetchFailed { .. } => ErrorKind::FetchFailed,
            Self::CodeNotFound { .. } => ErrorKind::CodeNotFound,
            Self::FeedUnavailable(_) => ErrorKind::FeedUnavailable,
            Self::ListingNotFound { .. } => ErrorKind::ListingNotFound,
            Self::MalformedFeed(_) => ErrorKind::MalformedFeed,
            Self::Config(_) | Self::Browser(_) | Self::Reqwest(_) | Self::Io(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Returns true for the expected "nothing there" outcomes
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::CodeNotFound | ErrorKind::ListingNotFound
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),

    #[error("No URL found in: {0}")]
    NotFound(String),
}

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, ResolverError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::{extract_from_html, extract_from_message, ListingCode};
pub use feed::{ContactRecord, FeedCache, FeedDocument, NOT_INFORMED};
pub use fetcher::{Fetcher, RenderedPage};
pub use pipeline::Pipeline;
pub use site::{classify, SourceSite};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_stable() {
        let err = ResolverError::ListingNotFound {
            code: "AB1".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::ListingNotFound);
        assert_eq!(err.kind().to_string(), "listing_not_found");
        assert!(err.is_not_found());

        let err = ResolverError::Blocked {
            url: "https://example.com".to_string(),
            marker: "Just a moment".to_string(),
        };
        assert_eq!(err.kind().as_str(), "blocked");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_url_error_maps_to_invalid_url() {
        let err: ResolverError = UrlError::NotFound("hello".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidUrl);
        assert!(err.to_string().contains("hello"));
    }

    #[test]
    fn test_plumbing_errors_are_internal() {
        let err = ResolverError::Browser("launch failed".to_string());
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
