//! Cached feed document
//!
//! A snapshot of the feed body together with the time it was fetched, so the
//! cache can tell fresh from stale without touching the network.

use chrono::{DateTime, Duration, Utc};

/// The full feed XML as last fetched
#[derive(Debug, Clone)]
pub struct FeedDocument {
    /// Raw XML body
    pub body: String,

    /// When the body was fetched
    pub fetched_at: DateTime<Utc>,
}

impl FeedDocument {
    /// Wraps a freshly fetched body, stamped with the current time
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            fetched_at: Utc::now(),
        }
    }

    /// Returns how long ago the body was fetched
    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }

    /// Checks whether the document has outlived `ttl`
    ///
    /// A TTL too large for chrono to represent never expires.
    pub fn is_expired(&self, ttl: std::time::Duration) -> bool {
        Duration::from_std(ttl).is_ok_and(|ttl| self.age() >= ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWELVE_HOURS: std::time::Duration = std::time::Duration::from_secs(12 * 3600);

    #[test]
    fn test_new_document_not_expired() {
        let doc = FeedDocument::new("<Listings/>");
        assert!(!doc.is_expired(TWELVE_HOURS));
        assert!(doc.age() < Duration::seconds(5));
    }

    #[test]
    fn test_document_expires_after_ttl() {
        let mut doc = FeedDocument::new("<Listings/>");
        doc.fetched_at = Utc::now() - Duration::hours(13);
        assert!(doc.is_expired(TWELVE_HOURS));
    }

    #[test]
    fn test_document_fresh_at_eleven_hours() {
        let mut doc = FeedDocument::new("<Listings/>");
        doc.fetched_at = Utc::now() - Duration::hours(11);
        assert!(!doc.is_expired(TWELVE_HOURS));
    }
}
