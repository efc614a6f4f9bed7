//! Property feed
//!
//! This module keeps the remote XML feed available to lookups:
//! - `FeedCache` holds the single current document and refreshes it
//! - `scheduler` refreshes at fixed wall-clock times
//! - `lookup` projects a listing's contact fields out of a document

mod cache;
mod document;
mod lookup;
pub mod scheduler;

pub use cache::{build_http_client, CacheState, FeedCache, FeedSettings};
pub use document::FeedDocument;
pub use lookup::lookup;
pub use scheduler::{next_occurrence, spawn_scheduler};

use std::fmt;

/// Value used for any contact field the feed leaves out
pub const NOT_INFORMED: &str = "not informed";

/// Broker contact attached to a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRecord {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl ContactRecord {
    /// Builds a record, substituting `NOT_INFORMED` for absent or blank fields
    pub fn new(name: Option<String>, email: Option<String>, phone: Option<String>) -> Self {
        fn or_sentinel(value: Option<String>) -> String {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| NOT_INFORMED.to_string())
        }

        Self {
            name: or_sentinel(name),
            email: or_sentinel(email),
            phone: or_sentinel(phone),
        }
    }
}

impl fmt::Display for ContactRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {}", self.name, self.email, self.phone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_become_sentinel() {
        let record = ContactRecord::new(Some("  ".to_string()), None, Some(" 123 ".to_string()));
        assert_eq!(record.name, NOT_INFORMED);
        assert_eq!(record.email, NOT_INFORMED);
        assert_eq!(record.phone, "123");
    }
}
