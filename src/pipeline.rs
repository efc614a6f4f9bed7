//! Resolution pipeline
//!
//! Wires the classifier, fetcher, extractor and feed into the three caller
//! operations:
//!
//! 1. `resolve_from_url`: classify → fetch → extract
//! 2. `resolve_from_message`: message extraction, no I/O
//! 3. `get_contact`: feed `get()` → lookup
//!
//! Each call is independent; only the feed cache is shared between them.

use crate::extract::{extract_from_html, extract_from_message, ListingCode};
use crate::feed::{lookup, ContactRecord, FeedCache};
use crate::fetcher::Fetcher;
use crate::site::{classify, find_url};
use crate::{ResolverError, Result};
use std::sync::Arc;

pub struct Pipeline {
    fetcher: Fetcher,
    feed: Arc<FeedCache>,
}

impl Pipeline {
    pub fn new(fetcher: Fetcher, feed: Arc<FeedCache>) -> Self {
        Self { fetcher, feed }
    }

    pub fn feed(&self) -> &Arc<FeedCache> {
        &self.feed
    }

    /// Resolves the listing code of the ad at `input`
    ///
    /// `input` is either a bare URL or text that contains one.
    ///
    /// # Errors
    ///
    /// * `InvalidUrl` - No http(s) URL could be found
    /// * `Blocked` / `FetchFailed` - The page could not be loaded
    /// * `CodeNotFound` - The page loaded but carries no recognizable code
    pub async fn resolve_from_url(&self, input: &str) -> Result<ListingCode> {
        let url = find_url(input)?;
        let site = classify(url.as_str())?;
        tracing::debug!("Classified {} as {}", url, site);

        let page = self.fetcher.fetch(url.as_str(), site).await?;

        match extract_from_html(&page.html, site) {
            Some(code) => {
                tracing::info!("Resolved {} to listing code {}", page.url, code);
                Ok(code)
            }
            None => {
                tracing::warn!("No listing code found on {} ({})", page.url, site);
                Err(ResolverError::CodeNotFound {
                    source_name: page.url,
                })
            }
        }
    }

    /// Resolves a listing code written directly in a message
    pub fn resolve_from_message(&self, text: &str) -> Result<ListingCode> {
        extract_from_message(text).ok_or_else(|| ResolverError::CodeNotFound {
            source_name: "message".to_string(),
        })
    }

    /// Looks up the broker contact for `code` in the current feed
    pub async fn get_contact(&self, code: &str) -> Result<ContactRecord> {
        let document = self.feed.get().await?;
        let record = lookup(code, &document)?;
        tracing::info!("Found contact for listing {}", code.trim());
        Ok(record)
    }

    /// Message in, contact out
    ///
    /// Inputs mentioning a URL go through the page; anything else is read as
    /// a message.
    pub async fn resolve_contact(&self, input: &str) -> Result<(ListingCode, ContactRecord)> {
        let code = if find_url(input).is_ok() {
            self.resolve_from_url(input).await?
        } else {
            self.resolve_from_message(input)?
        };

        let contact = self.get_contact(code.as_str()).await?;
        Ok((code, contact))
    }
}
