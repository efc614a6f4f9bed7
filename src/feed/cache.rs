//! TTL cache around the remote feed
//!
//! # States
//!
//! | State | `get()` behaviour |
//! |-------|-------------------|
//! | Empty | Waits for a refresh; `FeedUnavailable` if it fails |
//! | Fresh | Returns the document, no network access |
//! | Stale | Refreshes on demand; keeps serving the old document if that fails |
//!
//! Refreshes are serialized. A `get()` that finds a refresh already in flight
//! returns the stale document instead of queueing behind it; only an empty
//! cache waits.

use super::FeedDocument;
use crate::config::FeedConfig;
use crate::retry::{retry, RetryPolicy};
use crate::{ResolverError, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Observable cache state, derived at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Fresh,
    Stale,
}

/// Where to fetch the feed from and how long to trust it
#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub url: String,
    pub ttl: Duration,
    /// Request timeout for scheduled refreshes
    pub scheduled_timeout: Duration,
    /// Request timeout for refreshes triggered by `get()`
    pub fallback_timeout: Duration,
    pub retry: RetryPolicy,
}

impl From<&FeedConfig> for FeedSettings {
    fn from(config: &FeedConfig) -> Self {
        Self {
            url: config.url.clone(),
            ttl: config.ttl(),
            scheduled_timeout: config.scheduled_timeout(),
            fallback_timeout: config.fallback_timeout(),
            retry: RetryPolicy::new(config.max_attempts, Duration::from_millis(config.backoff_ms)),
        }
    }
}

/// Builds the HTTP client used for feed downloads
///
/// Request timeouts are set per call, since scheduled and on-demand refreshes
/// use different bounds.
pub fn build_http_client() -> std::result::Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Timeouts, refused connections and 5xx responses are worth another try
fn is_retryable(error: &reqwest::Error) -> bool {
    error.is_timeout()
        || error.is_connect()
        || error.status().is_some_and(|status| status.is_server_error())
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else if let Some(status) = error.status() {
        format!("HTTP {}", status)
    } else {
        error.to_string()
    }
}

/// Process-wide holder of the current feed document
pub struct FeedCache {
    client: Client,
    settings: FeedSettings,
    current: RwLock<Option<Arc<FeedDocument>>>,
    refresh_lock: Mutex<()>,
}

impl FeedCache {
    /// Creates an empty cache; nothing is fetched until `get()` or `warm_up()`
    pub fn new(settings: FeedSettings) -> Result<Self> {
        Ok(Self::with_client(build_http_client()?, settings))
    }

    pub fn with_client(client: Client, settings: FeedSettings) -> Self {
        Self {
            client,
            settings,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        Self::new(FeedSettings::from(config))
    }

    /// Returns the current document without any network access
    pub async fn snapshot(&self) -> Option<Arc<FeedDocument>> {
        self.current.read().await.clone()
    }

    pub async fn state(&self) -> CacheState {
        match self.snapshot().await {
            None => CacheState::Empty,
            Some(doc) if doc.is_expired(self.settings.ttl) => CacheState::Stale,
            Some(_) => CacheState::Fresh,
        }
    }

    /// Returns a usable feed document
    ///
    /// # Returns
    ///
    /// * `Ok(document)` - Fresh, newly refreshed, or stale when the refresh
    ///   failed or another refresh is in flight
    /// * `Err(ResolverError::FeedUnavailable)` - No document was ever obtained
    ///   and the on-demand refresh failed
    pub async fn get(&self) -> Result<Arc<FeedDocument>> {
        match self.snapshot().await {
            Some(doc) if !doc.is_expired(self.settings.ttl) => Ok(doc),
            Some(stale) => Ok(self.refresh_stale(stale).await),
            None => self.fill_empty().await,
        }
    }

    async fn refresh_stale(&self, stale: Arc<FeedDocument>) -> Arc<FeedDocument> {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            tracing::debug!("Feed refresh in flight, serving stale document");
            return stale;
        };

        // A refresh may have completed between the read and the lock
        if let Some(doc) = self.snapshot().await {
            if !doc.is_expired(self.settings.ttl) {
                return doc;
            }
        }

        tracing::info!(
            "Feed document is stale (age {}s), refreshing",
            stale.age().num_seconds()
        );
        match self.refresh(self.settings.fallback_timeout).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Feed refresh failed, serving stale document: {}", e);
                stale
            }
        }
    }

    async fn fill_empty(&self) -> Result<Arc<FeedDocument>> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(doc) = self.snapshot().await {
            return Ok(doc);
        }

        tracing::info!("Feed cache empty, fetching {}", self.settings.url);
        self.refresh(self.settings.fallback_timeout).await
    }

    /// Fetches the feed once at startup
    pub async fn warm_up(&self) -> Result<()> {
        let doc = self.get().await?;
        tracing::info!("Feed warmed up ({} bytes)", doc.body.len());
        Ok(())
    }

    /// Refresh triggered by the scheduler
    ///
    /// Skipped when another refresh is in flight. Failures are logged and the
    /// previous document stays current.
    ///
    /// # Returns
    ///
    /// `true` if a new document was stored
    pub async fn refresh_scheduled(&self) -> bool {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            tracing::info!("Scheduled feed refresh skipped: refresh already in flight");
            return false;
        };

        match self.refresh(self.settings.scheduled_timeout).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Scheduled feed refresh failed: {}", e);
                false
            }
        }
    }

    /// Downloads the feed and swaps it in. Callers hold `refresh_lock`.
    async fn refresh(&self, timeout: Duration) -> Result<Arc<FeedDocument>> {
        let outcome = retry(
            self.settings.retry,
            "Feed refresh",
            is_retryable,
            |_| self.download(timeout),
        )
        .await;

        match outcome {
            Ok(body) => {
                let doc = Arc::new(FeedDocument::new(body));
                *self.current.write().await = Some(Arc::clone(&doc));
                tracing::info!("Feed refreshed ({} bytes)", doc.body.len());
                Ok(doc)
            }
            Err(exhausted) => Err(ResolverError::FeedUnavailable(format!(
                "{} after {} attempt(s)",
                describe(&exhausted.error),
                exhausted.attempts
            ))),
        }
    }

    async fn download(&self, timeout: Duration) -> std::result::Result<String, reqwest::Error> {
        self.client
            .get(&self.settings.url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}
