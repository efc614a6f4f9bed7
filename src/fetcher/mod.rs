//! Page fetcher
//!
//! This module loads ad pages the way a person would, including:
//! - One isolated browsing context per attempt with a stealth profile applied
//! - Randomized pointer, wheel and keyboard interaction before capture
//! - Block-page detection on the captured HTML
//! - Bounded retries for transient failures
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Navigation error | Retry with a fresh context |
//! | Attempt timeout | Retry with a fresh context |
//! | Context creation error | Retry |
//! | Challenge page detected | Immediate → Blocked |
//! | Attempts exhausted | → FetchFailed |
//!
//! Browser resources are released on every exit path: the context is closed
//! after each attempt, whatever its outcome, and the Chromium context also
//! cleans up on drop when the caller abandons the future.

pub mod chromium;
mod renderer;
mod stealth;

pub use chromium::ChromiumRenderer;
pub use renderer::{Interaction, Key, RenderContext, Renderer};
pub use stealth::{detect_block, interaction_plan, Pacing, StealthProfile, BLOCK_MARKERS};

use crate::config::FetcherConfig;
use crate::retry::{retry, Exhausted, RetryPolicy};
use crate::site::SourceSite;
use crate::{ResolverError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Final HTML of a loaded page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// The URL that was requested
    pub url: String,
    /// Rendered HTML after interaction
    pub html: String,
}

/// Timing and retry knobs for the fetcher
#[derive(Debug, Clone, Copy)]
pub struct FetchSettings {
    pub retry: RetryPolicy,
    /// Upper bound for one attempt, from navigation to capture
    pub attempt_timeout: Duration,
    /// Wait after navigation before the first interaction
    pub settle: Duration,
    pub pacing: Pacing,
}

impl From<&FetcherConfig> for FetchSettings {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            retry: RetryPolicy::new(config.max_attempts, Duration::from_millis(config.backoff_ms)),
            attempt_timeout: config.navigation_timeout(),
            settle: Duration::from_millis(config.settle_ms),
            pacing: Pacing {
                min_pause: Duration::from_millis(config.pause_min_ms),
                max_pause: Duration::from_millis(config.pause_max_ms),
            },
        }
    }
}

/// Why a single attempt failed
#[derive(Debug)]
enum AttemptError {
    Transient(String),
    Blocked(&'static str),
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(reason) => f.write_str(reason),
            Self::Blocked(marker) => write!(f, "blocked ({})", marker),
        }
    }
}

/// Loads rendered pages through a `Renderer`
pub struct Fetcher {
    renderer: Arc<dyn Renderer>,
    settings: FetchSettings,
}

impl Fetcher {
    /// Creates a fetcher around an already running renderer
    pub fn new(renderer: Arc<dyn Renderer>, settings: FetchSettings) -> Self {
        Self { renderer, settings }
    }

    /// Fetches the fully rendered HTML of `url`
    ///
    /// # Arguments
    ///
    /// * `url` - The ad page to load
    /// * `site` - The classified site, selecting the stealth profile
    ///
    /// # Returns
    ///
    /// * `Ok(RenderedPage)` - The page HTML after interaction
    /// * `Err(ResolverError::Blocked)` - A challenge page was served
    /// * `Err(ResolverError::FetchFailed)` - Every attempt failed transiently
    pub async fn fetch(&self, url: &str, site: SourceSite) -> Result<RenderedPage> {
        tracing::info!("Fetching {} ({})", url, site);

        let label = format!("Fetch of {}", url);
        let outcome = retry(
            self.settings.retry,
            &label,
            AttemptError::is_retryable,
            move |attempt| self.attempt(url, site, attempt),
        )
        .await;

        match outcome {
            Ok(html) => {
                tracing::info!("Fetched {} ({} bytes)", url, html.len());
                Ok(RenderedPage {
                    url: url.to_string(),
                    html,
                })
            }
            Err(Exhausted {
                error: AttemptError::Blocked(marker),
                ..
            }) => Err(ResolverError::Blocked {
                url: url.to_string(),
                marker: marker.to_string(),
            }),
            Err(Exhausted {
                attempts,
                error: AttemptError::Transient(reason),
            }) => {
                tracing::error!("Giving up on {} after {} attempt(s): {}", url, attempts, reason);
                Err(ResolverError::FetchFailed {
                    url: url.to_string(),
                    attempts,
                    reason,
                })
            }
        }
    }

    /// One attempt in a fresh context; the context is always closed
    async fn attempt(
        &self,
        url: &str,
        site: SourceSite,
        attempt: u32,
    ) -> std::result::Result<String, AttemptError> {
        let profile = StealthProfile::for_site(site);
        let plan = interaction_plan(profile.viewport, self.settings.pacing);
        tracing::debug!(
            "Attempt {} for {}: viewport {:?}, {} interaction steps",
            attempt,
            url,
            profile.viewport,
            plan.len()
        );

        let mut context = self
            .renderer
            .new_context(&profile)
            .await
            .map_err(|e| AttemptError::Transient(format!("failed to open browsing context: {e:#}")))?;

        let outcome = tokio::time::timeout(
            self.settings.attempt_timeout,
            drive(context.as_mut(), url, &plan, self.settings.settle),
        )
        .await;

        if let Err(e) = context.close().await {
            tracing::warn!("Failed to close browsing context for {}: {:#}", url, e);
        }

        let html = match outcome {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => return Err(AttemptError::Transient(format!("{e:#}"))),
            Err(_) => {
                return Err(AttemptError::Transient(format!(
                    "timed out after {:?}",
                    self.settings.attempt_timeout
                )))
            }
        };

        if let Some(marker) = detect_block(&html) {
            tracing::error!("Page blocked by anti-bot challenge: {} (marker '{}')", url, marker);
            return Err(AttemptError::Blocked(marker));
        }

        Ok(html)
    }
}

/// Navigates, settles, plays the interaction plan and captures the HTML
async fn drive(
    context: &mut dyn RenderContext,
    url: &str,
    plan: &[Interaction],
    settle: Duration,
) -> anyhow::Result<String> {
    context.navigate(url).await?;
    tokio::time::sleep(settle).await;

    for step in plan {
        match step {
            Interaction::Pause(pause) => tokio::time::sleep(*pause).await,
            other => context.perform(other).await?,
        }
    }

    context.html().await
}
