//! Chromium renderer using chromiumoxide.
//!
//! One browser process is shared by all lookups. Every call gets its own
//! CDP browser context, so cookies and storage never leak between pages.

use super::renderer::{Interaction, RenderContext, Renderer};
use super::stealth::StealthProfile;
use crate::config::FetcherConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-gpu",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-background-networking",
];

/// Shared headless Chromium instance
pub struct ChromiumRenderer {
    browser: Arc<Browser>,
    /// Serializes context creation on the shared connection
    context_lock: Mutex<()>,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launches Chromium with automation flags hidden
    pub async fn launch(config: &FetcherConfig) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        for arg in LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }
        builder = if config.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler event error: {}", e);
                }
            }
            tracing::debug!("Browser handler stopped");
        });

        tracing::info!("Chromium launched (headless: {})", config.headless);

        Ok(Self {
            browser: Arc::new(browser),
            context_lock: Mutex::new(()),
            handler,
        })
    }

    /// Closes the browser process
    pub async fn shutdown(self) {
        match Arc::try_unwrap(self.browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    tracing::warn!("Failed to close Chromium: {}", e);
                }
                let _ = browser.wait().await;
            }
            Err(_) => tracing::warn!("Chromium still in use at shutdown"),
        }
        self.handler.abort();
    }

    async fn apply_profile(page: &Page, profile: &StealthProfile) -> Result<()> {
        let user_agent = SetUserAgentOverrideParams::builder()
            .user_agent(profile.user_agent.clone())
            .accept_language(profile.accept_language())
            .platform(profile.platform.clone())
            .build()
            .map_err(|e| anyhow!(e))?;
        page.execute(user_agent).await?;

        let (width, height) = profile.viewport;
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(width))
            .height(i64::from(height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|e| anyhow!(e))?;
        page.execute(metrics).await?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(profile.init_script()))
            .await?;

        Ok(())
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self, profile: &StealthProfile) -> Result<Box<dyn RenderContext>> {
        let _guard = self.context_lock.lock().await;

        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .context("failed to create browser context")?
            .result
            .browser_context_id;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(|e| anyhow!(e))?;

        // From here on the context is owned by the guard and released on drop
        let mut context = ChromiumContext {
            page: None,
            context_id: Some(context_id),
            browser: Arc::clone(&self.browser),
            runtime: tokio::runtime::Handle::current(),
        };

        let page = self
            .browser
            .new_page(target)
            .await
            .context("failed to open page")?;
        context.page = Some(page.clone());

        Self::apply_profile(&page, profile)
            .await
            .context("failed to apply stealth profile")?;

        Ok(Box::new(context))
    }
}

/// One page inside its own browser context
///
/// `close` is the normal cleanup path. When the context is dropped without
/// it (a timed-out or cancelled fetch) cleanup is spawned on the runtime.
pub struct ChromiumContext {
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
    browser: Arc<Browser>,
    runtime: tokio::runtime::Handle,
}

impl ChromiumContext {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().ok_or_else(|| anyhow!("page already closed"))
    }

    async fn release(
        browser: Arc<Browser>,
        page: Option<Page>,
        context_id: Option<BrowserContextId>,
    ) -> Result<()> {
        if let Some(page) = page {
            page.close().await.context("failed to close page")?;
        }
        if let Some(id) = context_id {
            browser
                .execute(DisposeBrowserContextParams::new(id))
                .await
                .context("failed to dispose browser context")?;
        }
        Ok(())
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let page = self.page()?;
        page.goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;
        page.wait_for_navigation().await?;
        Ok(())
    }

    async fn perform(&mut self, interaction: &Interaction) -> Result<()> {
        let page = self.page()?;

        match interaction {
            Interaction::MouseMove { x, y } => {
                let event = DispatchMouseEventParams::builder()
                    .r#type(DispatchMouseEventType::MouseMoved)
                    .x(*x)
                    .y(*y)
                    .build()
                    .map_err(|e| anyhow!(e))?;
                page.execute(event).await?;
            }
            Interaction::Scroll { delta_y } => {
                let event = DispatchMouseEventParams::builder()
                    .r#type(DispatchMouseEventType::MouseWheel)
                    .x(200.0)
                    .y(200.0)
                    .delta_x(0.0)
                    .delta_y(*delta_y)
                    .build()
                    .map_err(|e| anyhow!(e))?;
                page.execute(event).await?;
            }
            Interaction::KeyPress(key) => {
                for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
                    let event = DispatchKeyEventParams::builder()
                        .r#type(kind)
                        .key(key.key())
                        .code(key.code())
                        .windows_virtual_key_code(key.virtual_key_code())
                        .build()
                        .map_err(|e| anyhow!(e))?;
                    page.execute(event).await?;
                }
            }
            Interaction::Pause(pause) => tokio::time::sleep(*pause).await,
        }

        Ok(())
    }

    async fn html(&mut self) -> Result<String> {
        self.page()?
            .content()
            .await
            .context("failed to read page content")
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        let page = self.page.take();
        let context_id = self.context_id.take();
        Self::release(Arc::clone(&self.browser), page, context_id).await
    }
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        if self.page.is_none() && self.context_id.is_none() {
            return;
        }

        let page = self.page.take();
        let context_id = self.context_id.take();
        let browser = Arc::clone(&self.browser);
        self.runtime.spawn(async move {
            if let Err(e) = Self::release(browser, page, context_id).await {
                tracing::warn!("Background browser cleanup failed: {:#}", e);
            }
        });
    }
}
