//! Renderer abstraction for browser-based page loading.
//!
//! The fetcher drives pages through these traits so the browser engine
//! (Chromium via chromiumoxide in production) can be swapped for an
//! in-memory double in tests.

use super::stealth::StealthProfile;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Keys pressed during synthetic interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    PageDown,
    End,
}

impl Key {
    /// DOM `key` value
    pub fn key(&self) -> &'static str {
        match self {
            Self::ArrowDown => "ArrowDown",
            Self::PageDown => "PageDown",
            Self::End => "End",
        }
    }

    /// DOM `code` value
    pub fn code(&self) -> &'static str {
        self.key()
    }

    /// Windows virtual key code
    pub fn virtual_key_code(&self) -> i64 {
        match self {
            Self::ArrowDown => 40,
            Self::PageDown => 34,
            Self::End => 35,
        }
    }
}

/// One step of human-like page interaction
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    MouseMove { x: f64, y: f64 },
    Scroll { delta_y: f64 },
    KeyPress(Key),
    Pause(Duration),
}

/// A browser engine that hands out isolated browsing contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a fresh context (own cookies and storage) with the profile applied.
    async fn new_context(&self, profile: &StealthProfile) -> Result<Box<dyn RenderContext>>;
}

/// A single isolated browsing context holding one page.
#[async_trait]
pub trait RenderContext: Send {
    /// Navigate and wait for the content-loaded milestone.
    async fn navigate(&mut self, url: &str) -> Result<()>;
    /// Perform one synthetic interaction.
    async fn perform(&mut self, interaction: &Interaction) -> Result<()>;
    /// Get the full rendered HTML.
    async fn html(&mut self) -> Result<String>;
    /// Close the page and dispose of the context.
    async fn close(self: Box<Self>) -> Result<()>;
}
