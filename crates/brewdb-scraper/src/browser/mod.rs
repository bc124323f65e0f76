//! Narrow capability interface over a headless browser.
//!
//! The rendered-page adapter only needs to navigate, read the rendered HTML,
//! and close the session. Keeping the surface this small lets adapter logic
//! run against an in-memory fake in tests.

pub mod chromium;

use async_trait::async_trait;

use crate::error::{AttemptError, ScraperError};

pub use chromium::{ChromiumLauncher, ChromiumOptions};

/// One browser tab. Owned by a single adapter for the duration of its run.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Load `url` and wait for the document to settle.
    async fn navigate(&self, url: &str) -> Result<(), AttemptError>;
    /// The current page's rendered HTML.
    async fn content(&self) -> Result<String, AttemptError>;
    /// Release the tab and the browser process behind it.
    async fn close(&self) -> Result<(), ScraperError>;
}

/// Starts browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScraperError::BrowserSession`] if the browser cannot start.
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError>;
}
