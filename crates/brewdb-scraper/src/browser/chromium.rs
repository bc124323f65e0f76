//! Headless Chromium sessions via chromiumoxide.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{BrowserLauncher, BrowserSession};
use crate::error::{AttemptError, ScraperError};

#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    /// Explicit Chromium binary; chromiumoxide searches the usual locations when `None`.
    pub executable: Option<PathBuf>,
    pub user_agent: String,
    pub navigation_timeout: Duration,
    /// Extra wait after the load event so client-side scripts can render.
    pub settle_delay: Duration,
}

pub struct ChromiumLauncher {
    options: ChromiumOptions,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(options: ChromiumOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--lang=en-AU")
            .arg(format!("--user-agent={}", self.options.user_agent))
            .window_size(1280, 800);
        if let Some(path) = &self.options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| ScraperError::BrowserSession(format!("invalid browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::BrowserSession(format!("failed to launch Chromium: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "chromium handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(ScraperError::BrowserSession(format!(
                    "failed to open tab: {e}"
                )));
            }
        };

        tracing::info!("chromium session started");
        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task: std::sync::Mutex::new(Some(handler_task)),
            navigation_timeout: self.options.navigation_timeout,
            settle_delay: self.options.settle_delay,
        }))
    }
}

struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    navigation_timeout: Duration,
    settle_delay: Duration,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<(), AttemptError> {
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(AttemptError::Browser(e.to_string())),
            Err(_) => {
                return Err(AttemptError::Timeout {
                    url: url.to_owned(),
                    secs: self.navigation_timeout.as_secs(),
                })
            }
        }
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        Ok(())
    }

    async fn content(&self) -> Result<String, AttemptError> {
        self.page
            .content()
            .await
            .map_err(|e| AttemptError::Browser(format!("failed to read page content: {e}")))
    }

    async fn close(&self) -> Result<(), ScraperError> {
        let mut first_err = None;

        if let Err(e) = self.page.clone().close().await {
            first_err.get_or_insert(format!("failed to close tab: {e}"));
        }

        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                first_err.get_or_insert(format!("failed to close browser: {e}"));
            }
            if let Err(e) = browser.wait().await {
                first_err.get_or_insert(format!("failed to reap browser process: {e}"));
            }
        }

        let handler = self
            .handler_task
            .lock()
            .map(|mut guard| guard.take())
            .unwrap_or_default();
        if let Some(task) = handler {
            task.abort();
        }

        tracing::info!("chromium session closed");
        first_err.map_or(Ok(()), |msg| Err(ScraperError::BrowserSession(msg)))
    }
}
