//! Chrome DevTools implementation of [`Browser`] via `chromiumoxide`.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::Mutex as SyncMutex;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{Browser, Locator};
use crate::error::{Result, ScoutError};

/// Launch options for a local Chrome/Chromium.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub window_size: (u32, u32),
    pub user_agent: Option<String>,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: false,
            window_size: (1920, 1080),
            user_agent: Some(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

/// A single-tab Chrome session.
pub struct ChromeBrowser {
    browser: Mutex<Option<CdpBrowser>>,
    page: Page,
    handler: JoinHandle<()>,
    last_url: SyncMutex<String>,
}

impl ChromeBrowser {
    /// Launch Chrome and open a blank tab.
    pub async fn launch(options: &ChromeOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.window_size.0, options.window_size.1)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(user_agent) = &options.user_agent {
            builder = builder.arg(format!("--user-agent={}", user_agent));
        }
        let config = builder.build().map_err(ScoutError::Browser)?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| ScoutError::Browser(format!("launch failed: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    error!(error = %e, "CDP handler error");
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScoutError::Browser(format!("new_page failed: {}", e)))?;

        info!(headless = options.headless, "Chrome session started");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler,
            last_url: SyncMutex::new(String::new()),
        })
    }

    /// Classify a CDP failure on the current page.
    fn cdp_error(&self, action: &str, e: CdpError) -> ScoutError {
        let url = self
            .last_url
            .lock()
            .map(|url| url.clone())
            .unwrap_or_default();
        map_cdp_error(action, &url, e, !self.handler.is_finished())
    }

    async fn element(&self, locator: &Locator) -> Result<chromiumoxide::Element> {
        self.page
            .find_element(locator.to_css())
            .await
            .map_err(|_| ScoutError::ElementNotFound {
                candidates: locator.to_string(),
            })
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        if let Ok(mut last) = self.last_url.lock() {
            *last = url.to_string();
        }
        self.page
            .goto(url)
            .await
            .map_err(|e| self.cdp_error("navigate", e))?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| self.cdp_error("read url", e))?;
        Ok(url.unwrap_or_default())
    }

    async fn title(&self) -> Result<String> {
        let title = self
            .page
            .get_title()
            .await
            .map_err(|e| self.cdp_error("read title", e))?;
        Ok(title.unwrap_or_default())
    }

    async fn content(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| self.cdp_error("read content", e))
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        let element = self.element(locator).await?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(|e| self.cdp_error("clear field", e))?;
        element
            .click()
            .await
            .map_err(|e| self.cdp_error("focus field", e))?
            .type_str(text)
            .await
            .map_err(|e| self.cdp_error("type", e))?;
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        let element = self.element(locator).await?;
        element
            .click()
            .await
            .map_err(|e| self.cdp_error("click", e))?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "Chrome did not close cleanly");
            }
            let _ = browser.wait().await;
            info!("Chrome session closed");
        }
        self.handler.abort();
        Ok(())
    }
}

/// Transport and process failures end the session. Anything else (a CDP
/// timeout, a JS exception, a missing frame) only affects the current page.
fn map_cdp_error(action: &str, url: &str, e: CdpError, handler_alive: bool) -> ScoutError {
    let transport = matches!(
        e,
        CdpError::Ws(_)
            | CdpError::ChannelSendError(_)
            | CdpError::NoResponse
            | CdpError::LaunchExit(..)
            | CdpError::LaunchIo(..)
            | CdpError::LaunchTimeout(..)
    );

    if transport || !handler_alive {
        return ScoutError::Browser(format!("{}: {}", action, e));
    }
    ScoutError::NavigationFailed {
        url: url.to_string(),
        reason: format!("{}: {}", action, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://eservice.example.com/a/tickets/4411";

    #[test]
    fn test_page_level_cdp_errors_keep_the_session() {
        let err = map_cdp_error("read content", URL, CdpError::Timeout, true);
        assert!(!err.is_session_failure());
        match err {
            ScoutError::NavigationFailed { url, reason } => {
                assert_eq!(url, URL);
                assert!(reason.starts_with("read content"));
            }
            other => panic!("expected navigation failure, got {other:?}"),
        }
    }

    #[test]
    fn test_transport_cdp_errors_end_the_session() {
        assert!(map_cdp_error("read content", URL, CdpError::NoResponse, true).is_session_failure());
    }

    #[test]
    fn test_dead_handler_ends_the_session() {
        assert!(map_cdp_error("click", URL, CdpError::Timeout, false).is_session_failure());
    }
}
