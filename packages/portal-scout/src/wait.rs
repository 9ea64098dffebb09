//! Bounded condition polling.
//!
//! Portals redirect asynchronously after a submit. Instead of sleeping a
//! fixed amount, poll for the condition and give up after a timeout.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::browser::Browser;
use crate::error::{Result, ScoutError};

/// Timeouts used while driving a portal.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// How long a page may take to expose a `<body>`.
    pub page_timeout: Duration,

    /// How long to wait for a post-submit redirect.
    pub redirect_timeout: Duration,

    /// How long to wait for a login field on a late-loading SSO page.
    pub element_timeout: Duration,

    /// Delay between polls.
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(10),
            redirect_timeout: Duration::from_secs(5),
            element_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl WaitConfig {
    /// Use the same bound for every wait.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            page_timeout: timeout,
            redirect_timeout: timeout,
            element_timeout: timeout,
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Wait until the current page has a `<body>`.
pub async fn wait_for_ready<B>(browser: &B, config: &WaitConfig) -> Result<()>
where
    B: Browser + ?Sized,
{
    let deadline = Instant::now() + config.page_timeout;

    loop {
        let html = browser.content().await?;
        if has_body(&html) {
            return Ok(());
        }

        if Instant::now() >= deadline {
            let url = browser.current_url().await.unwrap_or_default();
            return Err(ScoutError::NavigationFailed {
                url,
                reason: format!("page not ready after {:?}", config.page_timeout),
            });
        }

        sleep(config.poll_interval).await;
    }
}

/// Wait until the URL differs from `previous`.
///
/// Returns the URL observed last. An unchanged URL at the deadline is not an
/// error: callers decide what a missing redirect means.
pub async fn wait_for_url_change<B>(browser: &B, previous: &str, config: &WaitConfig) -> Result<String>
where
    B: Browser + ?Sized,
{
    let deadline = Instant::now() + config.redirect_timeout;

    loop {
        let current = browser.current_url().await?;
        if current != previous {
            debug!(from = %previous, to = %current, "URL changed");
            return Ok(current);
        }

        if Instant::now() >= deadline {
            debug!(url = %current, "URL unchanged after redirect timeout");
            return Ok(current);
        }

        sleep(config.poll_interval).await;
    }
}

fn has_body(html: &str) -> bool {
    html.to_ascii_lowercase().contains("<body")
}
