//! Browser seam.
//!
//! The browser engine is an external collaborator. Everything downstream only
//! needs to navigate, act on an element addressed by a [`Locator`], and read
//! the current URL, title, and HTML. One navigation is in flight at a time;
//! any navigation invalidates earlier HTML snapshots.

use async_trait::async_trait;

use crate::error::Result;
pub use crate::selector::Locator;

#[cfg(feature = "chrome")]
mod chrome;

#[cfg(feature = "chrome")]
pub use chrome::{ChromeBrowser, ChromeOptions};

/// A live browser context.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Load `url` in the current tab.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL of the current page, after any redirects.
    async fn current_url(&self) -> Result<String>;

    /// `<title>` of the current page (empty if none).
    async fn title(&self) -> Result<String>;

    /// Serialized HTML of the current page.
    async fn content(&self) -> Result<String>;

    /// Clear the addressed input and type `text` into it.
    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()>;

    /// Click the addressed element.
    async fn click(&self, locator: &Locator) -> Result<()>;

    /// Tear the session down. Further calls may fail.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl<B: Browser + ?Sized> Browser for Box<B> {
    async fn navigate(&self, url: &str) -> Result<()> {
        (**self).navigate(url).await
    }

    async fn current_url(&self) -> Result<String> {
        (**self).current_url().await
    }

    async fn title(&self) -> Result<String> {
        (**self).title().await
    }

    async fn content(&self) -> Result<String> {
        (**self).content().await
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        (**self).type_text(locator, text).await
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        (**self).click(locator).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
