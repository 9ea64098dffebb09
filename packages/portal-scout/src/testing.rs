//! Mock browser for testing.
//!
//! Serves canned pages by URL, follows configured redirects, and moves to a
//! configured page when something on a form page is clicked. Every call is
//! recorded so tests can assert on what the login flow and scrapers did.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::browser::{Browser, Locator};
use crate::error::{Result, ScoutError};

/// A canned page.
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub title: String,
    pub html: String,
}

#[derive(Debug, Default)]
struct MockState {
    current_url: String,
    navigations: Vec<String>,
    typed: Vec<(String, String)>,
    clicks: Vec<String>,
    closed: bool,
}

/// Mock browser for testing.
///
/// # Example
///
/// ```rust
/// use portal_scout::testing::MockBrowser;
///
/// let browser = MockBrowser::new()
///     .with_page("https://portal.example.com/login", "Login", "<body><form>...</form></body>")
///     .with_submit("https://portal.example.com/login", "https://portal.example.com/home");
/// ```
#[derive(Default, Clone)]
pub struct MockBrowser {
    pages: Arc<RwLock<HashMap<String, MockPage>>>,
    redirects: Arc<RwLock<HashMap<String, String>>>,
    submits: Arc<RwLock<HashMap<String, String>>>,
    failing: Arc<RwLock<Vec<String>>>,
    crashed: Arc<AtomicBool>,
    state: Arc<RwLock<MockState>>,
}

impl MockBrowser {
    /// Create a new empty mock browser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page (builder pattern).
    pub fn with_page(self, url: &str, title: &str, html: &str) -> Self {
        self.add_page(url, title, html);
        self
    }

    /// Register or replace a page.
    pub fn add_page(&self, url: &str, title: &str, html: &str) {
        self.pages.write().unwrap().insert(
            url.to_string(),
            MockPage {
                title: title.to_string(),
                html: html.to_string(),
            },
        );
    }

    /// Navigating to `from` lands on `to`.
    pub fn with_redirect(self, from: &str, to: &str) -> Self {
        self.redirects
            .write()
            .unwrap()
            .insert(from.to_string(), to.to_string());
        self
    }

    /// Clicking any element while on `on_url` navigates to `to`.
    pub fn with_submit(self, on_url: &str, to: &str) -> Self {
        self.submits
            .write()
            .unwrap()
            .insert(on_url.to_string(), to.to_string());
        self
    }

    /// Navigating to `url` fails with a page-level error.
    pub fn with_failing_url(self, url: &str) -> Self {
        self.failing.write().unwrap().push(url.to_string());
        self
    }

    /// Simulate the browser process dying: every later call fails.
    pub fn crash(&self) {
        self.crashed.store(true, Ordering::SeqCst);
    }

    /// URLs passed to `navigate`, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.state.read().unwrap().navigations.clone()
    }

    /// `(locator, text)` pairs passed to `type_text`, in order.
    pub fn typed_values(&self) -> Vec<(String, String)> {
        self.state.read().unwrap().typed.clone()
    }

    /// Locators clicked, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.state.read().unwrap().clicks.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.read().unwrap().closed
    }

    fn check_alive(&self) -> Result<()> {
        if self.crashed.load(Ordering::SeqCst) {
            return Err(ScoutError::Browser("browser process exited".to_string()));
        }
        if self.state.read().unwrap().closed {
            return Err(ScoutError::Browser("session closed".to_string()));
        }
        Ok(())
    }

    fn current_page(&self) -> MockPage {
        let url = self.state.read().unwrap().current_url.clone();
        self.pages
            .read()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or_default()
    }

    fn follow_redirects(&self, url: &str) -> String {
        let redirects = self.redirects.read().unwrap();
        let mut current = url.to_string();
        // Bounded so a redirect cycle cannot hang a test
        for _ in 0..8 {
            match redirects.get(&current) {
                Some(next) => current = next.clone(),
                None => break,
            }
        }
        current
    }

    fn require_element(&self, locator: &Locator) -> Result<()> {
        if locator.exists_in(&self.current_page().html) {
            Ok(())
        } else {
            Err(ScoutError::ElementNotFound {
                candidates: locator.to_string(),
            })
        }
    }
}

#[async_trait]
impl Browser for MockBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.check_alive()?;
        self.state
            .write()
            .unwrap()
            .navigations
            .push(url.to_string());

        if self.failing.read().unwrap().iter().any(|u| u == url) {
            return Err(ScoutError::NavigationFailed {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            });
        }

        let landed = self.follow_redirects(url);
        self.state.write().unwrap().current_url = landed;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.check_alive()?;
        Ok(self.state.read().unwrap().current_url.clone())
    }

    async fn title(&self) -> Result<String> {
        self.check_alive()?;
        Ok(self.current_page().title)
    }

    async fn content(&self) -> Result<String> {
        self.check_alive()?;
        Ok(self.current_page().html)
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        self.check_alive()?;
        self.require_element(locator)?;
        self.state
            .write()
            .unwrap()
            .typed
            .push((locator.to_string(), text.to_string()));
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> Result<()> {
        self.check_alive()?;
        self.require_element(locator)?;

        let current = {
            let mut state = self.state.write().unwrap();
            state.clicks.push(locator.to_string());
            state.current_url.clone()
        };

        let target = self.submits.read().unwrap().get(&current).cloned();
        if let Some(target) = target {
            let landed = self.follow_redirects(&target);
            self.state.write().unwrap().current_url = landed;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.write().unwrap().closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = r#"<html><body><input id="email"><button type="submit">Go</button></body></html>"#;

    #[tokio::test]
    async fn test_submit_moves_to_target_page() {
        let browser = MockBrowser::new()
            .with_page("https://p.example.com/login", "Login", FORM)
            .with_page("https://p.example.com/home", "Home", "<body>home</body>")
            .with_submit("https://p.example.com/login", "https://p.example.com/home");

        browser.navigate("https://p.example.com/login").await.unwrap();
        let button = Locator::parse("button[type='submit']").unwrap();
        browser.click(&button).await.unwrap();

        assert_eq!(browser.current_url().await.unwrap(), "https://p.example.com/home");
        assert_eq!(browser.title().await.unwrap(), "Home");
    }

    #[tokio::test]
    async fn test_missing_element_is_not_found() {
        let browser = MockBrowser::new().with_page("https://p.example.com/", "", FORM);
        browser.navigate("https://p.example.com/").await.unwrap();

        let err = browser
            .type_text(&Locator::parse("#password").unwrap(), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::ElementNotFound { .. }));
        assert!(browser.typed_values().is_empty());
    }

    #[tokio::test]
    async fn test_crash_fails_every_call() {
        let browser = MockBrowser::new();
        browser.crash();
        assert!(browser.navigate("https://p.example.com/").await.unwrap_err().is_session_failure());
        assert!(browser.content().await.unwrap_err().is_session_failure());
    }

    #[tokio::test]
    async fn test_redirect_chain() {
        let browser = MockBrowser::new()
            .with_redirect("https://a.example.com/", "https://b.example.com/")
            .with_redirect("https://b.example.com/", "https://c.example.com/");
        browser.navigate("https://a.example.com/").await.unwrap();
        assert_eq!(browser.current_url().await.unwrap(), "https://c.example.com/");
        assert_eq!(browser.navigations(), vec!["https://a.example.com/"]);
    }
}
