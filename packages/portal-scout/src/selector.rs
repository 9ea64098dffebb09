//! Candidate selector lists and first-match resolution.
//!
//! Profiles store selector groups as comma-joined strings. Each candidate is
//! dispatched positionally: `#name` is an id lookup, `.name` a class lookup,
//! anything else a CSS query. Candidates are tried in listed order and the
//! first one with a structural match wins.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::browser::Browser;
use crate::error::{Result, ScoutError};

/// How a single candidate addresses an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `#user_session_email`
    Id(String),
    /// `.btn.btn-primary` (all classes must be present)
    Class(Vec<String>),
    /// Any other CSS query
    Css(String),
}

impl Locator {
    /// Parse one trimmed candidate. Returns `None` for empty input.
    pub fn parse(candidate: &str) -> Option<Self> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return None;
        }

        if let Some(id) = candidate.strip_prefix('#') {
            return Some(Locator::Id(id.to_string()));
        }

        if let Some(classes) = candidate.strip_prefix('.') {
            let classes: Vec<String> = classes
                .split('.')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
            if classes.is_empty() {
                return None;
            }
            return Some(Locator::Class(classes));
        }

        Some(Locator::Css(candidate.to_string()))
    }

    /// Equivalent CSS selector, for browser engines that only take CSS.
    pub fn to_css(&self) -> String {
        match self {
            Locator::Id(id) => format!("[id=\"{}\"]", escape_attr(id)),
            Locator::Class(classes) => classes
                .iter()
                .map(|c| format!("[class~=\"{}\"]", escape_attr(c)))
                .collect(),
            Locator::Css(css) => css.clone(),
        }
    }

    /// First element under `scope` (in document order) this locator addresses.
    pub fn find_in<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        match self {
            Locator::Id(id) => scope
                .descendants()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().id() == Some(id.as_str())),
            Locator::Class(classes) => scope
                .descendants()
                .filter_map(ElementRef::wrap)
                .find(|el| {
                    classes
                        .iter()
                        .all(|wanted| el.value().classes().any(|c| c == wanted))
                }),
            Locator::Css(css) => {
                // Unparseable CSS is a non-match, not an error
                let selector = Selector::parse(css).ok()?;
                scope.select(&selector).next()
            }
        }
    }

    /// Whether the locator addresses anything in a raw HTML page.
    pub fn exists_in(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        self.find_in(document.root_element()).is_some()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{}", id),
            Locator::Class(classes) => write!(f, ".{}", classes.join(".")),
            Locator::Css(css) => f.write_str(css),
        }
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Ordered list of candidate selectors, as written in a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SelectorList {
    candidates: Vec<String>,
}

impl SelectorList {
    /// Split a comma-joined candidate string.
    pub fn new(raw: &str) -> Self {
        Self {
            candidates: raw
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Build from already-split candidates.
    pub fn from_candidates(candidates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Parsed locators, in candidate order.
    pub fn locators(&self) -> Vec<Locator> {
        self.candidates
            .iter()
            .filter_map(|c| Locator::parse(c))
            .collect()
    }

    fn not_found(&self) -> ScoutError {
        ScoutError::ElementNotFound {
            candidates: self.to_string(),
        }
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.candidates.join(", "))
    }
}

impl From<String> for SelectorList {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<&str> for SelectorList {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<SelectorList> for String {
    fn from(list: SelectorList) -> Self {
        list.to_string()
    }
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    /// Position of the winning candidate in the list
    pub index: usize,
    pub locator: Locator,
    pub element: ElementRef<'a>,
}

/// Resolve the first candidate with a structural match under `scope`.
///
/// Later candidates are never consulted once an earlier one matches, even
/// if they would also match.
pub fn resolve<'a>(candidates: &SelectorList, scope: ElementRef<'a>) -> Result<Resolved<'a>> {
    for (index, raw) in candidates.candidates().iter().enumerate() {
        let Some(locator) = Locator::parse(raw) else {
            continue;
        };
        if let Some(element) = locator.find_in(scope) {
            debug!(candidate = %locator, index, "Selector candidate matched");
            return Ok(Resolved {
                index,
                locator,
                element,
            });
        }
    }

    Err(candidates.not_found())
}

/// Resolve against a raw HTML snapshot, returning the winning locator.
pub fn resolve_in_html(candidates: &SelectorList, html: &str) -> Result<Locator> {
    let document = Html::parse_document(html);
    resolve(candidates, document.root_element()).map(|resolved| resolved.locator)
}

/// Resolve against the browser's current page.
pub async fn resolve_in_page<B>(browser: &B, candidates: &SelectorList) -> Result<Locator>
where
    B: Browser + ?Sized,
{
    let html = browser.content().await?;
    resolve_in_html(candidates, &html)
}

/// Poll the current page until a candidate matches or `timeout` elapses.
pub async fn resolve_with_wait<B>(
    browser: &B,
    candidates: &SelectorList,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Locator>
where
    B: Browser + ?Sized,
{
    let deadline = Instant::now() + timeout;

    loop {
        match resolve_in_page(browser, candidates).await {
            Ok(locator) => return Ok(locator),
            Err(ScoutError::ElementNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        if Instant::now() >= deadline {
            return Err(ScoutError::Timeout {
                candidates: candidates.to_string(),
            });
        }

        sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBrowser;

    const LOGIN_FORM: &str = r#"
        <html><body>
          <form id="login">
            <input id="user_session_email" name="user_session[email]" type="email">
            <input name="user_session[password]" type="password" class="field secret">
            <button type="submit" class="btn btn-primary btn-login">Sign in</button>
            <input type="submit" value="Go">
          </form>
        </body></html>
    "#;

    #[test]
    fn test_locator_dispatch() {
        assert_eq!(
            Locator::parse("#email"),
            Some(Locator::Id("email".into()))
        );
        assert_eq!(
            Locator::parse(".btn.btn-primary"),
            Some(Locator::Class(vec!["btn".into(), "btn-primary".into()]))
        );
        assert_eq!(
            Locator::parse("input[type='email']"),
            Some(Locator::Css("input[type='email']".into()))
        );
        assert_eq!(Locator::parse("   "), None);
    }

    #[test]
    fn test_selector_list_split_and_display() {
        let list = SelectorList::new("#a,  .b , input[type='text'], ");
        assert_eq!(list.candidates(), &["#a", ".b", "input[type='text']"]);
        assert_eq!(list.to_string(), "#a, .b, input[type='text']");
    }

    #[test]
    fn test_first_candidate_wins_even_if_later_matches() {
        let document = Html::parse_document(LOGIN_FORM);
        let list = SelectorList::new("button[type='submit'], .btn-login, input[type='submit']");

        let resolved = resolve(&list, document.root_element()).unwrap();
        assert_eq!(resolved.index, 0);
        assert_eq!(resolved.element.value().name(), "button");

        let reversed = SelectorList::new("input[type='submit'], button[type='submit']");
        let resolved = resolve(&reversed, document.root_element()).unwrap();
        assert_eq!(resolved.index, 0);
        assert_eq!(resolved.element.value().name(), "input");
    }

    #[test]
    fn test_skips_non_matching_candidates() {
        let document = Html::parse_document(LOGIN_FORM);
        let list = SelectorList::new("#missing, .nope, input[name='user_session[password]']");

        let resolved = resolve(&list, document.root_element()).unwrap();
        assert_eq!(resolved.index, 2);
        assert_eq!(resolved.element.value().attr("type"), Some("password"));
    }

    #[test]
    fn test_id_and_compound_class_lookup() {
        let document = Html::parse_document(LOGIN_FORM);

        let by_id = resolve(&SelectorList::new("#user_session_email"), document.root_element())
            .unwrap();
        assert_eq!(by_id.element.value().attr("type"), Some("email"));

        let by_class =
            resolve(&SelectorList::new(".btn.btn-login"), document.root_element()).unwrap();
        assert_eq!(by_class.element.value().name(), "button");

        assert!(resolve(&SelectorList::new(".btn.btn-danger"), document.root_element()).is_err());
    }

    #[test]
    fn test_not_found_carries_every_candidate() {
        let document = Html::parse_document(LOGIN_FORM);
        let list = SelectorList::new("#one, .two, select");

        match resolve(&list, document.root_element()) {
            Err(ScoutError::ElementNotFound { candidates }) => {
                assert_eq!(candidates, "#one, .two, select");
            }
            other => panic!("expected ElementNotFound, got {:?}", other.map(|r| r.index)),
        }
    }

    #[test]
    fn test_invalid_css_is_a_non_match() {
        let document = Html::parse_document(LOGIN_FORM);
        let list = SelectorList::new("input[[broken, #user_session_email");
        let resolved = resolve(&list, document.root_element()).unwrap();
        assert_eq!(resolved.index, 1);
    }

    #[test]
    fn test_to_css_roundtrips_through_css_lookup() {
        let document = Html::parse_document(LOGIN_FORM);
        for candidate in ["#user_session_email", ".btn.btn-primary"] {
            let locator = Locator::parse(candidate).unwrap();
            let css = Locator::Css(locator.to_css());
            assert_eq!(
                locator.find_in(document.root_element()).map(|e| e.id()),
                css.find_in(document.root_element()).map(|e| e.id()),
                "css form of {} should address the same element",
                candidate
            );
        }
    }

    #[test]
    fn test_serde_from_comma_string() {
        let list: SelectorList = serde_json::from_str(r##""#email, input[type='email']""##).unwrap();
        assert_eq!(list.candidates().len(), 2);
        assert_eq!(
            serde_json::to_string(&list).unwrap(),
            r##""#email, input[type='email']""##
        );
    }

    #[test]
    fn test_index_counts_unparseable_candidates() {
        let document = Html::parse_document(LOGIN_FORM);
        let list = SelectorList::from_candidates([".", "#user_session_email"]);
        let resolved = resolve(&list, document.root_element()).unwrap();
        assert_eq!(resolved.index, 1);
        assert_eq!(resolved.locator, Locator::Id("user_session_email".into()));
    }

    #[tokio::test]
    async fn test_resolve_with_wait_sees_late_element() {
        let url = "https://portal.example.com/login";
        let browser = MockBrowser::new().with_page(url, "Login", "<html><body>loading</body></html>");
        browser.navigate(url).await.unwrap();

        let later = browser.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            later.add_page(url, "Login", LOGIN_FORM);
        });

        let list = SelectorList::new("#missing, #user_session_email");
        let locator = resolve_with_wait(
            &browser,
            &list,
            Duration::from_secs(2),
            Duration::from_millis(5),
        )
        .await
        .unwrap();
        assert_eq!(locator, Locator::Id("user_session_email".into()));
    }

    #[tokio::test]
    async fn test_resolve_with_wait_timeout_names_every_candidate() {
        let url = "https://portal.example.com/login";
        let browser = MockBrowser::new().with_page(url, "Login", LOGIN_FORM);
        browser.navigate(url).await.unwrap();

        let list = SelectorList::new("#nope, .also-missing, input[name='otp']");
        let err = resolve_with_wait(
            &browser,
            &list,
            Duration::from_millis(20),
            Duration::from_millis(5),
        )
        .await
        .unwrap_err();
        match err {
            ScoutError::Timeout { candidates } => {
                for candidate in list.candidates() {
                    assert!(candidates.contains(candidate.as_str()), "{}", candidate);
                }
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
