//! Site profiles: the only parameterization surface for a target portal.
//!
//! Switching portals means writing a new profile, not changing code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, ScoutError};
use crate::selector::SelectorList;

/// Selector group names used by the login flow and scrapers.
pub mod groups {
    pub const USERNAME_INPUT: &str = "username_input";
    pub const PASSWORD_INPUT: &str = "password_input";
    pub const LOGIN_BUTTON: &str = "login_button";
    pub const SECOND_USERNAME_INPUT: &str = "second_username_input";
    pub const SECOND_PASSWORD_INPUT: &str = "second_password_input";
    pub const SECOND_LOGIN_BUTTON: &str = "second_login_button";
    /// Optional: ticket rows tried before the built-in discovery strategies
    pub const TICKET_ITEM: &str = "ticket_item";
    /// Optional: overrides the default interaction container candidates
    pub const INTERACTION_CONTAINER: &str = "interaction_container";
    /// Optional: overrides the default author candidates
    pub const INTERACTION_AUTHOR: &str = "interaction_author";
}

/// A URL test: contains `contains`, and none of `forbid`.
///
/// Matching is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPredicate {
    pub contains: String,
    #[serde(default)]
    pub forbid: Vec<String>,
}

impl UrlPredicate {
    pub fn new(contains: impl Into<String>) -> Self {
        Self {
            contains: contains.into(),
            forbid: Vec::new(),
        }
    }

    pub fn forbidding(mut self, token: impl Into<String>) -> Self {
        self.forbid.push(token.into());
        self
    }

    pub fn matches(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        url.contains(&self.contains.to_lowercase())
            && !self
                .forbid
                .iter()
                .any(|token| url.contains(&token.to_lowercase()))
    }
}

/// Post-submit success heuristics.
///
/// Portals expose no structured success banner, so success is read off the
/// URL (and title) the browser lands on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessRules {
    /// Dual login, step 1: any of these means the first submit worked
    /// (typically the SSO provider's domain, or the portal minus "login").
    pub first_step_redirects: Vec<UrlPredicate>,

    /// Single login: success means this token left the URL.
    pub login_marker: String,

    /// Dual login, step 2: token looked for in URL and title.
    pub dashboard_marker: String,

    /// Dual login, step 2: any of these also counts as the dashboard.
    pub second_step_portals: Vec<UrlPredicate>,
}

impl Default for SuccessRules {
    fn default() -> Self {
        Self {
            first_step_redirects: Vec::new(),
            login_marker: "login".to_string(),
            dashboard_marker: "dashboard".to_string(),
            second_step_portals: Vec::new(),
        }
    }
}

impl SuccessRules {
    /// Single-login check.
    pub fn left_login(&self, url: &str) -> bool {
        !url.to_lowercase().contains(&self.login_marker.to_lowercase())
    }

    /// Dual-login step 1 check.
    pub fn first_step_passed(&self, url: &str) -> bool {
        self.first_step_redirects.iter().any(|p| p.matches(url))
    }

    /// Dual-login step 2 check.
    pub fn reached_dashboard(&self, url: &str, title: &str) -> bool {
        let marker = self.dashboard_marker.to_lowercase();
        url.to_lowercase().contains(&marker)
            || title.to_lowercase().contains(&marker)
            || self.second_step_portals.iter().any(|p| p.matches(url))
    }
}

/// External issue-tracker reference pattern.
///
/// Matches `<tracker_url>/browse/KEY-123` links and bare `KEY-123` ids for
/// each configured project key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossReferenceConfig {
    /// e.g. `https://tracker.example.com`
    pub tracker_url: String,
    /// e.g. `["OPS", "FW"]`
    pub project_keys: Vec<String>,
}

/// Everything needed to log into and scrape one portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Human name used in logs
    pub name: String,

    /// Tag written on every record (e.g. "eservice", "jira")
    pub source: String,

    pub login_url: String,

    #[serde(default)]
    pub second_login_url: Option<String>,

    /// Page listing tickets; when absent, the post-login page is used
    #[serde(default)]
    pub dashboard_url: Option<String>,

    /// Origin used to resolve relative ticket links
    pub base_url: String,

    #[serde(default)]
    pub is_dual_login: bool,

    pub selectors: HashMap<String, SelectorList>,

    #[serde(default)]
    pub success: SuccessRules,

    #[serde(default)]
    pub cross_reference: Option<CrossReferenceConfig>,
}

impl SiteProfile {
    /// Load a profile from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let profile: SiteProfile = serde_json::from_str(&raw)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Required selector group.
    pub fn selector(&self, group: &str) -> Result<&SelectorList> {
        self.selectors
            .get(group)
            .filter(|list| !list.is_empty())
            .ok_or_else(|| {
                ScoutError::InvalidProfile(format!(
                    "profile {} has no selector group {}",
                    self.name, group
                ))
            })
    }

    /// Optional selector group.
    pub fn optional_selector(&self, group: &str) -> Option<&SelectorList> {
        self.selectors.get(group).filter(|list| !list.is_empty())
    }

    pub fn with_selector(mut self, group: impl Into<String>, candidates: &str) -> Self {
        self.selectors
            .insert(group.into(), SelectorList::new(candidates));
        self
    }

    /// Check that the groups the login flow needs are present.
    pub fn validate(&self) -> Result<()> {
        let mut required = vec![
            groups::USERNAME_INPUT,
            groups::PASSWORD_INPUT,
            groups::LOGIN_BUTTON,
        ];
        if self.is_dual_login {
            required.extend([
                groups::SECOND_USERNAME_INPUT,
                groups::SECOND_PASSWORD_INPUT,
                groups::SECOND_LOGIN_BUTTON,
            ]);
            if self.success.first_step_redirects.is_empty() {
                return Err(ScoutError::InvalidProfile(format!(
                    "dual-login profile {} needs success.first_step_redirects",
                    self.name
                )));
            }
        }

        for group in required {
            self.selector(group)?;
        }

        url::Url::parse(&self.base_url).map_err(|e| {
            ScoutError::InvalidProfile(format!("base_url {}: {}", self.base_url, e))
        })?;

        Ok(())
    }
}
