//! Login state machine.
//!
//! Drives one login form, or two in sequence for dual-login portals (portal
//! form, then SSO form). Portals give no structured success signal, so each
//! step is judged by where the browser lands afterwards, using the profile's
//! [`SuccessRules`](crate::types::profile::SuccessRules).
//!
//! ```text
//! Unauthenticated -> FirstLoginSubmitted -> FirstLoginConfirmed | FirstLoginFailed
//!   [dual] FirstLoginConfirmed -> SecondLoginSubmitted -> Authenticated | SecondLoginFailed
//!   [single] FirstLoginConfirmed -> Authenticated
//! ```

use tracing::{debug, error, info, warn};

use crate::browser::{Browser, Locator};
use crate::error::{Result, ScoutError};
use crate::selector::{resolve_in_page, resolve_with_wait};
use crate::types::credentials::Credentials;
use crate::types::profile::{groups, SiteProfile};
use crate::wait::{wait_for_ready, wait_for_url_change, WaitConfig};

/// Where a login attempt is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    FirstLoginSubmitted,
    FirstLoginConfirmed,
    FirstLoginFailed,
    SecondLoginSubmitted,
    Authenticated,
    SecondLoginFailed,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated)
    }

    /// State to land in when the current stage errors out.
    fn failure(&self) -> AuthState {
        match self {
            AuthState::Unauthenticated | AuthState::FirstLoginSubmitted => AuthState::FirstLoginFailed,
            _ => AuthState::SecondLoginFailed,
        }
    }
}

/// Selector groups making up one login form.
struct LoginForm {
    username: &'static str,
    password: &'static str,
    button: &'static str,
}

const FIRST_FORM: LoginForm = LoginForm {
    username: groups::USERNAME_INPUT,
    password: groups::PASSWORD_INPUT,
    button: groups::LOGIN_BUTTON,
};

const SECOND_FORM: LoginForm = LoginForm {
    username: groups::SECOND_USERNAME_INPUT,
    password: groups::SECOND_PASSWORD_INPUT,
    button: groups::SECOND_LOGIN_BUTTON,
};

/// Login driver bound to one browser session.
pub struct AuthenticationFlow<'a, B: Browser + ?Sized> {
    browser: &'a B,
    wait: WaitConfig,
    history: Vec<AuthState>,
}

impl<'a, B: Browser + ?Sized> AuthenticationFlow<'a, B> {
    pub fn new(browser: &'a B, wait: WaitConfig) -> Self {
        Self {
            browser,
            wait,
            history: vec![AuthState::Unauthenticated],
        }
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        self.history
            .last()
            .copied()
            .unwrap_or(AuthState::Unauthenticated)
    }

    /// Every state visited during the last attempt, in order.
    pub fn history(&self) -> &[AuthState] {
        &self.history
    }

    /// Log in. Never errors: any failure is logged and yields `false`.
    pub async fn login(&mut self, profile: &SiteProfile, credentials: &Credentials) -> bool {
        self.attempt(profile, credentials).await.is_authenticated()
    }

    /// Log in and return the final state.
    pub async fn attempt(&mut self, profile: &SiteProfile, credentials: &Credentials) -> AuthState {
        self.history = vec![AuthState::Unauthenticated];
        info!(
            profile = %profile.name,
            dual = profile.is_dual_login,
            username = %credentials.username,
            "Starting login"
        );

        if !self.run_step(profile, credentials, Step::First).await {
            error!(profile = %profile.name, "First login failed");
            return self.state();
        }

        if !profile.is_dual_login {
            self.transition(AuthState::Authenticated);
            info!(profile = %profile.name, "Single login complete");
            return self.state();
        }

        info!(profile = %profile.name, "Dual login, continuing with second form");
        if self.run_step(profile, credentials, Step::Second).await {
            info!(profile = %profile.name, "Dual login complete");
        } else {
            error!(profile = %profile.name, "Second login failed");
        }
        self.state()
    }

    /// Run one step, folding errors into the stage's failure state.
    async fn run_step(&mut self, profile: &SiteProfile, credentials: &Credentials, step: Step) -> bool {
        let outcome = match step {
            Step::First => self.first_step(profile, credentials).await,
            Step::Second => self.second_step(profile, credentials).await,
        };

        let passed = match outcome {
            Ok(passed) => passed,
            Err(e) => {
                error!(profile = %profile.name, step = ?step, error = %e, "Login step errored");
                false
            }
        };

        let next = match (step, passed) {
            (Step::First, true) => AuthState::FirstLoginConfirmed,
            (Step::Second, true) => AuthState::Authenticated,
            _ => self.state().failure(),
        };
        self.transition(next);
        passed
    }

    async fn first_step(&mut self, profile: &SiteProfile, credentials: &Credentials) -> Result<bool> {
        self.browser.navigate(&profile.login_url).await?;
        wait_for_ready(self.browser, &self.wait).await?;
        self.log_page("First login page").await;

        // Forms are often rendered after the body appears
        let username = profile.selector(FIRST_FORM.username)?;
        match resolve_with_wait(self.browser, username, self.wait.element_timeout, self.wait.poll_interval).await {
            Ok(_) => {}
            Err(ScoutError::Timeout { candidates }) => {
                error!(field = FIRST_FORM.username, candidates = %candidates, "Login field not found");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        if !self
            .fill_and_submit(profile, &FIRST_FORM, credentials, AuthState::FirstLoginSubmitted)
            .await?
        {
            return Ok(false);
        }

        let url = self.browser.current_url().await?;
        let passed = if profile.is_dual_login {
            profile.success.first_step_passed(&url)
        } else {
            profile.success.left_login(&url)
        };

        if passed {
            info!(url = %url, "First login accepted");
        } else {
            warn!(url = %url, "First login did not reach an expected page");
        }
        Ok(passed)
    }

    async fn second_step(&mut self, profile: &SiteProfile, credentials: &Credentials) -> Result<bool> {
        let url = self.browser.current_url().await?;
        let title = self.browser.title().await?;
        self.log_page("Second login page").await;

        if profile.success.reached_dashboard(&url, &title) {
            info!(url = %url, "Already on the dashboard, skipping second form");
            return Ok(true);
        }

        if !self.await_second_form(profile).await? {
            return Ok(false);
        }

        if !self
            .fill_and_submit(profile, &SECOND_FORM, credentials, AuthState::SecondLoginSubmitted)
            .await?
        {
            return Ok(false);
        }

        let url = self.browser.current_url().await?;
        let title = self.browser.title().await?;
        let passed = profile.success.reached_dashboard(&url, &title);
        if passed {
            info!(url = %url, "Second login reached the dashboard");
        } else {
            warn!(url = %url, title = %title, "Second login did not reach the dashboard");
        }
        Ok(passed)
    }

    /// Wait for the SSO form; if it never shows, load it directly once.
    async fn await_second_form(&mut self, profile: &SiteProfile) -> Result<bool> {
        let candidates = profile.selector(SECOND_FORM.username)?;
        let timeout = self.wait.element_timeout;
        let poll = self.wait.poll_interval;

        match resolve_with_wait(self.browser, candidates, timeout, poll).await {
            Ok(_) => return Ok(true),
            Err(ScoutError::Timeout { .. }) => {}
            Err(e) => return Err(e),
        }

        let Some(second_url) = profile.second_login_url.as_deref() else {
            error!(
                field = SECOND_FORM.username,
                candidates = %candidates,
                "Second login field not found"
            );
            return Ok(false);
        };

        warn!(url = %second_url, "Second form did not appear, loading it directly");
        self.browser.navigate(second_url).await?;
        wait_for_ready(self.browser, &self.wait).await?;

        match resolve_with_wait(self.browser, candidates, timeout, poll).await {
            Ok(_) => Ok(true),
            Err(ScoutError::Timeout { candidates }) => {
                error!(field = SECOND_FORM.username, candidates = %candidates, "Second login field not found");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Fill both fields and click submit. `Ok(false)` when a field is missing.
    async fn fill_and_submit(
        &mut self,
        profile: &SiteProfile,
        form: &LoginForm,
        credentials: &Credentials,
        submitted: AuthState,
    ) -> Result<bool> {
        let Some(username) = self.locate(profile, form.username).await? else {
            return Ok(false);
        };
        self.browser.type_text(&username, &credentials.username).await?;
        debug!(field = form.username, "Entered username");

        let Some(password) = self.locate(profile, form.password).await? else {
            return Ok(false);
        };
        self.browser
            .type_text(&password, credentials.password.expose())
            .await?;
        debug!(field = form.password, "Entered password");

        let Some(button) = self.locate(profile, form.button).await? else {
            return Ok(false);
        };

        let before = self.browser.current_url().await?;
        self.browser.click(&button).await?;
        self.transition(submitted);
        debug!(field = form.button, "Submitted login form");

        let after = wait_for_url_change(self.browser, &before, &self.wait).await?;
        if after != before {
            // The landing page may still be loading; judge it once it has a body
            if let Err(e) = wait_for_ready(self.browser, &self.wait).await {
                debug!(url = %after, error = %e, "Landing page not ready");
            }
        }
        Ok(true)
    }

    async fn locate(&self, profile: &SiteProfile, group: &str) -> Result<Option<Locator>> {
        let candidates = profile.selector(group)?;
        match resolve_in_page(self.browser, candidates).await {
            Ok(locator) => Ok(Some(locator)),
            Err(ScoutError::ElementNotFound { candidates }) => {
                error!(field = group, candidates = %candidates, "Login field not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn log_page(&self, label: &str) {
        let url = self.browser.current_url().await.unwrap_or_default();
        let title = self.browser.title().await.unwrap_or_default();
        debug!(url = %url, title = %title, "{}", label);
    }

    fn transition(&mut self, next: AuthState) {
        debug!(from = ?self.state(), to = ?next, "Auth state");
        self.history.push(next);
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    First,
    Second,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBrowser;
    use crate::types::profile::{SuccessRules, UrlPredicate};
    use std::collections::HashMap;
    use std::time::Duration;

    const PORTAL_LOGIN: &str = "https://portal.example.com/login";
    const PORTAL_HOME: &str = "https://portal.example.com/tickets";

    const FORM: &str = r#"<html><body><form>
        <input id="email" type="email"><input id="pw" type="password">
        <button type="submit">Sign in</button>
    </form></body></html>"#;

    fn quick() -> WaitConfig {
        WaitConfig::uniform(Duration::from_millis(30)).with_poll_interval(Duration::from_millis(5))
    }

    fn single_profile() -> SiteProfile {
        SiteProfile {
            name: "Tracker".into(),
            source: "tracker".into(),
            login_url: PORTAL_LOGIN.into(),
            second_login_url: None,
            dashboard_url: None,
            base_url: "https://portal.example.com".into(),
            is_dual_login: false,
            selectors: HashMap::new(),
            success: SuccessRules::default(),
            cross_reference: None,
        }
        .with_selector(groups::USERNAME_INPUT, "#email")
        .with_selector(groups::PASSWORD_INPUT, "#pw")
        .with_selector(groups::LOGIN_BUTTON, "button[type='submit']")
    }

    fn creds() -> Credentials {
        Credentials::new("agent@example.com", "s3cret")
    }

    #[tokio::test]
    async fn test_single_login_success() {
        let browser = MockBrowser::new()
            .with_page(PORTAL_LOGIN, "Login", FORM)
            .with_page(PORTAL_HOME, "Tickets", "<html><body>list</body></html>")
            .with_submit(PORTAL_LOGIN, PORTAL_HOME);

        let mut flow = AuthenticationFlow::new(&browser, quick());
        assert!(flow.login(&single_profile(), &creds()).await);
        assert_eq!(
            flow.history(),
            &[
                AuthState::Unauthenticated,
                AuthState::FirstLoginSubmitted,
                AuthState::FirstLoginConfirmed,
                AuthState::Authenticated,
            ]
        );

        let typed = browser.typed_values();
        assert_eq!(typed[0], ("#email".to_string(), "agent@example.com".to_string()));
        assert_eq!(typed[1], ("#pw".to_string(), "s3cret".to_string()));
    }

    #[tokio::test]
    async fn test_single_login_stays_on_login_page() {
        let browser = MockBrowser::new().with_page(PORTAL_LOGIN, "Login", FORM);

        let mut flow = AuthenticationFlow::new(&browser, quick());
        assert_eq!(
            flow.attempt(&single_profile(), &creds()).await,
            AuthState::FirstLoginFailed
        );
    }

    #[tokio::test]
    async fn test_missing_password_field_fails_without_submitting() {
        let browser = MockBrowser::new().with_page(
            PORTAL_LOGIN,
            "Login",
            r#"<html><body><input id="email"><button type="submit">Go</button></body></html>"#,
        );

        let mut flow = AuthenticationFlow::new(&browser, quick());
        assert!(!flow.login(&single_profile(), &creds()).await);
        assert!(browser.clicks().is_empty());
        assert_eq!(flow.state(), AuthState::FirstLoginFailed);
    }

    #[tokio::test]
    async fn test_browser_crash_becomes_false() {
        let browser = MockBrowser::new().with_page(PORTAL_LOGIN, "Login", FORM);
        browser.crash();

        let mut flow = AuthenticationFlow::new(&browser, quick());
        assert!(!flow.login(&single_profile(), &creds()).await);
    }

    #[tokio::test]
    async fn test_dual_login_skips_second_form_when_already_in() {
        let mut profile = single_profile()
            .with_selector(groups::SECOND_USERNAME_INPUT, "input[name='email']")
            .with_selector(groups::SECOND_PASSWORD_INPUT, "input[name='password']")
            .with_selector(groups::SECOND_LOGIN_BUTTON, ".login-btn");
        profile.is_dual_login = true;
        profile.success.first_step_redirects =
            vec![UrlPredicate::new("portal.example.com").forbidding("login")];
        profile.success.second_step_portals = profile.success.first_step_redirects.clone();

        let browser = MockBrowser::new()
            .with_page(PORTAL_LOGIN, "Login", FORM)
            .with_page(PORTAL_HOME, "Tickets", "<html><body>list</body></html>")
            .with_submit(PORTAL_LOGIN, PORTAL_HOME);

        let mut flow = AuthenticationFlow::new(&browser, quick());
        assert!(flow.login(&profile, &creds()).await);
        assert_eq!(browser.clicks().len(), 1);
    }

    const SSO_LANDING: &str = "https://sso.example.com/start";
    const SSO_LOGIN: &str = "https://sso.example.com/login";
    const DASHBOARD: &str = "https://portal.example.com/dashboard";

    const SSO_FORM: &str = r#"<html><body><form>
        <input name="email"><input name="password" type="password">
        <button class="login-btn">Next</button>
    </form></body></html>"#;

    fn sso_profile(second_login_url: Option<&str>) -> SiteProfile {
        let mut profile = single_profile()
            .with_selector(groups::SECOND_USERNAME_INPUT, "input[name='email']")
            .with_selector(groups::SECOND_PASSWORD_INPUT, "input[name='password']")
            .with_selector(groups::SECOND_LOGIN_BUTTON, ".login-btn");
        profile.is_dual_login = true;
        profile.second_login_url = second_login_url.map(String::from);
        profile.success.first_step_redirects = vec![UrlPredicate::new("sso.example.com")];
        profile
    }

    fn sso_browser() -> MockBrowser {
        MockBrowser::new()
            .with_page(PORTAL_LOGIN, "Login", FORM)
            .with_page(SSO_LANDING, "Signing in", "<html><body>Redirecting</body></html>")
            .with_page(SSO_LOGIN, "Sign in", SSO_FORM)
            .with_page(DASHBOARD, "Dashboard", "<html><body>tickets</body></html>")
            .with_submit(PORTAL_LOGIN, SSO_LANDING)
            .with_submit(SSO_LOGIN, DASHBOARD)
    }

    #[tokio::test]
    async fn test_second_form_loaded_directly_when_redirect_stalls() {
        let browser = sso_browser();

        let mut flow = AuthenticationFlow::new(&browser, quick());
        assert!(flow.login(&sso_profile(Some(SSO_LOGIN)), &creds()).await);
        assert_eq!(flow.state(), AuthState::Authenticated);
        assert_eq!(browser.navigations(), vec![PORTAL_LOGIN.to_string(), SSO_LOGIN.to_string()]);

        let typed = browser.typed_values();
        assert_eq!(typed.len(), 4);
        assert_eq!(typed[2], ("input[name='email']".to_string(), "agent@example.com".to_string()));
    }

    #[tokio::test]
    async fn test_second_form_missing_without_fallback_url() {
        let browser = sso_browser();

        let mut flow = AuthenticationFlow::new(&browser, quick());
        assert_eq!(
            flow.attempt(&sso_profile(None), &creds()).await,
            AuthState::SecondLoginFailed
        );
        assert_eq!(browser.navigations(), vec![PORTAL_LOGIN.to_string()]);
    }
}
