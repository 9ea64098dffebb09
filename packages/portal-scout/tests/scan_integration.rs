//! Integration tests for a full portal scan against the mock browser.
//!
//! These tests drive the whole flow:
//! 1. Dual login (portal form, then SSO form)
//! 2. Ticket discovery on the dashboard
//! 3. Recency filtering
//! 4. Reply-thread extraction from detail pages

use chrono::NaiveDate;
use std::time::Duration;

use portal_scout::{
    testing::MockBrowser,
    types::profile::groups,
    AuthenticationFlow, Browser, Credentials, CrossReferenceConfig, InteractionExtractor,
    InteractionKind, RecencyFilter, ScanOptions, Scanner, ScoutError, SiteProfile, SuccessRules,
    UrlPredicate, WaitConfig,
};

const LOGIN: &str = "https://eservice.example.com/login";
const SSO: &str = "https://sso.example.com/login";
const DASHBOARD: &str = "https://eservice.example.com/a/dashboard";
const TICKET_101: &str = "https://eservice.example.com/a/tickets/101";

const PORTAL_FORM: &str = r#"<html><head><title>eService</title></head><body>
    <form><input id="email" type="email"><input id="password" type="password">
    <button type="submit">Log in</button></form>
</body></html>"#;

const SSO_FORM: &str = r#"<html><head><title>Sign in to your account</title></head><body>
    <form><input id="i0116" type="email"><input id="i0118" type="password">
    <input id="idSIButton9" type="submit" value="Sign in"></form>
</body></html>"#;

const DASHBOARD_HTML: &str = r#"<html><head><title>Dashboard</title></head><body>
    <table class="tickets">
      <tr data-ticket-id="101"><td><a href="/a/tickets/101">Modem drops LTE</a></td><td>Open</td><td>2 days ago</td></tr>
      <tr data-ticket-id="102"><td><a href="/a/tickets/102">Flash write fails</a></td><td>Pending</td><td>15 days ago</td></tr>
      <tr data-ticket-id="103"><td><a href="/a/tickets/103">Printer offline</a></td><td>Closed</td></tr>
    </table>
</body></html>"#;

const DETAIL_HTML: &str = r#"<html><head><title>Ticket 101</title></head><body>
    <div class="conversation-item">
      <span class="author">Jane</span><time>3 hours ago</time>
      <p>Customer reports it is still dropping, tracked as OPS-12 here.</p>
    </div>
    <div class="conversation-item">
      <span class="author">Lee</span><time>1 days ago</time>
      <p>Please try firmware 2.1 and report back.</p>
    </div>
</body></html>"#;

/// Short waits so timeouts resolve quickly.
fn quick() -> WaitConfig {
    WaitConfig::uniform(Duration::from_millis(40)).with_poll_interval(Duration::from_millis(5))
}

fn dual_profile() -> SiteProfile {
    SiteProfile {
        name: "eService".into(),
        source: "eservice".into(),
        login_url: LOGIN.into(),
        second_login_url: None,
        dashboard_url: Some(DASHBOARD.into()),
        base_url: "https://eservice.example.com".into(),
        is_dual_login: true,
        selectors: Default::default(),
        success: SuccessRules {
            first_step_redirects: vec![UrlPredicate::new("sso.example.com")],
            ..Default::default()
        },
        cross_reference: Some(CrossReferenceConfig {
            tracker_url: "https://tracker.example.com".into(),
            project_keys: vec!["OPS".into()],
        }),
    }
    .with_selector(groups::USERNAME_INPUT, "#email, input[type='email']")
    .with_selector(groups::PASSWORD_INPUT, "#password")
    .with_selector(groups::LOGIN_BUTTON, "button[type='submit']")
    .with_selector(groups::SECOND_USERNAME_INPUT, "#i0116")
    .with_selector(groups::SECOND_PASSWORD_INPUT, "#i0118")
    .with_selector(groups::SECOND_LOGIN_BUTTON, "#idSIButton9")
}

/// A portal whose both forms lead where they should.
fn portal() -> MockBrowser {
    MockBrowser::new()
        .with_page(LOGIN, "eService", PORTAL_FORM)
        .with_page(SSO, "Sign in to your account", SSO_FORM)
        .with_page(DASHBOARD, "Dashboard", DASHBOARD_HTML)
        .with_page(TICKET_101, "Ticket 101", DETAIL_HTML)
        .with_submit(LOGIN, SSO)
        .with_submit(SSO, DASHBOARD)
}

fn options() -> ScanOptions {
    ScanOptions {
        wait: quick(),
        ..Default::default()
    }
}

fn fixed_today() -> RecencyFilter {
    RecencyFilter::new(NaiveDate::from_ymd_opt(2024, 5, 20).unwrap())
}

fn creds() -> Credentials {
    Credentials::new("fae@example.com", "hunter2")
}

#[tokio::test]
async fn test_dual_login_reaches_dashboard() {
    let browser = portal();
    let profile = dual_profile();

    let mut flow = AuthenticationFlow::new(&browser, quick());
    assert!(flow.login(&profile, &creds()).await);

    assert_eq!(browser.current_url().await.unwrap(), DASHBOARD);
    let typed: Vec<String> = browser.typed_values().into_iter().map(|(field, _)| field).collect();
    assert_eq!(typed, vec!["#email", "#password", "#i0116", "#i0118"]);
    assert_eq!(browser.clicks(), vec!["button[type='submit']", "#idSIButton9"]);
}

#[tokio::test]
async fn test_dual_login_fails_when_sso_submit_goes_nowhere() {
    let browser = MockBrowser::new()
        .with_page(LOGIN, "eService", PORTAL_FORM)
        .with_page(SSO, "Sign in to your account", SSO_FORM)
        .with_submit(LOGIN, SSO);

    let mut flow = AuthenticationFlow::new(&browser, quick());
    assert!(!flow.login(&dual_profile(), &creds()).await);
    assert_eq!(browser.current_url().await.unwrap(), SSO);
    assert_eq!(flow.history().last().copied(), Some(portal_scout::AuthState::SecondLoginFailed));
}

#[tokio::test]
async fn test_dual_login_fails_when_portal_rejects_first_form() {
    let browser = MockBrowser::new().with_page(LOGIN, "eService", PORTAL_FORM);

    let mut flow = AuthenticationFlow::new(&browser, quick());
    assert!(!flow.login(&dual_profile(), &creds()).await);
    assert_eq!(flow.history().last().copied(), Some(portal_scout::AuthState::FirstLoginFailed));
    // Second form never attempted
    assert_eq!(browser.clicks().len(), 1);
}

#[tokio::test]
async fn test_scan_keeps_recent_tickets_and_their_threads() {
    let browser = portal();
    let outcome = Scanner::new(browser.clone(), dual_profile(), options())
        .with_recency(fixed_today())
        .run(creds())
        .await
        .unwrap();

    assert_eq!(outcome.stats.nodes_discovered, 3);
    assert_eq!(outcome.stats.records_extracted, 3);
    assert_eq!(outcome.stats.records_in_window, 1);
    assert_eq!(outcome.stats.detail_pages_visited, 1);
    assert_eq!(outcome.stats.detail_pages_failed, 0);

    let record = &outcome.records[0];
    assert_eq!(record.id, "101");
    assert_eq!(record.title, "Modem drops LTE");
    assert_eq!(record.date, "2 days ago");
    assert_eq!(record.full_url, TICKET_101);
    assert_eq!(record.source, "eservice");

    assert_eq!(record.interactions.len(), 2);
    let first = &record.interactions[0];
    assert_eq!(first.author, "Jane");
    assert_eq!(first.timestamp, "3 hours ago");
    assert_eq!(first.kind, InteractionKind::CustomerResponse);
    assert_eq!(first.cross_references.len(), 1);
    assert_eq!(first.cross_references[0].ticket_id, "OPS-12");
    assert_eq!(
        first.cross_references[0].url,
        "https://tracker.example.com/browse/OPS-12"
    );
    assert_eq!(record.interactions[1].kind, InteractionKind::Other);

    assert!(browser.is_closed());
}

#[tokio::test]
async fn test_unreachable_detail_page_leaves_thread_empty() {
    let browser = portal().with_failing_url(TICKET_101);
    let outcome = Scanner::new(browser.clone(), dual_profile(), options())
        .with_recency(fixed_today())
        .run(creds())
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert!(outcome.records[0].interactions.is_empty());
    assert_eq!(outcome.stats.detail_pages_visited, 1);
    assert_eq!(outcome.stats.detail_pages_failed, 1);
}

#[tokio::test]
async fn test_failed_login_aborts_scan_and_closes_browser() {
    let browser = MockBrowser::new().with_page(LOGIN, "eService", PORTAL_FORM);
    let err = Scanner::new(browser.clone(), dual_profile(), options())
        .run(creds())
        .await
        .unwrap_err();

    assert!(matches!(err, ScoutError::AuthenticationFailed { .. }));
    assert!(browser.is_closed());
}

#[tokio::test]
async fn test_crashed_session_propagates_from_thread_fetch() {
    let browser = portal();
    browser.crash();

    let record = portal_scout::TicketRecord {
        full_url: TICKET_101.into(),
        ..Default::default()
    };
    let err = InteractionExtractor::default()
        .fetch(&browser, &record)
        .await
        .unwrap_err();
    assert!(err.is_session_failure());
}

#[tokio::test]
async fn test_skipping_threads_visits_no_detail_pages() {
    let browser = portal();
    let outcome = Scanner::new(
        browser.clone(),
        dual_profile(),
        ScanOptions {
            fetch_interactions: false,
            ..options()
        },
    )
    .with_recency(fixed_today())
    .run(creds())
    .await
    .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.stats.detail_pages_visited, 0);
    assert!(!browser.navigations().iter().any(|url| url == TICKET_101));
}
