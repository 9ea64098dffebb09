//! The shipped profiles must load and validate.

use std::path::PathBuf;

use portal_scout::{types::profile::groups, SiteProfile};

fn profile_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../profiles")
        .join(name)
}

#[test]
fn test_eservice_profile_is_dual_login() {
    let profile = SiteProfile::from_file(profile_path("eservice.json")).unwrap();
    assert!(profile.is_dual_login);
    assert!(profile.second_login_url.is_some());
    assert!(profile.selector(groups::SECOND_LOGIN_BUTTON).is_ok());
    assert!(profile
        .success
        .first_step_passed("https://team.sso.example.com/login"));
    assert!(!profile
        .success
        .first_step_passed("https://eservice.example.com/login"));
    assert_eq!(
        profile.cross_reference.as_ref().map(|c| c.project_keys.len()),
        Some(2)
    );
}

#[test]
fn test_jira_profile_is_single_login() {
    let profile = SiteProfile::from_file(profile_path("jira.json")).unwrap();
    assert!(!profile.is_dual_login);
    assert!(profile.optional_selector(groups::INTERACTION_CONTAINER).is_some());
    assert!(profile.success.left_login("https://tracker.example.com/secure/Dashboard.jspa"));
}
