use super::*;
use crate::router::routes::{ROLE_ADMIN, ROLE_ANALYST, ROLE_CITIZEN, RouteTable};
use crate::state::session::{Session, UserProfile};

fn anonymous() -> Session {
    Session::default()
}

fn logged_in(role: &str) -> Session {
    Session { token: Some("tok".to_owned()), user: Some(UserProfile::with_role(role)) }
}

fn route(path: &str) -> RouteDescriptor {
    RouteTable::dashboard().find(path).cloned().unwrap()
}

fn redirect(to: &'static str, reason: DenyReason) -> GuardDecision {
    GuardDecision::Redirect { to, reason }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn no_token_on_auth_route_redirects_to_login() {
    assert_eq!(evaluate(&route("/county"), &anonymous()), redirect(LOGIN_PATH, DenyReason::Unauthenticated));
}

#[test]
fn wrong_role_redirects_to_home() {
    assert_eq!(evaluate(&route("/alerts"), &logged_in(ROLE_CITIZEN)), redirect(HOME_PATH, DenyReason::Forbidden));
}

#[test]
fn matching_role_is_allowed() {
    assert_eq!(evaluate(&route("/alerts"), &logged_in(ROLE_ADMIN)), GuardDecision::Allow);
}

#[test]
fn logged_in_user_bounced_from_login() {
    assert_eq!(
        evaluate(&route(LOGIN_PATH), &logged_in(ROLE_CITIZEN)),
        redirect(HOME_PATH, DenyReason::AlreadyAuthenticated)
    );
}

#[test]
fn anonymous_user_reaches_public_home() {
    assert!(evaluate(&route(HOME_PATH), &anonymous()).is_allowed());
}

// =============================================================================
// Properties over the whole dashboard table
// =============================================================================

#[test]
fn every_auth_route_redirects_anonymous_to_login() {
    for route in RouteTable::dashboard().routes().filter(|r| r.requires_auth) {
        assert_eq!(
            evaluate(route, &anonymous()),
            redirect(LOGIN_PATH, DenyReason::Unauthenticated),
            "route {}",
            route.path
        );
    }
}

#[test]
fn every_role_route_sends_outsiders_home_and_admits_members() {
    let roles = [ROLE_CITIZEN, ROLE_ANALYST, ROLE_ADMIN, "普通用户"];
    for route in RouteTable::dashboard().routes().filter(|r| !r.roles.is_empty()) {
        for role in roles {
            let decision = evaluate(route, &logged_in(role));
            if route.allows_role(role) {
                assert_eq!(decision, GuardDecision::Allow, "{role} on {}", route.path);
            } else {
                assert_eq!(decision, redirect(HOME_PATH, DenyReason::Forbidden), "{role} on {}", route.path);
            }
        }
    }
}

#[test]
fn logged_in_user_bounced_from_register() {
    let session = Session { token: Some("tok".to_owned()), user: None };
    assert_eq!(evaluate(&route(REGISTER_PATH), &session), redirect(HOME_PATH, DenyReason::AlreadyAuthenticated));
}

#[test]
fn anonymous_user_may_open_login_and_register() {
    assert!(evaluate(&route(LOGIN_PATH), &anonymous()).is_allowed());
    assert!(evaluate(&route(REGISTER_PATH), &anonymous()).is_allowed());
}

// =============================================================================
// Ordering and degraded sessions
// =============================================================================

#[test]
fn token_without_profile_on_role_route_redirects_to_login() {
    let session = Session { token: Some("tok".to_owned()), user: None };
    assert_eq!(evaluate(&route("/users"), &session), redirect(LOGIN_PATH, DenyReason::MissingRole));
}

#[test]
fn auth_checked_before_role() {
    let session = Session { token: None, user: Some(UserProfile::with_role(ROLE_ADMIN)) };
    assert_eq!(evaluate(&route("/alerts"), &session), redirect(LOGIN_PATH, DenyReason::Unauthenticated));
}

#[test]
fn role_route_without_auth_flag_still_needs_a_role() {
    let route = RouteDescriptor::public("/reports").with_roles(&[ROLE_ANALYST]);
    let session = Session { token: None, user: None };
    assert_eq!(evaluate(&route, &session), redirect(LOGIN_PATH, DenyReason::MissingRole));
}

#[test]
fn empty_token_counts_as_logged_out() {
    let session = Session { token: Some(String::new()), user: Some(UserProfile::with_role(ROLE_ADMIN)) };
    assert_eq!(evaluate(&route("/profile"), &session), redirect(LOGIN_PATH, DenyReason::Unauthenticated));
}

#[test]
fn auth_route_without_roles_allows_any_token() {
    let session = Session { token: Some("tok".to_owned()), user: None };
    assert!(evaluate(&route("/profile"), &session).is_allowed());
}
