//! Pre-navigation access check.
//!
//! DESIGN
//! ======
//! `evaluate` is a pure function of the target route and a read-only session
//! view. Checks run in a fixed order: authentication strictly before
//! authorization, then the logged-in bounce away from login/register. A user
//! without a token goes to `/login`; an authenticated user with the wrong
//! role goes to `/home`. The destination is the only signal of why access
//! was denied.
//!
//! This is a UX convenience. The server enforces permissions independently.

use super::routes::{HOME_PATH, LOGIN_PATH, REGISTER_PATH, RouteDescriptor};
use crate::state::session::SessionView;

/// Why a navigation was redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The route requires auth and no token is present.
    Unauthenticated,
    /// The route requires a role but none could be resolved from the session.
    MissingRole,
    /// The session's role is not in the route's required set.
    Forbidden,
    /// A logged-in user asked for the login or register page.
    AlreadyAuthenticated,
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect { to: &'static str, reason: DenyReason },
}

impl GuardDecision {
    fn redirect(to: &'static str, reason: DenyReason) -> Self {
        Self::Redirect { to, reason }
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decide whether the current session may enter `route`.
pub fn evaluate(route: &RouteDescriptor, session: &impl SessionView) -> GuardDecision {
    let token = session.token();

    if route.requires_auth && token.is_none() {
        return GuardDecision::redirect(LOGIN_PATH, DenyReason::Unauthenticated);
    }

    if !route.roles.is_empty() {
        let Some(role) = session.role() else {
            return GuardDecision::redirect(LOGIN_PATH, DenyReason::MissingRole);
        };
        if !route.allows_role(&role) {
            return GuardDecision::redirect(HOME_PATH, DenyReason::Forbidden);
        }
    }

    if (route.path == LOGIN_PATH || route.path == REGISTER_PATH) && token.is_some() {
        return GuardDecision::redirect(HOME_PATH, DenyReason::AlreadyAuthenticated);
    }

    GuardDecision::Allow
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
