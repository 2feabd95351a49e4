//! Client-side router: route table, guard, and navigation processing.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every navigation passes through [`guard::evaluate`] before the location
//! changes. A guard redirect is a fresh navigation and is guarded again, so
//! `/login` with a stale token still lands on `/home`.
//!
//! Navigations are processed one at a time (`&mut self`): the decision for
//! navigation N completes before N+1 is evaluated. The router only reads the
//! session; the login flow and 401 handling are the only writers.

pub mod guard;
pub mod routes;

use tracing::debug;

use crate::state::session::SessionView;
use guard::{DenyReason, GuardDecision};
use routes::{LOGIN_PATH, RouteTable, normalize_path};

/// Upper bound on guard redirects followed for a single navigation.
pub const MAX_REDIRECTS: usize = 8;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("no route matches {path}")]
    NotFound { path: String },

    #[error("navigation to {path} exceeded {hops} redirects")]
    RedirectLoop { path: String, hops: usize },
}

/// One user navigation action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub target_path: String,
    pub source_path: String,
}

/// A single guard redirect taken while resolving a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectHop {
    pub from: String,
    pub to: String,
    pub reason: DenyReason,
}

/// Result of a completed navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub requested: String,
    pub location: String,
    pub redirects: Vec<RedirectHop>,
}

impl Navigation {
    /// True when the guard let the request through without redirecting.
    #[must_use]
    pub fn allowed(&self) -> bool {
        self.redirects.is_empty()
    }

    /// Reason for the first redirect, which is why the requested page was refused.
    #[must_use]
    pub fn denial(&self) -> Option<DenyReason> {
        self.redirects.first().map(|hop| hop.reason)
    }
}

pub struct Router<V> {
    table: RouteTable,
    session: V,
    current: Option<String>,
}

impl<V: SessionView> Router<V> {
    pub fn new(table: RouteTable, session: V) -> Self {
        Self { table, session, current: None }
    }

    /// Router over the dashboard's own route table.
    pub fn dashboard(session: V) -> Self {
        Self::new(RouteTable::dashboard(), session)
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn session(&self) -> &V {
        &self.session
    }

    /// Location of the last successful navigation.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Navigate to `target`, following guard redirects until one is allowed.
    ///
    /// The current location only changes when the navigation completes.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NotFound`] if a path on the way matches no route and
    /// [`RouterError::RedirectLoop`] if redirects exceed [`MAX_REDIRECTS`].
    pub fn navigate(&mut self, target: &str) -> Result<Navigation, RouterError> {
        let requested = normalize_path(target);
        let mut request = NavigationRequest {
            target_path: requested.clone(),
            source_path: self.current.clone().unwrap_or_default(),
        };
        let mut redirects = Vec::new();

        loop {
            let path = self.table.resolve_alias(&request.target_path).to_owned();
            let route = self
                .table
                .find(&path)
                .ok_or_else(|| RouterError::NotFound { path: path.clone() })?;

            match guard::evaluate(route, &self.session) {
                GuardDecision::Allow => {
                    debug!(from = %request.source_path, to = %path, "navigation allowed");
                    self.current = Some(path.clone());
                    return Ok(Navigation { requested, location: path, redirects });
                }
                GuardDecision::Redirect { to, reason } => {
                    if redirects.len() >= MAX_REDIRECTS {
                        return Err(RouterError::RedirectLoop { path: requested, hops: redirects.len() });
                    }
                    debug!(from = %request.source_path, path = %path, to, ?reason, "navigation redirected");
                    redirects.push(RedirectHop { from: path, to: to.to_owned(), reason });
                    request.target_path = to.to_owned();
                }
            }
        }
    }

    /// Force the redirect to the login page after the server rejected the token.
    ///
    /// # Errors
    ///
    /// Propagates [`Router::navigate`] errors for the login route.
    pub fn handle_unauthorized(&mut self) -> Result<Navigation, RouterError> {
        self.navigate(LOGIN_PATH)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
