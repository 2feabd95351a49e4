//! Static route table of the dashboard.
//!
//! Descriptors are built once at startup and never mutated; the guard treats
//! the table as read-only input.

pub const HOME_PATH: &str = "/home";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";

pub const ROLE_CITIZEN: &str = "群众";
pub const ROLE_ANALYST: &str = "数据分析师";
pub const ROLE_ADMIN: &str = "管理员";

/// A page and the access requirements it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub path: String,
    pub requires_auth: bool,
    /// Roles allowed to reach the page. Empty means any role.
    pub roles: Vec<String>,
}

impl RouteDescriptor {
    /// Page anyone may reach.
    #[must_use]
    pub fn public(path: &str) -> Self {
        Self { path: path.to_owned(), requires_auth: false, roles: Vec::new() }
    }

    /// Page that needs a login token.
    #[must_use]
    pub fn authenticated(path: &str) -> Self {
        Self { requires_auth: true, ..Self::public(path) }
    }

    #[must_use]
    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(|r| (*r).to_owned()).collect();
        self
    }

    #[must_use]
    pub fn allows_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Route descriptors plus path aliases that redirect before any guard runs.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    aliases: Vec<(String, String)>,
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: Vec<RouteDescriptor>) -> Self {
        Self { routes, aliases: Vec::new() }
    }

    #[must_use]
    pub fn with_alias(mut self, from: &str, to: &str) -> Self {
        self.aliases.push((from.to_owned(), to.to_owned()));
        self
    }

    /// The dashboard's pages and their access rules.
    #[must_use]
    pub fn dashboard() -> Self {
        Self::new(vec![
            RouteDescriptor::public(HOME_PATH),
            RouteDescriptor::authenticated("/county"),
            RouteDescriptor::authenticated("/analysis").with_roles(&[ROLE_CITIZEN, ROLE_ANALYST, ROLE_ADMIN]),
            RouteDescriptor::authenticated("/alerts").with_roles(&[ROLE_ADMIN]),
            RouteDescriptor::public(LOGIN_PATH),
            RouteDescriptor::authenticated("/users").with_roles(&[ROLE_ADMIN]),
            RouteDescriptor::authenticated("/profile"),
            RouteDescriptor::public(REGISTER_PATH),
        ])
        .with_alias("/", HOME_PATH)
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter()
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(from, to)| (from.as_str(), to.as_str()))
    }

    #[must_use]
    pub fn find(&self, path: &str) -> Option<&RouteDescriptor> {
        self.routes.iter().find(|r| r.path == path)
    }

    /// Follow an alias for `path`, if one is declared.
    #[must_use]
    pub fn resolve_alias<'a>(&'a self, path: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(from, _)| from == path)
            .map_or(path, |(_, to)| to.as_str())
    }
}

/// Strip query and fragment, ensure a leading `/`, and drop trailing slashes.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let trimmed = raw[..end].trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_owned()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
