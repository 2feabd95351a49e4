//! Persisted login session for the current user.
//!
//! DESIGN
//! ======
//! The session lives in a string-keyed store under two fixed keys: the raw
//! bearer token and the JSON-serialized user profile. The store is injected
//! through [`KeyValueStore`], so the same `SessionStore` runs against a
//! durable file in the binary and an in-memory map in tests.
//!
//! ERROR HANDLING
//! ==============
//! Reads never fail. Missing, unreadable, or corrupt persisted data reads as
//! "no session" and is logged; only writes surface [`StoreError`].

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Key holding the raw bearer token.
pub const TOKEN_KEY: &str = "token";
/// Key holding the serialized user profile.
pub const USER_KEY: &str = "currentUser";

// =============================================================================
// ERRORS
// =============================================================================

/// Failures writing to a session backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

// =============================================================================
// USER PROFILE
// =============================================================================

/// Cached profile of the logged-in user.
///
/// Only the role is interpreted; every other field the server sends is kept
/// verbatim in `fields` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, rename = "roleName", skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl UserProfile {
    /// Profile carrying only a role.
    #[must_use]
    pub fn with_role(role: &str) -> Self {
        Self { role: Some(role.to_owned()), ..Self::default() }
    }

    /// The user's role: `role`, falling back to `roleName`. Empty strings count as absent.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        non_empty(self.role.as_deref()).or_else(|| non_empty(self.role_name.as_deref()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// =============================================================================
// SESSION SNAPSHOT
// =============================================================================

/// Point-in-time copy of the persisted session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Read-only view of the session, as consumed by route guards.
pub trait SessionView {
    /// Current bearer token, if a login succeeded and has not been invalidated.
    fn token(&self) -> Option<String>;

    /// Role of the cached user profile, if one can be resolved.
    fn role(&self) -> Option<String>;
}

impl SessionView for Session {
    fn token(&self) -> Option<String> {
        self.token.clone().filter(|t| !t.is_empty())
    }

    fn role(&self) -> Option<String> {
        self.user.as_ref().and_then(UserProfile::role).map(str::to_owned)
    }
}

impl<T: SessionView + ?Sized> SessionView for &T {
    fn token(&self) -> Option<String> {
        (**self).token()
    }

    fn role(&self) -> Option<String> {
        (**self).role()
    }
}

impl<T: SessionView + ?Sized> SessionView for Arc<T> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }

    fn role(&self) -> Option<String> {
        (**self).role()
    }
}

// =============================================================================
// BACKENDS
// =============================================================================

/// Durable string-keyed storage backing a [`SessionStore`].
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot persist the value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot persist the removal.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Apply several writes in order. `None` removes the key.
    ///
    /// Backends that can persist the whole batch at once override this.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`]; earlier writes in the batch may have landed.
    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
        for (key, value) in changes {
            match value {
                Some(value) => self.set(key, value)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }
}

fn apply_to(entries: &mut HashMap<String, String>, changes: &[(&str, Option<&str>)]) {
    for (key, value) in changes {
        match value {
            Some(value) => entries.insert((*key).to_owned(), (*value).to_owned()),
            None => entries.remove(*key),
        };
    }
}

/// Process-local store. Contents vanish when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        apply_to(&mut entries, changes);
        Ok(())
    }
}

/// Store persisted as a flat JSON object in a single file.
///
/// Survives process restarts. Each file is its own isolated scope, the way
/// browser storage is scoped to one origin.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashMap<String, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return HashMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "session file unreadable; treating as empty");
                return HashMap::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "session file corrupt; treating as empty");
            HashMap::new()
        })
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.load();
        entries.insert(key.to_owned(), value.to_owned());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.load();
        if entries.remove(key).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.save(&entries)
    }

    /// One load and one save for the whole batch, so the file never holds half of it.
    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<(), StoreError> {
        let mut entries = self.load();
        apply_to(&mut entries, changes);
        self.save(&entries)
    }
}

// =============================================================================
// SESSION STORE
// =============================================================================

/// Typed session operations over a [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct SessionStore<S> {
    backend: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Persist `token` and `user`. Subsequent reads observe them immediately.
    ///
    /// A `None` user removes any previously cached profile. The profile is
    /// written before the token, and a failed write clears the session, so a
    /// new token is never paired with the previous user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend rejects the write.
    pub fn set_session(&self, token: &str, user: Option<&UserProfile>) -> Result<(), StoreError> {
        let user_json = user.map(serde_json::to_string).transpose()?;
        let changes = [(USER_KEY, user_json.as_deref()), (TOKEN_KEY, Some(token))];
        if let Err(e) = self.backend.apply(&changes) {
            warn!(error = %e, "session write failed; clearing partial session");
            if let Err(clear) = self.clear_session() {
                warn!(error = %clear, "failed to clear partial session");
            }
            return Err(e);
        }
        debug!(role = ?user.and_then(UserProfile::role), "session stored");
        Ok(())
    }

    /// Cached user profile, or `None` when absent or unparseable.
    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.backend.get(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "cached user profile is malformed; ignoring");
                None
            }
        }
    }

    pub fn session(&self) -> Session {
        Session { token: SessionView::token(self), user: self.user() }
    }

    /// Remove the token and the cached profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend rejects the removal.
    pub fn clear_session(&self) -> Result<(), StoreError> {
        self.backend.remove(TOKEN_KEY)?;
        self.backend.remove(USER_KEY)?;
        info!("session cleared");
        Ok(())
    }
}

impl<S: KeyValueStore> SessionView for SessionStore<S> {
    fn token(&self) -> Option<String> {
        self.backend.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    fn role(&self) -> Option<String> {
        self.user().as_ref().and_then(UserProfile::role).map(str::to_owned)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
