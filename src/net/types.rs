//! Wire types and errors for the dashboard API.

use serde::{Deserialize, Serialize};

use crate::router::routes::LOGIN_PATH;
use crate::state::session::{StoreError, UserProfile};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by API client operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered 401. The session has already been cleared.
    #[error("unauthorized; please log in again")]
    Unauthorized,

    /// The server answered with a non-success status other than 401.
    #[error("API response error: status {status}")]
    Status { status: u16, body: String },

    /// The server processed an auth request and refused it.
    #[error("request rejected: {message}")]
    Rejected { message: String },

    /// A successful response lacked a field the client depends on.
    #[error("missing expected field `{0}`")]
    MissingField(&'static str),

    /// The response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// The session store could not persist a login.
    #[error("session update failed: {0}")]
    Session(#[from] StoreError),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// Page the UI must move to because of this error, if any.
    #[must_use]
    pub fn redirect_target(&self) -> Option<&'static str> {
        matches!(self, Self::Unauthorized).then_some(LOGIN_PATH)
    }
}

// =============================================================================
// AUTH ENVELOPES
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Body of `POST /auth/register`. Unset optional fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Envelope returned by the login and register endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl AuthResponse {
    #[must_use]
    pub fn rejected(&self) -> bool {
        self.success == Some(false)
    }
}
