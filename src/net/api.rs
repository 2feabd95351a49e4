//! REST API client for the dashboard backend.
//!
//! DESIGN
//! ======
//! Every call flows through one pipeline: [`authorize`] decorates the request
//! with the session's bearer token, the request is sent, and the response is
//! checked. A 401 clears the session store and surfaces as
//! [`ApiError::Unauthorized`], whose redirect target is `/login`. It is never
//! retried. Transport failures propagate to the caller of the specific call.
//!
//! Payloads other than the auth envelopes are passed through as JSON values.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::types::{ApiError, AuthResponse, LoginRequest, RegisterRequest};
use crate::config::ClientConfig;
use crate::state::session::{KeyValueStore, SessionStore, SessionView};

/// Lower bound used for indicator ranges when only `to` is given.
pub const FIRST_INDICATOR_YEAR: i32 = 2015;

/// Attach `Authorization: Bearer <token>` when a non-empty token is present.
pub fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token.filter(|t| !t.is_empty()) {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

fn county_endpoint(county_id: i64) -> String {
    format!("/counties/{county_id}")
}

fn county_detail_endpoint(county_id: i64) -> String {
    format!("/counties/{county_id}/detail")
}

fn county_indicators_endpoint(county_id: i64) -> String {
    format!("/counties/{county_id}/indicators")
}

fn county_projects_endpoint(county_id: i64) -> String {
    format!("/counties/{county_id}/projects")
}

fn county_project_endpoint(county_id: i64, project_id: i64) -> String {
    format!("/counties/{county_id}/projects/{project_id}")
}

/// Query for county listing and search. A blank keyword is not sent.
fn county_query(keyword: Option<&str>, province_id: Option<i64>) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(keyword) = keyword.map(str::trim).filter(|k| !k.is_empty()) {
        query.push(("keyword", keyword.to_owned()));
    }
    if let Some(id) = province_id {
        query.push(("provinceId", id.to_string()));
    }
    query
}

fn user_endpoint(user_id: i64) -> String {
    format!("/users/{user_id}")
}

fn rule_endpoint(rule_id: i64) -> String {
    format!("/alerts/rules/{rule_id}")
}

fn resolve_alert_endpoint(event_id: i64) -> String {
    format!("/alerts/{event_id}/resolve")
}

/// Year bounds sent for an indicator query. Both or neither are sent.
fn indicator_range(from: Option<i32>, to: Option<i32>, current_year: i32) -> Option<(i32, i32)> {
    if from.is_none() && to.is_none() {
        return None;
    }
    Some((from.unwrap_or(FIRST_INDICATOR_YEAR), to.unwrap_or(current_year)))
}

/// Decode a response body: empty is `null`, non-JSON text is a JSON string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

fn current_year() -> i32 {
    time::OffsetDateTime::now_utc().year()
}

pub struct ApiClient<S> {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore<S>>,
}

impl<S: KeyValueStore> ApiClient<S> {
    /// Build a client for `config.base_url` that reads and clears `session`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig, session: Arc<SessionStore<S>>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), session })
    }

    pub fn session(&self) -> &Arc<SessionStore<S>> {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        authorize(self.http.request(method, url), self.session.token().as_deref())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "API response");

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                warn!(status = status.as_u16(), error = %e, "failed to read error body");
                String::new()
            });
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        Ok(response)
    }

    fn handle_unauthorized(&self) {
        warn!("unauthorized or expired token; clearing session");
        if let Err(e) = self.session.clear_session() {
            warn!(error = %e, "failed to clear session after 401");
        }
    }

    async fn call(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = self.send(request).await?;
        let text = response.text().await?;
        Ok(parse_body(&text))
    }

    async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.call(self.request(Method::GET, path)).await
    }

    async fn get_query<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<Value, ApiError> {
        self.call(self.request(Method::GET, path).query(query)).await
    }

    async fn post(&self, path: &str) -> Result<Value, ApiError> {
        self.call(self.request(Method::POST, path)).await
    }

    async fn send_json(&self, method: Method, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.call(self.request(method, path).json(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.call(self.request(Method::DELETE, path)).await
    }

    /// POST an auth envelope. A `success: false` body is a rejection even on 4xx.
    async fn auth_request(&self, path: &str, body: &impl Serialize) -> Result<AuthResponse, ApiError> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
            return Err(ApiError::Unauthorized);
        }

        let text = response.text().await?;
        let parsed = serde_json::from_str::<AuthResponse>(&text);
        if let Ok(envelope) = &parsed {
            if envelope.rejected() {
                let message = envelope.message.clone().unwrap_or_else(|| "request rejected".to_owned());
                return Err(ApiError::Rejected { message });
            }
        }
        if !status.is_success() {
            return Err(ApiError::Status { status: status.as_u16(), body: text });
        }
        Ok(parsed?)
    }

    // =========================================================================
    // AUTH
    // =========================================================================

    /// Log in via `POST /auth/login` and store the returned token and profile.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for bad credentials, [`ApiError::MissingField`]
    /// if the server omits the token, and transport/session errors otherwise.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let response = self.auth_request("/auth/login", &LoginRequest { username, password }).await?;
        let token = response
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::MissingField("token"))?;
        self.session.set_session(token, response.user.as_ref())?;
        info!(username, role = ?response.user.as_ref().and_then(|u| u.role()), "logged in");
        Ok(response)
    }

    /// Create an account via `POST /auth/register`. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] if the server refuses the registration.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.auth_request("/auth/register", request).await
    }

    /// Drop the local session. The server keeps no login state to revoke.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Session`] if the store cannot be cleared.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session.clear_session()?;
        Ok(())
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn current_user(&self) -> Result<Value, ApiError> {
        self.get("/users/current").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn update_current_user(&self, body: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, "/users/current", body).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn users(&self) -> Result<Value, ApiError> {
        self.get("/users").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn delete_user(&self, user_id: i64) -> Result<Value, ApiError> {
        self.delete(&user_endpoint(user_id)).await
    }

    // =========================================================================
    // COUNTIES
    // =========================================================================

    /// List counties, optionally filtered by province and name keyword.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn counties(&self, province_id: Option<i64>, keyword: Option<&str>) -> Result<Value, ApiError> {
        self.get_query("/counties", &county_query(keyword, province_id)).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn search_counties(&self, keyword: Option<&str>, province_id: Option<i64>) -> Result<Value, ApiError> {
        self.get_query("/counties/search", &county_query(keyword, province_id)).await
    }

    /// County record together with its latest indicators and projects.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn county_detail(&self, county_id: i64) -> Result<Value, ApiError> {
        self.get(&county_detail_endpoint(county_id)).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn update_county(&self, county_id: i64, county: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, &county_endpoint(county_id), county).await
    }

    /// Yearly indicators for a county. If either bound is given both are sent,
    /// defaulting to 2015 and the current year.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn county_indicators(&self, county_id: i64, from: Option<i32>, to: Option<i32>) -> Result<Value, ApiError> {
        let path = county_indicators_endpoint(county_id);
        match indicator_range(from, to, current_year()) {
            Some((from, to)) => self.get_query(&path, &[("from", from), ("to", to)]).await,
            None => self.get(&path).await,
        }
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn provinces(&self) -> Result<Value, ApiError> {
        self.get("/counties/provinces").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn projects(&self, county_id: i64) -> Result<Value, ApiError> {
        self.get(&county_projects_endpoint(county_id)).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn create_project(&self, county_id: i64, project: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::POST, &county_projects_endpoint(county_id), project).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn update_project(&self, county_id: i64, project_id: i64, project: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, &county_project_endpoint(county_id, project_id), project).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn delete_project(&self, county_id: i64, project_id: i64) -> Result<Value, ApiError> {
        self.delete(&county_project_endpoint(county_id, project_id)).await
    }

    // =========================================================================
    // ALERTS
    // =========================================================================

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn alerts(&self) -> Result<Value, ApiError> {
        self.get("/alerts").await
    }

    /// Start a server-side alert scan.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn scan_alerts(&self) -> Result<Value, ApiError> {
        self.post("/alerts/scan").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn scan_status(&self) -> Result<Value, ApiError> {
        self.get("/alerts/scan/status").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn rules(&self) -> Result<Value, ApiError> {
        self.get("/alerts/rules").await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn create_rule(&self, rule: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/alerts/rules", rule).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn update_rule(&self, rule_id: i64, rule: &Value) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, &rule_endpoint(rule_id), rule).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn delete_rule(&self, rule_id: i64) -> Result<Value, ApiError> {
        self.delete(&rule_endpoint(rule_id)).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn resolve_alert(&self, event_id: i64) -> Result<Value, ApiError> {
        self.post(&resolve_alert_endpoint(event_id)).await
    }

    // =========================================================================
    // CHARTS
    // =========================================================================

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn summary(&self, year: Option<i32>) -> Result<Value, ApiError> {
        self.get_by_year("/indicators/summary", year).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn charts_data(&self, year: Option<i32>) -> Result<Value, ApiError> {
        self.get_by_year("/dashboard/charts", year).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or a non-success status.
    pub async fn analysis_data(&self, year: Option<i32>) -> Result<Value, ApiError> {
        self.get_by_year("/indicators/charts", year).await
    }

    async fn get_by_year(&self, path: &str, year: Option<i32>) -> Result<Value, ApiError> {
        match year {
            Some(year) => self.get_query(path, &[("year", year)]).await,
            None => self.get(path).await,
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
