//! Session endpoints and the authorization gate over protected content.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, instrument};

use super::UserResponse;
use crate::api::{ApiConfig, AppState};

const SESSION_COOKIE_NAME: &str = "vestibule_session";

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "Session is active", body = UserResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn session(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    // A missing token is simply "no session", never an error.
    let Some(token) = extract_session_token(&headers) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match state.auth.authenticated_user(&token).await {
        Ok(Some(user)) => (StatusCode::OK, Json(UserResponse::from(&user))).into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("failed to resolve session: {err:?}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/secrets",
    responses(
        (status = 200, description = "Protected content"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn secrets(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    // Gate check first; nothing protected is rendered on failure.
    let authenticated = match extract_session_token(&headers) {
        Some(token) => state.auth.is_authenticated(&token).await,
        None => false,
    };

    if authenticated {
        Json(json!({
            "secret": "The owl hoots at midnight",
        }))
        .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()).into_response()
    }
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    if let Some(token) = extract_session_token(&headers) {
        // The store delete completes before success is acknowledged.
        if let Err(err) = state.auth.logout(&token).await {
            error!("failed to clear session: {err:?}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    // Always clear the cookie, even if no session record existed.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(&state.config) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Build a secure `HttpOnly` cookie carrying the session token.
pub(super) fn session_cookie(
    config: &ApiConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
    );
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &ApiConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.session_cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next().unwrap_or_default().trim();
        // A pair without a value is skipped, not fatal; later cookies in
        // the header must still be reachable.
        let Some(val) = parts.next() else {
            continue;
        };
        if key == SESSION_COOKIE_NAME {
            return Some(val.trim().to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
