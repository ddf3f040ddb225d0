//! Federated login routes: redirect out to the provider, then turn the
//! callback into an authenticated session.

use axum::{
    extract::{Extension, Query},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::session::session_cookie;
use crate::api::AppState;
use crate::auth::{Credentials, Outcome, FEDERATED_STRATEGY};

#[derive(Deserialize, Debug)]
pub struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/google",
    responses(
        (status = 303, description = "Redirect to the identity provider"),
        (status = 503, description = "Federated login is not configured"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn federated_redirect(state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let Some(oauth) = &state.oauth else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "Federated login is not configured".to_string(),
        )
            .into_response();
    };

    match oauth.authorize_url() {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(err) => {
            error!("failed to build authorization url: {err:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Login failed".to_string()).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/auth/google/callback",
    responses(
        (status = 303, description = "Authenticated, redirected to protected content"),
        (status = 503, description = "Federated login is not configured"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn federated_callback(
    state: Extension<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let Some(oauth) = &state.oauth else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            "Federated login is not configured".to_string(),
        )
            .into_response();
    };

    // Provider denial (user cancelled, bad scope) goes back to login.
    let Some(code) = params.code else {
        debug!(error = ?params.error, "provider callback without code");
        return Redirect::to("/login").into_response();
    };

    let assertion = match oauth.exchange_code(&code).await {
        Ok(assertion) => assertion,
        Err(err) => {
            error!("code exchange failed: {err:?}");
            return Redirect::to("/login").into_response();
        }
    };

    match state
        .auth
        .authenticate(FEDERATED_STRATEGY, Credentials::Assertion(assertion))
        .await
    {
        Ok(Outcome::Success(user)) => {
            let token = match state.auth.login(&user).await {
                Ok(token) => token,
                Err(err) => {
                    error!("session issuance failed: {err:?}");
                    return (StatusCode::INTERNAL_SERVER_ERROR, "Login failed".to_string())
                        .into_response();
                }
            };

            let mut headers = HeaderMap::new();
            if let Ok(cookie) = session_cookie(&state.config, &token) {
                headers.insert(SET_COOKIE, cookie);
            }
            (headers, Redirect::to("/secrets")).into_response()
        }
        Ok(Outcome::Failure(reason)) => {
            debug!("federated login rejected: {reason}");
            Redirect::to("/login").into_response()
        }
        Err(err) => {
            error!("federated login failed: {err:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Login failed".to_string()).into_response()
        }
    }
}
