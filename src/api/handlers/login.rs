use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use super::session::session_cookie;
use super::UserResponse;
use crate::api::AppState;
use crate::auth::{Credentials, Outcome, LOCAL_STRATEGY};

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginPayload {
    username: String,
    password: String,
}

#[utoipa::path(
    post,
    path = "/login",
    responses(
        (status = 200, description = "Authenticated", body = UserResponse),
        (status = 401, description = "Incorrect username or password"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginPayload>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let credentials = Credentials::Password {
        username: payload.username,
        password: payload.password,
    };

    match state.auth.authenticate(LOCAL_STRATEGY, credentials).await {
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
            (StatusCode::OK, headers, Json(UserResponse::from(&user))).into_response()
        }
        Ok(Outcome::Failure(reason)) => {
            debug!("login rejected: {reason}");
            (StatusCode::UNAUTHORIZED, reason.message().to_string()).into_response()
        }
        Err(err) => {
            // Cause detail stays in the logs; the client sees a generic refusal.
            error!("login failed: {err:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Login failed".to_string()).into_response()
        }
    }
}
