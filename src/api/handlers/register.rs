use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

use super::session::session_cookie;
use super::{valid_password, valid_username, UserResponse};
use crate::api::AppState;
use crate::auth::{Outcome, Reason};

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterPayload {
    username: String,
    password: String,
}

#[utoipa::path(
    post,
    path = "/register",
    responses(
        (status = 201, description = "Account created and logged in", body = UserResponse),
        (status = 400, description = "Malformed username or password"),
        (status = 409, description = "Username already taken"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RegisterPayload>>,
) -> impl IntoResponse {
    let Some(Json(payload)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    if !valid_username(&payload.username) {
        return (StatusCode::BAD_REQUEST, "Invalid username".to_string()).into_response();
    }
    if !valid_password(&payload.password) {
        return (StatusCode::BAD_REQUEST, "Invalid password".to_string()).into_response();
    }

    let outcome = match state.auth.register(&payload.username, &payload.password).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("registration failed: {err:?}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Registration failed".to_string())
                .into_response();
        }
    };

    match outcome {
        Outcome::Success(user) => {
            // Mirror the login flow: a fresh account starts authenticated.
            let token = match state.auth.login(&user).await {
                Ok(token) => token,
                Err(err) => {
                    error!("session issuance failed after registration: {err:?}");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Registration failed".to_string(),
                    )
                        .into_response();
                }
            };

            let mut headers = HeaderMap::new();
            if let Ok(cookie) = session_cookie(&state.config, &token) {
                headers.insert(SET_COOKIE, cookie);
            }
            (StatusCode::CREATED, headers, Json(UserResponse::from(&user))).into_response()
        }
        Outcome::Failure(reason @ Reason::UsernameTaken) => {
            (StatusCode::CONFLICT, reason.message().to_string()).into_response()
        }
        Outcome::Failure(reason) => {
            (StatusCode::BAD_REQUEST, reason.message().to_string()).into_response()
        }
    }
}
