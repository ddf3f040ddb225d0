//! End-to-end authentication flow against an in-process server backed by
//! in-memory storage: register, login, gate checks, and logout over real
//! HTTP requests.

use anyhow::{Context, Result};
use reqwest::{header, Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

use vestibule::api::{router, ApiConfig, AppState};
use vestibule::auth::{AuthService, CredentialHasher, MemorySessionStore};
use vestibule::users::MemoryRepository;

async fn spawn_server() -> Result<String> {
    // Minimum bcrypt cost keeps the suite fast.
    let auth = AuthService::with_hasher(
        Arc::new(MemoryRepository::new()),
        Arc::new(MemorySessionStore::default()),
        CredentialHasher::new(4),
    );
    let state = Arc::new(AppState::new(auth, ApiConfig::default(), None));
    let app = router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to bind test listener")?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app.into_make_service()).await;
    });

    Ok(format!("http://{addr}"))
}

/// First `key=value` pair of the session cookie, ready for a Cookie header.
fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(str::to_string)
}

#[tokio::test]
async fn health_reports_service_identity() -> Result<()> {
    let base = spawn_server().await?;
    let response = Client::new().get(format!("{base}/health")).send().await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["name"], "vestibule");
    Ok(())
}

#[tokio::test]
async fn openapi_document_is_served() -> Result<()> {
    let base = spawn_server().await?;
    let response = Client::new()
        .get(format!("{base}/openapi.json"))
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await?;
    assert_eq!(body["info"]["title"], "vestibule");
    assert!(body["paths"]["/login"].is_object());
    assert!(body["paths"]["/secrets"].is_object());
    Ok(())
}

#[tokio::test]
async fn register_login_gate_logout_flow() -> Result<()> {
    let base = spawn_server().await?;
    let client = Client::new();

    // Register: account created, session issued immediately.
    let response = client
        .post(format!("{base}/register"))
        .json(&json!({"username": "alice1234", "password": "Secret123"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = session_cookie(&response).context("register sets a session cookie")?;
    let created: Value = response.json().await?;
    assert_eq!(created["username"], "alice1234");
    assert_eq!(created["federated"], false);

    // The fresh session passes the gate.
    let response = client
        .get(format!("{base}/secrets"))
        .header(header::COOKIE, &cookie)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    // Correct credentials log in.
    let response = client
        .post(format!("{base}/login"))
        .json(&json!({"username": "alice1234", "password": "Secret123"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).context("login sets a session cookie")?;

    // Wrong password and unknown username are clean rejections.
    let response = client
        .post(format!("{base}/login"))
        .json(&json!({"username": "alice1234", "password": "wrong"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.text().await?, "incorrect password");

    let response = client
        .post(format!("{base}/login"))
        .json(&json!({"username": "nobody", "password": "x"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.text().await?, "incorrect username");

    // Whoami resolves the live session.
    let response = client
        .get(format!("{base}/session"))
        .header(header::COOKIE, &cookie)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let whoami: Value = response.json().await?;
    assert_eq!(whoami["username"], "alice1234");

    // Logout clears the session; the gate closes.
    let response = client
        .post(format!("{base}/logout"))
        .header(header::COOKIE, &cookie)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client
        .get(format!("{base}/secrets"))
        .header(header::COOKIE, &cookie)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> Result<()> {
    let base = spawn_server().await?;
    let client = Client::new();
    let payload = json!({"username": "carol", "password": "Secret123"});

    let response = client
        .post(format!("{base}/register"))
        .json(&payload)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .post(format!("{base}/register"))
        .json(&payload)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(response.text().await?, "username already taken");
    Ok(())
}

#[tokio::test]
async fn malformed_registration_rejected() -> Result<()> {
    let base = spawn_server().await?;
    let client = Client::new();

    let response = client
        .post(format!("{base}/register"))
        .json(&json!({"username": "ab", "password": "Secret123"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{base}/register"))
        .json(&json!({"username": "alice1234", "password": "short"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn gate_requires_a_session() -> Result<()> {
    let base = spawn_server().await?;
    let client = Client::new();

    let response = client.get(format!("{base}/secrets")).send().await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .get(format!("{base}/secrets"))
        .header(header::COOKIE, "vestibule_session=forged-token")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client.get(format!("{base}/session")).send().await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn bearer_token_works_like_the_cookie() -> Result<()> {
    let base = spawn_server().await?;
    let client = Client::new();

    let response = client
        .post(format!("{base}/register"))
        .json(&json!({"username": "dave1234", "password": "Secret123"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = session_cookie(&response).context("register sets a session cookie")?;
    let token = cookie
        .split_once('=')
        .map(|(_, value)| value.to_string())
        .context("cookie has a value")?;

    let response = client
        .get(format!("{base}/secrets"))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn federated_routes_answer_503_without_provider() -> Result<()> {
    let base = spawn_server().await?;
    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    let response = client.get(format!("{base}/auth/google")).send().await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = client
        .get(format!("{base}/auth/google/callback?code=abc"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}
