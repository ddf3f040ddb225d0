//! Google-style OAuth code exchange.
//!
//! The HTTP layer owns the redirect/callback handshake; the authentication
//! core only ever sees the resulting [`IdentityAssertion`]. Endpoints are
//! configurable so tests never reach the real provider.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::api::APP_USER_AGENT;
use crate::auth::IdentityAssertion;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl OAuthConfig {
    #[must_use]
    pub fn google(client_id: String, client_secret: String, redirect_url: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_url,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
        }
    }
}

/// OAuth client: builds the authorization redirect and turns a callback
/// `code` into an identity assertion.
pub struct OAuthClient {
    config: OAuthConfig,
    http: Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfo {
    /// Stable subject identifier, provider-scoped.
    sub: String,
    name: Option<String>,
}

impl OAuthClient {
    /// # Errors
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(config: OAuthConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("failed to build oauth http client")?;
        Ok(Self { config, http })
    }

    /// Where to send the visitor to start the handshake.
    ///
    /// # Errors
    /// Fails only on a malformed configured authorization endpoint.
    pub fn authorize_url(&self) -> Result<String> {
        let mut url =
            Url::parse(&self.config.auth_url).context("malformed authorization endpoint")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", "profile");
        Ok(url.into())
    }

    /// Exchange the callback `code` for the provider's identity assertion.
    ///
    /// # Errors
    /// Any provider-side rejection or transport fault is an internal fault;
    /// callers surface it as a generic authentication failure.
    pub async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion> {
        let params = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .context("token exchange request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!("token exchange rejected: {}", response.status()));
        }
        let token: TokenResponse = response
            .json()
            .await
            .context("malformed token exchange response")?;

        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .context("userinfo request failed")?;
        if !response.status().is_success() {
            return Err(anyhow!("userinfo rejected: {}", response.status()));
        }
        let info: UserInfo = response
            .json()
            .await
            .context("malformed userinfo response")?;

        debug!(federated_id = %info.sub, "resolved federated identity");

        Ok(IdentityAssertion {
            display_name: info.name.unwrap_or_else(|| info.sub.clone()),
            federated_id: info.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> OAuthClient {
        OAuthClient::new(OAuthConfig::google(
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/auth/google/callback".to_string(),
        ))
        .expect("client builds")
    }

    #[test]
    fn authorize_url_carries_required_params() {
        let url = test_client().authorize_url().expect("url builds");
        let parsed = Url::parse(&url).expect("valid url");

        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "client-id".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "profile".to_string())));
        assert!(!url.contains("client-secret"));
    }

    #[test]
    fn malformed_auth_endpoint_is_an_error() {
        let mut config = OAuthConfig::google(
            "client-id".to_string(),
            "client-secret".to_string(),
            "https://app.example.com/cb".to_string(),
        );
        config.auth_url = "not a url".to_string();

        let client = OAuthClient::new(config).expect("client builds");
        assert!(client.authorize_url().is_err());
    }
}
