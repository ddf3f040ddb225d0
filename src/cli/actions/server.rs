use crate::api::{self, oauth::OAuthClient, oauth::OAuthConfig, ApiConfig};
use crate::cli::actions::Action;
use anyhow::{Context, Result};
use tracing::warn;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    let Action::Server {
        port,
        dsn,
        session_ttl_seconds,
        secure_cookies,
        google_client_id,
        google_client_secret,
        google_redirect_url,
    } = action;

    if !dsn.is_empty() {
        // Fail fast on an unparseable DSN instead of at pool connect time.
        Url::parse(&dsn).context("invalid database connection string")?;
    }

    let config = ApiConfig::default()
        .with_session_ttl_seconds(session_ttl_seconds)
        .with_session_cookie_secure(secure_cookies);

    let oauth = match (google_client_id, google_client_secret, google_redirect_url) {
        (Some(client_id), Some(client_secret), Some(redirect_url)) => Some(OAuthClient::new(
            OAuthConfig::google(client_id, client_secret, redirect_url),
        )?),
        (None, None, None) => None,
        _ => {
            warn!("incomplete federated login configuration, routes disabled");
            None
        }
    };

    api::serve(port, &dsn, config, oauth).await?;

    Ok(())
}
