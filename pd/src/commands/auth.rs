use anyhow::{Context, Result};
use chrono::Utc;
use pd_auth::login::{self, LoginOptions};
use pd_auth::{AuthError, AuthMode, Config, TokenStore};
use serde_json::json;

use super::print_json;

pub async fn login(config: &Config, port: u16, open_browser: bool) -> Result<()> {
    let options = LoginOptions::from_config(config, port, open_browser)?;
    let token_file = options.token_file.clone();

    let token = login::login(options).await.context("Login failed")?;

    println!("Authentication successful.");
    println!("Token saved to {}", token_file.display());
    if let Some(expiry) = token.expiry {
        println!("Access token expires at {}", expiry.to_rfc3339());
    }
    Ok(())
}

/// Report the active credential. Never prints secrets.
pub fn status(config: &Config) -> Result<()> {
    let oauth = match config.validate()? {
        AuthMode::ApiToken(_) => {
            return print_json(&json!({ "credential": "api_token" }));
        }
        AuthMode::OAuth(oauth) => oauth,
    };

    let token = TokenStore::new(&oauth.token_file)
        .load_token()
        .map_err(|e| match e {
            AuthError::TokenFileMissing(path) => AuthError::NoStoredToken(path),
            other => other,
        })?;

    let client_id_matches = token.client_id == oauth.client_id;
    let expired = token.is_expired();
    let refreshable = token.has_refresh_token();

    print_json(&json!({
        "credential": "oauth",
        "app_type": oauth.app_type.to_string(),
        "token_file": oauth.token_file.display().to_string(),
        "client_id": token.client_id,
        "client_id_matches": client_id_matches,
        "scopes": token.scopes,
        "token_type": token.token_type,
        "expiry": token.expiry.map(|expiry| expiry.to_rfc3339()),
        "expires_in_seconds": token.expiry.map(|expiry| (expiry - Utc::now()).num_seconds()),
        "expired": expired,
        "refreshable": refreshable,
    }))
}
