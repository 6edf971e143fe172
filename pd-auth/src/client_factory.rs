use pagerduty_api::Client;
use secrecy::ExposeSecret;
use std::sync::Arc;

use crate::error::AuthError;
use crate::settings::{AuthMode, Config};
use crate::token_source::{RefreshingTokenSource, ReuseTokenSource};

/// Build an API client from a static token or, when OAuth is fully
/// configured, from the stored OAuth token.
///
/// Classic and scoped applications only differ in the endpoints used to
/// refresh; the resulting client is the same.
pub fn build_client(config: &Config) -> Result<Client, AuthError> {
    match config.validate()? {
        AuthMode::OAuth(oauth) => {
            tracing::debug!(
                app_type = %oauth.app_type,
                token_file = %oauth.token_file.display(),
                "Using OAuth token source"
            );
            let source = RefreshingTokenSource::from_config(&oauth)?;
            let held = source.held_token();
            Ok(Client::with_token_provider(Arc::new(
                ReuseTokenSource::new(Some(held), source),
            )))
        }
        AuthMode::ApiToken(token) => {
            tracing::debug!("Using static API token");
            Ok(Client::new(token.expose_secret()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{OAuthApplicationType, StoredToken};
    use crate::settings::{merge, ConfigValues};
    use crate::token_storage::TokenStore;
    use pagerduty_api::Credential;
    use tempfile::TempDir;

    fn oauth_values(dir: &TempDir) -> ConfigValues {
        ConfigValues {
            oauth_type: Some(OAuthApplicationType::Classic),
            client_id: Some("client-123".to_string()),
            client_secret: Some("shh".to_string()),
            scopes: vec!["read".to_string()],
            token_file: Some(dir.path().join("token.json")),
            ..Default::default()
        }
    }

    #[test]
    fn static_token_builds_api_token_client() {
        let config = merge(
            ConfigValues {
                authtoken: Some("y_NbAkKc66ryYTWUXYEu".to_string()),
                ..Default::default()
            },
            ConfigValues::default(),
        );

        let client = build_client(&config).unwrap();
        assert!(matches!(client.credential(), Credential::ApiToken(_)));
    }

    #[test]
    fn oauth_without_login_asks_for_login() {
        let dir = TempDir::new().unwrap();
        let config = merge(oauth_values(&dir), ConfigValues::default());

        assert!(matches!(
            build_client(&config),
            Err(AuthError::NoStoredToken(_))
        ));
    }

    #[test]
    fn oauth_with_stored_token_builds_oauth_client() {
        let dir = TempDir::new().unwrap();
        TokenStore::new(dir.path().join("token.json"))
            .save_token(&StoredToken {
                access_token: "access".to_string(),
                token_type: "Bearer".to_string(),
                refresh_token: Some("refresh".to_string()),
                expiry: None,
                client_id: "client-123".to_string(),
                scopes: vec!["read".to_string()],
            })
            .unwrap();

        let mut values = oauth_values(&dir);
        values.authtoken = Some("ignored".to_string());
        let client = build_client(&merge(values, ConfigValues::default())).unwrap();

        assert!(matches!(client.credential(), Credential::OAuth(_)));
    }

    #[test]
    fn partial_oauth_config_is_rejected_even_with_static_token() {
        let dir = TempDir::new().unwrap();
        let mut values = oauth_values(&dir);
        values.client_secret = None;
        values.authtoken = Some("y_NbAkKc66ryYTWUXYEu".to_string());

        assert!(matches!(
            build_client(&merge(values, ConfigValues::default())),
            Err(AuthError::IncompleteOAuthConfig { .. })
        ));
    }
}
