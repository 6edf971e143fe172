use async_trait::async_trait;
use pagerduty_api::{PagerDutyApiError, TokenProvider};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::common::StoredToken;
use crate::error::AuthError;
use crate::oauth_client::{oauth_endpoints, OAuthClient, TokenRefresher};
use crate::settings::OAuthConfig;
use crate::token_storage::TokenStore;

/// Produces a currently valid OAuth token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<StoredToken, AuthError>;
}

/// Refreshes the persisted token on every call and writes the result back.
pub struct RefreshingTokenSource<R = OAuthClient> {
    refresher: R,
    store: TokenStore,
    client_id: String,
    scopes: Vec<String>,
    held: Mutex<StoredToken>,
}

impl RefreshingTokenSource<OAuthClient> {
    pub fn from_config(config: &OAuthConfig) -> Result<Self, AuthError> {
        let client = OAuthClient::new(
            &oauth_endpoints(Some(config.app_type)),
            &config.client_id,
            &config.client_secret,
        )?;
        Self::new(config, client)
    }
}

impl<R: TokenRefresher> RefreshingTokenSource<R> {
    /// Load the stored token; only the client id that created it may use it.
    pub fn new(config: &OAuthConfig, refresher: R) -> Result<Self, AuthError> {
        let store = TokenStore::new(&config.token_file);
        let stored = match store.load_token() {
            Ok(token) => token,
            Err(AuthError::TokenFileMissing(path)) => return Err(AuthError::NoStoredToken(path)),
            Err(e) => return Err(e),
        };

        if stored.client_id != config.client_id {
            return Err(AuthError::ClientIDMismatch {
                stored: stored.client_id,
                requested: config.client_id.clone(),
            });
        }

        Ok(Self {
            refresher,
            store,
            client_id: config.client_id.clone(),
            scopes: config.scopes.clone(),
            held: Mutex::new(stored),
        })
    }

    fn lock(&self) -> MutexGuard<'_, StoredToken> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn held_token(&self) -> StoredToken {
        self.lock().clone()
    }
}

#[async_trait]
impl<R: TokenRefresher> TokenSource for RefreshingTokenSource<R> {
    async fn token(&self) -> Result<StoredToken, AuthError> {
        let refresh_token = {
            let held = self.lock();
            if !held.has_refresh_token() {
                return Err(AuthError::NoRefreshToken);
            }
            held.refresh_token.clone().unwrap_or_default()
        };

        tracing::debug!(client_id = %self.client_id, "Refreshing OAuth token");
        let grant = self
            .refresher
            .refresh(&refresh_token)
            .await
            .map_err(|e| match e {
                AuthError::RefreshFailed(cause) => AuthError::RefreshFailed(cause),
                other => AuthError::RefreshFailed(other.to_string()),
            })?;

        let mut token = StoredToken::from_grant(grant, &self.client_id, &self.scopes);
        if !token.has_refresh_token() {
            token.refresh_token = Some(refresh_token);
        }

        if let Err(e) = self.store.save_token(&token) {
            tracing::warn!(error = %e, "Failed to persist refreshed token");
        }

        *self.lock() = token.clone();
        tracing::info!(expiry = ?token.expiry, "OAuth token refreshed");

        Ok(token)
    }
}

/// Caches the last token and only asks the inner source once it has expired.
pub struct ReuseTokenSource<S> {
    inner: S,
    cached: tokio::sync::Mutex<Option<StoredToken>>,
}

impl<S: TokenSource> ReuseTokenSource<S> {
    pub fn new(initial: Option<StoredToken>, inner: S) -> Self {
        Self {
            inner,
            cached: tokio::sync::Mutex::new(initial),
        }
    }
}

#[async_trait]
impl<S: TokenSource> TokenSource for ReuseTokenSource<S> {
    async fn token(&self) -> Result<StoredToken, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| !token.is_expired()) {
            return Ok(token.clone());
        }

        let token = self.inner.token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

#[async_trait]
impl<S: TokenSource> TokenProvider for ReuseTokenSource<S> {
    async fn access_token(&self) -> Result<String, PagerDutyApiError> {
        self.token()
            .await
            .map(|token| token.access_token)
            .map_err(|e| PagerDutyApiError::Credential(e.to_string()))
    }
}
