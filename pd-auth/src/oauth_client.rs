use async_trait::async_trait;
use chrono::Utc;
use oauth2::{
    basic::BasicClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    HttpRequest, HttpResponse, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::common::{OAuthApplicationType, TokenGrant};
use crate::error::AuthError;

const HTTP_TIMEOUT_SECS: u64 = 30;

// Async HTTP client for oauth2 on top of reqwest
async fn http_client(request: HttpRequest) -> Result<HttpResponse, reqwest::Error> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?;
    let mut builder = client
        .request(request.method().clone(), request.uri().to_string())
        .body(request.body().clone());

    for (name, value) in request.headers() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }

    let response = builder.send().await?;
    let status = response.status();
    let body = response.bytes().await?.to_vec();

    let mut http_response = HttpResponse::new(body);
    *http_response.status_mut() = status;

    Ok(http_response)
}

/// Authorization and token endpoints of one OAuth application family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub auth_url: String,
    pub token_url: String,
}

const CLASSIC_AUTH_URL: &str = "https://app.pagerduty.com/oauth/authorize";
const CLASSIC_TOKEN_URL: &str = "https://app.pagerduty.com/oauth/token";
const SCOPED_AUTH_URL: &str = "https://identity.pagerduty.com/oauth/authorize";
const SCOPED_TOKEN_URL: &str = "https://identity.pagerduty.com/oauth/token";

/// Classic endpoints unless the application is explicitly scoped.
pub fn oauth_endpoints(app_type: Option<OAuthApplicationType>) -> OAuthEndpoints {
    match app_type {
        Some(OAuthApplicationType::Scoped) => OAuthEndpoints {
            auth_url: SCOPED_AUTH_URL.to_string(),
            token_url: SCOPED_TOKEN_URL.to_string(),
        },
        Some(OAuthApplicationType::Classic) | None => OAuthEndpoints {
            auth_url: CLASSIC_AUTH_URL.to_string(),
            token_url: CLASSIC_TOKEN_URL.to_string(),
        },
    }
}

/// Performs the refresh-token grant for a held refresh token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError>;
}

pub struct OAuthClient {
    client_id: String,
    client_secret: SecretString,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: Option<RedirectUrl>,
}

impl OAuthClient {
    pub fn new(
        endpoints: &OAuthEndpoints,
        client_id: &str,
        client_secret: &SecretString,
    ) -> Result<Self, AuthError> {
        let auth_url = AuthUrl::new(endpoints.auth_url.clone())
            .map_err(|e| AuthError::Configuration(format!("Invalid auth URL: {}", e)))?;

        let token_url = TokenUrl::new(endpoints.token_url.clone())
            .map_err(|e| AuthError::Configuration(format!("Invalid token URL: {}", e)))?;

        Ok(Self {
            client_id: client_id.to_string(),
            client_secret: SecretString::from(client_secret.expose_secret().to_string()),
            auth_url,
            token_url,
            redirect_url: None,
        })
    }

    pub fn with_redirect_url(mut self, redirect_url: &str) -> Result<Self, AuthError> {
        let redirect_url = RedirectUrl::new(redirect_url.to_string())
            .map_err(|e| AuthError::Configuration(format!("Invalid redirect URI: {}", e)))?;
        self.redirect_url = Some(redirect_url);
        Ok(self)
    }

    fn basic_client(
        &self,
    ) -> BasicClient<
        oauth2::EndpointSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointNotSet,
        oauth2::EndpointSet,
    > {
        let client = BasicClient::new(ClientId::new(self.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                self.client_secret.expose_secret().to_string(),
            ))
            .set_auth_type(AuthType::RequestBody)
            .set_auth_uri(self.auth_url.clone())
            .set_token_uri(self.token_url.clone());

        match &self.redirect_url {
            Some(redirect_url) => client.set_redirect_uri(redirect_url.clone()),
            None => client,
        }
    }

    /// Build authorization URL with state parameter for CSRF protection
    pub fn build_authorization_url(&self, state: &str, scopes: &[String]) -> String {
        let csrf_token = CsrfToken::new(state.to_string());
        let (auth_url, _) = self
            .basic_client()
            .authorize_url(|| csrf_token)
            .add_scopes(scopes.iter().cloned().map(Scope::new))
            .url();
        auth_url.to_string()
    }

    /// Exchange authorization code for access and refresh tokens
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<TokenGrant, AuthError> {
        let token_result = self
            .basic_client()
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| AuthError::TokenExchangeFailed(e.to_string()))?;

        let grant = Self::grant_from_response(&token_result);
        tracing::debug!(expiry = ?grant.expiry, "Exchanged authorization code for tokens");
        Ok(grant)
    }

    /// Refresh an expired access token using a refresh token
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        let token_result = self
            .basic_client()
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| AuthError::RefreshFailed(e.to_string()))?;

        let grant = Self::grant_from_response(&token_result);
        tracing::debug!(expiry = ?grant.expiry, "Refreshed access token");
        Ok(grant)
    }

    fn grant_from_response(token_result: &oauth2::basic::BasicTokenResponse) -> TokenGrant {
        let token_type = match token_result.token_type() {
            oauth2::basic::BasicTokenType::Extension(ext) => ext.clone(),
            other => format!("{:?}", other),
        };

        TokenGrant {
            access_token: token_result.access_token().secret().to_string(),
            token_type,
            refresh_token: token_result
                .refresh_token()
                .map(|token| token.secret().to_string()),
            expiry: token_result
                .expires_in()
                .and_then(|expires_in| chrono::Duration::from_std(expires_in).ok())
                .map(|expires_in| Utc::now() + expires_in),
        }
    }

    /// Generate a random CSRF state token
    pub fn generate_state_token() -> String {
        use base64::Engine;
        let mut rng = rand::rng();
        let random_bytes: Vec<u8> = (0..32).map(|_| rng.random()).collect();
        base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(&random_bytes)
    }
}

#[async_trait]
impl TokenRefresher for OAuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        self.refresh_access_token(refresh_token).await
    }
}
