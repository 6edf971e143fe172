pub mod endpoints;
mod error;
mod macros;
pub mod repositories;
mod request;

pub use crate::error::{ErrorDetail, PagerDutyApiError};
pub use crate::request::{Method, Request as ApiRequest, RequestData};
use async_trait::async_trait;
use repositories::*;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

const BASE_URL: &str = "https://api.pagerduty.com";
const ACCEPT: &str = "application/vnd.pagerduty+json;version=2";
const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Produces a currently valid OAuth access token, refreshing it if needed.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, PagerDutyApiError>;
}

/// Authentication material attached to every request.
pub enum Credential {
    /// Account or user REST API key, sent as `Token token=...`.
    ApiToken(SecretString),
    /// OAuth access token, sent as `Bearer ...`.
    OAuth(Arc<dyn TokenProvider>),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiToken(_) => f.write_str("ApiToken([REDACTED])"),
            Self::OAuth(_) => f.write_str("OAuth(..)"),
        }
    }
}

pub struct Client {
    http_client: reqwest::Client,
    base_url: String,
    credential: Credential,
}

impl Client {
    pub fn new(api_token: &str) -> Self {
        Self::with_credential(Credential::ApiToken(SecretString::from(api_token.to_string())))
    }

    pub fn with_token_provider(provider: Arc<dyn TokenProvider>) -> Self {
        Self::with_credential(Credential::OAuth(provider))
    }

    pub fn with_credential(credential: Credential) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            base_url: BASE_URL.to_string(),
            credential,
        }
    }

    /// Point the client at a different API host (tests, EU service region).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    async fn authorization(&self) -> Result<String, PagerDutyApiError> {
        match &self.credential {
            Credential::ApiToken(token) => Ok(format!("Token token={}", token.expose_secret())),
            Credential::OAuth(provider) => {
                let token = provider.access_token().await?;
                Ok(format!("Bearer {}", token))
            }
        }
    }

    pub async fn send<R>(&self, request: R) -> Result<R::Response, PagerDutyApiError>
    where
        R: ApiRequest,
    {
        let method = R::METHOD;
        let url = format!("{}{}", self.base_url, request.endpoint());
        tracing::debug!(%method, %url, "Sending PagerDuty API request");

        let mut builder = self
            .http_client
            .request(method, &url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header(reqwest::header::AUTHORIZATION, self.authorization().await?);

        builder = match request.data() {
            RequestData::Empty => builder,
            RequestData::Query(query) => builder.query(query),
            RequestData::Json(body) => builder.json(body),
        };

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%status, "PagerDuty API request failed");
            return Err(PagerDutyApiError::from_response(status, &body));
        }

        Ok(response.json::<R::Response>().await?)
    }
}

pub struct Request;

impl Request {
    pub fn new() -> Self {
        Self {}
    }

    pub fn services() -> ServiceRepository {
        ServiceRepository::new()
    }

    pub fn users() -> UserRepository {
        UserRepository::new()
    }
}
