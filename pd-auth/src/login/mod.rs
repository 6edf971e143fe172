mod callback;

pub use callback::{CallbackOutcome, CallbackServer, CALLBACK_PATH};

use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;

use crate::common::{OAuthApplicationType, StoredToken};
use crate::error::AuthError;
use crate::oauth_client::{oauth_endpoints, OAuthClient, OAuthEndpoints};
use crate::scopes::validate_scopes;
use crate::settings::Config;
use crate::token_storage::TokenStore;

pub const DEFAULT_CALLBACK_PORT: u16 = 8080;
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(300); // 5 minute timeout

/// Everything one `pd auth login` attempt needs.
#[derive(Debug)]
pub struct LoginOptions {
    pub app_type: OAuthApplicationType,
    pub client_id: String,
    pub client_secret: SecretString,
    pub scopes: Vec<String>,
    pub token_file: PathBuf,
    pub port: u16,
    pub open_browser: bool,
    pub timeout: Duration,
    pub endpoints: OAuthEndpoints,
}

impl LoginOptions {
    /// Login options from the merged config; client id, secret and at least
    /// one scope must be present.
    pub fn from_config(config: &Config, port: u16, open_browser: bool) -> Result<Self, AuthError> {
        let options = Self {
            app_type: config.oauth_type.unwrap_or_default(),
            client_id: config.client_id.clone().unwrap_or_default(),
            client_secret: config
                .client_secret
                .as_ref()
                .map(|s| SecretString::from(s.expose_secret().to_string()))
                .unwrap_or_else(|| SecretString::from(String::new())),
            scopes: config.scopes.clone(),
            token_file: config.token_file(),
            port,
            open_browser,
            timeout: DEFAULT_LOGIN_TIMEOUT,
            endpoints: oauth_endpoints(config.oauth_type),
        };
        options.check_credentials()?;
        Ok(options)
    }

    fn check_credentials(&self) -> Result<(), AuthError> {
        let missing = self.missing_credentials();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AuthError::MissingOAuthCredentials { missing })
        }
    }

    fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.client_id.trim().is_empty() {
            missing.push("client-id");
        }
        if self.client_secret.expose_secret().trim().is_empty() {
            missing.push("client-secret");
        }
        if self.scopes.is_empty() {
            missing.push("scope");
        }
        missing
    }
}

/// A login attempt whose listener is up and whose authorization URL has been
/// handed to the user.
pub struct PendingLogin {
    server: CallbackServer,
    oauth_client: OAuthClient,
    authorization_url: String,
    redirect_url: String,
    options: LoginOptions,
}

fn launch_browser(url: &str) -> Result<(), AuthError> {
    open::that(url).map_err(|e| AuthError::BrowserLaunchFailed(e.to_string()))
}

/// Bind the callback listener, build the authorization URL and point the user
/// at it.
pub async fn start(options: LoginOptions) -> Result<PendingLogin, AuthError> {
    options.check_credentials()?;
    validate_scopes(options.app_type, &options.scopes)?;

    let oauth_client = OAuthClient::new(
        &options.endpoints,
        &options.client_id,
        &options.client_secret,
    )?;

    let state = OAuthClient::generate_state_token();
    let server = CallbackServer::bind(options.port, &state).await?;
    let redirect_url = format!("http://localhost:{}{}", server.port(), CALLBACK_PATH);
    let oauth_client = oauth_client.with_redirect_url(&redirect_url)?;
    let authorization_url = oauth_client.build_authorization_url(&state, &options.scopes);

    tracing::info!(
        client_id = %options.client_id,
        app_type = %options.app_type,
        port = server.port(),
        "Awaiting OAuth redirect"
    );

    if options.open_browser {
        match launch_browser(&authorization_url) {
            Ok(()) => {
                println!("Browser opened. Please authorize the application...");
                println!("\nYou can also open this URL directly in your browser:");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not launch browser");
                println!("Failed to open browser automatically.");
                println!("\nPlease open this URL in your browser:");
            }
        }
    } else {
        println!("Please open this URL in your browser:");
    }
    println!("{}\n", authorization_url);

    Ok(PendingLogin {
        server,
        oauth_client,
        authorization_url,
        redirect_url,
        options,
    })
}

impl PendingLogin {
    pub fn authorization_url(&self) -> &str {
        &self.authorization_url
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    pub fn port(&self) -> u16 {
        self.server.port()
    }

    /// Wait for the redirect, exchange the code and persist the token.
    ///
    /// Nothing is written unless the exchange succeeds.
    pub async fn finish(self) -> Result<StoredToken, AuthError> {
        let PendingLogin {
            server,
            oauth_client,
            options,
            ..
        } = self;

        println!("Waiting for authorization...");
        let code = match server.wait(options.timeout).await {
            CallbackOutcome::Code(code) => code,
            CallbackOutcome::ProviderError { error, description } => {
                return Err(AuthError::OAuthProviderError { error, description });
            }
            CallbackOutcome::TimedOut => return Err(AuthError::AuthTimeout(options.timeout)),
        };

        tracing::debug!("Authorization code received, exchanging for token");
        let grant = oauth_client.exchange_code_for_token(&code).await?;
        let token = StoredToken::from_grant(grant, &options.client_id, &options.scopes);

        TokenStore::new(&options.token_file).save_token(&token)?;
        tracing::info!(
            token_file = %options.token_file.display(),
            "OAuth token persisted"
        );

        Ok(token)
    }
}

/// Run a complete authorization-code login.
#[tracing::instrument(
    name = "oauth_login",
    skip_all,
    fields(client_id = %options.client_id, app_type = %options.app_type)
)]
pub async fn login(options: LoginOptions) -> Result<StoredToken, AuthError> {
    start(options).await?.finish().await
}
