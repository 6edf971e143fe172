use std::path::PathBuf;
use thiserror::Error;

use crate::common::OAuthApplicationType;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Incomplete OAuth configuration, missing: {}", .missing.join(", "))]
    IncompleteOAuthConfig { missing: Vec<&'static str> },

    #[error("No credentials configured. Set --authtoken, or configure OAuth (--oauth-type, --client-id, --client-secret, --scope) and run 'pd auth login'")]
    NoCredentials,

    #[error("Invalid scope '{scope}' for {app_type} OAuth application")]
    InvalidScope {
        scope: String,
        app_type: OAuthApplicationType,
    },

    #[error("Failed to bind local callback listener on port {port}: {source}. Make sure no other process is using this port, or pass --port")]
    ListenerBindFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing OAuth credentials for login: {}", .missing.join(", "))]
    MissingOAuthCredentials { missing: Vec<&'static str> },

    #[error("Failed to open browser: {0}")]
    BrowserLaunchFailed(String),

    #[error("OAuth provider returned an error: {error}{}", describe(.description))]
    OAuthProviderError {
        error: String,
        description: Option<String>,
    },

    #[error("Authentication timed out after {} seconds waiting for the browser redirect", seconds(.0))]
    AuthTimeout(std::time::Duration),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Failed to persist token to {}: {message}", .path.display())]
    TokenPersistFailed { path: PathBuf, message: String },

    #[error("No stored OAuth token found at {}. Run 'pd auth login' first", .0.display())]
    NoStoredToken(PathBuf),

    #[error("Stored token belongs to client id '{stored}', not '{requested}'. Run 'pd auth login' again")]
    ClientIDMismatch { stored: String, requested: String },

    #[error("Stored token has no refresh token. Run 'pd auth login' again")]
    NoRefreshToken,

    #[error("Token refresh failed: {0}. Run 'pd auth login' again")]
    RefreshFailed(String),

    #[error("Token file {} does not exist", .0.display())]
    TokenFileMissing(PathBuf),

    #[error("Token file {} is corrupt: {message}", .path.display())]
    TokenFileCorrupt { path: PathBuf, message: String },
}

fn describe(description: &Option<String>) -> String {
    match description {
        Some(d) if !d.is_empty() => format!(" ({})", d),
        _ => String::new(),
    }
}

fn seconds(duration: &std::time::Duration) -> u64 {
    duration.as_secs()
}

impl From<config::ConfigError> for AuthError {
    fn from(err: config::ConfigError) -> Self {
        AuthError::Configuration(err.to_string())
    }
}
