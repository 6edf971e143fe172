// Types shared by every component
pub mod common;

mod client_factory;
mod error;
pub mod login;
mod oauth_client;
mod scopes;
pub mod settings;
mod token_source;
mod token_storage;

pub use client_factory::build_client;
pub use common::{OAuthApplicationType, StoredToken, TokenGrant};
pub use error::AuthError;
pub use oauth_client::{oauth_endpoints, OAuthClient, OAuthEndpoints, TokenRefresher};
pub use scopes::validate_scopes;
pub use settings::{AuthMode, Config, ConfigValues, OAuthConfig};
pub use token_source::{RefreshingTokenSource, ReuseTokenSource, TokenSource};
pub use token_storage::{default_token_path, TokenStore};
