mod models;

pub use models::{OAuthApplicationType, StoredToken, TokenGrant};
