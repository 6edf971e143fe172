use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tokens expiring within this window are treated as already expired.
const EXPIRY_DELTA: Duration = Duration::seconds(10);

/// PagerDuty OAuth application family.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthApplicationType {
    #[default]
    Classic,
    Scoped,
}

impl fmt::Display for OAuthApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic => f.write_str("classic"),
            Self::Scoped => f.write_str("scoped"),
        }
    }
}

impl FromStr for OAuthApplicationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "scoped" => Ok(Self::Scoped),
            other => Err(format!(
                "unknown OAuth application type '{}', expected 'classic' or 'scoped'",
                other
            )),
        }
    }
}

/// Tokens returned from a code exchange or refresh grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

/// Token persisted between invocations, tied to the client id that obtained it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    pub client_id: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl StoredToken {
    pub fn from_grant(grant: TokenGrant, client_id: &str, scopes: &[String]) -> Self {
        Self {
            access_token: grant.access_token,
            token_type: grant.token_type,
            refresh_token: grant.refresh_token,
            expiry: grant.expiry,
            client_id: client_id.to_string(),
            scopes: scopes.to_vec(),
        }
    }

    /// A missing expiry never expires.
    pub fn is_expired(&self) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry <= Utc::now() + EXPIRY_DELTA)
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expiry: Option<DateTime<Utc>>) -> StoredToken {
        StoredToken {
            access_token: "access".into(),
            token_type: "Bearer".into(),
            refresh_token: Some("refresh".into()),
            expiry,
            client_id: "client".into(),
            scopes: vec!["read".into()],
        }
    }

    #[test]
    fn expiry_window() {
        assert!(!token(None).is_expired());
        assert!(!token(Some(Utc::now() + Duration::hours(1))).is_expired());
        assert!(token(Some(Utc::now() + Duration::seconds(5))).is_expired());
        assert!(token(Some(Utc::now() - Duration::minutes(1))).is_expired());
    }

    #[test]
    fn empty_refresh_token_counts_as_missing() {
        let mut t = token(None);
        assert!(t.has_refresh_token());
        t.refresh_token = Some(String::new());
        assert!(!t.has_refresh_token());
        t.refresh_token = None;
        assert!(!t.has_refresh_token());
    }

    #[test]
    fn app_type_parsing() {
        assert_eq!(
            "Scoped".parse::<OAuthApplicationType>(),
            Ok(OAuthApplicationType::Scoped)
        );
        assert_eq!(
            "classic".parse::<OAuthApplicationType>(),
            Ok(OAuthApplicationType::Classic)
        );
        assert!("legacy".parse::<OAuthApplicationType>().is_err());
        assert_eq!(OAuthApplicationType::default(), OAuthApplicationType::Classic);
    }
}
