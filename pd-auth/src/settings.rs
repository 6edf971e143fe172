use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::common::OAuthApplicationType;
use crate::error::AuthError;
use crate::scopes::validate_scopes;
use crate::token_storage::default_token_path;

const CONFIG_FILE_NAME: &str = ".pd.yml";
const ENV_PREFIX: &str = "PD";
const DEFAULT_LOG_LEVEL: &str = "info";

/// One layer of raw configuration values, either from the config file and
/// environment or from command-line flags.
#[derive(Default, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigValues {
    pub authtoken: Option<String>,
    pub loglevel: Option<String>,
    pub oauth_type: Option<OAuthApplicationType>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(deserialize_with = "scope_list")]
    pub scopes: Vec<String>,
    pub token_file: Option<PathBuf>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeList {
    Joined(String),
    List(Vec<String>),
}

// A YAML list, or a comma separated string as set through `PD_SCOPES`.
fn scope_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ScopeList::deserialize(deserializer)? {
        ScopeList::Joined(joined) => joined
            .split(',')
            .map(|scope| scope.trim().to_string())
            .filter(|scope| !scope.is_empty())
            .collect(),
        ScopeList::List(scopes) => scopes,
    })
}

impl fmt::Debug for ConfigValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigValues")
            .field("authtoken", &self.authtoken.as_ref().map(|_| "[REDACTED]"))
            .field("loglevel", &self.loglevel)
            .field("oauth_type", &self.oauth_type)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("scopes", &self.scopes)
            .field("token_file", &self.token_file)
            .finish()
    }
}

/// Merged, immutable runtime configuration
#[derive(Debug)]
pub struct Config {
    pub authtoken: Option<SecretString>,
    pub loglevel: String,
    pub oauth_type: Option<OAuthApplicationType>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub scopes: Vec<String>,
    pub token_file: Option<PathBuf>,
}

/// Fully populated OAuth settings
#[derive(Debug)]
pub struct OAuthConfig {
    pub app_type: OAuthApplicationType,
    pub client_id: String,
    pub client_secret: SecretString,
    pub scopes: Vec<String>,
    pub token_file: PathBuf,
}

/// How API requests authenticate, decided by [`Config::validate`].
#[derive(Debug)]
pub enum AuthMode<'a> {
    ApiToken(&'a SecretString),
    OAuth(OAuthConfig),
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// `PD_*` variables, kept as strings so ids and secrets are never reinterpreted.
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
}

/// Read the config file (if it exists) layered under `PD_*` environment variables.
pub fn load_file_values(path: Option<&Path>) -> Result<ConfigValues, AuthError> {
    build_values(path, environment())
}

fn build_values(
    path: Option<&Path>,
    environment: config::Environment,
) -> Result<ConfigValues, AuthError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        tracing::debug!(path = %path.display(), "Loading config file");
        builder = builder.add_source(config::File::from(path).required(false));
    }

    builder = builder.add_source(environment);

    Ok(builder.build()?.try_deserialize()?)
}

/// Load the config file and apply flag overrides on top of it.
pub fn load(config_path: Option<&Path>, flags: ConfigValues) -> Result<Config, AuthError> {
    let path = config_path.map(Path::to_path_buf).or_else(default_config_path);
    let file = load_file_values(path.as_deref())?;
    Ok(merge(file, flags))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn pick(flag: Option<String>, file: Option<String>) -> Option<String> {
    non_empty(flag).or_else(|| non_empty(file))
}

/// Flags win over file values; empty flag values never override.
pub fn merge(file: ConfigValues, flags: ConfigValues) -> Config {
    let scopes = if flags.scopes.iter().any(|s| !s.trim().is_empty()) {
        flags.scopes
    } else {
        file.scopes
    };

    Config {
        authtoken: pick(flags.authtoken, file.authtoken).map(SecretString::from),
        loglevel: pick(flags.loglevel, file.loglevel)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        oauth_type: flags.oauth_type.or(file.oauth_type),
        client_id: pick(flags.client_id, file.client_id),
        client_secret: pick(flags.client_secret, file.client_secret).map(SecretString::from),
        scopes: scopes
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        token_file: flags
            .token_file
            .filter(|p| !p.as_os_str().is_empty())
            .or(file.token_file.filter(|p| !p.as_os_str().is_empty())),
    }
}

impl Config {
    /// OAuth fields that are unset, in flag order.
    pub fn missing_oauth_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.oauth_type.is_none() {
            missing.push("oauth-type");
        }
        if self.client_id.is_none() {
            missing.push("client-id");
        }
        if self.client_secret.is_none() {
            missing.push("client-secret");
        }
        if self.scopes.is_empty() {
            missing.push("scope");
        }
        missing
    }

    pub fn token_file(&self) -> PathBuf {
        self.token_file.clone().unwrap_or_else(default_token_path)
    }

    /// Decide between static-token and OAuth authentication, rejecting partial
    /// OAuth settings and scopes outside the application type's vocabulary.
    pub fn validate(&self) -> Result<AuthMode<'_>, AuthError> {
        let missing = self.missing_oauth_fields();

        if missing.len() == 4 {
            return match &self.authtoken {
                Some(token) => Ok(AuthMode::ApiToken(token)),
                None => Err(AuthError::NoCredentials),
            };
        }

        if !missing.is_empty() {
            return Err(AuthError::IncompleteOAuthConfig { missing });
        }

        let app_type = self.oauth_type.unwrap_or_default();
        validate_scopes(app_type, &self.scopes)?;

        Ok(AuthMode::OAuth(OAuthConfig {
            app_type,
            client_id: self.client_id.clone().unwrap_or_default(),
            client_secret: self
                .client_secret
                .as_ref()
                .map(|s| SecretString::from(s.expose_secret().to_string()))
                .unwrap_or_else(|| SecretString::from(String::new())),
            scopes: self.scopes.clone(),
            token_file: self.token_file(),
        }))
    }
}
