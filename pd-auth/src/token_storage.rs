use crate::common::StoredToken;
use crate::error::AuthError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const TOKEN_FILE_NAME: &str = ".pd-token.json";

/// `~/.pd-token.json`, or `./.pd-token.json` when the home directory is unknown.
pub fn default_token_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(TOKEN_FILE_NAME),
        None => {
            tracing::warn!(
                "Could not determine home directory, storing token in the current directory"
            );
            PathBuf::from(TOKEN_FILE_NAME)
        }
    }
}

// Created with mode 0600 so the token is never readable by others, even briefly.
#[cfg(unix)]
fn write_owner_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_owner_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    fs::write(path, contents)
}

pub struct TokenStore {
    token_path: PathBuf,
}

impl TokenStore {
    pub fn new(token_path: impl Into<PathBuf>) -> Self {
        Self {
            token_path: token_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.token_path
    }

    /// Overwrite the token file, readable and writable by the owner only.
    pub fn save_token(&self, token: &StoredToken) -> Result<(), AuthError> {
        let persist_err = |message: String| AuthError::TokenPersistFailed {
            path: self.token_path.clone(),
            message,
        };

        let json = serde_json::to_string_pretty(token)
            .map_err(|e| persist_err(format!("Failed to serialize token: {}", e)))?;

        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| persist_err(format!("Failed to create directory: {}", e)))?;
            }
        }

        write_owner_only(&self.token_path, json.as_bytes())
            .map_err(|e| persist_err(format!("Failed to write token: {}", e)))?;

        // An existing file keeps its old mode on open, so tighten it as well
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.token_path, fs::Permissions::from_mode(0o600))
                .map_err(|e| persist_err(format!("Failed to set file permissions: {}", e)))?;
        }

        tracing::debug!(path = %self.token_path.display(), "Token saved");
        Ok(())
    }

    pub fn load_token(&self) -> Result<StoredToken, AuthError> {
        let json = match fs::read_to_string(&self.token_path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AuthError::TokenFileMissing(self.token_path.clone()));
            }
            Err(e) => {
                return Err(AuthError::TokenFileCorrupt {
                    path: self.token_path.clone(),
                    message: format!("Failed to read token: {}", e),
                });
            }
        };

        serde_json::from_str(&json).map_err(|e| AuthError::TokenFileCorrupt {
            path: self.token_path.clone(),
            message: e.to_string(),
        })
    }
}
