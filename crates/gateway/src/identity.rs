use std::fs;
use std::path::{Path, PathBuf};

use logisim_core::model::AccountId;
use serde::Deserialize;

use crate::repository::{GatewayError, SessionIdentity};

/// Identity fixed at construction. `None` models a signed-out user.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<AccountId>);

impl StaticIdentity {
    #[must_use]
    pub fn signed_in(account: AccountId) -> Self {
        Self(Some(account))
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl SessionIdentity for StaticIdentity {
    fn current_account_id(&self) -> Option<AccountId> {
        self.0.clone()
    }
}

/// Persisted login state, as written by the sign-in flow.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    #[serde(default)]
    pub current_user: Option<StoredUser>,
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredUser {
    pub id: AccountId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl StoredSession {
    /// Parse a stored session document.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Serialization` if the JSON is malformed.
    pub fn from_json(raw: &str) -> Result<Self, GatewayError> {
        serde_json::from_str(raw).map_err(|e| GatewayError::Serialization(e.to_string()))
    }

    /// Read and parse the session file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Unauthenticated` if the file does not exist and
    /// `GatewayError::Serialization` if it cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(GatewayError::Unauthenticated);
            }
            Err(err) => return Err(GatewayError::Serialization(err.to_string())),
        };
        Self::from_json(&raw)
    }
}

/// Identity read from the stored session file on every lookup, so a sign-out
/// that removes the file takes effect immediately.
#[derive(Debug, Clone)]
pub struct StoredIdentity {
    path: PathBuf,
}

impl StoredIdentity {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Access token of the stored session, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        StoredSession::load(&self.path)
            .ok()
            .and_then(|session| session.access_token)
            .filter(|token| !token.trim().is_empty())
    }
}

impl SessionIdentity for StoredIdentity {
    fn current_account_id(&self) -> Option<AccountId> {
        match StoredSession::load(&self.path) {
            Ok(session) => session.current_user.map(|user| user.id),
            Err(GatewayError::Unauthenticated) => None,
            Err(err) => {
                log::warn!("ignoring unreadable session file {}: {err}", self.path.display());
                None
            }
        }
    }
}
