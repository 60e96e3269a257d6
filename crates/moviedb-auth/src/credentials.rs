//! Credential and token types passed along the authentication chain.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{AuthError, AuthResult};

/// Where the workload identity token is read from.
///
/// The token is issued and renewed by the platform, so it is read again on
/// every exchange rather than captured once at startup.
#[derive(Clone, PartialEq, Eq)]
pub enum WebIdentityTokenSource {
    /// Token value held in an environment variable.
    Env(String),
    /// Token written to a file by the platform.
    File(PathBuf),
    /// Fixed token value.
    Static(String),
}

impl WebIdentityTokenSource {
    /// Read the current token.
    pub async fn load(&self) -> AuthResult<SecretString> {
        let raw = match self {
            WebIdentityTokenSource::Env(var) => std::env::var(var).map_err(|_| {
                AuthError::CredentialExchange(format!("web identity token variable {var} is not set"))
            })?,
            WebIdentityTokenSource::File(path) => {
                tokio::fs::read_to_string(path).await.map_err(|e| {
                    AuthError::CredentialExchange(format!(
                        "failed to read web identity token file {}: {e}",
                        path.display()
                    ))
                })?
            }
            WebIdentityTokenSource::Static(token) => token.clone(),
        };

        let token = raw.trim();
        if token.is_empty() {
            return Err(AuthError::CredentialExchange(
                "web identity token is empty".to_string(),
            ));
        }
        Ok(SecretString::from(token.to_string()))
    }
}

impl fmt::Debug for WebIdentityTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebIdentityTokenSource::Env(var) => f.debug_tuple("Env").field(var).finish(),
            WebIdentityTokenSource::File(path) => f.debug_tuple("File").field(path).finish(),
            WebIdentityTokenSource::Static(_) => f.debug_tuple("Static").field(&"[REDACTED]").finish(),
        }
    }
}

/// Credential set as returned by the identity-federation service.
///
/// Any part may be missing; use [`IssuedCredentials::into_complete`] before
/// signing anything with it.
#[derive(Debug, Default)]
pub struct IssuedCredentials {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<SecretString>,
    pub session_token: Option<SecretString>,
    pub expiration: Option<DateTime<Utc>>,
}

impl IssuedCredentials {
    /// Convert into a complete credential set, failing if any part is absent.
    pub fn into_complete(self) -> AuthResult<TemporaryCloudCredentials> {
        let access_key_id = self
            .access_key_id
            .filter(|v| !v.is_empty())
            .ok_or_else(|| missing("access key id"))?;
        let secret_access_key = self
            .secret_access_key
            .filter(|v| !v.expose_secret().is_empty())
            .ok_or_else(|| missing("secret access key"))?;
        let session_token = self
            .session_token
            .filter(|v| !v.expose_secret().is_empty())
            .ok_or_else(|| missing("session token"))?;

        Ok(TemporaryCloudCredentials {
            access_key_id,
            secret_access_key,
            session_token,
            expiration: self.expiration,
        })
    }
}

fn missing(part: &str) -> AuthError {
    AuthError::CredentialExchange(format!("identity federation response is missing the {part}"))
}

/// Complete temporary credentials for an assumed role.
#[derive(Debug)]
pub struct TemporaryCloudCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: SecretString,
    pub expiration: Option<DateTime<Utc>>,
}

impl TemporaryCloudCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::from(secret_access_key.into()),
            session_token: SecretString::from(session_token.into()),
            expiration: None,
        }
    }
}

/// A signed token accepted by the database in place of a password.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseAuthToken {
    value: Arc<str>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl DatabaseAuthToken {
    pub fn new(value: impl Into<String>, issued_at: DateTime<Utc>, valid_for: Duration) -> Self {
        Self {
            value: Arc::from(value.into()),
            issued_at,
            expires_at: issued_at + valid_for,
        }
    }

    /// The token string, to be used as the connection password.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the token expires within `skew` of `now`.
    pub fn expires_within(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        now + skew >= self.expires_at
    }
}

impl fmt::Debug for DatabaseAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseAuthToken")
            .field("value", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
