//! Authentication error types.

use thiserror::Error;

/// Errors raised while obtaining a database auth token.
///
/// Cloneable so that one failed in-flight fetch can be reported to every
/// caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The identity-federation exchange failed or returned an incomplete
    /// credential set.
    #[error("credential exchange failed: {0}")]
    CredentialExchange(String),

    /// Signing the database auth token failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Required configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Returns true for failures of the identity-federation exchange.
    pub fn is_credential_exchange(&self) -> bool {
        matches!(self, AuthError::CredentialExchange(_))
    }

    /// Returns true for failures of the signing step.
    pub fn is_signing(&self) -> bool {
        matches!(self, AuthError::Signing(_))
    }
}

/// Result alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
