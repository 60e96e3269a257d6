//! Password sources for new database connections.

use std::sync::Arc;

use async_trait::async_trait;
use moviedb_auth::{AuthConfig, CredentialAuthenticator};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::error::StoreResult;

/// Choose the password source from the environment.
///
/// `PGPASSWORD` wins when set; otherwise passwords come from a
/// [`CredentialAuthenticator`] configured by [`AuthConfig::from_env`].
pub async fn from_env() -> StoreResult<Arc<dyn PasswordSource>> {
    match std::env::var("PGPASSWORD") {
        Ok(password) if !password.is_empty() => {
            info!("Using static database password from PGPASSWORD");
            Ok(Arc::new(StaticPassword::new(password)))
        }
        _ => {
            let auth = CredentialAuthenticator::from_config(AuthConfig::from_env()?).await;
            info!(user = %auth.target().username, "Using IAM database authentication");
            Ok(Arc::new(auth))
        }
    }
}

/// Supplies the password used for new physical connections.
///
/// Called before every store operation, so implementations should be cheap
/// when nothing changed.
#[async_trait]
pub trait PasswordSource: Send + Sync {
    async fn password(&self) -> StoreResult<String>;
}

/// A fixed password, e.g. from `PGPASSWORD`.
pub struct StaticPassword(SecretString);

impl StaticPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(SecretString::from(password.into()))
    }
}

#[async_trait]
impl PasswordSource for StaticPassword {
    async fn password(&self) -> StoreResult<String> {
        Ok(self.0.expose_secret().to_string())
    }
}

#[async_trait]
impl PasswordSource for CredentialAuthenticator {
    async fn password(&self) -> StoreResult<String> {
        let token = self.get_token().await?;
        Ok(token.as_str().to_string())
    }
}
