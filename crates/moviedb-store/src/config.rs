//! Database connection configuration.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::error::{StoreError, StoreResult};

/// Default Postgres port.
pub const DEFAULT_PORT: u16 = 5432;

/// Default database name.
pub const DEFAULT_DATABASE: &str = "postgres";

/// Default maximum pool size.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default timeout when acquiring a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Postgres connection settings, without the password.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database user.
    pub username: String,
    /// Database name.
    pub database: String,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Timeout when acquiring a pooled connection.
    pub acquire_timeout: Duration,
    /// TLS mode. Defaults to requiring TLS without verifying the certificate.
    pub ssl_mode: PgSslMode,
}

impl DatabaseConfig {
    /// Create a configuration for the given host and user.
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            username: username.into(),
            database: DEFAULT_DATABASE.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            ssl_mode: PgSslMode::Require,
        }
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the maximum pool size.
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    /// Set the acquire timeout.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the TLS mode.
    pub fn with_ssl_mode(mut self, mode: PgSslMode) -> Self {
        self.ssl_mode = mode;
        self
    }

    /// Connect options without a password.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new_without_pgpass()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .database(&self.database)
            .ssl_mode(self.ssl_mode)
    }

    /// Load from `PGHOST`, `PGPORT`, `PGUSER`, `PGDATABASE`, `PGSSLMODE`.
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("PGHOST").ok_or_else(|| StoreError::Config("PGHOST must be set".into()))?;
        let username =
            get("PGUSER").ok_or_else(|| StoreError::Config("PGUSER must be set".into()))?;

        let mut config = Self::new(host, username);

        if let Some(raw) = get("PGPORT") {
            let port = raw
                .parse::<u16>()
                .map_err(|_| StoreError::Config(format!("PGPORT is not a valid port: {raw}")))?;
            config = config.with_port(port);
        }
        if let Some(database) = get("PGDATABASE") {
            config = config.with_database(database);
        }
        if let Some(mode) = get("PGSSLMODE") {
            let mode = mode
                .parse::<PgSslMode>()
                .map_err(|e| StoreError::Config(format!("PGSSLMODE is invalid: {e}")))?;
            config = config.with_ssl_mode(mode);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            DatabaseConfig::from_lookup(lookup(&[("PGHOST", "db.local"), ("PGUSER", "app")]))
                .unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert!(matches!(config.ssl_mode, PgSslMode::Require));

        let options = config.connect_options();
        assert_eq!(options.get_host(), "db.local");
        assert_eq!(options.get_port(), DEFAULT_PORT);
        assert_eq!(options.get_username(), "app");
        assert_eq!(options.get_database(), Some(DEFAULT_DATABASE));
    }

    #[test]
    fn test_overrides() {
        let config = DatabaseConfig::from_lookup(lookup(&[
            ("PGHOST", "db.local"),
            ("PGUSER", "app"),
            ("PGPORT", "6432"),
            ("PGDATABASE", "movies"),
            ("PGSSLMODE", "disable"),
        ]))
        .unwrap();
        assert_eq!(config.port, 6432);
        assert_eq!(config.database, "movies");
        assert!(matches!(config.ssl_mode, PgSslMode::Disable));
    }

    #[test]
    fn test_missing_host() {
        let err = DatabaseConfig::from_lookup(lookup(&[("PGUSER", "app")])).unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_invalid_port() {
        let err = DatabaseConfig::from_lookup(lookup(&[
            ("PGHOST", "db.local"),
            ("PGUSER", "app"),
            ("PGPORT", "70000"),
        ]))
        .unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
