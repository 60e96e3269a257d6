//! Authenticator configuration.
//!
//! # Environment Variables
//!
//! ```text
//! PGHOST, PGPORT, PGUSER         database target the token is signed for
//! AWS_REGION                     region for STS and signing
//! AWS_ROLE_ARN                   role assumed with the web identity
//! AWS_ROLE_SESSION_NAME          optional, defaults to "local-dev-session"
//! VERCEL_OIDC_TOKEN              workload identity token
//! AWS_WEB_IDENTITY_TOKEN_FILE    alternative: file holding the token
//! AWS_STS_ENDPOINT               optional STS endpoint override
//! MOVIEDB_TOKEN_REFRESH          "never" (default) or "expiry"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::RefreshPolicy;
use crate::credentials::WebIdentityTokenSource;
use crate::error::{AuthError, AuthResult};

/// Default Postgres port.
pub const DEFAULT_PORT: u16 = 5432;

/// Default STS role session name.
pub const DEFAULT_SESSION_NAME: &str = "local-dev-session";

/// Default environment variable holding the workload identity token.
pub const DEFAULT_TOKEN_ENV: &str = "VERCEL_OIDC_TOKEN";

/// Default timeout for STS requests.
pub const DEFAULT_STS_TIMEOUT: Duration = Duration::from_secs(10);

/// Database endpoint a token is signed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningTarget {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub region: String,
}

/// Configuration for [`CredentialAuthenticator`](crate::CredentialAuthenticator).
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Database endpoint and region the token is signed for.
    pub target: SigningTarget,
    /// Role assumed through the identity-federation exchange.
    pub role_arn: String,
    /// Session name passed with the exchange.
    pub session_name: String,
    /// Where the workload identity token comes from.
    pub token_source: WebIdentityTokenSource,
    /// STS endpoint override. When unset the SDK resolves the regional endpoint.
    pub sts_endpoint: Option<String>,
    /// Timeout for STS requests.
    pub sts_timeout: Duration,
    /// Cache refresh policy.
    pub refresh: RefreshPolicy,
}

impl AuthConfig {
    /// Create a configuration with defaults for everything but the target and role.
    pub fn new(target: SigningTarget, role_arn: impl Into<String>) -> Self {
        Self {
            target,
            role_arn: role_arn.into(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            token_source: WebIdentityTokenSource::Env(DEFAULT_TOKEN_ENV.to_string()),
            sts_endpoint: None,
            sts_timeout: DEFAULT_STS_TIMEOUT,
            refresh: RefreshPolicy::Never,
        }
    }

    /// Set the session name.
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    /// Set the workload identity token source.
    pub fn with_token_source(mut self, source: WebIdentityTokenSource) -> Self {
        self.token_source = source;
        self
    }

    /// Override the STS endpoint.
    pub fn with_sts_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.sts_endpoint = Some(endpoint.into());
        self
    }

    /// Set the STS request timeout.
    pub fn with_sts_timeout(mut self, timeout: Duration) -> Self {
        self.sts_timeout = timeout;
        self
    }

    /// Set the cache refresh policy.
    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> AuthResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> AuthResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| AuthError::Config(format!("{key} must be set")))
        };

        let port = match get("PGPORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AuthError::Config(format!("PGPORT is not a valid port: {raw}")))?,
            None => DEFAULT_PORT,
        };

        let target = SigningTarget {
            hostname: require("PGHOST")?,
            port,
            username: require("PGUSER")?,
            region: require("AWS_REGION")?,
        };

        let mut config = Self::new(target, require("AWS_ROLE_ARN")?);

        if let Some(name) = get("AWS_ROLE_SESSION_NAME") {
            config = config.with_session_name(name);
        }
        if let Some(path) = get("AWS_WEB_IDENTITY_TOKEN_FILE") {
            config = config.with_token_source(WebIdentityTokenSource::File(PathBuf::from(path)));
        }
        if let Some(endpoint) = get("AWS_STS_ENDPOINT") {
            config = config.with_sts_endpoint(endpoint);
        }
        if let Some(refresh) = get("MOVIEDB_TOKEN_REFRESH") {
            config = config.with_refresh(refresh.parse()?);
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

    const BASE: &[(&str, &str)] = &[
        ("PGHOST", "db.cluster.us-east-1.rds.amazonaws.com"),
        ("PGUSER", "app"),
        ("AWS_REGION", "us-east-1"),
        ("AWS_ROLE_ARN", "arn:aws:iam::123456789012:role/app"),
    ];

    #[test]
    fn test_from_lookup_defaults() {
        let config = AuthConfig::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(config.target.port, DEFAULT_PORT);
        assert_eq!(config.session_name, DEFAULT_SESSION_NAME);
        assert_eq!(
            config.token_source,
            WebIdentityTokenSource::Env(DEFAULT_TOKEN_ENV.to_string())
        );
        assert_eq!(config.refresh, RefreshPolicy::Never);
        assert_eq!(config.sts_endpoint, None);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let mut vars = BASE.to_vec();
        vars.extend_from_slice(&[
            ("PGPORT", "6543"),
            ("AWS_ROLE_SESSION_NAME", "seed"),
            ("AWS_WEB_IDENTITY_TOKEN_FILE", "/var/run/token"),
            ("AWS_STS_ENDPOINT", "http://localhost:4566"),
            ("MOVIEDB_TOKEN_REFRESH", "expiry"),
        ]);
        let config = AuthConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.target.port, 6543);
        assert_eq!(config.session_name, "seed");
        assert_eq!(
            config.token_source,
            WebIdentityTokenSource::File(PathBuf::from("/var/run/token"))
        );
        assert_eq!(config.sts_endpoint.as_deref(), Some("http://localhost:4566"));
        assert!(matches!(config.refresh, RefreshPolicy::BeforeExpiry { .. }));
    }

    #[test]
    fn test_from_lookup_missing_required() {
        let vars: Vec<_> = BASE.iter().filter(|(k, _)| *k != "AWS_ROLE_ARN").copied().collect();
        let err = AuthConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert_eq!(err, AuthError::Config("AWS_ROLE_ARN must be set".to_string()));
    }

    #[test]
    fn test_from_lookup_bad_port() {
        let mut vars = BASE.to_vec();
        vars.push(("PGPORT", "not-a-port"));
        assert!(matches!(
            AuthConfig::from_lookup(lookup(&vars)),
            Err(AuthError::Config(_))
        ));
    }
}
