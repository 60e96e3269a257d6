//! The credential authenticator.

use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::cache::TokenCache;
use crate::config::{AuthConfig, SigningTarget};
use crate::credentials::{DatabaseAuthToken, WebIdentityTokenSource};
use crate::error::{AuthError, AuthResult};
use crate::signer::{RdsTokenSigner, TokenSigner};
use crate::sts::{AssumeRoleRequest, IdentityFederation, StsClient};

/// Supplies database passwords backed by RDS IAM auth tokens.
///
/// On a cache miss the authenticator exchanges the workload identity token for
/// temporary credentials and signs a new auth token with them. The token is
/// cached and handed out again on later calls.
pub struct CredentialAuthenticator {
    inner: Arc<Inner>,
    cache: TokenCache,
}

struct Inner {
    federation: Arc<dyn IdentityFederation>,
    signer: Arc<dyn TokenSigner>,
    target: SigningTarget,
    role_arn: String,
    session_name: String,
    token_source: WebIdentityTokenSource,
}

impl CredentialAuthenticator {
    /// Build an authenticator talking to STS and signing RDS tokens.
    pub async fn from_config(config: AuthConfig) -> Self {
        let sts = StsClient::new(
            &config.target.region,
            config.sts_endpoint.as_deref(),
            config.sts_timeout,
        )
        .await;
        Self::new(config, Arc::new(sts), Arc::new(RdsTokenSigner::new()))
    }

    /// Build an authenticator from explicit collaborators.
    pub fn new(
        config: AuthConfig,
        federation: Arc<dyn IdentityFederation>,
        signer: Arc<dyn TokenSigner>,
    ) -> Self {
        Self {
            cache: TokenCache::new(config.refresh),
            inner: Arc::new(Inner {
                federation,
                signer,
                target: config.target,
                role_arn: config.role_arn,
                session_name: config.session_name,
                token_source: config.token_source,
            }),
        }
    }

    /// Get a database auth token, fetching one if none is cached.
    pub async fn get_token(&self) -> AuthResult<DatabaseAuthToken> {
        let inner = self.inner.clone();
        self.cache
            .get_or_fetch(move || async move { inner.fetch().await }.boxed())
            .await
    }

    /// The cached token, if any.
    pub fn cached_token(&self) -> Option<DatabaseAuthToken> {
        self.cache.peek()
    }

    /// The database endpoint tokens are signed for.
    pub fn target(&self) -> &SigningTarget {
        &self.inner.target
    }
}

impl Inner {
    async fn fetch(&self) -> AuthResult<DatabaseAuthToken> {
        let web_identity_token = self.token_source.load().await?;
        let request = AssumeRoleRequest {
            role_arn: self.role_arn.clone(),
            session_name: self.session_name.clone(),
            web_identity_token,
        };

        let credentials = self
            .federation
            .assume_role_with_web_identity(&request)
            .await
            .and_then(|issued| issued.into_complete())
            .inspect_err(|e| warn!(error = %e, role_arn = %self.role_arn, "Credential exchange failed"))?;

        debug!(
            access_key_id = %credentials.access_key_id,
            expiration = ?credentials.expiration,
            "Obtained temporary credentials"
        );

        let token = self
            .signer
            .sign(&credentials, &self.target, Utc::now())
            .await
            .and_then(|token| {
                if token.as_str().is_empty() {
                    Err(AuthError::Signing("signer produced an empty token".to_string()))
                } else {
                    Ok(token)
                }
            })
            .inspect_err(|e| warn!(error = %e, "Database auth token signing failed"))?;

        info!(
            host = %self.target.hostname,
            port = self.target.port,
            user = %self.target.username,
            expires_at = %token.expires_at(),
            "Issued database auth token"
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RefreshPolicy;
    use crate::credentials::{IssuedCredentials, TemporaryCloudCredentials};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use parking_lot::Mutex;
    use secrecy::{ExposeSecret, SecretString};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Exchange fake returning a fixed credential tuple and counting calls.
    struct FakeFederation {
        access_key_id: Option<&'static str>,
        secret_access_key: Option<&'static str>,
        session_token: Option<&'static str>,
        fail: bool,
        delay: Option<std::time::Duration>,
        calls: AtomicUsize,
        seen_tokens: Mutex<Vec<String>>,
    }

    impl FakeFederation {
        fn complete() -> Self {
            Self::with_parts(Some("AKIA..."), Some("secret"), Some("tok"))
        }

        fn with_parts(
            access_key_id: Option<&'static str>,
            secret_access_key: Option<&'static str>,
            session_token: Option<&'static str>,
        ) -> Self {
            Self {
                access_key_id,
                secret_access_key,
                session_token,
                fail: false,
                delay: None,
                calls: AtomicUsize::new(0),
                seen_tokens: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IdentityFederation for FakeFederation {
        async fn assume_role_with_web_identity(
            &self,
            request: &AssumeRoleRequest,
        ) -> AuthResult<IssuedCredentials> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_tokens
                .lock()
                .push(request.web_identity_token.expose_secret().to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(AuthError::CredentialExchange("upstream unavailable".into()));
            }
            Ok(IssuedCredentials {
                access_key_id: self.access_key_id.map(str::to_string),
                secret_access_key: self
                    .secret_access_key
                    .map(|s| SecretString::from(s.to_string())),
                session_token: self.session_token.map(|s| SecretString::from(s.to_string())),
                expiration: None,
            })
        }
    }

    /// Signer fake returning a fixed token, or failing.
    struct FakeSigner {
        token: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeSigner {
        fn returning(token: &'static str) -> Self {
            Self {
                token,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                token: "",
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenSigner for FakeSigner {
        async fn sign(
            &self,
            credentials: &TemporaryCloudCredentials,
            _target: &SigningTarget,
            now: DateTime<Utc>,
        ) -> AuthResult<DatabaseAuthToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(credentials.secret_access_key.expose_secret(), "secret");
            if self.fail {
                return Err(AuthError::Signing("malformed region".into()));
            }
            Ok(DatabaseAuthToken::new(self.token, now, Duration::minutes(15)))
        }
    }

    fn config() -> AuthConfig {
        AuthConfig::new(
            SigningTarget {
                hostname: "db.example.internal".to_string(),
                port: 5432,
                username: "app".to_string(),
                region: "us-east-1".to_string(),
            },
            "arn:aws:iam::123456789012:role/app",
        )
        .with_token_source(WebIdentityTokenSource::Static("oidc-jwt".to_string()))
    }

    fn authenticator(
        federation: &Arc<FakeFederation>,
        signer: &Arc<FakeSigner>,
    ) -> CredentialAuthenticator {
        CredentialAuthenticator::new(config(), federation.clone(), signer.clone())
    }

    #[tokio::test]
    async fn test_scenario_a_token_is_cached() {
        let federation = Arc::new(FakeFederation::complete());
        let signer = Arc::new(FakeSigner::returning("eyJhbGc...signed-token"));
        let auth = authenticator(&federation, &signer);

        let first = auth.get_token().await.unwrap();
        assert_eq!(first.as_str(), "eyJhbGc...signed-token");
        assert_eq!(auth.cached_token().unwrap().as_str(), "eyJhbGc...signed-token");

        let second = auth.get_token().await.unwrap();
        assert_eq!(second.as_str(), first.as_str());
        assert_eq!(federation.calls(), 1);
        assert_eq!(signer.calls(), 1);
        assert_eq!(*federation.seen_tokens.lock(), vec!["oidc-jwt".to_string()]);
    }

    #[tokio::test]
    async fn test_scenario_b_missing_secret_does_not_pollute_cache() {
        let federation = Arc::new(FakeFederation::with_parts(Some("AKIA..."), None, Some("tok")));
        let signer = Arc::new(FakeSigner::returning("unused"));
        let auth = authenticator(&federation, &signer);

        let err = auth.get_token().await.unwrap_err();
        assert!(err.is_credential_exchange());
        assert!(auth.cached_token().is_none());
        assert_eq!(signer.calls(), 0);

        // Next call starts from scratch.
        let err = auth.get_token().await.unwrap_err();
        assert!(err.is_credential_exchange());
        assert_eq!(federation.calls(), 2);
    }

    #[tokio::test]
    async fn test_any_missing_part_is_an_exchange_error() {
        let cases = [
            (None, Some("secret"), Some("tok")),
            (Some("AKIA..."), None, Some("tok")),
            (Some("AKIA..."), Some("secret"), None),
        ];
        for (access, secret, session) in cases {
            let federation = Arc::new(FakeFederation::with_parts(access, secret, session));
            let signer = Arc::new(FakeSigner::returning("unused"));
            let auth = authenticator(&federation, &signer);

            assert!(auth.get_token().await.unwrap_err().is_credential_exchange());
            assert!(auth.cached_token().is_none());
        }
    }

    #[tokio::test]
    async fn test_exchange_call_failure_propagates() {
        let mut fake = FakeFederation::complete();
        fake.fail = true;
        let federation = Arc::new(fake);
        let signer = Arc::new(FakeSigner::returning("unused"));
        let auth = authenticator(&federation, &signer);

        let err = auth.get_token().await.unwrap_err();
        assert_eq!(err, AuthError::CredentialExchange("upstream unavailable".into()));
        assert!(auth.cached_token().is_none());
    }

    #[tokio::test]
    async fn test_signing_failure_does_not_pollute_cache() {
        let federation = Arc::new(FakeFederation::complete());
        let signer = Arc::new(FakeSigner::failing());
        let auth = authenticator(&federation, &signer);

        let err = auth.get_token().await.unwrap_err();
        assert!(err.is_signing());
        assert!(auth.cached_token().is_none());
        assert_eq!(federation.calls(), 1);
        assert_eq!(signer.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_signed_token_is_a_signing_error() {
        let federation = Arc::new(FakeFederation::complete());
        let signer = Arc::new(FakeSigner::returning(""));
        let auth = authenticator(&federation, &signer);

        let err = auth.get_token().await.unwrap_err();
        assert!(err.is_signing(), "unexpected error: {err}");
        assert!(auth.cached_token().is_none());

        assert!(auth.get_token().await.unwrap_err().is_signing());
        assert_eq!(signer.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let mut fake = FakeFederation::complete();
        fake.delay = Some(std::time::Duration::from_millis(50));
        let federation = Arc::new(fake);
        let signer = Arc::new(FakeSigner::returning("shared-token"));
        let auth = Arc::new(authenticator(&federation, &signer));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let auth = auth.clone();
                tokio::spawn(async move { auth.get_token().await })
            })
            .collect();

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token.as_str(), "shared-token");
        }
        assert_eq!(federation.calls(), 1);
        assert_eq!(signer.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_web_identity_token_fails_exchange() {
        let federation = Arc::new(FakeFederation::complete());
        let signer = Arc::new(FakeSigner::returning("unused"));
        let config = config().with_token_source(WebIdentityTokenSource::Env(
            "MOVIEDB_TEST_ABSENT_OIDC_TOKEN".to_string(),
        ));
        let auth = CredentialAuthenticator::new(config, federation.clone(), signer);

        assert!(auth.get_token().await.unwrap_err().is_credential_exchange());
        assert_eq!(federation.calls(), 0);
    }

    #[tokio::test]
    async fn test_expiry_policy_refreshes_expired_token() {
        struct ExpiredSigner(AtomicUsize);

        #[async_trait]
        impl TokenSigner for ExpiredSigner {
            async fn sign(
                &self,
                _credentials: &TemporaryCloudCredentials,
                _target: &SigningTarget,
                now: DateTime<Utc>,
            ) -> AuthResult<DatabaseAuthToken> {
                let n = self.0.fetch_add(1, Ordering::SeqCst);
                Ok(DatabaseAuthToken::new(
                    format!("token-{n}"),
                    now - Duration::minutes(30),
                    Duration::minutes(15),
                ))
            }
        }

        let federation = Arc::new(FakeFederation::complete());
        let config = config().with_refresh(RefreshPolicy::BeforeExpiry {
            skew: std::time::Duration::from_secs(60),
        });
        let auth = CredentialAuthenticator::new(
            config,
            federation.clone(),
            Arc::new(ExpiredSigner(AtomicUsize::new(0))),
        );

        assert_eq!(auth.get_token().await.unwrap().as_str(), "token-0");
        assert_eq!(auth.get_token().await.unwrap().as_str(), "token-1");
        assert_eq!(federation.calls(), 2);
    }
}
