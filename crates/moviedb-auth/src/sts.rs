//! Identity-federation exchange against AWS STS.
//!
//! `AssumeRoleWithWebIdentity` is authorised by the web identity token itself,
//! so the SDK client is built without credentials of its own. Failures are
//! reported to the caller rather than retried.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_sts::primitives::DateTime as AwsDateTime;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::credentials::IssuedCredentials;
use crate::error::{AuthError, AuthResult};

/// Parameters of one identity-federation exchange.
#[derive(Debug)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub session_name: String,
    pub web_identity_token: SecretString,
}

/// Exchanges a workload identity token for temporary cloud credentials.
#[async_trait]
pub trait IdentityFederation: Send + Sync {
    /// Assume `request.role_arn` using the web identity token.
    ///
    /// Returns whatever credential parts the service produced; completeness
    /// is checked by the caller.
    async fn assume_role_with_web_identity(
        &self,
        request: &AssumeRoleRequest,
    ) -> AuthResult<IssuedCredentials>;
}

/// STS client backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct StsClient {
    client: aws_sdk_sts::Client,
}

impl StsClient {
    /// Create a client for `region`, optionally against a custom endpoint.
    pub async fn new(region: &str, endpoint: Option<&str>, timeout: Duration) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
            .retry_config(RetryConfig::disabled())
            .no_credentials();
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        Self::with_client(aws_sdk_sts::Client::new(&sdk_config))
    }

    /// Wrap an existing SDK client.
    pub fn with_client(client: aws_sdk_sts::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityFederation for StsClient {
    async fn assume_role_with_web_identity(
        &self,
        request: &AssumeRoleRequest,
    ) -> AuthResult<IssuedCredentials> {
        debug!(
            role_arn = %request.role_arn,
            session_name = %request.session_name,
            "Assuming role with web identity"
        );

        let output = self
            .client
            .assume_role_with_web_identity()
            .role_arn(&request.role_arn)
            .role_session_name(&request.session_name)
            .web_identity_token(request.web_identity_token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                let status = e.raw_response().map(|r| r.status().as_u16());
                warn!(status = ?status, code = ?e.code(), "STS rejected web identity exchange");
                let message = match (e.code(), e.message()) {
                    (Some(code), Some(message)) => format!("{code}: {message}"),
                    _ => DisplayErrorContext(&e).to_string(),
                };
                match status {
                    Some(status) => {
                        AuthError::CredentialExchange(format!("STS returned {status}: {message}"))
                    }
                    None => AuthError::CredentialExchange(message),
                }
            })?;

        let Some(credentials) = output.credentials() else {
            return Ok(IssuedCredentials::default());
        };

        Ok(IssuedCredentials {
            access_key_id: present(credentials.access_key_id()),
            secret_access_key: present(credentials.secret_access_key()).map(SecretString::from),
            session_token: present(credentials.session_token()).map(SecretString::from),
            expiration: to_utc(credentials.expiration()),
        })
    }
}

/// The SDK fills absent required members with empty strings.
fn present(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn to_utc(value: &AwsDateTime) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(value.secs(), value.subsec_nanos()).single()
}
