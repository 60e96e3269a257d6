//! RDS IAM auth token signing.
//!
//! A token is a SigV4 presigned `connect` request for the `rds-db` service,
//! minus the scheme:
//!
//! ```text
//! <host>:<port>/?Action=connect&DBUser=<user>&X-Amz-Algorithm=AWS4-HMAC-SHA256
//!     &X-Amz-Credential=...&X-Amz-Date=...&X-Amz-Expires=900
//!     &X-Amz-SignedHeaders=host&X-Amz-Security-Token=...&X-Amz-Signature=<hex>
//! ```
//!
//! Signing is delegated to `aws-sigv4`; the signature covers the sorted query,
//! so parameter order in the token itself is not significant.

use std::time::{Duration as StdDuration, SystemTime};

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    sign, SignableBody, SignableRequest, SignatureLocation, SigningParams, SigningSettings,
};
use aws_sigv4::sign::v4;
use chrono::{DateTime, Duration, Utc};
use secrecy::ExposeSecret;
use url::Url;

use crate::config::SigningTarget;
use crate::credentials::{DatabaseAuthToken, TemporaryCloudCredentials};
use crate::error::{AuthError, AuthResult};

const SERVICE: &str = "rds-db";
const PROVIDER_NAME: &str = "moviedb-sts";

/// Validity of an RDS auth token in seconds.
pub const TOKEN_TTL_SECS: i64 = 900;

/// Produces database auth tokens from temporary credentials.
#[async_trait]
pub trait TokenSigner: Send + Sync {
    async fn sign(
        &self,
        credentials: &TemporaryCloudCredentials,
        target: &SigningTarget,
        now: DateTime<Utc>,
    ) -> AuthResult<DatabaseAuthToken>;
}

/// SigV4 presigner for RDS IAM database authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct RdsTokenSigner;

impl RdsTokenSigner {
    pub fn new() -> Self {
        Self
    }

    /// Build the token synchronously; signing needs no I/O.
    pub fn presign(
        &self,
        credentials: &TemporaryCloudCredentials,
        target: &SigningTarget,
        now: DateTime<Utc>,
    ) -> AuthResult<DatabaseAuthToken> {
        validate(target)?;

        let identity = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.expose_secret().to_string(),
            Some(credentials.session_token.expose_secret().to_string()),
            None,
            PROVIDER_NAME,
        )
        .into();

        let mut settings = SigningSettings::default();
        settings.expires_in = Some(StdDuration::from_secs(TOKEN_TTL_SECS as u64));
        settings.signature_location = SignatureLocation::QueryParams;

        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(&target.region)
            .name(SERVICE)
            .time(SystemTime::from(now))
            .settings(settings)
            .build()
            .map_err(signing_error)?
            .into();

        let mut url = Url::parse(&format!("https://{}:{}/", target.hostname, target.port))
            .map_err(signing_error)?;
        url.query_pairs_mut()
            .append_pair("Action", "connect")
            .append_pair("DBUser", &target.username);

        let request = SignableRequest::new(
            "GET",
            url.as_str(),
            std::iter::empty(),
            SignableBody::Bytes(&[]),
        )
        .map_err(signing_error)?;
        let (instructions, _signature) = sign(request, &params)
            .map_err(signing_error)?
            .into_parts();

        {
            let mut query = url.query_pairs_mut();
            for (name, value) in instructions.params() {
                query.append_pair(name, value);
            }
        }

        let value = url
            .as_str()
            .strip_prefix("https://")
            .unwrap_or(url.as_str())
            .to_string();

        Ok(DatabaseAuthToken::new(
            value,
            now,
            Duration::seconds(TOKEN_TTL_SECS),
        ))
    }
}

#[async_trait]
impl TokenSigner for RdsTokenSigner {
    async fn sign(
        &self,
        credentials: &TemporaryCloudCredentials,
        target: &SigningTarget,
        now: DateTime<Utc>,
    ) -> AuthResult<DatabaseAuthToken> {
        self.presign(credentials, target, now)
    }
}

fn validate(target: &SigningTarget) -> AuthResult<()> {
    if target.hostname.trim().is_empty() {
        return Err(AuthError::Signing("hostname is empty".to_string()));
    }
    if target.hostname.contains(['/', ' ', '?', '#']) {
        return Err(AuthError::Signing(format!(
            "hostname is malformed: {}",
            target.hostname
        )));
    }
    if target.username.is_empty() {
        return Err(AuthError::Signing("username is empty".to_string()));
    }
    if target.region.is_empty()
        || !target
            .region
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(AuthError::Signing(format!(
            "region is malformed: {:?}",
            target.region
        )));
    }
    Ok(())
}

fn signing_error(err: impl std::fmt::Display) -> AuthError {
    AuthError::Signing(err.to_string())
}
