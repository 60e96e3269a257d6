//! IAM database authentication for moviedb.
//!
//! Provides [`CredentialAuthenticator`], which turns a workload identity token
//! into a short-lived RDS auth token usable as a Postgres password:
//!
//! ```text
//! web identity token ──STS AssumeRoleWithWebIdentity──▶ temporary credentials
//!                    ──SigV4 presign (rds-db)─────────▶ database auth token
//! ```
//!
//! Tokens are cached per authenticator; concurrent callers on an empty cache
//! share a single exchange.

pub mod authenticator;
pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod signer;
pub mod sts;

pub use authenticator::CredentialAuthenticator;
pub use cache::{RefreshPolicy, TokenCache};
pub use config::{AuthConfig, SigningTarget};
pub use credentials::{
    DatabaseAuthToken, IssuedCredentials, TemporaryCloudCredentials, WebIdentityTokenSource,
};
pub use error::{AuthError, AuthResult};
pub use signer::{RdsTokenSigner, TokenSigner};
pub use sts::{AssumeRoleRequest, IdentityFederation, StsClient};
