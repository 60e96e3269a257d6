//! Postgres access for moviedb.
//!
//! [`MovieStore`] wraps a lazily connecting `PgPool` whose password comes from
//! a [`PasswordSource`], normally the IAM [`CredentialAuthenticator`]. The
//! [`migrate`] and [`seed`] modules implement the one-shot maintenance tasks.
//!
//! [`CredentialAuthenticator`]: moviedb_auth::CredentialAuthenticator

pub mod config;
pub mod error;
pub mod migrate;
pub mod password;
pub mod seed;
pub mod store;

pub use config::DatabaseConfig;
pub use error::{StoreError, StoreResult};
pub use migrate::run_migration;
pub use password::{PasswordSource, StaticPassword};
pub use seed::{read_movie_titles, seed_movies, SeedOptions, SeedReport};
pub use store::{Movie, MovieRepository, MovieStore};
