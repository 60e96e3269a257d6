//! Movie store backed by a Postgres pool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::StoreResult;
use crate::password::{self, PasswordSource};

/// A row of the `movies` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub score: i32,
    pub last_vote_time: DateTime<Utc>,
}

/// Read and write access to movies.
#[async_trait]
pub trait MovieRepository: Send + Sync {
    /// All movies, ordered by id.
    async fn query_movies(&self) -> StoreResult<Vec<Movie>>;

    /// Insert one movie with the current time as its last vote.
    async fn write_movie(&self, title: &str, score: i32) -> StoreResult<Movie>;

    /// Check that the database is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

/// Postgres-backed movie store.
///
/// The pool connects lazily. Before each operation the password source is
/// consulted and, if the password changed, the pool's connect options are
/// replaced so the next physical connection authenticates with it.
pub struct MovieStore {
    pool: PgPool,
    options: PgConnectOptions,
    password: Arc<dyn PasswordSource>,
    current_password: Mutex<Option<String>>,
}

impl MovieStore {
    /// Create a store with a lazily connecting pool.
    pub fn connect_lazy(config: &DatabaseConfig, password: Arc<dyn PasswordSource>) -> Self {
        let options = config.connect_options();
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_lazy_with(options.clone());

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_connections,
            "Configured database pool"
        );

        Self {
            pool,
            options,
            password,
            current_password: Mutex::new(None),
        }
    }

    /// Create a store from the environment.
    pub async fn from_env() -> StoreResult<Self> {
        Self::with_env_password(&DatabaseConfig::from_env()?).await
    }

    /// Create a store for `config` with the password source chosen by
    /// [`password::from_env`].
    pub async fn with_env_password(config: &DatabaseConfig) -> StoreResult<Self> {
        Ok(Self::connect_lazy(config, password::from_env().await?))
    }

    /// The pool, with the current password installed.
    pub async fn pool(&self) -> StoreResult<&PgPool> {
        let password = self.password.password().await?;
        let mut current = self.current_password.lock();
        if current.as_deref() != Some(password.as_str()) {
            self.pool
                .set_connect_options(self.options.clone().password(&password));
            *current = Some(password);
            debug!("Installed new database password on pool");
        }
        Ok(&self.pool)
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MovieRepository for MovieStore {
    async fn query_movies(&self) -> StoreResult<Vec<Movie>> {
        let pool = self.pool().await?;
        let movies = sqlx::query_as::<_, Movie>(
            "SELECT id, title, score, last_vote_time FROM movies ORDER BY id",
        )
        .fetch_all(pool)
        .await?;
        debug!(count = movies.len(), "Queried movies");
        Ok(movies)
    }

    async fn write_movie(&self, title: &str, score: i32) -> StoreResult<Movie> {
        let pool = self.pool().await?;
        let movie = sqlx::query_as::<_, Movie>(
            "INSERT INTO movies (title, score, last_vote_time) VALUES ($1, $2, now()) \
             RETURNING id, title, score, last_vote_time",
        )
        .bind(title)
        .bind(score)
        .fetch_one(pool)
        .await?;
        debug!(id = movie.id, "Wrote movie");
        Ok(movie)
    }

    async fn ping(&self) -> StoreResult<()> {
        let pool = self.pool().await?;
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::StaticPassword;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RotatingPassword(AtomicUsize);

    #[async_trait]
    impl PasswordSource for RotatingPassword {
        async fn password(&self) -> StoreResult<String> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-{}", n / 2))
        }
    }

    #[tokio::test]
    async fn test_pool_tracks_password_changes() {
        let config = DatabaseConfig::new("localhost", "app");
        let store = MovieStore::connect_lazy(&config, Arc::new(RotatingPassword(AtomicUsize::new(0))));

        store.pool().await.unwrap();
        assert_eq!(store.current_password.lock().as_deref(), Some("token-0"));
        store.pool().await.unwrap();
        assert_eq!(store.current_password.lock().as_deref(), Some("token-0"));
        store.pool().await.unwrap();
        assert_eq!(store.current_password.lock().as_deref(), Some("token-1"));
    }

    #[tokio::test]
    async fn test_static_password_installed_once() {
        let config = DatabaseConfig::new("localhost", "app");
        let store = MovieStore::connect_lazy(&config, Arc::new(StaticPassword::new("pw")));

        store.pool().await.unwrap();
        store.pool().await.unwrap();
        assert_eq!(store.current_password.lock().as_deref(), Some("pw"));
    }
}
