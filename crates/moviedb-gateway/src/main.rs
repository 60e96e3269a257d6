//! moviedb HTTP gateway binary.

use std::sync::Arc;

use clap::Parser;
use moviedb_gateway::{create_router, AppState, Args, GatewayConfig};
use moviedb_store::{DatabaseConfig, MovieStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::from_filename(".env.local").ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = GatewayConfig::from(&args);

    info!(listen = %config.listen_addr, "Starting moviedb gateway");

    let db_config =
        DatabaseConfig::from_env()?.with_max_connections(config.pool_max_connections);
    let store = MovieStore::with_env_password(&db_config).await?;
    let state = AppState::new(Arc::new(store), config.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Gateway listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
