//! Gateway configuration.

use clap::Parser;

/// moviedb HTTP gateway command line arguments.
#[derive(Debug, Parser)]
#[command(name = "moviedb-gateway")]
#[command(about = "HTTP load-test endpoints for moviedb")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, env = "MOVIEDB_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: String,

    /// Title inserted by the write endpoint.
    #[arg(long, env = "MOVIEDB_WRITE_TITLE", default_value = "Yasoob")]
    pub write_title: String,

    /// Score inserted by the write endpoint.
    #[arg(long, env = "MOVIEDB_WRITE_SCORE", default_value_t = 1)]
    pub write_score: i32,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "MOVIEDB_POOL_MAX_CONNECTIONS", default_value_t = 10)]
    pub pool_max_connections: u32,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to listen on for HTTP requests.
    pub listen_addr: String,
    /// Title inserted by the write endpoint.
    pub write_title: String,
    /// Score inserted by the write endpoint.
    pub write_score: i32,
    /// Maximum number of pooled database connections.
    pub pool_max_connections: u32,
}

impl From<&Args> for GatewayConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            write_title: args.write_title.clone(),
            write_score: args.write_score,
            pool_max_connections: args.pool_max_connections,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            write_title: "Yasoob".to_string(),
            write_score: 1,
            pool_max_connections: 10,
        }
    }
}
