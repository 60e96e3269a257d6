//! moviedb maintenance commands.
//!
//! ```text
//! moviedb migrate [--file PATH]
//! moviedb seed [--csv PATH] [--batch-size N]
//! moviedb token
//! ```

mod commands;

use clap::Parser;
use commands::Command;

/// moviedb maintenance commands
#[derive(Parser, Debug)]
#[command(name = "moviedb")]
#[command(version, about = "moviedb maintenance commands")]
pub struct Args {
    /// Environment file loaded before reading configuration
    #[arg(long, default_value = ".env.local")]
    pub env_file: String,

    /// Maximum number of pooled database connections
    #[arg(long, default_value_t = 2)]
    pub pool_max_connections: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    dotenvy::from_filename(&args.env_file).ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = commands::run(&args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
