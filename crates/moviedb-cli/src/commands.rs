//! Subcommand implementations.

use std::path::PathBuf;

use clap::Subcommand;
use moviedb_auth::{AuthConfig, CredentialAuthenticator};
use moviedb_store::migrate::DEFAULT_MIGRATION_FILE;
use moviedb_store::seed::{read_movie_titles_from_path, DEFAULT_BATCH_SIZE, DEFAULT_SEED_FILE};
use moviedb_store::{run_migration, seed_movies, DatabaseConfig, MovieStore, SeedOptions};
use tracing::info;

use crate::Args;

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Apply a SQL migration script
    Migrate {
        /// Migration file to execute
        #[arg(short, long, default_value = DEFAULT_MIGRATION_FILE)]
        file: PathBuf,
    },
    /// Load movie titles from a CSV file
    Seed {
        /// CSV file with a "title" column
        #[arg(short, long, default_value = DEFAULT_SEED_FILE)]
        csv: PathBuf,

        /// Rows per insert statement
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Obtain a database auth token and report its validity
    Token,
}

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Run the selected subcommand.
pub async fn run(args: &Args) -> CommandResult {
    match &args.command {
        Command::Migrate { file } => {
            let store = connect(args).await?;
            let result = run_migration(&store, file).await;
            store.close().await;
            result?;
        }
        Command::Seed { csv, batch_size } => {
            let titles = read_movie_titles_from_path(csv)?;
            let options = SeedOptions::default().with_batch_size(*batch_size);

            let store = connect(args).await?;
            let result = seed_movies(&store, &titles, &options).await;
            store.close().await;
            let report = result?;
            println!(
                "Successfully seeded {} movies ({} new rows in {} batches)",
                report.submitted, report.inserted, report.batches
            );
        }
        Command::Token => {
            let auth = CredentialAuthenticator::from_config(AuthConfig::from_env()?).await;
            let token = auth.get_token().await?;
            info!(user = %auth.target().username, "Obtained database auth token");
            println!(
                "Token for {}@{}:{} valid until {}",
                auth.target().username,
                auth.target().hostname,
                auth.target().port,
                token.expires_at()
            );
        }
    }
    Ok(())
}

async fn connect(args: &Args) -> Result<MovieStore, Box<dyn std::error::Error>> {
    let config = DatabaseConfig::from_env()?.with_max_connections(args.pool_max_connections);
    Ok(MovieStore::with_env_password(&config).await?)
}
