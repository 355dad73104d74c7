//! Larder server entry point.

mod config;

use config::{ConfigError, ServerConfig};
use larder_db::{DbError, DbManager};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("signal handler failed: {0}")]
    Signal(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("larder=info".parse().unwrap()),
        )
        .json()
        .init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "larder server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ServerError> {
    // A .env file is optional; real environments set variables directly.
    let _ = dotenvy::dotenv();
    let config = ServerConfig::from_env()?;

    tracing::info!("starting larder server...");

    let manager = DbManager::connect(&config.db).await?;
    larder_db::run_migrations(&manager.client()).await?;

    // TODO: mount the HTTP API over the service layer
    tracing::info!(
        token_lifetime_secs = config.auth.access_token_lifetime_secs,
        "larder server ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("larder server stopped.");
    Ok(())
}
