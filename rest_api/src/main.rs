// rest_api/src/main.rs

// Entry point for the prescription REST API server. Loads configuration,
// opens the database, creates the tables once, and serves until ctrl-c.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::oneshot;

use rest_api::config::load_rest_api_config;
use rest_api::start_server;
use storage::PrescriptionStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config_path = std::env::var("REST_API_CONFIG").ok().map(PathBuf::from);
    let config = load_rest_api_config(config_path)
        .context("Failed to load REST API configuration")?;

    let store = PrescriptionStore::connect(&config.database_path)
        .await
        .context("Failed to open the prescriptions database")?;
    store
        .ensure_schema()
        .await
        .context("Failed to create the prescriptions tables")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    start_server(config, Arc::new(store), shutdown_rx).await
}
