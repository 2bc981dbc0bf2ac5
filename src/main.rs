use anyhow::Result;
use std::sync::Arc;

use crosstab_services::{app, config, logging, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    let addr = config.socket_addr();
    tracing::info!(
        "Upload limit {}MB, significance threshold {}",
        config.max_file_size / (1024 * 1024),
        config.significance_threshold
    );

    // Build our application state
    let state = Arc::new(AppState::new(config));

    // Build our application with its routes
    let app = app(state);

    // Run it
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
