mod app;
mod config;
mod diagnostics;
mod error;
mod logging;
mod views;

use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(logging::env_filter()?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!(
        "Starting sample_web with settings module {} (debug: {})",
        config.settings_module,
        config.debug
    );

    // Built once, shared by every connection for the life of the process
    let app = app::application(&config);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
