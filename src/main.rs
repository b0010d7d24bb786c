use election_dashboard::{AppState, Config, DataSource, router};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    match &config.source {
        DataSource::File(path) => info!("reading cities from {}", path.display()),
        DataSource::Remote { base_url, table, .. } => {
            info!("reading cities from table '{table}' at {base_url}")
        }
    }

    let state = AppState::from_config(&config);
    if let Err(err) = state.dataset().await {
        warn!("initial load failed, will retry on first request: {err}");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
