//! meterline demo server.
//!
//! - `/`        : simulated latency
//! - `/error`   : simulated random failure
//! - `/metrics` : scrape endpoint
//! - `/healthz` : liveness

use tracing_subscriber::{fmt, EnvFilter};

use meterline_core::error::{MeterlineError, Result};
use meterline_server::{app_state, config, router};

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cfg = config::load_from_env(std::env::var(config::ENV_VAR))?;
    let listen = cfg.server.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state);

    tracing::info!(%listen, "meterline-server starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MeterlineError::Internal(format!("bind {listen} failed: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MeterlineError::Internal(format!("server failed: {e}")))?;

    tracing::info!("meterline-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
