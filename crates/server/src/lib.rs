//! Control-plane HTTP server for the Siren alert router.

pub mod api;
pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;

use std::net::SocketAddr;

use tracing::info;

use crate::config::SirenConfig;
use crate::error::ApiError;
use crate::state::AppState;

/// Build the application router from configuration.
pub fn app(config: &SirenConfig) -> Result<(axum::Router, AppState), ApiError> {
    let state = AppState::in_memory(config)?;
    let router = api::router(
        state.clone(),
        config.server.webhook_max_payload_size,
        config.server.admin_max_payload_size,
    );
    Ok((router, state))
}

/// Bind and serve until ctrl-c, then stop the background sweepers.
pub async fn serve(config: SirenConfig) -> Result<(), std::io::Error> {
    let (router, state) = app(&config)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "siren server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    state.shutdown();
    Ok(())
}
