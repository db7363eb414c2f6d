//! HTTP server lifecycle.
//!
//! [`start_server`] binds the configured address and serves the router
//! until the process is terminated.

use std::net::SocketAddr;
use std::sync::Arc;

use gambit_core::{AnalysisStore, GameRepository, TaskQueue};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::HttpConfig;
use crate::router::build_router;
use crate::state::AppState;

/// Start the API server.
///
/// # Errors
///
/// Returns [`ServerError`] if the address is invalid, the listener cannot
/// bind, or the server hits a fatal I/O error.
pub async fn start_server<S, Q>(
    config: &HttpConfig,
    state: Arc<AppState<S, Q>>,
) -> Result<(), ServerError>
where
    S: AnalysisStore + GameRepository + 'static,
    Q: TaskQueue + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    Ok(())
}

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
