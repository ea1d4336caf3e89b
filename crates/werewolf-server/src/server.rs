//! HTTP server lifecycle.
//!
//! [`start_server`] binds the configured address and serves the router
//! until the process is terminated.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind failed on {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The server encountered a fatal error while serving.
    #[error("serve error: {source}")]
    Serve {
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Start the game server.
///
/// Binds to `server.host:server.port` from the state's configuration,
/// builds the router, and serves requests until the process is
/// terminated.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(state: Arc<AppState>) -> Result<(), ServerError> {
    let addr = state.config.server.bind_addr();
    let listener = TcpListener::bind(addr.as_str())
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!(
        %addr,
        agent_count = state.config.game.agent_count,
        self_match = state.config.server.self_match,
        api = state.config.api.enable,
        "werewolf server listening"
    );

    axum::serve(listener, build_router(state))
        .await
        .map_err(|source| ServerError::Serve { source })
}
