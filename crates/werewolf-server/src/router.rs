//! Axum router construction.
//!
//! Assembles the agent endpoint, the health check and, when enabled, the
//! analysis API into a single [`Router`] with CORS and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /ws` -- agent `WebSocket` endpoint
/// - `GET /health` -- server status
/// - `GET /api/games` -- recorded session ids (when `api.enable`)
/// - `GET /api/game?id=` -- one recorded session (when `api.enable`)
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/ws", get(ws::ws_agent))
        .route("/health", get(handlers::health));

    if state.config.api.enable {
        router = router
            .route("/api/games", get(handlers::list_games))
            .route("/api/game", get(handlers::get_game));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
