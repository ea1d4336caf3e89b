//! HTTP endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Server status and progress of running sessions |
//! | `GET` | `/api/games` | Ids of recorded sessions |
//! | `GET` | `/api/game?id=` | One recorded session |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use werewolf_types::GameId;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /api/game`.
#[derive(Debug, serde::Deserialize)]
pub struct GameQuery {
    /// The session id.
    pub id: Option<String>,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report that the server is up and how far each running session is.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let progress: Vec<serde_json::Value> = state
        .sessions
        .running()
        .await
        .iter()
        .map(|s| {
            serde_json::json!({
                "id": s.id(),
                "day": s.day(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "status": "running",
        "progress": progress,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/games
// ---------------------------------------------------------------------------

/// List the ids of every recorded session.
pub async fn list_games(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "games": state.analysis.ids(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/game?id=
// ---------------------------------------------------------------------------

/// Return one recorded session.
///
/// A session still in progress is only served when
/// `api.publish_running_game` is set.
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GameQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let raw = params
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("id is required".to_owned()))?;

    let record = raw
        .parse::<GameId>()
        .ok()
        .and_then(|id| state.analysis.get(id))
        .ok_or_else(|| ApiError::NotFound(format!("game {raw}")))?;

    if !record.finished && !state.config.api.publish_running_game {
        return Err(ApiError::Forbidden("game is running".to_owned()));
    }

    Ok(Json(record))
}
