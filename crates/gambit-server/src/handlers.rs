//! REST endpoint handlers for the API tier.
//!
//! Handlers are generic over the store and queue backends so the same
//! router serves production (`PostgreSQL` + Valkey) and tests (in-memory).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use gambit_core::{
    AnalysisStore, GameImport, GameRepository, LineRequest, TaskQueue, import_game,
};
use gambit_types::{GameId, GameStatus};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for `PUT /api/games/{id}/positions/{ply}/note`.
#[derive(Debug, Deserialize)]
pub struct NoteBody {
    /// New note text; replaces the old one.
    pub note: String,
}

// ---------------------------------------------------------------------------
// POST /api/games
// ---------------------------------------------------------------------------

/// Import a game and queue it for position expansion.
///
/// Responds `201 Created` with the new game identifier.
pub async fn create_game<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    Json(import): Json<GameImport>,
) -> Result<impl IntoResponse, ApiError>
where
    S: GameRepository,
    Q: TaskQueue,
{
    let game_id = import_game(&state.store, &state.publisher, import).await?;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "gameId": game_id }))))
}

// ---------------------------------------------------------------------------
// GET /api/games/{id}/positions
// ---------------------------------------------------------------------------

/// All positions of a game, with the game's analysis status.
pub async fn get_positions<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: GameRepository,
{
    let game_id = parse_game_id(&id)?;
    if !state.store.game_exists(game_id).await? {
        return Err(ApiError::NotFound(format!("game {game_id}")));
    }

    let positions = state.store.positions(game_id).await?;
    let status = GameStatus::from_positions(&positions);
    Ok(Json(serde_json::json!({
        "gameId": game_id,
        "status": status,
        "positions": positions,
    })))
}

// ---------------------------------------------------------------------------
// GET|PUT /api/games/{id}/positions/{ply}/note
// ---------------------------------------------------------------------------

/// The note attached to one position.
pub async fn get_note<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path((id, ply)): Path<(String, u32)>,
) -> Result<impl IntoResponse, ApiError>
where
    S: GameRepository,
{
    let game_id = parse_game_id(&id)?;
    let note = state
        .store
        .position_note(game_id, ply)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("position {game_id}/{ply}")))?;
    Ok(Json(serde_json::json!({ "note": note })))
}

/// Replace the note attached to one position.
pub async fn put_note<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path((id, ply)): Path<(String, u32)>,
    Json(body): Json<NoteBody>,
) -> Result<impl IntoResponse, ApiError>
where
    S: GameRepository,
{
    let game_id = parse_game_id(&id)?;
    state
        .store
        .update_position_note(game_id, ply, &body.note)
        .await?;
    Ok(Json(serde_json::json!({ "note": body.note })))
}

// ---------------------------------------------------------------------------
// POST|GET /api/games/{id}/lines/{ply}
// ---------------------------------------------------------------------------

/// Request line exploration for one ply.
///
/// Responds `202 Accepted` when this request published the task and
/// `200 OK` when lines were already requested.
pub async fn request_lines<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path((id, ply)): Path<(String, u32)>,
) -> Result<impl IntoResponse, ApiError>
where
    S: AnalysisStore,
    Q: TaskQueue,
{
    let game_id = parse_game_id(&id)?;
    let outcome = state
        .publisher
        .request_line_exploration(&state.store, game_id, ply)
        .await?;

    let (status, label) = match outcome {
        LineRequest::Published => (StatusCode::ACCEPTED, "published"),
        LineRequest::AlreadyRequested => (StatusCode::OK, "already-requested"),
    };
    Ok((status, Json(serde_json::json!({ "status": label }))))
}

/// Lines stored so far for one ply, ordered by rank.
pub async fn get_lines<S, Q>(
    State(state): State<Arc<AppState<S, Q>>>,
    Path((id, ply)): Path<(String, u32)>,
) -> Result<impl IntoResponse, ApiError>
where
    S: GameRepository,
{
    let game_id = parse_game_id(&id)?;
    let lines = state.store.lines(game_id, ply).await?;
    Ok(Json(lines))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a game identifier from a path segment.
pub(crate) fn parse_game_id(s: &str) -> Result<GameId, ApiError> {
    s.parse::<GameId>()
        .map_err(|e| ApiError::InvalidGameId(format!("{s}: {e}")))
}
