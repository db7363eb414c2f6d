//! Axum router construction for the API tier.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin front-end access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use gambit_core::{AnalysisStore, GameRepository, TaskQueue};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `POST /api/games` -- import a game
/// - `GET /api/games/{id}/positions` -- positions and analysis status
/// - `GET|PUT /api/games/{id}/positions/{ply}/note` -- position note
/// - `POST /api/games/{id}/lines/{ply}` -- request line exploration
/// - `GET /api/games/{id}/lines/{ply}` -- stored lines
/// - `GET /ws/lines/{id}/{ply}` -- `WebSocket` live line stream
pub fn build_router<S, Q>(state: Arc<AppState<S, Q>>) -> Router
where
    S: AnalysisStore + GameRepository + 'static,
    Q: TaskQueue + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // REST API
        .route("/api/games", post(handlers::create_game::<S, Q>))
        .route(
            "/api/games/{id}/positions",
            get(handlers::get_positions::<S, Q>),
        )
        .route(
            "/api/games/{id}/positions/{ply}/note",
            get(handlers::get_note::<S, Q>).put(handlers::put_note::<S, Q>),
        )
        .route(
            "/api/games/{id}/lines/{ply}",
            get(handlers::get_lines::<S, Q>).post(handlers::request_lines::<S, Q>),
        )
        // WebSocket
        .route("/ws/lines/{id}/{ply}", get(ws::ws_lines::<S, Q>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
