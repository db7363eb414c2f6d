//! Game intake.
//!
//! A game arrives as a list of moves in long notation. It is checked for
//! legality by replaying it from the initial position (which also yields
//! standard notation for every move), persisted with skeleton positions,
//! and handed to the workers as a position-expansion task.

use std::collections::BTreeMap;

use gambit_db::NewGame;
use gambit_types::GameId;
use serde::Deserialize;

use crate::notation::{self, NotationError};
use crate::publisher::Publisher;
use crate::queue::{QueueError, TaskQueue};
use crate::store::{GameRepository, StoreError};

/// Result string used when the import does not carry one.
const UNKNOWN_RESULT: &str = "*";

/// A game submitted for analysis.
#[derive(Debug, Clone, Deserialize)]
pub struct GameImport {
    /// Display name.
    pub name: String,
    /// PGN result string.
    #[serde(default = "unknown_result")]
    pub result: String,
    /// PGN headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Moves from the initial position in long notation.
    pub moves: Vec<String>,
}

fn unknown_result() -> String {
    UNKNOWN_RESULT.to_owned()
}

/// Errors raised during game intake.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The game has no name.
    #[error("game name must not be empty")]
    EmptyName,

    /// A move is malformed or illegal.
    #[error(transparent)]
    Notation(#[from] NotationError),

    /// Persisting the game failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The game was stored but its expansion task could not be published.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Validate, persist and enqueue a game. Returns its identifier.
///
/// # Errors
///
/// Returns [`ImportError`] if the game is invalid, cannot be stored, or
/// its position-expansion task cannot be published.
pub async fn import_game<G, Q>(
    games: &G,
    publisher: &Publisher<Q>,
    import: GameImport,
) -> Result<GameId, ImportError>
where
    G: GameRepository,
    Q: TaskQueue,
{
    let name = import.name.trim();
    if name.is_empty() {
        return Err(ImportError::EmptyName);
    }

    let sans = notation::lan_to_san_from_start(&import.moves)?;
    let game = NewGame {
        name: name.to_owned(),
        result: import.result,
        headers: import.headers,
        sans,
        lans: import.moves,
    };

    let game_id = games.create_game(&game).await?;
    tracing::info!(game_id = %game_id, moves = game.lans.len(), "Game imported");

    publisher
        .publish_position_expansion(game_id, game.lans)
        .await?;
    Ok(game_id)
}
