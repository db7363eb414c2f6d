//! Task and response envelopes exchanged over the work queues.
//!
//! Every envelope has the shape `{kind, state, payload}`. `state` carries the
//! correlation identifiers and is echoed unchanged from a task into its
//! response, so the consumer routes results without re-querying.
//!
//! | kind | direction | state | payload |
//! |------|-----------|-------|---------|
//! | `position-expansion` | task | `gameId` | `moves: string[]` |
//! | `position-expansion` | response | `gameId` | `fens: string[]` |
//! | `scoring` | task | `gameId` | `fens: string[]` |
//! | `scoring` | response | `gameId` | `scores: {unit, value}[]` |
//! | `line-exploration` | task | `gameId, ply` | `fen: string` |
//! | `line-exploration` | response | `gameId, ply` | `line: {rank, score, positions}` |
//!
//! Older producers tagged responses `fens`, `scores` and `lines`; those
//! names are still accepted when decoding.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::TaskKind;
use crate::ids::GameId;
use crate::structs::{ExploredLine, Score};

/// Correlation state for game-wide tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct GameState {
    /// The game being analysed.
    pub game_id: GameId,
}

/// Correlation state for per-ply tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PlyState {
    /// The game being analysed.
    pub game_id: GameId,
    /// The ply being explored.
    #[serde(alias = "gameTurn")]
    pub ply: u32,
}

/// Long-notation moves from the initial position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MovesPayload {
    /// Moves in long algebraic notation.
    pub moves: Vec<String>,
}

/// One FEN per ply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FensPayload {
    /// Board states, index 0 = starting position.
    pub fens: Vec<String>,
}

/// A single board state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FenPayload {
    /// Board state to explore.
    pub fen: String,
}

/// One raw score per FEN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScoresPayload {
    /// Raw engine scores aligned with the scored FEN list.
    pub scores: Vec<Score>,
}

/// One explored line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LinePayload {
    /// The completed line.
    pub line: ExploredLine,
}

/// A unit of work pushed onto the `tasks` queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum Task {
    /// Replay a move list and capture every intermediate FEN.
    #[serde(alias = "fens")]
    PositionExpansion {
        /// Correlation state.
        state: GameState,
        /// Moves to replay.
        payload: MovesPayload,
    },
    /// Score every FEN of a game.
    #[serde(alias = "scores")]
    Scoring {
        /// Correlation state.
        state: GameState,
        /// FENs to score.
        payload: FensPayload,
    },
    /// Explore the three best lines from one position.
    #[serde(alias = "lines")]
    LineExploration {
        /// Correlation state.
        state: PlyState,
        /// Position to explore.
        payload: FenPayload,
    },
}

impl Task {
    /// The stage this task belongs to.
    pub const fn kind(&self) -> TaskKind {
        match self {
            Self::PositionExpansion { .. } => TaskKind::PositionExpansion,
            Self::Scoring { .. } => TaskKind::Scoring,
            Self::LineExploration { .. } => TaskKind::LineExploration,
        }
    }

    /// The game this task belongs to.
    pub const fn game_id(&self) -> GameId {
        match self {
            Self::PositionExpansion { state, .. } | Self::Scoring { state, .. } => state.game_id,
            Self::LineExploration { state, .. } => state.game_id,
        }
    }
}

/// A computed result pushed onto the `responses` queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum AnalysisResponse {
    /// FENs produced by position expansion.
    #[serde(alias = "fens")]
    PositionExpansion {
        /// Correlation state echoed from the task.
        state: GameState,
        /// One FEN per ply.
        payload: FensPayload,
    },
    /// Scores produced by scoring.
    #[serde(alias = "scores")]
    Scoring {
        /// Correlation state echoed from the task.
        state: GameState,
        /// One raw score per FEN.
        payload: ScoresPayload,
    },
    /// One line produced by line exploration.
    #[serde(alias = "lines")]
    LineExploration {
        /// Correlation state echoed from the task.
        state: PlyState,
        /// The completed line.
        payload: LinePayload,
    },
}

impl AnalysisResponse {
    /// The stage this response belongs to.
    pub const fn kind(&self) -> TaskKind {
        match self {
            Self::PositionExpansion { .. } => TaskKind::PositionExpansion,
            Self::Scoring { .. } => TaskKind::Scoring,
            Self::LineExploration { .. } => TaskKind::LineExploration,
        }
    }

    /// The game this response belongs to.
    pub const fn game_id(&self) -> GameId {
        match self {
            Self::PositionExpansion { state, .. } | Self::Scoring { state, .. } => state.game_id,
            Self::LineExploration { state, .. } => state.game_id,
        }
    }
}
