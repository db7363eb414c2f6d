//! Enumeration types shared by the worker, the processor and the API tier.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::structs::Position;

/// Unit of an engine evaluation.
///
/// Serialized with the UCI tokens the engine itself prints (`cp`, `mate`),
/// which is also what the persistence layer stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum ScoreUnit {
    /// Material-equivalent advantage in hundredths of a pawn.
    #[serde(rename = "cp")]
    Centipawn,
    /// Forced mate in N moves (negative when the side to move is mated).
    #[serde(rename = "mate")]
    Mate,
}

impl ScoreUnit {
    /// The UCI token for this unit.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Centipawn => "cp",
            Self::Mate => "mate",
        }
    }

    /// Parse a UCI score unit token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "cp" => Some(Self::Centipawn),
            "mate" => Some(Self::Mate),
            _ => None,
        }
    }
}

impl core::fmt::Display for ScoreUnit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three pipeline stages.
///
/// Used as a logging label; the envelope enums carry the actual tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum TaskKind {
    /// Move list in, one FEN per ply out.
    PositionExpansion,
    /// FEN list in, one score per FEN out.
    Scoring,
    /// Single FEN in, three principal variations out.
    LineExploration,
}

impl TaskKind {
    /// Wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PositionExpansion => "position-expansion",
            Self::Scoring => "scoring",
            Self::LineExploration => "line-exploration",
        }
    }
}

impl core::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis status of a stored game, as seen by the API tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum GameStatus {
    /// Positions or scores have not arrived yet.
    Generating,
    /// Every position carries a score.
    Ready,
}

impl GameStatus {
    /// Derive the status from a game's stored positions.
    ///
    /// A game is ready once the starting position exists and every
    /// position has been scored.
    pub fn from_positions(positions: &[Position]) -> Self {
        let expanded = positions.first().is_some_and(|p| p.ply == 0);
        if expanded && positions.iter().all(|p| p.score().is_some()) {
            Self::Ready
        } else {
            Self::Generating
        }
    }
}
