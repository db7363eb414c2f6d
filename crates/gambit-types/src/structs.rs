//! Score, position and line structs.
//!
//! Two families live here. The wire family ([`Score`], [`LinePosition`],
//! [`ExploredLine`]) is what the worker produces and the queue carries. The
//! stored family ([`Position`], [`StoredLine`], [`StoredLinePosition`]) is
//! what the persistence layer returns and the API tier serves.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::ScoreUnit;
use crate::ids::GameId;

/// FEN of the standard initial position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Number of principal variations explored per ply.
pub const LINES_PER_PLY: u8 = 3;

// ---------------------------------------------------------------------------
// Wire family
// ---------------------------------------------------------------------------

/// One engine evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Score {
    /// Centipawns or mate distance.
    pub unit: ScoreUnit,
    /// Signed magnitude.
    #[serde(alias = "score")]
    pub value: i32,
}

impl Score {
    /// A centipawn score.
    pub const fn centipawns(value: i32) -> Self {
        Self {
            unit: ScoreUnit::Centipawn,
            value,
        }
    }

    /// A mate-distance score.
    pub const fn mate(value: i32) -> Self {
        Self {
            unit: ScoreUnit::Mate,
            value,
        }
    }

    /// Apply the alternating-sign convention for the given ply.
    ///
    /// The engine reports every score from the side to move. Stored
    /// scores are multiplied by `(-1)^ply`, so even plies keep their sign
    /// and odd plies flip it.
    #[must_use]
    pub const fn resigned(self, ply: u32) -> Self {
        if ply % 2 == 0 {
            self
        } else {
            Self {
                unit: self.unit,
                value: self.value.saturating_neg(),
            }
        }
    }
}

/// One half-move of an explored line as produced by the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LinePosition {
    /// The move that led here, in long algebraic notation.
    pub lan: String,
    /// Board state after the move, exactly as the engine printed it.
    pub fen: String,
    /// Raw engine score of this position (side-to-move frame).
    pub score: Score,
}

/// A fully explored principal variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ExploredLine {
    /// 1-indexed rank of the variation (1 = best).
    #[serde(alias = "line")]
    pub rank: u8,
    /// Raw score of the variation from the explored position.
    pub score: Score,
    /// Positions reached along the variation, in move order.
    pub positions: Vec<LinePosition>,
}

// ---------------------------------------------------------------------------
// Stored family
// ---------------------------------------------------------------------------

/// One ply of a stored game.
///
/// Created as a skeleton (SAN/LAN only) at game intake, filled with a FEN
/// by position expansion, then with an evaluation by scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Zero-based ply index (0 = starting position).
    pub ply: u32,
    /// Move that led here in standard notation (`None` at ply 0).
    pub san: Option<String>,
    /// Move that led here in long notation (`None` at ply 0).
    pub lan: Option<String>,
    /// Board state, once position expansion has run.
    pub fen: Option<String>,
    /// Evaluation unit, once scoring has run.
    pub score_unit: Option<ScoreUnit>,
    /// Re-signed evaluation value, once scoring has run.
    pub score_value: Option<i32>,
    /// Freeform annotation.
    pub note: String,
}

impl Position {
    /// The evaluation as a [`Score`], if both halves are present.
    pub fn score(&self) -> Option<Score> {
        match (self.score_unit, self.score_value) {
            (Some(unit), Some(value)) => Some(Score { unit, value }),
            _ => None,
        }
    }
}

/// One ply of a stored line. Index 0 is the explored game position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StoredLinePosition {
    /// Zero-based index along the line.
    pub line_ply: u32,
    /// Move that led here in standard notation (`None` at index 0).
    pub san: Option<String>,
    /// Move that led here in long notation (`None` at index 0).
    pub lan: Option<String>,
    /// Board state.
    pub fen: String,
    /// Evaluation unit.
    pub score_unit: Option<ScoreUnit>,
    /// Re-signed evaluation value.
    pub score_value: Option<i32>,
}

/// A persisted line, also the payload of live line events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StoredLine {
    /// Owning game.
    pub game_id: GameId,
    /// Game ply the line branches from.
    pub ply: u32,
    /// 1-indexed rank (1 = best).
    pub rank: u8,
    /// Evaluation unit of the line as a whole.
    pub score_unit: Option<ScoreUnit>,
    /// Re-signed evaluation of the line as a whole.
    pub score_value: Option<i32>,
    /// Ordered positions, starting at the game position.
    pub positions: Vec<StoredLinePosition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resign_flips_odd_plies_only() {
        let raw = Score::centipawns(35);
        assert_eq!(raw.resigned(0), Score::centipawns(35));
        assert_eq!(raw.resigned(1), Score::centipawns(-35));
        assert_eq!(raw.resigned(2), Score::centipawns(35));
        assert_eq!(Score::mate(-2).resigned(3), Score::mate(2));
    }

    #[test]
    fn resign_saturates_at_min() {
        assert_eq!(Score::centipawns(i32::MIN).resigned(1).value, i32::MAX);
    }

    #[test]
    fn score_accepts_legacy_field_name() {
        let parsed: Score = serde_json::from_str(r#"{"unit":"mate","score":3}"#)
            .unwrap_or(Score::centipawns(0));
        assert_eq!(parsed, Score::mate(3));
    }

    #[test]
    fn position_score_requires_both_halves() {
        let mut position = Position {
            ply: 0,
            san: None,
            lan: None,
            fen: Some(START_FEN.to_owned()),
            score_unit: Some(ScoreUnit::Centipawn),
            score_value: None,
            note: String::new(),
        };
        assert_eq!(position.score(), None);
        position.score_value = Some(20);
        assert_eq!(position.score(), Some(Score::centipawns(20)));
    }
}
