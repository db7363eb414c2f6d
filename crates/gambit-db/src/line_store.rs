//! Explored line persistence.
//!
//! A line is one row in `lines` plus one row per ply in `line_positions`.
//! Lines are append-only: a second write for the same `(game, ply, rank)`
//! is ignored rather than merged.

use gambit_types::{GameId, ScoreUnit, StoredLine, StoredLinePosition};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;
use crate::position_store::ply_to_db;

/// Operations on the `lines` and `line_positions` tables.
pub struct LineStore<'a> {
    pool: &'a PgPool,
}

impl<'a> LineStore<'a> {
    /// Create a new line store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a line and all of its positions in one transaction.
    ///
    /// Returns `false` (and writes nothing) if a line with the same rank
    /// already exists for this ply.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if any insert fails.
    pub async fn create_line(&self, line: &StoredLine) -> Result<bool, DbError> {
        let game_id = line.game_id.into_inner();
        let ply = ply_to_db(line.ply);
        let rank = i16::from(line.rank);

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r"INSERT INTO lines (game_id, ply, rank, score_unit, score_value)
              VALUES ($1, $2, $3, $4, $5)
              ON CONFLICT (game_id, ply, rank) DO NOTHING",
        )
        .bind(game_id)
        .bind(ply)
        .bind(rank)
        .bind(line.score_unit.map(ScoreUnit::as_str))
        .bind(line.score_value)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            tracing::warn!(
                game_id = %line.game_id,
                ply = line.ply,
                rank = line.rank,
                "Line already stored, ignoring duplicate"
            );
            return Ok(false);
        }

        if !line.positions.is_empty() {
            let len = line.positions.len();
            let mut line_plies = Vec::with_capacity(len);
            let mut sans = Vec::with_capacity(len);
            let mut lans = Vec::with_capacity(len);
            let mut fens = Vec::with_capacity(len);
            let mut units: Vec<Option<String>> = Vec::with_capacity(len);
            let mut values = Vec::with_capacity(len);
            for position in &line.positions {
                line_plies.push(ply_to_db(position.line_ply));
                sans.push(position.san.clone());
                lans.push(position.lan.clone());
                fens.push(position.fen.clone());
                units.push(position.score_unit.map(|u| u.as_str().to_owned()));
                values.push(position.score_value);
            }

            sqlx::query(
                r"INSERT INTO line_positions
                  (game_id, ply, rank, line_ply, san, lan, fen, score_unit, score_value)
                  SELECT $1, $2, $3, * FROM UNNEST($4::INTEGER[], $5::TEXT[], $6::TEXT[], $7::TEXT[], $8::TEXT[], $9::INTEGER[])",
            )
            .bind(game_id)
            .bind(ply)
            .bind(rank)
            .bind(&line_plies)
            .bind(&sans)
            .bind(&lans)
            .bind(&fens)
            .bind(&units)
            .bind(&values)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            game_id = %line.game_id,
            ply = line.ply,
            rank = line.rank,
            positions = line.positions.len(),
            "Stored line"
        );
        Ok(true)
    }

    /// All stored lines of one ply, ordered by rank, each with its
    /// positions in line order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_lines(&self, game_id: GameId, ply: u32) -> Result<Vec<StoredLine>, DbError> {
        let rows = sqlx::query_as::<_, LineRow>(
            r"SELECT l.game_id, l.ply, l.rank,
                     l.score_unit AS line_score_unit, l.score_value AS line_score_value,
                     p.line_ply, p.san, p.lan, p.fen, p.score_unit, p.score_value
              FROM lines l
              LEFT JOIN line_positions p
                ON p.game_id = l.game_id AND p.ply = l.ply AND p.rank = l.rank
              WHERE l.game_id = $1 AND l.ply = $2
              ORDER BY l.rank, p.line_ply",
        )
        .bind(game_id.into_inner())
        .bind(ply_to_db(ply))
        .fetch_all(self.pool)
        .await?;

        Ok(group_lines(rows))
    }
}

/// One joined row of a line and (optionally) one of its positions.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LineRow {
    /// Owning game.
    pub game_id: Uuid,
    /// Game ply the line branches from.
    pub ply: i32,
    /// Line rank.
    pub rank: i16,
    /// Unit of the line score.
    pub line_score_unit: Option<String>,
    /// Value of the line score.
    pub line_score_value: Option<i32>,
    /// Index along the line (`None` for a line with no positions).
    pub line_ply: Option<i32>,
    /// Move in standard notation.
    pub san: Option<String>,
    /// Move in long notation.
    pub lan: Option<String>,
    /// Board state.
    pub fen: Option<String>,
    /// Unit of the position score.
    pub score_unit: Option<String>,
    /// Value of the position score.
    pub score_value: Option<i32>,
}

/// Fold joined rows (ordered by rank, then line ply) into lines.
fn group_lines(rows: Vec<LineRow>) -> Vec<StoredLine> {
    let mut lines: Vec<StoredLine> = Vec::new();

    for row in rows {
        let rank = u8::try_from(row.rank).unwrap_or(0);
        let starts_new = lines.last().is_none_or(|line| line.rank != rank);
        if starts_new {
            lines.push(StoredLine {
                game_id: GameId::from(row.game_id),
                ply: u32::try_from(row.ply).unwrap_or(0),
                rank,
                score_unit: row.line_score_unit.as_deref().and_then(ScoreUnit::from_token),
                score_value: row.line_score_value,
                positions: Vec::new(),
            });
        }

        if let (Some(line_ply), Some(fen), Some(line)) = (row.line_ply, row.fen, lines.last_mut()) {
            line.positions.push(StoredLinePosition {
                line_ply: u32::try_from(line_ply).unwrap_or(0),
                san: row.san,
                lan: row.lan,
                fen,
                score_unit: row.score_unit.as_deref().and_then(ScoreUnit::from_token),
                score_value: row.score_value,
            });
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rank: i16, line_ply: Option<i32>) -> LineRow {
        LineRow {
            game_id: Uuid::nil(),
            ply: 4,
            rank,
            line_score_unit: Some("cp".to_owned()),
            line_score_value: Some(i32::from(rank)),
            line_ply,
            san: line_ply.map(|p| format!("m{p}")),
            lan: None,
            fen: line_ply.map(|p| format!("fen{p}")),
            score_unit: Some("mate".to_owned()),
            score_value: Some(1),
        }
    }

    #[test]
    fn groups_rows_by_rank_in_order() {
        let lines = group_lines(vec![
            row(1, Some(0)),
            row(1, Some(1)),
            row(2, Some(0)),
            row(3, None),
        ]);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines.first().map(|l| l.positions.len()), Some(2));
        assert_eq!(lines.get(1).map(|l| l.rank), Some(2));
        assert_eq!(lines.get(1).and_then(|l| l.score_value), Some(2));
        assert_eq!(lines.get(2).map(|l| l.positions.is_empty()), Some(true));
        assert_eq!(
            lines
                .first()
                .and_then(|l| l.positions.get(1))
                .map(|p| p.fen.as_str()),
            Some("fen1")
        );
        assert_eq!(lines.first().map(|l| l.ply), Some(4));
    }

    #[test]
    fn empty_rows_yield_no_lines() {
        assert!(group_lines(Vec::new()).is_empty());
    }
}
