//! Task handlers.
//!
//! Each handler drives the engine through a fixed command sequence and
//! returns (or, for lines, emits) a typed result. The engine's board is
//! never assumed to survive between steps: every step reasserts it with a
//! `position` command first.

use gambit_types::{ExploredLine, LinePosition, Score};

use crate::config::SearchSettings;
use crate::error::EngineError;
use crate::uci::UciEngine;

/// Replay `moves` from the initial position and capture every FEN.
///
/// Returns one FEN more than there are moves; element 0 is the initial
/// position as the engine reports it.
///
/// # Errors
///
/// Returns [`EngineError`] if the engine stops answering.
pub async fn expand_positions(
    engine: &mut UciEngine,
    moves: &[String],
) -> Result<Vec<String>, EngineError> {
    engine.set_startpos().await?;
    let mut fen = engine.current_fen().await?;

    let mut fens = Vec::with_capacity(moves.len().saturating_add(1));
    for mv in moves {
        engine.set_position(&fen, Some(mv.as_str())).await?;
        let next = engine.current_fen().await?;
        fens.push(std::mem::replace(&mut fen, next));
    }
    fens.push(fen);

    tracing::info!(moves = moves.len(), fens = fens.len(), "Positions expanded");
    Ok(fens)
}

/// Score every FEN independently. An empty list never touches the engine.
///
/// # Errors
///
/// Returns [`EngineError`] if a search fails or yields no score.
pub async fn score_positions(
    engine: &mut UciEngine,
    fens: &[String],
    settings: SearchSettings,
) -> Result<Vec<Score>, EngineError> {
    let mut scores = Vec::with_capacity(fens.len());
    for fen in fens {
        scores.push(evaluate(engine, fen, settings.depth).await?);
    }
    tracing::info!(scores = scores.len(), depth = settings.depth, "Positions scored");
    Ok(scores)
}

/// Explore the best lines from `fen` and hand each to `emit` as soon as it
/// is complete. Returns the number of lines emitted.
///
/// One multi-variation search picks the candidate lines. Each line is then
/// walked move by move: advance the board, capture its FEN, and score the
/// new position with a single-variation search.
///
/// # Errors
///
/// Returns the first error from the engine or from `emit`.
pub async fn explore_lines<E>(
    engine: &mut UciEngine,
    fen: &str,
    settings: SearchSettings,
    mut emit: impl AsyncFnMut(ExploredLine) -> Result<(), E>,
) -> Result<usize, E>
where
    E: From<EngineError>,
{
    engine.set_option("MultiPV", settings.line_count).await?;
    engine.set_position(fen, None).await?;
    let variations = engine.search(settings.depth, settings.line_count).await?;
    engine.set_option("MultiPV", 1).await?;

    let mut emitted = 0_usize;
    for variation in variations {
        if variation.pv.is_empty() {
            tracing::debug!(rank = variation.multipv, "Variation without moves skipped");
            continue;
        }

        let mut current = fen.to_owned();
        let mut positions = Vec::with_capacity(variation.pv.len());
        for lan in variation.pv {
            engine.set_position(&current, Some(lan.as_str())).await?;
            current = engine.current_fen().await?;
            let score = evaluate(engine, &current, settings.depth).await?;
            positions.push(LinePosition {
                lan,
                fen: current.clone(),
                score,
            });
        }

        tracing::info!(
            rank = variation.multipv,
            plies = positions.len(),
            "Line explored"
        );
        emit(ExploredLine {
            rank: variation.multipv,
            score: variation.score,
            positions,
        })
        .await?;
        emitted = emitted.saturating_add(1);
    }
    Ok(emitted)
}

/// Score one position with a single-variation search.
async fn evaluate(engine: &mut UciEngine, fen: &str, depth: u32) -> Result<Score, EngineError> {
    engine.set_position(fen, None).await?;
    engine
        .search(depth, 1)
        .await?
        .first()
        .map(|report| report.score)
        .ok_or_else(|| EngineError::Malformed(format!("search of {fen} ended without a score")))
}

#[cfg(test)]
#[allow(clippy::indexing_slicing, clippy::panic)]
mod tests {
    use std::time::Duration;

    use gambit_types::START_FEN;

    use super::*;
    use crate::fake_engine::FakeEngine;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn settings() -> SearchSettings {
        SearchSettings {
            depth: 20,
            line_count: 3,
        }
    }

    fn moves(list: &[&str]) -> Vec<String> {
        list.iter().map(|m| (*m).to_owned()).collect()
    }

    #[tokio::test]
    async fn expansion_returns_one_more_fen_than_moves() {
        let mut engine = FakeEngine::default().connect(TIMEOUT);

        let Ok(fens) = expand_positions(&mut engine, &moves(&["e2e4", "e7e5"])).await else {
            panic!("expansion failed");
        };
        assert_eq!(
            fens,
            [
                START_FEN.to_owned(),
                format!("{START_FEN} +e2e4"),
                format!("{START_FEN} +e2e4 +e7e5"),
            ]
        );
    }

    #[tokio::test]
    async fn expansion_of_empty_game_is_start_only() {
        let mut engine = FakeEngine::default().connect(TIMEOUT);
        let fens = expand_positions(&mut engine, &[]).await.ok();
        assert_eq!(fens, Some(vec![START_FEN.to_owned()]));
    }

    #[tokio::test]
    async fn scoring_is_index_aligned() {
        let mut engine = FakeEngine::default().connect(TIMEOUT);
        let fens = vec![
            START_FEN.to_owned(),
            format!("{START_FEN} +e2e4"),
            format!("{START_FEN} +e2e4 +e7e5"),
        ];

        let scores = score_positions(&mut engine, &fens, settings()).await.ok();
        assert_eq!(
            scores,
            Some(vec![
                Score::centipawns(0),
                Score::centipawns(1),
                Score::centipawns(2),
            ])
        );
    }

    #[tokio::test]
    async fn scoring_nothing_sends_nothing() {
        let fake = FakeEngine::default();
        let mut engine = fake.connect(TIMEOUT);

        let scores = score_positions(&mut engine, &[], settings()).await.ok();
        assert_eq!(scores, Some(Vec::new()));
        assert!(fake.commands().is_empty());
    }

    #[tokio::test]
    async fn lines_are_emitted_rank_by_rank() {
        let fake = FakeEngine::default();
        let mut engine = fake.connect(TIMEOUT);
        let mut lines = Vec::new();

        let emitted = explore_lines(&mut engine, START_FEN, settings(), async |line| {
            lines.push(line);
            Ok::<(), EngineError>(())
        })
        .await;

        assert_eq!(emitted.ok(), Some(3));
        let ranks: Vec<u8> = lines.iter().map(|l| l.rank).collect();
        assert_eq!(ranks, [1, 2, 3]);
        assert_eq!(lines[0].score, Score::centipawns(31));

        let best = &lines[0].positions;
        let lans: Vec<&str> = best.iter().map(|p| p.lan.as_str()).collect();
        assert_eq!(lans, ["e2e4", "e7e5", "g1f3"]);
        assert_eq!(best[2].fen, format!("{START_FEN} +e2e4 +e7e5 +g1f3"));
        assert_eq!(best[2].score, Score::centipawns(3));
        assert_eq!(lines[2].positions.len(), 1);

        // Width goes back to one before the per-move searches.
        let log = fake.commands();
        let reset = log.iter().position(|c| c == "setoption name MultiPV value 1");
        let first_go = log.iter().position(|c| c.starts_with("go depth"));
        let second_go = log.iter().rposition(|c| c.starts_with("go depth"));
        assert!(first_go < reset && reset < second_go);
    }

    #[tokio::test]
    async fn terminal_position_has_no_lines() {
        let mut engine = FakeEngine::default().connect(TIMEOUT);
        let emitted = explore_lines(&mut engine, FakeEngine::MATED, settings(), async |_line| {
            Ok::<(), EngineError>(())
        })
        .await;
        assert_eq!(emitted.ok(), Some(0));
    }

    #[tokio::test]
    async fn emit_failure_stops_exploration() {
        let mut engine = FakeEngine::default().connect(TIMEOUT);
        let mut seen = 0_u8;

        let result = explore_lines(&mut engine, START_FEN, settings(), async |_line| {
            seen = seen.saturating_add(1);
            Err(EngineError::Malformed("sink closed".to_owned()))
        })
        .await;

        assert!(matches!(result, Err(EngineError::Malformed(_))));
        assert_eq!(seen, 1);
    }
}
