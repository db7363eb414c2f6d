//! In-memory queue and store backends.
//!
//! Used by unit and router tests, and handy for running the API tier
//! without infrastructure. Semantics match the `Valkey` and `PostgreSQL`
//! backends: FIFO queues with blocking pop, an atomic lines-generated
//! claim, append-only lines.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use gambit_db::NewGame;
use gambit_types::{GameId, Position, Score, StoredLine};
use tokio::sync::Notify;

use crate::queue::{QueueError, TaskQueue};
use crate::store::{AnalysisStore, GameRepository, StoreError};

// =============================================================================
// Queue
// =============================================================================

#[derive(Debug, Default)]
struct QueueInner {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    notify: Notify,
    closed: AtomicBool,
}

/// A set of named in-memory FIFO queues.
///
/// Clones share the same queues, so one clone can block in
/// [`TaskQueue::pop`] while another pushes.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    inner: Arc<QueueInner>,
}

impl MemoryQueue {
    /// Create an empty set of queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the head of `queue` without waiting.
    pub fn try_pop(&self, queue: &str) -> Option<String> {
        let Ok(mut lists) = self.inner.lists.lock() else {
            return None;
        };
        lists.get_mut(queue).and_then(VecDeque::pop_front)
    }

    /// Snapshot of the messages waiting on `queue`, head first.
    pub fn pending(&self, queue: &str) -> Vec<String> {
        let Ok(lists) = self.inner.lists.lock() else {
            return Vec::new();
        };
        lists
            .get(queue)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Wake every blocked consumer with [`QueueError::Closed`].
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }
}

impl TaskQueue for MemoryQueue {
    async fn push(&self, queue: &str, payload: &str) -> Result<(), QueueError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }
        {
            let Ok(mut lists) = self.inner.lists.lock() else {
                return Err(QueueError::Closed);
            };
            lists
                .entry(queue.to_owned())
                .or_default()
                .push_back(payload.to_owned());
        }
        self.inner.notify.notify_waiters();
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<String, QueueError> {
        loop {
            // Register interest before checking so a push in between is
            // not missed.
            let notified = self.inner.notify.notified();
            if let Some(message) = self.try_pop(queue) {
                return Ok(message);
            }
            if self.inner.closed.load(Ordering::Acquire) {
                return Err(QueueError::Closed);
            }
            notified.await;
        }
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Debug, Clone)]
struct PositionRecord {
    position: Position,
    lines_generated: bool,
}

#[derive(Debug, Default)]
struct StoreState {
    games: HashMap<GameId, NewGame>,
    positions: HashMap<GameId, BTreeMap<u32, PositionRecord>>,
    lines: BTreeMap<(GameId, u32, u8), StoredLine>,
}

/// In-memory implementation of [`AnalysisStore`] and [`GameRepository`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut StoreState) -> T) -> Result<T, StoreError> {
        let Ok(mut state) = self.state.lock() else {
            return Err(StoreError::Invalid("memory store poisoned".to_owned()));
        };
        Ok(f(&mut state))
    }
}

fn empty_position(ply: u32) -> Position {
    Position {
        ply,
        san: None,
        lan: None,
        fen: None,
        score_unit: None,
        score_value: None,
        note: String::new(),
    }
}

impl AnalysisStore for MemoryStore {
    async fn create_positions(&self, game_id: GameId, fens: &[String]) -> Result<(), StoreError> {
        self.with_state(|state| {
            if !state.games.contains_key(&game_id) {
                return Err(StoreError::NotFound(format!("game {game_id}")));
            }
            let rows = state.positions.entry(game_id).or_default();
            for (ply, fen) in (0_u32..).zip(fens) {
                let record = rows.entry(ply).or_insert_with(|| PositionRecord {
                    position: empty_position(ply),
                    lines_generated: false,
                });
                record.position.fen = Some(fen.clone());
            }
            Ok(())
        })?
    }

    async fn create_scores(&self, game_id: GameId, scores: &[Score]) -> Result<(), StoreError> {
        self.with_state(|state| {
            if let Some(rows) = state.positions.get_mut(&game_id) {
                for (ply, score) in (0_u32..).zip(scores) {
                    if let Some(record) = rows.get_mut(&ply) {
                        record.position.score_unit = Some(score.unit);
                        record.position.score_value = Some(score.value);
                    }
                }
            }
        })
    }

    async fn create_line(&self, line: &StoredLine) -> Result<bool, StoreError> {
        self.with_state(|state| {
            let key = (line.game_id, line.ply, line.rank);
            if state.lines.contains_key(&key) {
                return false;
            }
            state.lines.insert(key, line.clone());
            true
        })
    }

    async fn position_fen(&self, game_id: GameId, ply: u32) -> Result<Option<String>, StoreError> {
        self.with_state(|state| {
            state
                .positions
                .get(&game_id)
                .and_then(|rows| rows.get(&ply))
                .and_then(|record| record.position.fen.clone())
        })
    }

    async fn position_score(&self, game_id: GameId, ply: u32) -> Result<Option<Score>, StoreError> {
        self.with_state(|state| {
            state
                .positions
                .get(&game_id)
                .and_then(|rows| rows.get(&ply))
                .and_then(|record| record.position.score())
        })
    }

    async fn lines_already_generated(&self, game_id: GameId, ply: u32) -> Result<bool, StoreError> {
        self.with_state(|state| {
            state
                .positions
                .get(&game_id)
                .and_then(|rows| rows.get(&ply))
                .is_none_or(|record| record.lines_generated)
        })
    }

    async fn mark_lines_generated(&self, game_id: GameId, ply: u32) -> Result<bool, StoreError> {
        self.with_state(|state| {
            match state
                .positions
                .get_mut(&game_id)
                .and_then(|rows| rows.get_mut(&ply))
            {
                Some(record) if !record.lines_generated => {
                    record.lines_generated = true;
                    true
                }
                _ => false,
            }
        })
    }

    async fn release_lines(&self, game_id: GameId, ply: u32) -> Result<(), StoreError> {
        self.with_state(|state| {
            if let Some(record) = state
                .positions
                .get_mut(&game_id)
                .and_then(|rows| rows.get_mut(&ply))
            {
                record.lines_generated = false;
            }
        })
    }
}

impl GameRepository for MemoryStore {
    async fn create_game(&self, game: &NewGame) -> Result<GameId, StoreError> {
        if game.sans.len() != game.lans.len() {
            return Err(StoreError::Invalid(
                "SAN and LAN move lists differ in length".to_owned(),
            ));
        }
        self.with_state(|state| {
            let game_id = GameId::new();
            let rows = (1_u32..)
                .zip(game.sans.iter().zip(&game.lans))
                .map(|(ply, (san, lan))| {
                    let mut position = empty_position(ply);
                    position.san = Some(san.clone());
                    position.lan = Some(lan.clone());
                    (
                        ply,
                        PositionRecord {
                            position,
                            lines_generated: false,
                        },
                    )
                })
                .collect();
            state.games.insert(game_id, game.clone());
            state.positions.insert(game_id, rows);
            game_id
        })
    }

    async fn game_exists(&self, game_id: GameId) -> Result<bool, StoreError> {
        self.with_state(|state| state.games.contains_key(&game_id))
    }

    async fn positions(&self, game_id: GameId) -> Result<Vec<Position>, StoreError> {
        self.with_state(|state| {
            state
                .positions
                .get(&game_id)
                .map(|rows| rows.values().map(|r| r.position.clone()).collect())
                .unwrap_or_default()
        })
    }

    async fn lines(&self, game_id: GameId, ply: u32) -> Result<Vec<StoredLine>, StoreError> {
        self.with_state(|state| {
            state
                .lines
                .range((game_id, ply, 0)..=(game_id, ply, u8::MAX))
                .map(|(_, line)| line.clone())
                .collect()
        })
    }

    async fn position_note(&self, game_id: GameId, ply: u32) -> Result<Option<String>, StoreError> {
        self.with_state(|state| {
            state
                .positions
                .get(&game_id)
                .and_then(|rows| rows.get(&ply))
                .map(|record| record.position.note.clone())
        })
    }

    async fn update_position_note(
        &self,
        game_id: GameId,
        ply: u32,
        note: &str,
    ) -> Result<(), StoreError> {
        self.with_state(|state| {
            let record = state
                .positions
                .get_mut(&game_id)
                .and_then(|rows| rows.get_mut(&ply))
                .ok_or_else(|| StoreError::NotFound(format!("position {game_id}/{ply}")))?;
            note.clone_into(&mut record.position.note);
            Ok(())
        })?
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn game(moves: &[(&str, &str)]) -> NewGame {
        NewGame {
            name: "test".to_owned(),
            result: "*".to_owned(),
            headers: BTreeMap::new(),
            sans: moves.iter().map(|(san, _)| (*san).to_owned()).collect(),
            lans: moves.iter().map(|(_, lan)| (*lan).to_owned()).collect(),
        }
    }

    #[tokio::test]
    async fn queue_is_fifo() {
        let queue = MemoryQueue::new();
        queue.push("q", "1").await.ok();
        queue.push("q", "2").await.ok();
        assert_eq!(queue.pop("q").await.ok().as_deref(), Some("1"));
        assert_eq!(queue.pop("q").await.ok().as_deref(), Some("2"));
        assert!(queue.try_pop("q").is_none());
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let queue = MemoryQueue::new();
        let consumer = queue.clone();
        let handle = tokio::spawn(async move { consumer.pop("q").await.ok() });

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push("q", "late").await.ok();

        let popped = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert_eq!(
            popped.ok().and_then(Result::ok).flatten().as_deref(),
            Some("late")
        );
    }

    #[tokio::test]
    async fn close_releases_blocked_consumer() {
        let queue = MemoryQueue::new();
        let consumer = queue.clone();
        let handle = tokio::spawn(async move { consumer.pop("q").await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.close();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(matches!(result, Ok(Ok(Err(QueueError::Closed)))));
    }

    #[tokio::test]
    async fn claim_is_granted_once() {
        let store = MemoryStore::new();
        let game_id = store.create_game(&game(&[("e4", "e2e4")])).await.unwrap_or_default();

        assert!(!store.lines_already_generated(game_id, 1).await.unwrap_or(true));
        assert!(store.mark_lines_generated(game_id, 1).await.unwrap_or(false));
        assert!(!store.mark_lines_generated(game_id, 1).await.unwrap_or(true));
        assert!(store.lines_already_generated(game_id, 1).await.unwrap_or(false));

        store.release_lines(game_id, 1).await.ok();
        assert!(store.mark_lines_generated(game_id, 1).await.unwrap_or(false));
    }

    #[tokio::test]
    async fn missing_row_counts_as_generated() {
        let store = MemoryStore::new();
        assert!(store.lines_already_generated(GameId::new(), 0).await.unwrap_or(false));
        assert!(!store.mark_lines_generated(GameId::new(), 0).await.unwrap_or(true));
    }

    #[tokio::test]
    async fn positions_fill_skeleton_rows() {
        let store = MemoryStore::new();
        let game_id = store
            .create_game(&game(&[("e4", "e2e4"), ("e5", "e7e5")]))
            .await
            .unwrap_or_default();

        let fens: Vec<String> = ["f0", "f1", "f2"].map(String::from).to_vec();
        store.create_positions(game_id, &fens).await.ok();
        store
            .create_scores(game_id, &[Score::centipawns(1), Score::centipawns(-2)])
            .await
            .ok();

        let positions = store.positions(game_id).await.unwrap_or_default();
        assert_eq!(positions.len(), 3);
        assert_eq!(positions.first().and_then(|p| p.fen.as_deref()), Some("f0"));
        assert_eq!(positions.get(1).and_then(|p| p.san.as_deref()), Some("e4"));
        assert_eq!(positions.get(1).and_then(Position::score), Some(Score::centipawns(-2)));
        assert_eq!(positions.get(2).and_then(Position::score), None);
    }

    #[tokio::test]
    async fn positions_for_unknown_game_fail() {
        let store = MemoryStore::new();
        let result = store.create_positions(GameId::new(), &["f".to_owned()]).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn notes_round_trip() {
        let store = MemoryStore::new();
        let game_id = store.create_game(&game(&[("d4", "d2d4")])).await.unwrap_or_default();

        store.update_position_note(game_id, 1, "queen's pawn").await.ok();
        assert_eq!(
            store.position_note(game_id, 1).await.ok().flatten().as_deref(),
            Some("queen's pawn")
        );
        assert!(store.update_position_note(game_id, 9, "x").await.is_err());
    }
}
