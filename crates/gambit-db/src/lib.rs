//! Data layer for the Gambit analysis pipeline (`Valkey` + `PostgreSQL`).
//!
//! `Valkey` carries the two work queues between the API tier and the
//! engine workers. `PostgreSQL` holds everything that outlives a message:
//! games, per-ply positions and scores, and explored lines.
//!
//! # Architecture
//!
//! ```text
//! API tier ──RPUSH tasks──> Valkey ──BLPOP──> worker
//!     ^                                         |
//!     |                                   RPUSH responses
//!     |                                         v
//! response processor <──BLPOP── Valkey
//!     |
//!     +--> PostgreSQL (PostgresPool)
//!          |-- GameStore      (games, headers, skeleton positions)
//!          |-- PositionStore  (FENs, scores, notes, lines flag)
//!          +-- LineStore      (explored lines)
//! ```
//!
//! # Modules
//!
//! - [`valkey`] -- `Valkey` (Redis-compatible) queue operations
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`game_store`] -- Game intake and game-level reads
//! - [`position_store`] -- Per-ply FENs, scores, notes and the lines flag
//! - [`line_store`] -- Explored line persistence
//! - [`error`] -- Shared error types

pub mod error;
pub mod game_store;
pub mod line_store;
pub mod position_store;
pub mod postgres;
pub mod valkey;

// Re-export primary types for convenience.
pub use error::DbError;
pub use game_store::{GameRow, GameStore, NewGame};
pub use line_store::{LineRow, LineStore};
pub use position_store::{PositionRow, PositionStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use valkey::ValkeyPool;
