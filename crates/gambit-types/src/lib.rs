//! Shared type definitions for the Gambit analysis pipeline.
//!
//! This crate is the single source of truth for every type that crosses a
//! process boundary: the worker, the response processor and the API tier all
//! speak in these types. They flow to the web client as `TypeScript` via
//! `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe game identifier
//! - [`enums`] -- Score units, task kinds, game status
//! - [`structs`] -- Scores, positions and lines (wire and stored forms)
//! - [`envelope`] -- Task and response envelopes carried by the queues

pub mod enums;
pub mod envelope;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{GameStatus, ScoreUnit, TaskKind};
pub use envelope::{
    AnalysisResponse, FenPayload, FensPayload, GameState, LinePayload, MovesPayload, PlyState,
    ScoresPayload, Task,
};
pub use ids::GameId;
pub use structs::{
    ExploredLine, LINES_PER_PLY, LinePosition, Position, START_FEN, Score, StoredLine,
    StoredLinePosition,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings to `bindings/` relative to the crate
        // root when `export_all` is called.
        use ts_rs::TS;

        let _ = crate::ids::GameId::export_all();

        let _ = crate::enums::ScoreUnit::export_all();
        let _ = crate::enums::TaskKind::export_all();
        let _ = crate::enums::GameStatus::export_all();

        let _ = crate::structs::Score::export_all();
        let _ = crate::structs::LinePosition::export_all();
        let _ = crate::structs::ExploredLine::export_all();
        let _ = crate::structs::Position::export_all();
        let _ = crate::structs::StoredLinePosition::export_all();
        let _ = crate::structs::StoredLine::export_all();

        let _ = crate::envelope::Task::export_all();
        let _ = crate::envelope::AnalysisResponse::export_all();
    }
}
