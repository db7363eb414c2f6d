//! API tier for the Gambit analysis pipeline.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Game intake** (`POST /api/games`), which validates and stores a
//!   game and publishes its position-expansion task
//! - **Read endpoints** for positions, analysis status, notes and lines
//! - **Line requests** (`POST /api/games/{id}/lines/{ply}`), published at
//!   most once per ply
//! - **`WebSocket` endpoint** (`/ws/lines/{id}/{ply}`) streaming lines as
//!   the response processor stores them
//!
//! The binary also runs the response processor in the same process, so
//! the processor and the `WebSocket` handlers share one [`LineBroker`].
//!
//! [`LineBroker`]: gambit_core::LineBroker

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use config::{ConfigError, DEFAULT_CONFIG_PATH, ServerConfig};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
