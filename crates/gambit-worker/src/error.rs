//! Error types for the analysis worker.
//!
//! [`EngineError`] covers everything that can go wrong talking to the
//! engine subprocess. Any of them means the conversation can no longer be
//! trusted, so the worker fails the task and restarts the engine.
//! [`WorkerError`] is the top-level error that ends the worker loop.

use std::time::Duration;

use gambit_core::QueueError;

/// Failures of the engine conversation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The subprocess could not be started.
    #[error("failed to spawn engine {path}: {source}")]
    Spawn {
        /// Executable that was launched.
        path: String,
        /// The underlying OS error.
        source: std::io::Error,
    },

    /// Reading from or writing to the subprocess failed.
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The expected reply did not arrive in time.
    #[error("engine did not reply within {waited:?} (waiting for {expected})")]
    ReplyTimeout {
        /// What the driver was waiting for.
        expected: &'static str,
        /// How long it waited.
        waited: Duration,
    },

    /// The subprocess closed its output stream.
    #[error("engine exited while waiting for {expected}")]
    Exited {
        /// What the driver was waiting for.
        expected: &'static str,
    },

    /// A reply was structurally wrong.
    #[error("malformed engine reply: {0}")]
    Malformed(String),
}

/// Errors that stop the worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The queue failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// A task envelope could not be decoded.
    #[error("malformed task envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The engine failed.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}
