//! Worker configuration.
//!
//! All configuration is loaded from environment variables. The worker needs
//! to know how to reach Valkey, where the engine binary lives, and how hard
//! to search.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use gambit_core::{RESPONSES_QUEUE, TASKS_QUEUE};
use gambit_types::LINES_PER_PLY;

use crate::error::WorkerError;

/// Complete worker configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Valkey server URL (e.g. `redis://localhost:6379`).
    pub valkey_url: String,
    /// Path to the UCI engine executable.
    pub engine_path: String,
    /// Search threads the engine is told to use.
    pub engine_threads: u16,
    /// Search settings shared by every handler.
    pub search: SearchSettings,
    /// Longest wait for any single engine reply.
    pub reply_timeout: Duration,
    /// Queue tasks are popped from.
    pub tasks_queue: String,
    /// Queue responses are pushed onto.
    pub responses_queue: String,
}

/// How deep and how wide the engine searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    /// Target depth in plies.
    pub depth: u32,
    /// Number of best lines explored per position.
    pub line_count: u8,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            depth: 20,
            line_count: LINES_PER_PLY,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `VALKEY_URL` -- Valkey connection string
    /// - `ENGINE_PATH` -- UCI engine executable
    ///
    /// Optional variables:
    /// - `ENGINE_THREADS` -- engine search threads (default 4)
    /// - `SEARCH_DEPTH` -- search depth (default 20)
    /// - `LINE_COUNT` -- lines explored per position, 1 to 3 (default 3)
    /// - `ENGINE_REPLY_TIMEOUT_MS` -- engine reply deadline (default 120000)
    /// - `TASKS_QUEUE` -- task queue name (default `tasks`)
    /// - `RESPONSES_QUEUE` -- response queue name (default `responses`)
    pub fn from_env() -> Result<Self, WorkerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WorkerError> {
        let required = |name: &str| {
            lookup(name)
                .ok_or_else(|| WorkerError::Config(format!("missing required env var {name}")))
        };

        let valkey_url = required("VALKEY_URL")?;
        let engine_path = required("ENGINE_PATH")?;
        let engine_threads = parse_or(&lookup, "ENGINE_THREADS", 4_u16)?;
        let depth = parse_or(&lookup, "SEARCH_DEPTH", 20_u32)?;
        let line_count = parse_or(&lookup, "LINE_COUNT", LINES_PER_PLY)?;
        let reply_timeout_ms = parse_or(&lookup, "ENGINE_REPLY_TIMEOUT_MS", 120_000_u64)?;

        if !(1..=LINES_PER_PLY).contains(&line_count) {
            return Err(WorkerError::Config(format!(
                "LINE_COUNT must be between 1 and {LINES_PER_PLY}, got {line_count}"
            )));
        }
        if depth == 0 {
            return Err(WorkerError::Config("SEARCH_DEPTH must be positive".to_owned()));
        }

        Ok(Self {
            valkey_url,
            engine_path,
            engine_threads,
            search: SearchSettings { depth, line_count },
            reply_timeout: Duration::from_millis(reply_timeout_ms),
            tasks_queue: lookup("TASKS_QUEUE").unwrap_or_else(|| TASKS_QUEUE.to_owned()),
            responses_queue: lookup("RESPONSES_QUEUE")
                .unwrap_or_else(|| RESPONSES_QUEUE.to_owned()),
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, WorkerError>
where
    T: FromStr,
    T::Err: Display,
{
    lookup(name).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| WorkerError::Config(format!("invalid {name}: {e}")))
    })
}
