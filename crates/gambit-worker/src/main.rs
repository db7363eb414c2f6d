//! Analysis worker entry point for the Gambit pipeline.
//!
//! The worker pops task envelopes from Valkey, drives a UCI chess engine
//! subprocess through the matching handler, and pushes the results back as
//! response envelopes.
//!
//! # Architecture
//!
//! ```text
//! Valkey "tasks" --> Worker --> handler --> UCI engine (stdin/stdout)
//!                      |
//!                      +--> Valkey "responses"
//! ```
//!
//! One worker owns exactly one engine and processes one task at a time.
//! Scale out by running more worker processes against the same queue.

mod config;
mod error;
#[cfg(test)]
mod fake_engine;
mod handlers;
mod report;
mod uci;
mod worker;

use gambit_db::ValkeyPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::WorkerConfig;
use crate::worker::{SubprocessLauncher, Worker};

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// opens separate Valkey connections for consuming and producing, then runs
/// the worker loop until it fails.
///
/// # Errors
///
/// Returns an error if initialization or the worker loop fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("gambit-worker starting");

    let config = WorkerConfig::from_env()?;
    info!(
        valkey_url = config.valkey_url,
        engine_path = config.engine_path,
        engine_threads = config.engine_threads,
        depth = config.search.depth,
        line_count = config.search.line_count,
        reply_timeout_ms = config.reply_timeout.as_millis(),
        "configuration loaded"
    );

    // A blocking pop monopolizes its connection, so responses need their own.
    let consumer = ValkeyPool::connect(&config.valkey_url).await?;
    let producer = ValkeyPool::connect(&config.valkey_url).await?;

    let launcher = SubprocessLauncher::from_config(&config);
    let mut worker = Worker::new(consumer, producer, launcher, &config);

    info!("worker initialized, entering task loop");
    worker.run().await?;

    Ok(())
}
