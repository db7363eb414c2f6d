//! API server entry point for the Gambit pipeline.
//!
//! Runs the HTTP/`WebSocket` API and the response processor in one
//! process:
//!
//! ```text
//! client --> API --> PostgreSQL
//!             |
//!             +--> Valkey "tasks" --> workers --> Valkey "responses"
//!                                                      |
//! client <-- WebSocket <-- LineBroker <-- ResponseProcessor
//! ```
//!
//! The process exits when either half stops.

use std::path::Path;
use std::sync::Arc;

use gambit_core::{LineBroker, PgStore, Publisher, ResponseProcessor};
use gambit_db::{PostgresConfig, PostgresPool, ValkeyPool};
use gambit_server::{AppState, DEFAULT_CONFIG_PATH, ServerConfig, start_server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, a connection, or migrations fail,
/// or if the server or processor stops with an error.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    info!("gambit-server starting");

    let config = ServerConfig::load(Path::new(DEFAULT_CONFIG_PATH))?;
    info!(
        host = config.http.host,
        port = config.http.port,
        valkey_url = config.infrastructure.valkey_url,
        tasks_queue = config.queues.tasks,
        responses_queue = config.queues.responses,
        "configuration loaded"
    );

    let pg_config = PostgresConfig::new(&config.infrastructure.postgres_url)
        .with_max_connections(config.infrastructure.max_connections);
    let pool = PostgresPool::connect(&pg_config).await?;
    pool.run_migrations().await?;
    let store = PgStore::new(pool.clone());

    // The processor parks in a blocking pop, so it gets its own connection.
    let consumer = ValkeyPool::connect(&config.infrastructure.valkey_url).await?;
    let producer = ValkeyPool::connect(&config.infrastructure.valkey_url).await?;

    let broker = LineBroker::new();
    let publisher = Publisher::new(producer).with_tasks_queue(config.queues.tasks.clone());

    let processor = ResponseProcessor::new(store.clone(), consumer, publisher.clone(), broker.clone())
        .with_responses_queue(config.queues.responses.clone());

    let state = Arc::new(AppState::new(store, publisher, broker));

    let result: Result<(), Box<dyn std::error::Error>> = tokio::select! {
        served = start_server(&config.http, state) => match served {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(error = %e, "API server stopped");
                Err(e.into())
            }
        },
        processed = processor.run() => match processed {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(error = %e, "Response processor stopped");
                Err(e.into())
            }
        },
    };

    pool.close().await;
    info!("gambit-server stopped");
    result
}
