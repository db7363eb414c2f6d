//! Work queue client.
//!
//! One sequential loop: pop a task, drive the engine through the matching
//! handler, push the result onto the responses queue. The loop exclusively
//! owns the engine conversation, so no two tasks ever share it.
//!
//! When the engine fails mid-task the task is dropped, the subprocess is
//! discarded and a fresh one is launched for the next task. Queue failures
//! and undecodable envelopes end the loop.

use std::future::Future;
use std::time::Duration;

use gambit_core::{TaskQueue, queue::push_json};
use gambit_types::{AnalysisResponse, FensPayload, LinePayload, ScoresPayload, Task};

use crate::config::{SearchSettings, WorkerConfig};
use crate::error::{EngineError, WorkerError};
use crate::handlers;
use crate::uci::UciEngine;

/// Produces ready-to-use engine conversations.
pub trait EngineLauncher: Send + Sync {
    /// Start a new engine and complete its handshake.
    fn launch(&self) -> impl Future<Output = Result<UciEngine, EngineError>> + Send;
}

/// Launches the engine executable as a subprocess.
#[derive(Debug, Clone)]
pub struct SubprocessLauncher {
    path: String,
    threads: u16,
    reply_timeout: Duration,
}

impl SubprocessLauncher {
    /// Launcher for the engine configured in `config`.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            path: config.engine_path.clone(),
            threads: config.engine_threads,
            reply_timeout: config.reply_timeout,
        }
    }
}

impl EngineLauncher for SubprocessLauncher {
    async fn launch(&self) -> Result<UciEngine, EngineError> {
        UciEngine::spawn(&self.path, self.threads, self.reply_timeout).await
    }
}

/// The worker loop.
#[derive(Debug)]
pub struct Worker<Q, L> {
    consumer: Q,
    producer: Q,
    launcher: L,
    engine: Option<UciEngine>,
    search: SearchSettings,
    tasks_queue: String,
    responses_queue: String,
}

impl<Q: TaskQueue, L: EngineLauncher> Worker<Q, L> {
    /// Create a worker. `consumer` blocks on the tasks queue; responses go
    /// out through `producer`.
    pub fn new(consumer: Q, producer: Q, launcher: L, config: &WorkerConfig) -> Self {
        Self {
            consumer,
            producer,
            launcher,
            engine: None,
            search: config.search,
            tasks_queue: config.tasks_queue.clone(),
            responses_queue: config.responses_queue.clone(),
        }
    }

    /// Run until the queue fails or delivers an undecodable task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError`] on queue failure, on a malformed envelope, or
    /// when a fresh engine cannot be launched.
    pub async fn run(&mut self) -> Result<(), WorkerError> {
        tracing::info!(queue = %self.tasks_queue, "Worker started");
        loop {
            let raw = self.consumer.pop(&self.tasks_queue).await?;
            let task: Task = match serde_json::from_str(&raw) {
                Ok(task) => task,
                Err(e) => {
                    tracing::error!(error = %e, "Malformed task envelope, stopping");
                    return Err(e.into());
                }
            };
            let kind = task.kind();
            let game_id = task.game_id();
            tracing::debug!(kind = %kind, game_id = %game_id, "queue >>");

            let mut engine = match self.engine.take() {
                Some(engine) => engine,
                None => self.launcher.launch().await?,
            };

            match self.process(&mut engine, task).await {
                Ok(()) => self.engine = Some(engine),
                Err(WorkerError::Engine(e)) => {
                    tracing::error!(
                        kind = %kind,
                        game_id = %game_id,
                        error = %e,
                        "Task failed, restarting engine"
                    );
                    engine.shutdown().await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run one task to completion and push its response(s).
    async fn process(&self, engine: &mut UciEngine, task: Task) -> Result<(), WorkerError> {
        match task {
            Task::PositionExpansion { state, payload } => {
                let fens = handlers::expand_positions(engine, &payload.moves).await?;
                self.respond(&AnalysisResponse::PositionExpansion {
                    state,
                    payload: FensPayload { fens },
                })
                .await
            }
            Task::Scoring { state, payload } => {
                let scores = handlers::score_positions(engine, &payload.fens, self.search).await?;
                self.respond(&AnalysisResponse::Scoring {
                    state,
                    payload: ScoresPayload { scores },
                })
                .await
            }
            Task::LineExploration { state, payload } => {
                let emitted = handlers::explore_lines(engine, &payload.fen, self.search, async |line| {
                    self.respond(&AnalysisResponse::LineExploration {
                        state,
                        payload: LinePayload { line },
                    })
                    .await
                })
                .await?;
                if emitted == 0 {
                    tracing::warn!(game_id = %state.game_id, ply = state.ply, "No lines to explore");
                }
                Ok(())
            }
        }
    }

    async fn respond(&self, response: &AnalysisResponse) -> Result<(), WorkerError> {
        push_json(&self.producer, &self.responses_queue, response).await?;
        tracing::info!(
            kind = %response.kind(),
            game_id = %response.game_id(),
            "Response published"
        );
        Ok(())
    }
}
