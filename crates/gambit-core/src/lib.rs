//! Pipeline core for the Gambit analysis pipeline.
//!
//! Everything between the queues and the database that is not the engine
//! itself: the seams both sides are written against, the publisher that
//! enqueues tasks, the response processor that persists results and chains
//! the next stage, and the broker that pushes finished lines to live
//! subscribers.
//!
//! # Modules
//!
//! - [`queue`] -- [`TaskQueue`] seam and queue names
//! - [`store`] -- [`AnalysisStore`] / [`GameRepository`] seams and the
//!   `PostgreSQL` implementation
//! - [`publisher`] -- Task publishing and the at-most-once line request
//! - [`processor`] -- The responses-queue consumer
//! - [`broker`] -- Per-topic live-line fan-out
//! - [`notation`] -- Long to standard move notation
//! - [`intake`] -- Game validation, persistence and first task
//! - [`memory`] -- In-memory queue and store backends
//!
//! [`TaskQueue`]: queue::TaskQueue
//! [`AnalysisStore`]: store::AnalysisStore
//! [`GameRepository`]: store::GameRepository

pub mod broker;
pub mod intake;
pub mod memory;
pub mod notation;
pub mod processor;
pub mod publisher;
pub mod queue;
pub mod store;

pub use broker::{LineBroker, LineSubscription, line_topic};
pub use intake::{GameImport, ImportError, import_game};
pub use memory::{MemoryQueue, MemoryStore};
pub use notation::NotationError;
pub use processor::{ProcessError, ResponseProcessor};
pub use publisher::{LineRequest, LineRequestError, Publisher};
pub use queue::{QueueError, RESPONSES_QUEUE, TASKS_QUEUE, TaskQueue};
pub use store::{AnalysisStore, GameRepository, PgStore, StoreError};
