//! Shared application state for the API tier.
//!
//! [`AppState`] bundles the store the handlers read and write, the
//! publisher that enqueues tasks for the workers, and the broker that
//! fans stored lines out to live `WebSocket` subscribers. It is generic
//! over the store and queue so tests can run the router against the
//! in-memory backends.

use gambit_core::{LineBroker, Publisher};

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState<S, Q> {
    /// Game, position and line persistence.
    pub store: S,
    /// Task publisher.
    pub publisher: Publisher<Q>,
    /// Live line fan-out, shared with the response processor.
    pub broker: LineBroker,
}

impl<S, Q> AppState<S, Q> {
    /// Bundle the shared pieces.
    pub const fn new(store: S, publisher: Publisher<Q>, broker: LineBroker) -> Self {
        Self {
            store,
            publisher,
            broker,
        }
    }
}
