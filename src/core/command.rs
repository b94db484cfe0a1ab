//! # Supervisor commands.
//!
//! Everything that can happen to the supervisor arrives as a [`Command`] on
//! one unbounded mpsc channel, processed strictly in arrival order. External
//! callers enqueue via [`SupervisorHandle`](crate::SupervisorHandle); loader
//! and worker tasks enqueue their own completions. The per-id ordering
//! guarantee (buffered-then-live, no reordering) follows from this single
//! serialization point.
//!
//! Completions carry the attempt **epoch** they belong to; the supervisor
//! discards any completion whose epoch no longer matches the active instance
//! (the attempt was stopped or superseded in the meantime).

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::core::loader::LoaderResult;
use crate::error::{LoadError, RuntimeError, WorkerError};
use crate::workers::{Listener, Message};

/// A single unit of supervisor work.
pub(crate) enum Command {
    /// Begin loading worker `id`; `input` overrides the spec's input.
    Start {
        id: String,
        input: Option<Value>,
    },
    /// Tear down worker `id` unconditionally.
    Stop {
        id: String,
    },
    /// Evaluate every conditional-strategy spec against `config`.
    ConfigAvailable {
        config: Value,
    },
    /// Deliver (or buffer) a message for worker `id`.
    Send {
        id: String,
        message: Message,
    },
    /// Register (or buffer) a listener on worker `id`'s named event.
    Listen {
        id: String,
        event: Arc<str>,
        listener: Listener,
    },
    /// A loader finished; `epoch` identifies the attempt it belongs to.
    LoaderDone {
        id: Arc<str>,
        epoch: u64,
        outcome: Result<LoaderResult, LoadError>,
    },
    /// A live worker's task finished; `epoch` identifies its attempt.
    WorkerExited {
        id: Arc<str>,
        epoch: u64,
        outcome: Result<(), WorkerError>,
    },
    /// Cancel everything, wait up to the grace period, then stop the loop.
    Shutdown {
        done: oneshot::Sender<Result<(), RuntimeError>>,
    },
}
