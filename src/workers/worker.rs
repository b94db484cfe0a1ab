//! # Worker abstraction: the opaque, runnable logic handle.
//!
//! The supervisor never looks inside a worker. A logic loader resolves to a
//! [`BoxWorker`]; once the matching data load also succeeds, the supervisor
//! spawns the worker with a [`WorkerContext`] carrying everything it needs:
//! the resolved input, its message inbox (pre-filled with any traffic buffered
//! while it was loading), an [`Emitter`](crate::Emitter) for named outbound
//! events, and a cancellation token.
//!
//! A worker should periodically check its token (or select on it) to stop
//! cooperatively during `stop`/shutdown.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::workers::{Emitter, Message};

/// Everything a live worker receives at spawn.
///
/// The inbox is **unbounded**: the supervisor guarantees lossless, ordered
/// delivery of buffered and subsequent messages, so backpressure is the
/// embedding application's concern. Messages buffered during loading are
/// already enqueued, in arrival order, before the worker is handed the
/// context.
pub struct WorkerContext {
    /// Resolved input for this run: the explicit start input, or the spec's
    /// input (static, built from loaded data, or built from configuration).
    /// `Value::Null` when none was configured.
    pub input: Value,
    /// Ordered message inbox. `None` from `recv` means the supervisor is gone.
    pub inbox: mpsc::UnboundedReceiver<Message>,
    /// Outbound named events; listeners registered while the worker was
    /// loading are already attached.
    pub emitter: Emitter,
    /// Cancelled on `stop` and on runtime shutdown.
    pub cancel: CancellationToken,
}

/// # Asynchronous, cancelable worker.
///
/// The executable logic handle a [`LogicLoader`](crate::LogicLoader) resolves
/// to. `run` consumes the worker: every start attempt loads a fresh instance.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use lazyvisor::{Worker, WorkerContext, WorkerError};
///
/// struct Echo;
///
/// #[async_trait]
/// impl Worker for Echo {
///     async fn run(self: Box<Self>, mut ctx: WorkerContext) -> Result<(), WorkerError> {
///         loop {
///             tokio::select! {
///                 _ = ctx.cancel.cancelled() => return Ok(()),
///                 msg = ctx.inbox.recv() => match msg {
///                     Some(m) => ctx.emitter.emit(&m.name, &m.payload),
///                     None => return Ok(()),
///                 },
///             }
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + 'static {
    /// Executes the worker until completion or cancellation.
    ///
    /// Implementations should watch `ctx.cancel` and exit promptly to honor
    /// graceful teardown. Returning `Err(WorkerError::Canceled)` is treated as
    /// a graceful stop.
    async fn run(self: Box<Self>, ctx: WorkerContext) -> Result<(), WorkerError>;
}

/// Owned worker handle, as produced by a logic loader.
pub type BoxWorker = Box<dyn Worker>;
