//! # Function-backed worker (`WorkerFn`).
//!
//! [`WorkerFn`] wraps a closure `F: FnOnce(WorkerContext) -> Fut`, avoiding a
//! trait impl for one-off workers. `FnOnce` is deliberate: a logic loader
//! produces a fresh worker per start attempt, and the worker is consumed by
//! its single run.
//!
//! ## Example
//! ```rust
//! use lazyvisor::{WorkerFn, WorkerError};
//!
//! let worker = WorkerFn::boxed(|mut ctx| async move {
//!     while let Some(msg) = ctx.inbox.recv().await {
//!         if ctx.cancel.is_cancelled() {
//!             break;
//!         }
//!         let _ = msg;
//!     }
//!     Ok::<_, WorkerError>(())
//! });
//! # let _ = worker;
//! ```

use std::future::Future;

use async_trait::async_trait;

use crate::error::WorkerError;
use crate::workers::worker::{BoxWorker, Worker, WorkerContext};

/// Function-backed worker implementation.
///
/// Wraps a closure that becomes the worker's entire run.
pub struct WorkerFn<F> {
    f: F,
}

impl<F, Fut> WorkerFn<F>
where
    F: FnOnce(WorkerContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    /// Creates a new function-backed worker.
    ///
    /// Prefer [`WorkerFn::boxed`] when you immediately need a [`BoxWorker`]
    /// (the shape logic loaders return).
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the worker and returns it as an owned handle (`Box<dyn Worker>`).
    pub fn boxed(f: F) -> BoxWorker {
        Box::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Worker for WorkerFn<F>
where
    F: FnOnce(WorkerContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), WorkerError>> + Send + 'static,
{
    async fn run(self: Box<Self>, ctx: WorkerContext) -> Result<(), WorkerError> {
        (self.f)(ctx).await
    }
}
