//! # Worker abstractions and specifications.
//!
//! This module provides the worker-facing types:
//! - [`Worker`] - trait for the opaque, runnable logic handle
//! - [`WorkerFn`] - closure-backed worker implementation
//! - [`WorkerContext`] - everything a live worker receives at spawn
//! - [`WorkerSpec`] - static descriptor (loaders, strategy, input)
//! - [`Registry`] - read-only id → spec lookup
//! - [`Message`] / [`Emitter`] / [`WorkerRef`] - inbound traffic, outbound
//!   named events, and the live handle

mod emitter;
mod handle;
mod message;
mod registry;
mod spec;
mod worker;
mod worker_fn;

pub use emitter::{Emitter, Listener};
pub use handle::WorkerRef;
pub use message::Message;
pub use registry::Registry;
pub use spec::{
    ConfigPredicate, DataFuture, DataLoader, InputSpec, LoadStrategy, LogicFuture, LogicLoader,
    WorkerSpec,
};
pub use worker::{BoxWorker, Worker, WorkerContext};
pub use worker_fn::WorkerFn;
