//! # lazyvisor
//!
//! **Lazyvisor** is a lightweight supervision library for lazily-loaded async
//! workers.
//!
//! A worker's executable logic and auxiliary startup data are not available up
//! front: both are fetched asynchronously and on demand — eagerly, manually,
//! or conditionally on external configuration. While a worker is still
//! loading, other parts of the system may already be sending it messages or
//! registering interest in events it will emit; the supervisor buffers those
//! interactions losslessly and hands them to the worker the instant it
//! becomes live, never duplicating or reordering them. Any one worker's
//! failure is isolated from all others and from the supervisor itself.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  WorkerSpec  │   │  WorkerSpec  │   │  WorkerSpec  │
//!     │ (registry)   │   │ (registry)   │   │ (registry)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (command loop)                                        │
//! │  - StatusBoard (id → loading | running | error)                   │
//! │  - instances  (id → Loading{buffers} | Running{handle})           │
//! │  - Bus (broadcast lifecycle events)                               │
//! └──────┬──────────────────────┬────────────────────────────┬────────┘
//!        ▼                      ▼                            │
//!   ┌──────────┐          ┌───────────┐                      │
//!   │  Loader  │ success  │   live    │                      ▼
//!   │ logic ∥  ├─────────►│  worker   │               ┌──────────────┐
//!   │ data     │          │  (task)   │               │SubscriberSet │
//!   └────┬─────┘          └───────────┘               │ (log relay)  │
//!        │ failure                                    └──────────────┘
//!        ▼
//!   status = error  (isolated; everything else keeps running)
//! ```
//!
//! ### Lifecycle
//! ```text
//! start(id) ──► Loader spawned, status = loading
//!                 ├─ messages / listeners for id are buffered, in order
//!                 ├─ logic load ∥ data load (both must succeed)
//!                 │
//!                 ├─ both ok ──► live worker spawned:
//!                 │               1. buffered listeners attached
//!                 │               2. buffered messages replayed, in order
//!                 │               3. status = running
//!                 │
//!                 └─ either fails ──► status = error
//!                                     (other sub-task's result discarded)
//!
//! stop(id) ──► active instance cancelled, status entry removed;
//!              a late loader/worker completion is silently discarded
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                   |
//! |-------------------|---------------------------------------------------------------|--------------------------------------|
//! | **Specs**         | Describe how and when each worker loads, and its input.       | [`WorkerSpec`], [`Registry`]         |
//! | **Workers**       | Opaque runnable logic with inbox, emitter, cancellation.      | [`Worker`], [`WorkerFn`], [`WorkerContext`] |
//! | **Supervision**   | Start/stop, conditional loading, handoff, failure isolation.  | [`Supervisor`], [`SupervisorHandle`] |
//! | **Status**        | Authoritative lifecycle queries, inert handles for errors.    | [`WorkerStatus`], [`WorkerRef`]      |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom sinks).  | [`Subscribe`], [`Event`]             |
//! | **Errors**        | Typed errors per failure domain.                              | [`LoadError`], [`WorkerError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use lazyvisor::{
//!     Message, Registry, Supervisor, SupervisorConfig, WorkerFn, WorkerSpec,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // A worker that logs every message it receives.
//!     let chat = WorkerSpec::new("chatWorker", || async {
//!         Ok(WorkerFn::boxed(|mut ctx| async move {
//!             while let Some(msg) = ctx.inbox.recv().await {
//!                 println!("chat got {}: {}", msg.name, msg.payload);
//!             }
//!             Ok(())
//!         }))
//!     })
//!     .with_data(|| async { Ok(json!({ "history": [] })) });
//!
//!     let handle = Supervisor::spawn(
//!         Registry::new().with_spec(chat),
//!         SupervisorConfig::default(),
//!         Vec::new(),
//!     );
//!
//!     handle.start("chatWorker")?;
//!     // Messages sent while the worker is still loading are buffered and
//!     // replayed, in order, the instant it becomes live.
//!     handle.send("chatWorker", Message::new("newMessage").with_payload(json!({ "id": 1 })))?;
//!
//!     handle.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use config::SupervisorConfig;
pub use self::core::{StatusBoard, Supervisor, SupervisorHandle, WorkerStatus};
pub use error::{BoxError, LoadError, LoadStage, RuntimeError, WorkerError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use workers::{
    BoxWorker, ConfigPredicate, DataFuture, DataLoader, Emitter, InputSpec, Listener,
    LoadStrategy, LogicFuture, LogicLoader, Message, Registry, Worker, WorkerContext, WorkerFn,
    WorkerRef, WorkerSpec,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
