//! # External interface to a running supervisor.
//!
//! [`SupervisorHandle`] is cheap to clone and safe to share. Commands are
//! enqueued onto the supervisor's lossless command channel and processed
//! strictly in arrival order; queries read the
//! [`StatusBoard`](crate::StatusBoard) synchronously.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::core::command::Command;
use crate::core::status::{StatusBoard, WorkerStatus};
use crate::error::RuntimeError;
use crate::events::{Bus, Event};
use crate::workers::{Listener, Message, WorkerRef};

/// Handle for issuing commands and queries to a [`Supervisor`](crate::Supervisor).
#[derive(Clone)]
pub struct SupervisorHandle {
    commands: mpsc::UnboundedSender<Command>,
    board: Arc<StatusBoard>,
    bus: Bus,
}

impl SupervisorHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        board: Arc<StatusBoard>,
        bus: Bus,
    ) -> Self {
        Self { commands, board, bus }
    }

    /// Begins loading worker `id` with the spec's configured input.
    ///
    /// A no-op (logged) when the id is already loading, running, or errored,
    /// or when it is absent from the registry.
    pub fn start(&self, id: impl Into<String>) -> Result<(), RuntimeError> {
        self.command(Command::Start { id: id.into(), input: None })
    }

    /// Begins loading worker `id`; `input` overrides the spec's input.
    pub fn start_with_input(
        &self,
        id: impl Into<String>,
        input: Value,
    ) -> Result<(), RuntimeError> {
        self.command(Command::Start { id: id.into(), input: Some(input) })
    }

    /// Tears down worker `id` unconditionally, whatever its state, and clears
    /// its status entry. A subsequent `start` begins a fresh attempt.
    pub fn stop(&self, id: impl Into<String>) -> Result<(), RuntimeError> {
        self.command(Command::Stop { id: id.into() })
    }

    /// Announces the external configuration; every `Conditional`-strategy
    /// spec's predicate is evaluated against it, and matches are started.
    pub fn config_available(&self, config: Value) -> Result<(), RuntimeError> {
        self.command(Command::ConfigAvailable { config })
    }

    /// Sends a message to worker `id`.
    ///
    /// Buffered (losslessly, in order) while the id is loading; delivered
    /// directly while it is running; dropped (logged) otherwise.
    pub fn send(&self, id: impl Into<String>, message: Message) -> Result<(), RuntimeError> {
        self.command(Command::Send { id: id.into(), message })
    }

    /// Registers a listener for a named event worker `id` emits.
    ///
    /// Buffered while the id is loading and attached before the buffered
    /// message replay; attached directly while running; dropped (logged)
    /// otherwise.
    pub fn listen(
        &self,
        id: impl Into<String>,
        event: impl Into<Arc<str>>,
        listener: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Result<(), RuntimeError> {
        self.command(Command::Listen {
            id: id.into(),
            event: event.into(),
            listener: Arc::new(listener) as Listener,
        })
    }

    /// Current status of worker `id`; `Absent` when never started or fully
    /// stopped.
    pub fn status(&self, id: &str) -> WorkerStatus {
        self.board.status(id)
    }

    /// Live handle for worker `id`: `Some(live)` while running, `Some(inert)`
    /// while errored, `None` while loading or absent.
    pub fn get(&self, id: &str) -> Option<WorkerRef> {
        self.board.get(id)
    }

    /// Sorted snapshot of every present status entry.
    pub fn snapshot(&self) -> Vec<(String, WorkerStatus)> {
        self.board.snapshot()
    }

    /// New receiver over the lifecycle event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Cancels every active instance and waits up to the configured grace
    /// period for worker tasks to finish.
    ///
    /// Returns [`RuntimeError::GraceExceeded`] with the stuck ids when the
    /// grace period elapses first; stuck tasks are force-aborted.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (done, ack) = oneshot::channel();
        self.command(Command::Shutdown { done })?;
        ack.await.map_err(|_| RuntimeError::Stopped)?
    }

    fn command(&self, command: Command) -> Result<(), RuntimeError> {
        self.commands.send(command).map_err(|_| RuntimeError::Stopped)
    }
}
