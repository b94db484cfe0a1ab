//! # Lifecycle events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: worker startup flow (load starting, started,
//!   stopped, load failed, worker failed)
//! - **Configuration events**: commands that could not be honored (unknown
//!   worker, duplicate start, dropped message/listener)
//! - **Shutdown events**: runtime teardown progress
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! worker id, the failing load stage, and failure reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! observed out of order across receivers.
//!
//! ## Log-record shape
//! Every event renders to the relay record consumed by logging sinks:
//! [`Event::category`] (the worker id, or `supervisor` for runtime-level
//! events) plus [`Event::message`] (a human-readable line).
//!
//! ## Example
//! ```rust
//! use lazyvisor::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::LoadFailed)
//!     .with_worker("chat")
//!     .with_reason("module not found");
//!
//! assert_eq!(ev.kind, EventKind::LoadFailed);
//! assert_eq!(ev.category(), "chat");
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::LoadStage;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Worker lifecycle events ===
    /// A start command was accepted and a loader was spawned for the id.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    LoadStarting,

    /// Both loader sub-tasks succeeded; the live worker was spawned, buffered
    /// listeners were re-attached, and the buffered queue was replayed.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    WorkerStarted,

    /// The worker was torn down: explicit stop, or a clean run-to-completion.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `reason`: `"stopped"` or `"completed"`
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    WorkerStopped,

    /// A loader sub-task failed; the id is now in `error` status.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `stage`: which sub-task failed (logic or data)
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    LoadFailed,

    /// A live worker's run failed or panicked; the id is now in `error`
    /// status.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    WorkerFailed,

    // === Configuration events ===
    /// A command referenced an id absent from the registry. Configuration
    /// error, not fatal.
    ///
    /// Sets:
    /// - `worker`: the unknown id
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    UnknownWorker,

    /// A start command targeted an id that is already loading, running, or
    /// errored. Ignored.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `reason`: current status label
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    AlreadyActive,

    /// A message addressed an id with no active loader or live worker and was
    /// dropped.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `reason`: current status label
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    MessageDropped,

    /// A listener registration addressed an id with no active loader or live
    /// worker and was dropped.
    ///
    /// Sets:
    /// - `worker`: worker id
    /// - `reason`: current status label
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ListenerDropped,

    // === Shutdown events ===
    /// Shutdown was requested; every active instance is being cancelled.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ShutdownRequested,

    /// All workers stopped within the configured grace period.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    ///
    /// Sets:
    /// - `reason`: comma-separated stuck ids
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    GraceExceeded,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::LoadStarting => "load_starting",
            EventKind::WorkerStarted => "worker_started",
            EventKind::WorkerStopped => "worker_stopped",
            EventKind::LoadFailed => "load_failed",
            EventKind::WorkerFailed => "worker_failed",
            EventKind::UnknownWorker => "unknown_worker",
            EventKind::AlreadyActive => "already_active",
            EventKind::MessageDropped => "message_dropped",
            EventKind::ListenerDropped => "listener_dropped",
            EventKind::ShutdownRequested => "shutdown_requested",
            EventKind::AllStoppedWithin => "all_stopped_within_grace",
            EventKind::GraceExceeded => "grace_exceeded",
        }
    }
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Id of the worker, if applicable.
    pub worker: Option<Arc<str>>,
    /// The failing loader sub-task, for [`EventKind::LoadFailed`].
    pub stage: Option<LoadStage>,
    /// Human-readable reason (errors, drop details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            stage: None,
            reason: None,
        }
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches the failing loader stage.
    #[inline]
    pub fn with_stage(mut self, stage: LoadStage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Logging category for this record: the worker id, or `supervisor` for
    /// runtime-level events.
    pub fn category(&self) -> &str {
        self.worker.as_deref().unwrap_or("supervisor")
    }

    /// Human-readable message line for this record.
    pub fn message(&self) -> String {
        let label = self.kind.as_label();
        match (&self.stage, &self.reason) {
            (Some(stage), Some(reason)) => {
                format!("{label} stage={} reason={reason}", stage.as_label())
            }
            (Some(stage), None) => format!("{label} stage={}", stage.as_label()),
            (None, Some(reason)) => format!("{label} reason={reason}"),
            (None, None) => label.to_string(),
        }
    }
}
