//! Error types used by the lazyvisor runtime and workers.
//!
//! This module defines three error enums:
//!
//! - [`LoadError`] — a start attempt's loader failed (logic or data stage).
//! - [`WorkerError`] — errors raised by live worker executions.
//! - [`RuntimeError`] — errors raised by the supervision runtime itself.
//!
//! All types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics. A `LoadError` is always scoped to a single worker id and
//! never propagates beyond the supervisor: the failing id is marked `error`
//! and every other worker keeps running.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error returned by logic and data loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Which of the two loader sub-tasks failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Loading the worker's executable logic.
    Logic,
    /// Loading the worker's auxiliary startup data.
    Data,
}

impl LoadStage {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadStage::Logic => "logic",
            LoadStage::Data => "data",
        }
    }
}

/// # Errors produced by a worker's start-attempt loader.
///
/// Either sub-task failing fails the whole attempt; the other sub-task's
/// eventual result is discarded. The loader never retries — issuing a fresh
/// `start` after a `stop` begins a new attempt with fresh buffers.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LoadError {
    /// The logic loader failed; no live worker can be spawned.
    #[error("worker {worker}: logic load failed: {source}")]
    Logic {
        /// Id of the worker whose attempt failed.
        worker: Arc<str>,
        /// The underlying loader error.
        #[source]
        source: BoxError,
    },

    /// The data loader failed; the logic result (if any) is discarded.
    #[error("worker {worker}: data load failed: {source}")]
    Data {
        /// Id of the worker whose attempt failed.
        worker: Arc<str>,
        /// The underlying loader error.
        #[source]
        source: BoxError,
    },
}

impl LoadError {
    /// Id of the worker whose start attempt failed.
    pub fn worker(&self) -> &Arc<str> {
        match self {
            LoadError::Logic { worker, .. } | LoadError::Data { worker, .. } => worker,
        }
    }

    /// The sub-task that failed.
    pub fn stage(&self) -> LoadStage {
        match self {
            LoadError::Logic { .. } => LoadStage::Logic,
            LoadError::Data { .. } => LoadStage::Data,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadError::Logic { .. } => "logic_load_failed",
            LoadError::Data { .. } => "data_load_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LoadError::Logic { worker, source } => {
                format!("logic load for {worker} failed: {source}")
            }
            LoadError::Data { worker, source } => {
                format!("data load for {worker} failed: {source}")
            }
        }
    }
}

/// # Errors produced by live worker execution.
///
/// Returned from [`Worker::run`](crate::Worker::run). A failing or panicking
/// worker flips its own status to `error`; the supervisor and all other
/// workers are unaffected.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The worker task panicked; the panic was caught at the task boundary.
    #[error("worker panicked: {info}")]
    Panic {
        /// Panic payload rendered as text.
        info: String,
    },

    /// Worker observed cancellation and exited; treated as a graceful stop.
    #[error("context cancelled")]
    Canceled,
}

impl WorkerError {
    /// Creates a [`WorkerError::Fail`] from any displayable error.
    pub fn fail(error: impl Into<String>) -> Self {
        WorkerError::Fail { error: error.into() }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Panic { .. } => "worker_panicked",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkerError::Fail { error } => format!("error: {error}"),
            WorkerError::Panic { info } => format!("panic: {info}"),
            WorkerError::Canceled => "context cancelled".to_string(),
        }
    }

    /// True for exits that count as a graceful stop rather than a failure.
    pub fn is_graceful(&self) -> bool {
        matches!(self, WorkerError::Canceled)
    }
}

/// # Errors produced by the supervision runtime.
///
/// These represent failures of the runtime itself, never of an individual
/// worker.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some workers remained stuck and had
    /// to be force-terminated.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Ids of workers that did not shut down in time.
        stuck: Vec<String>,
    },

    /// The supervisor task is no longer running; the command was not accepted.
    #[error("supervisor is not running")]
    Stopped,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Stopped => "runtime_stopped",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; stuck workers={stuck:?}")
            }
            RuntimeError::Stopped => "supervisor is not running".to_string(),
        }
    }
}
