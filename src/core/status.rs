//! # Authoritative worker status board.
//!
//! Maintains the single source of truth for lifecycle queries: worker id →
//! `loading | running | error`. Absence of an entry means "not started /
//! fully stopped".
//!
//! ## Rules
//! - Written **only** by the supervisor command loop; every mutation happens
//!   inside one command's processing, never across an await point.
//! - Read-only for everyone else, through
//!   [`SupervisorHandle`](crate::SupervisorHandle) queries.
//! - For a `running` worker the board also holds the live
//!   [`WorkerRef`](crate::WorkerRef); for an `error` worker, `get` hands out
//!   the inert ref.
//!
//! The lock is a `std::sync::RwLock`: no holder ever awaits while holding it,
//! and synchronous reads keep `status()`/`get()` callable from non-async code.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::workers::WorkerRef;

/// Lifecycle status of one worker id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Not started, or fully stopped. Never stored; the absence of an entry.
    Absent,
    /// A start attempt's loader is in flight.
    Loading,
    /// The live worker is running.
    Running,
    /// The last attempt failed (load failure, run failure, or panic).
    Error,
}

impl WorkerStatus {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerStatus::Absent => "absent",
            WorkerStatus::Loading => "loading",
            WorkerStatus::Running => "running",
            WorkerStatus::Error => "error",
        }
    }
}

struct Entry {
    status: WorkerStatus,
    /// Live handle; present only while `Running`.
    worker: Option<WorkerRef>,
}

/// Shared, read-mostly view of every worker's status.
#[derive(Default)]
pub struct StatusBoard {
    entries: RwLock<HashMap<Arc<str>, Entry>>,
}

impl StatusBoard {
    /// Creates an empty board.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current status for `id`; [`WorkerStatus::Absent`] when unknown.
    pub fn status(&self, id: &str) -> WorkerStatus {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(id).map(|e| e.status).unwrap_or(WorkerStatus::Absent)
    }

    /// Handle for `id`: the live ref while `Running`, an inert ref while
    /// `Error` (safe to send to, without effect), `None` otherwise.
    pub fn get(&self, id: &str) -> Option<WorkerRef> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(id)?;
        match entry.status {
            WorkerStatus::Running => entry.worker.clone(),
            WorkerStatus::Error => Some(WorkerRef::inert(Arc::from(id))),
            _ => None,
        }
    }

    /// Sorted snapshot of all present entries.
    pub fn snapshot(&self) -> Vec<(String, WorkerStatus)> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<(String, WorkerStatus)> = entries
            .iter()
            .map(|(id, e)| (id.to_string(), e.status))
            .collect();
        all.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub(crate) fn set_loading(&self, id: Arc<str>) {
        self.set(id, WorkerStatus::Loading, None);
    }

    pub(crate) fn set_running(&self, id: Arc<str>, worker: WorkerRef) {
        self.set(id, WorkerStatus::Running, Some(worker));
    }

    pub(crate) fn set_error(&self, id: Arc<str>) {
        self.set(id, WorkerStatus::Error, None);
    }

    /// Removes the entry entirely (status becomes `Absent`).
    pub(crate) fn clear(&self, id: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(id);
    }

    /// Removes every entry (runtime shutdown).
    pub(crate) fn clear_all(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    fn set(&self, id: Arc<str>, status: WorkerStatus, worker: Option<WorkerRef>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(id, Entry { status, worker });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_until_set() {
        let board = StatusBoard::new();
        assert_eq!(board.status("a"), WorkerStatus::Absent);
        assert!(board.get("a").is_none());

        board.set_loading(Arc::from("a"));
        assert_eq!(board.status("a"), WorkerStatus::Loading);
        assert!(board.get("a").is_none());

        board.clear("a");
        assert_eq!(board.status("a"), WorkerStatus::Absent);
    }

    #[test]
    fn errored_worker_yields_inert_ref() {
        let board = StatusBoard::new();
        board.set_error(Arc::from("broken"));
        let handle = board.get("broken").expect("inert ref");
        assert!(handle.is_inert());
        assert_eq!(handle.id(), "broken");
    }

    #[test]
    fn snapshot_is_sorted() {
        let board = StatusBoard::new();
        board.set_loading(Arc::from("b"));
        board.set_error(Arc::from("a"));
        let snap = board.snapshot();
        assert_eq!(
            snap,
            vec![
                ("a".to_string(), WorkerStatus::Error),
                ("b".to_string(), WorkerStatus::Loading),
            ]
        );
    }
}
