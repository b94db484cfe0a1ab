//! # Loader: one worker's deferred startup.
//!
//! A loader is a per-start-attempt task that brings one worker from "not
//! present" to "ready to run". It races two sub-operations:
//! - the **logic load** (always runs),
//! - the **data load** (only when the spec has a data loader; otherwise that
//!   side is immediately satisfied with no data).
//!
//! ## Rules
//! - Both succeed → one aggregated [`LoaderResult`] is reported.
//! - Either fails → one failure is reported, tagged with the failing stage;
//!   the other sub-task's eventual result is discarded (`try_join`
//!   short-circuit).
//! - Never retries. Retry policy, if any, belongs to whoever issues a fresh
//!   `start`.
//! - Holds no state after termination; the event/listener buffers for the
//!   attempt live with the supervisor's pending entry, so buffering stays
//!   synchronous with message arrival.
//!
//! ## Cancellation
//! The loader selects on its attempt token: a `stop` cancels it and the load
//! is abandoned without reporting. A completion that raced the stop is
//! discarded by the supervisor's epoch guard, so stale results never touch
//! status or buffers.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::command::Command;
use crate::error::LoadError;
use crate::workers::{BoxWorker, DataLoader, LogicLoader};

/// Aggregated output of a successful start attempt.
pub(crate) struct LoaderResult {
    /// The loaded executable logic.
    pub worker: BoxWorker,
    /// Auxiliary data, when the spec has a data loader.
    pub data: Option<serde_json::Value>,
}

impl std::fmt::Debug for LoaderResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderResult")
            .field("worker", &"<boxed worker>")
            .field("data", &self.data)
            .finish()
    }
}

/// Spawns the loader task for one start attempt.
///
/// Reports exactly one [`Command::LoaderDone`] unless cancelled first.
pub(crate) fn spawn(
    id: Arc<str>,
    epoch: u64,
    logic: LogicLoader,
    data: Option<DataLoader>,
    cancel: CancellationToken,
    commands: mpsc::UnboundedSender<Command>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let logic_id = id.clone();
        let data_id = id.clone();

        let load = async {
            let logic_fut = async {
                (logic)().await.map_err(|source| LoadError::Logic {
                    worker: logic_id.clone(),
                    source,
                })
            };
            let data_fut = async {
                match &data {
                    Some(loader) => (loader)().await.map(Some).map_err(|source| LoadError::Data {
                        worker: data_id.clone(),
                        source,
                    }),
                    None => Ok(None),
                }
            };
            tokio::try_join!(logic_fut, data_fut)
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                // Stopped mid-load; the in-flight sub-tasks are dropped and
                // nothing is reported.
            }
            outcome = load => {
                let outcome = outcome.map(|(worker, data)| LoaderResult { worker, data });
                let _ = commands.send(Command::LoaderDone { id, epoch, outcome });
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadStage;
    use crate::workers::{WorkerFn, WorkerSpec};
    use serde_json::json;

    fn loader_parts(spec: &WorkerSpec) -> (LogicLoader, Option<DataLoader>) {
        (spec.logic().clone(), spec.data().cloned())
    }

    async fn recv_done(rx: &mut mpsc::UnboundedReceiver<Command>) -> Result<LoaderResult, LoadError> {
        match rx.recv().await {
            Some(Command::LoaderDone { outcome, .. }) => outcome,
            _ => panic!("expected LoaderDone"),
        }
    }

    #[tokio::test]
    async fn joins_logic_and_data() {
        let spec = WorkerSpec::new("w", || async {
            Ok(WorkerFn::boxed(|_ctx| async { Ok(()) }))
        })
        .with_data(|| async { Ok(json!({ "rows": 3 })) });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (logic, data) = loader_parts(&spec);
        spawn(spec.id().clone(), 1, logic, data, CancellationToken::new(), tx);

        let result = recv_done(&mut rx).await.expect("load should succeed");
        assert_eq!(result.data, Some(json!({ "rows": 3 })));
    }

    #[tokio::test]
    async fn missing_data_loader_is_immediately_satisfied() {
        let spec = WorkerSpec::new("w", || async {
            Ok(WorkerFn::boxed(|_ctx| async { Ok(()) }))
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (logic, data) = loader_parts(&spec);
        spawn(spec.id().clone(), 1, logic, data, CancellationToken::new(), tx);

        let result = recv_done(&mut rx).await.expect("load should succeed");
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn logic_failure_short_circuits_pending_data() {
        // Data side never resolves; the failing logic side must still produce
        // a single tagged failure.
        let spec = WorkerSpec::new("w", || async { Err("module not found".into()) })
            .with_data(|| async {
                std::future::pending::<()>().await;
                Ok(json!(null))
            });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (logic, data) = loader_parts(&spec);
        spawn(spec.id().clone(), 1, logic, data, CancellationToken::new(), tx);

        let err = recv_done(&mut rx).await.expect_err("load should fail");
        assert_eq!(err.stage(), LoadStage::Logic);
        assert_eq!(err.worker().as_ref(), "w");
    }

    #[tokio::test]
    async fn data_failure_is_tagged() {
        let spec = WorkerSpec::new("w", || async {
            Ok(WorkerFn::boxed(|_ctx| async { Ok(()) }))
        })
        .with_data(|| async { Err("404".into()) });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let (logic, data) = loader_parts(&spec);
        spawn(spec.id().clone(), 1, logic, data, CancellationToken::new(), tx);

        let err = recv_done(&mut rx).await.expect_err("load should fail");
        assert_eq!(err.stage(), LoadStage::Data);
    }

    #[tokio::test]
    async fn cancellation_reports_nothing() {
        let spec = WorkerSpec::new("w", || async {
            std::future::pending::<()>().await;
            Ok(WorkerFn::boxed(|_ctx| async { Ok(()) }))
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let (logic, data) = loader_parts(&spec);
        let join = spawn(spec.id().clone(), 1, logic, data, cancel.clone(), tx);

        cancel.cancel();
        join.await.expect("loader task joins");

        // Sender dropped without reporting.
        assert!(rx.recv().await.is_none());
    }
}
