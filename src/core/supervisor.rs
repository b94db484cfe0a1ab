//! # Supervisor: authoritative lifecycle control over the worker population.
//!
//! The [`Supervisor`] owns the status board and the active-instance set, and
//! processes every command on a single lossless channel, strictly in arrival
//! order. It spawns a [`loader`](crate::core::loader) per start attempt,
//! performs the loader→live handoff, and isolates any one worker's failure
//! from all others and from itself.
//!
//! ## High-level architecture
//! ```text
//! SupervisorHandle ──┐
//! loader tasks ──────┼──► command channel ──► Supervisor loop
//! worker tasks ──────┘         (mpsc)             │
//!                                                 ├─► instances: id → Loading{buffers} | Running{ref}
//!                                                 ├─► StatusBoard: id → loading | running | error
//!                                                 └─► Bus ──► subscriber listener ──► SubscriberSet
//! ```
//!
//! ## State machine per worker id
//! ```text
//! absent ──(start)──────────────► loading   [loader spawned, buffers fresh]
//! loading ──(start)─────────────► loading   [no-op, logged]
//! loading ──(loader success)────► running   [spawn live worker:
//!                                             attach buffered listeners,
//!                                             replay buffered queue in order]
//! loading ──(loader failure)────► error     [stage-tagged, isolated]
//! running ──(worker error/panic)► error     [isolated]
//! running ──(worker clean exit)─► absent    [fully stopped]
//! any ──(stop)──────────────────► absent    [token cancelled, entry deleted]
//! ```
//!
//! ## Rules
//! - At most one active instance (loader or live worker) per id.
//! - Every handler is synchronous: a status transition is one
//!   read-modify-write with no await point in the middle.
//! - Completions carry their attempt epoch; stale completions (after a stop
//!   or a newer start) are discarded without touching status or buffers.
//! - A hung loader stays `loading` until stopped: there is no implicit
//!   timeout, `stop` is the sole cancellation primitive.
//! - One worker's failure never unwinds the loop; worker panics are caught at
//!   the task boundary.

use std::collections::HashMap;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SupervisorConfig;
use crate::core::command::Command;
use crate::core::handle::SupervisorHandle;
use crate::core::loader::{self, LoaderResult};
use crate::core::status::{StatusBoard, WorkerStatus};
use crate::error::{LoadError, RuntimeError, WorkerError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::workers::{
    Emitter, InputSpec, Listener, LoadStrategy, Message, Registry, WorkerContext, WorkerRef,
};

/// A start attempt whose loader is still in flight, with the traffic buffered
/// for it.
struct Pending {
    epoch: u64,
    cancel: CancellationToken,
    join: JoinHandle<()>,
    /// Inbound messages in strict arrival order.
    queue: Vec<Message>,
    /// Listener registrations, merged into the live emitter before replay.
    listeners: HashMap<Arc<str>, Vec<Listener>>,
    /// Explicit start input overriding the spec's.
    input: Option<Value>,
}

/// A live worker instance.
struct Live {
    epoch: u64,
    cancel: CancellationToken,
    join: JoinHandle<()>,
    worker: WorkerRef,
}

/// The active instance for one id.
enum Instance {
    Loading(Pending),
    Running(Live),
}

impl Instance {
    fn cancel(&self) {
        match self {
            Instance::Loading(p) => p.cancel.cancel(),
            Instance::Running(l) => l.cancel.cancel(),
        }
    }

    fn into_join(self) -> JoinHandle<()> {
        match self {
            Instance::Loading(p) => p.join,
            Instance::Running(l) => l.join,
        }
    }
}

/// Long-lived authority managing worker lifecycle, status, and the
/// loader-to-live handoff.
pub struct Supervisor {
    registry: Registry,
    cfg: SupervisorConfig,
    bus: Bus,
    board: Arc<StatusBoard>,
    commands: mpsc::UnboundedReceiver<Command>,
    commands_tx: mpsc::UnboundedSender<Command>,
    instances: HashMap<Arc<str>, Instance>,
    next_epoch: u64,
    runtime_token: CancellationToken,
}

impl Supervisor {
    /// Spawns the supervisor task over the given registry and returns its
    /// handle.
    ///
    /// Eager-strategy specs are started immediately. The task runs until
    /// [`SupervisorHandle::shutdown`] is called (or the runtime is dropped).
    pub fn spawn(
        registry: Registry,
        cfg: SupervisorConfig,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> SupervisorHandle {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let board = Arc::new(StatusBoard::new());
        let (tx, rx) = mpsc::unbounded_channel();

        Self::subscriber_listener(&bus, SubscriberSet::new(subscribers));

        let supervisor = Supervisor {
            registry,
            cfg,
            bus: bus.clone(),
            board: Arc::clone(&board),
            commands: rx,
            commands_tx: tx.clone(),
            instances: HashMap::new(),
            next_epoch: 0,
            runtime_token: CancellationToken::new(),
        };
        tokio::spawn(supervisor.run());

        SupervisorHandle::new(tx, board, bus)
    }

    /// Subscribes to the bus and forwards events to the subscriber set
    /// (fire-and-forget).
    fn subscriber_listener(bus: &Bus, subs: SubscriberSet) {
        let mut rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => subs.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    async fn run(mut self) {
        self.start_eager();
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Start { id, input } => self.handle_start(&id, input),
                Command::Stop { id } => self.handle_stop(&id),
                Command::ConfigAvailable { config } => self.handle_config(&config),
                Command::Send { id, message } => self.handle_send(&id, message),
                Command::Listen { id, event, listener } => {
                    self.handle_listen(&id, event, listener)
                }
                Command::LoaderDone { id, epoch, outcome } => {
                    self.handle_loader_done(id, epoch, outcome)
                }
                Command::WorkerExited { id, epoch, outcome } => {
                    self.handle_worker_exited(id, epoch, outcome)
                }
                Command::Shutdown { done } => {
                    let _ = done.send(self.shutdown().await);
                    break;
                }
            }
        }
    }

    /// Issues `start` once for every eager-strategy spec.
    fn start_eager(&mut self) {
        let eager: Vec<String> = self
            .registry
            .iter()
            .filter(|spec| matches!(spec.strategy(), LoadStrategy::Eager))
            .map(|spec| spec.id().to_string())
            .collect();
        for id in eager {
            self.handle_start(&id, None);
        }
    }

    fn handle_start(&mut self, id: &str, input: Option<Value>) {
        let Some(spec) = self.registry.get(id) else {
            tracing::warn!(worker = id, "start for id absent from registry");
            self.publish(Event::now(EventKind::UnknownWorker).with_worker(id));
            return;
        };

        // Any present status entry (loading, running, or error) blocks a new
        // start; restarting an errored worker requires an explicit stop first.
        let status = self.board.status(id);
        if status != WorkerStatus::Absent {
            self.publish(
                Event::now(EventKind::AlreadyActive)
                    .with_worker(spec.id().clone())
                    .with_reason(status.as_label()),
            );
            return;
        }

        let wid = spec.id().clone();
        let epoch = self.next_epoch;
        self.next_epoch += 1;

        let cancel = self.runtime_token.child_token();
        let join = loader::spawn(
            wid.clone(),
            epoch,
            spec.logic().clone(),
            spec.data().cloned(),
            cancel.clone(),
            self.commands_tx.clone(),
        );

        self.instances.insert(
            wid.clone(),
            Instance::Loading(Pending {
                epoch,
                cancel,
                join,
                queue: Vec::new(),
                listeners: HashMap::new(),
                input,
            }),
        );
        self.board.set_loading(wid.clone());
        self.publish(Event::now(EventKind::LoadStarting).with_worker(wid));
    }

    fn handle_stop(&mut self, id: &str) {
        if !self.registry.contains(id) {
            tracing::warn!(worker = id, "stop for id absent from registry");
            self.publish(Event::now(EventKind::UnknownWorker).with_worker(id));
            return;
        }

        let had_instance = match self.instances.remove(id) {
            Some(instance) => {
                instance.cancel();
                true
            }
            None => false,
        };
        let had_status = self.board.status(id) != WorkerStatus::Absent;
        self.board.clear(id);

        if had_instance || had_status {
            self.publish(
                Event::now(EventKind::WorkerStopped)
                    .with_worker(id)
                    .with_reason("stopped"),
            );
        } else {
            tracing::debug!(worker = id, "stop for inactive worker ignored");
        }
    }

    /// Evaluates every conditional spec against the announced configuration.
    ///
    /// Repeated signals re-evaluate; ids already active are skipped by the
    /// duplicate-start guard in `handle_start`.
    fn handle_config(&mut self, config: &Value) {
        let mut matched: Vec<(String, Option<Value>)> = Vec::new();
        for spec in self.registry.iter() {
            let LoadStrategy::Conditional(predicate) = spec.strategy() else {
                continue;
            };
            if !predicate(config) {
                continue;
            }
            let input = match spec.input() {
                InputSpec::FromConfig(build) => Some(build(config)),
                _ => None,
            };
            matched.push((spec.id().to_string(), input));
        }
        for (id, input) in matched {
            self.handle_start(&id, input);
        }
    }

    fn handle_send(&mut self, id: &str, message: Message) {
        if !self.registry.contains(id) {
            tracing::warn!(worker = id, "message for id absent from registry");
            self.publish(Event::now(EventKind::UnknownWorker).with_worker(id));
            return;
        }
        match self.instances.get_mut(id) {
            Some(Instance::Loading(pending)) => pending.queue.push(message),
            Some(Instance::Running(live)) => live.worker.send(message),
            None => {
                let status = self.board.status(id);
                self.publish(
                    Event::now(EventKind::MessageDropped)
                        .with_worker(id)
                        .with_reason(status.as_label()),
                );
            }
        }
    }

    fn handle_listen(&mut self, id: &str, event: Arc<str>, listener: Listener) {
        if !self.registry.contains(id) {
            tracing::warn!(worker = id, "listener for id absent from registry");
            self.publish(Event::now(EventKind::UnknownWorker).with_worker(id));
            return;
        }
        match self.instances.get_mut(id) {
            Some(Instance::Loading(pending)) => {
                pending.listeners.entry(event).or_default().push(listener);
            }
            Some(Instance::Running(live)) => live.worker.attach(event, listener),
            None => {
                let status = self.board.status(id);
                self.publish(
                    Event::now(EventKind::ListenerDropped)
                        .with_worker(id)
                        .with_reason(status.as_label()),
                );
            }
        }
    }

    fn handle_loader_done(
        &mut self,
        id: Arc<str>,
        epoch: u64,
        outcome: Result<LoaderResult, LoadError>,
    ) {
        // Epoch guard: a completion that raced a stop (or a newer start) is
        // discarded without touching status or buffers.
        let pending = match self.instances.remove(id.as_ref()) {
            Some(Instance::Loading(pending)) if pending.epoch == epoch => pending,
            Some(other) => {
                self.instances.insert(id.clone(), other);
                tracing::debug!(worker = %id, epoch, "stale loader completion discarded");
                return;
            }
            None => {
                tracing::debug!(worker = %id, epoch, "loader completion for stopped worker discarded");
                return;
            }
        };

        match outcome {
            Ok(result) => self.spawn_live(id, pending, result),
            Err(err) => {
                // The attempt is over; whatever was buffered for it is
                // discarded, a fresh start gets fresh buffers.
                if self.cfg.debug {
                    eprintln!("[lazyvisor] {}", err.as_message());
                }
                self.board.set_error(id.clone());
                self.publish(
                    Event::now(EventKind::LoadFailed)
                        .with_worker(id)
                        .with_stage(err.stage())
                        .with_reason(err.as_message()),
                );
            }
        }
    }

    /// The loader→live handoff: resolve input, attach buffered listeners,
    /// spawn the worker task, replay the buffered queue in order, flip status.
    fn spawn_live(&mut self, id: Arc<str>, pending: Pending, result: LoaderResult) {
        let LoaderResult { worker, data } = result;
        let Pending {
            epoch,
            cancel,
            queue,
            listeners,
            input,
            ..
        } = pending;

        let input = self.resolve_input(&id, input, data.as_ref());

        let emitter = Emitter::new();
        for (event, registered) in listeners {
            for listener in registered {
                emitter.on(event.clone(), listener);
            }
        }

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let ctx = WorkerContext {
            input,
            inbox: inbox_rx,
            emitter: emitter.clone(),
            cancel: cancel.clone(),
        };

        let commands = self.commands_tx.clone();
        let wid = id.clone();
        let join = tokio::spawn(async move {
            let outcome = match std::panic::AssertUnwindSafe(worker.run(ctx))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(panic) => Err(WorkerError::Panic {
                    info: panic_info(&panic),
                }),
            };
            let _ = commands.send(Command::WorkerExited {
                id: wid,
                epoch,
                outcome,
            });
        });

        let worker_ref = WorkerRef::live(id.clone(), inbox_tx.clone(), emitter);
        // Replay strictly before the flip to running: the supervisor is the
        // only inbox writer, so nothing can overtake the buffered traffic.
        for message in queue {
            let _ = inbox_tx.send(message);
        }

        self.instances.insert(
            id.clone(),
            Instance::Running(Live {
                epoch,
                cancel,
                join,
                worker: worker_ref.clone(),
            }),
        );
        self.board.set_running(id.clone(), worker_ref);
        self.publish(Event::now(EventKind::WorkerStarted).with_worker(id));
    }

    fn handle_worker_exited(
        &mut self,
        id: Arc<str>,
        epoch: u64,
        outcome: Result<(), WorkerError>,
    ) {
        let live = match self.instances.remove(id.as_ref()) {
            Some(Instance::Running(live)) if live.epoch == epoch => live,
            Some(other) => {
                self.instances.insert(id.clone(), other);
                tracing::debug!(worker = %id, epoch, "stale worker exit discarded");
                return;
            }
            None => {
                tracing::debug!(worker = %id, epoch, "exit of stopped worker discarded");
                return;
            }
        };
        drop(live);

        match outcome {
            Ok(()) => self.worker_stopped(id),
            Err(err) if err.is_graceful() => self.worker_stopped(id),
            Err(err) => {
                if self.cfg.debug {
                    eprintln!("[lazyvisor] worker {id}: {}", err.as_message());
                }
                self.board.set_error(id.clone());
                self.publish(
                    Event::now(EventKind::WorkerFailed)
                        .with_worker(id)
                        .with_reason(err.as_message()),
                );
            }
        }
    }

    /// Clean run-to-completion: the entry is removed, the id reads as fully
    /// stopped.
    fn worker_stopped(&mut self, id: Arc<str>) {
        self.board.clear(&id);
        self.publish(
            Event::now(EventKind::WorkerStopped)
                .with_worker(id)
                .with_reason("completed"),
        );
    }

    /// Resolves the live worker's input: the explicit start input wins,
    /// otherwise the spec's input, against the loaded data.
    fn resolve_input(&self, id: &Arc<str>, explicit: Option<Value>, data: Option<&Value>) -> Value {
        if let Some(value) = explicit {
            return value;
        }
        let resolved = self
            .registry
            .get(id)
            .and_then(|spec| spec.input().resolve(data));
        match resolved {
            Some(value) => value,
            None => {
                // Config-derived input, but the start was not config-driven
                // (manual or eager). A registration mistake; degrades to null
                // input rather than failing the attempt.
                tracing::warn!(worker = %id, "config-derived input without configuration; using null");
                Value::Null
            }
        }
    }

    async fn shutdown(&mut self) -> Result<(), RuntimeError> {
        self.publish(Event::now(EventKind::ShutdownRequested));
        self.runtime_token.cancel();

        let instances = std::mem::take(&mut self.instances);
        self.board.clear_all();

        let deadline = tokio::time::Instant::now() + self.cfg.grace;
        let mut stuck = Vec::new();
        for (id, instance) in instances {
            let join = instance.into_join();
            let abort = join.abort_handle();
            if tokio::time::timeout_at(deadline, join).await.is_err() {
                abort.abort();
                stuck.push(id.to_string());
            }
        }

        if stuck.is_empty() {
            self.publish(Event::now(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            stuck.sort_unstable();
            self.publish(Event::now(EventKind::GraceExceeded).with_reason(stuck.join(",")));
            Err(RuntimeError::GraceExceeded {
                grace: self.cfg.grace,
                stuck,
            })
        }
    }

    fn publish(&self, event: Event) {
        self.bus.publish(event);
    }
}

/// Renders a caught panic payload for diagnostics.
fn panic_info(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::{BoxWorker, WorkerFn, WorkerSpec};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::watch;

    fn spawn_supervisor(registry: Registry) -> SupervisorHandle {
        Supervisor::spawn(registry, SupervisorConfig::default(), Vec::new())
    }

    /// Worker that appends every received payload to `log` and stops on
    /// cancellation.
    fn recording_worker(log: Arc<Mutex<Vec<Value>>>) -> BoxWorker {
        WorkerFn::boxed(move |mut ctx| async move {
            loop {
                tokio::select! {
                    _ = ctx.cancel.cancelled() => return Ok(()),
                    msg = ctx.inbox.recv() => match msg {
                        Some(m) => log.lock().unwrap().push(m.payload),
                        None => return Ok(()),
                    },
                }
            }
        })
    }

    /// Spec whose logic load is gated on a watch flag, for deterministic
    /// mid-load assertions.
    fn gated_recording_spec(
        id: &str,
        log: Arc<Mutex<Vec<Value>>>,
        gate: watch::Receiver<bool>,
        loads: Arc<AtomicUsize>,
    ) -> WorkerSpec {
        WorkerSpec::new(id, move || {
            let mut gate = gate.clone();
            let log = log.clone();
            loads.fetch_add(1, Ordering::SeqCst);
            async move {
                let _ = gate.wait_for(|open| *open).await;
                Ok(recording_worker(log))
            }
        })
    }

    async fn wait_for_status(handle: &SupervisorHandle, id: &str, want: WorkerStatus) {
        let reached = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if handle.status(id) == want {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await;
        assert!(reached.is_ok(), "timed out waiting for {id} to be {want:?}");
    }

    async fn wait_for_len(log: &Arc<Mutex<Vec<Value>>>, want: usize) {
        let reached = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if log.lock().unwrap().len() >= want {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await;
        assert!(reached.is_ok(), "timed out waiting for {want} entries");
    }

    async fn wait_for_event(
        events: &mut tokio::sync::broadcast::Receiver<Event>,
        kind: EventKind,
    ) -> Event {
        let found = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match events.recv().await {
                    Ok(ev) if ev.kind == kind => return ev,
                    Ok(_) => continue,
                    Err(err) => panic!("event stream ended early: {err}"),
                }
            }
        })
        .await;
        found.unwrap_or_else(|_| panic!("timed out waiting for {kind:?}"))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn absent_before_start_and_after_stop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let spec = WorkerSpec::new("w", move || {
            let log = log2.clone();
            async move { Ok(recording_worker(log)) }
        });
        let handle = spawn_supervisor(Registry::new().with_spec(spec));

        assert_eq!(handle.status("w"), WorkerStatus::Absent);
        assert!(handle.get("w").is_none());

        handle.start("w").expect("start");
        wait_for_status(&handle, "w", WorkerStatus::Running).await;

        handle.stop("w").expect("stop");
        wait_for_status(&handle, "w", WorkerStatus::Absent).await;
        assert!(handle.get("w").is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn successful_load_runs_through_loading() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (gate, gate_rx) = watch::channel(false);
        let loads = Arc::new(AtomicUsize::new(0));
        let spec = gated_recording_spec("w", log, gate_rx, loads);
        let handle = spawn_supervisor(Registry::new().with_spec(spec));

        handle.start("w").expect("start");
        wait_for_status(&handle, "w", WorkerStatus::Loading).await;
        assert!(handle.get("w").is_none(), "no handle while loading");

        gate.send(true).expect("open gate");
        wait_for_status(&handle, "w", WorkerStatus::Running).await;
        let live = handle.get("w").expect("live handle");
        assert!(!live.is_inert());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn logic_load_failure_marks_error() {
        let spec = WorkerSpec::new("w", || async { Err("module not found".into()) });
        let handle = spawn_supervisor(Registry::new().with_spec(spec));
        let mut events = handle.events();

        handle.start("w").expect("start");
        wait_for_status(&handle, "w", WorkerStatus::Error).await;

        let ev = wait_for_event(&mut events, EventKind::LoadFailed).await;
        assert_eq!(ev.stage, Some(crate::error::LoadStage::Logic));

        let inert = handle.get("w").expect("inert handle");
        assert!(inert.is_inert());
        inert.send(Message::new("ignored"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn data_load_failure_marks_error() {
        let spec = WorkerSpec::new("w", || async {
            Ok(WorkerFn::boxed(|_ctx| async { Ok(()) }))
        })
        .with_data(|| async { Err("404".into()) });
        let handle = spawn_supervisor(Registry::new().with_spec(spec));
        let mut events = handle.events();

        handle.start("w").expect("start");
        wait_for_status(&handle, "w", WorkerStatus::Error).await;

        let ev = wait_for_event(&mut events, EventKind::LoadFailed).await;
        assert_eq!(ev.stage, Some(crate::error::LoadStage::Data));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn buffered_messages_replay_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (gate, gate_rx) = watch::channel(false);
        let loads = Arc::new(AtomicUsize::new(0));
        let spec = gated_recording_spec("chatWorker", log.clone(), gate_rx, loads);
        let handle = spawn_supervisor(Registry::new().with_spec(spec));

        handle.start("chatWorker").expect("start");
        wait_for_status(&handle, "chatWorker", WorkerStatus::Loading).await;

        handle
            .send(
                "chatWorker",
                Message::new("newMessage").with_payload(json!({ "id": 1 })),
            )
            .expect("send");
        handle
            .send(
                "chatWorker",
                Message::new("newMessage").with_payload(json!({ "id": 2 })),
            )
            .expect("send");

        gate.send(true).expect("open gate");
        wait_for_status(&handle, "chatWorker", WorkerStatus::Running).await;
        wait_for_len(&log, 2).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec![json!({ "id": 1 }), json!({ "id": 2 })]
        );

        // A post-spawn message lands strictly after the replayed ones.
        handle
            .send(
                "chatWorker",
                Message::new("newMessage").with_payload(json!({ "id": 3 })),
            )
            .expect("send");
        wait_for_len(&log, 3).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec![json!({ "id": 1 }), json!({ "id": 2 }), json!({ "id": 3 })]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn duplicate_start_is_a_logged_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (gate, gate_rx) = watch::channel(false);
        let loads = Arc::new(AtomicUsize::new(0));
        let spec = gated_recording_spec("w", log, gate_rx, loads.clone());
        let handle = spawn_supervisor(Registry::new().with_spec(spec));
        let mut events = handle.events();

        handle.start("w").expect("start");
        handle.start("w").expect("second start");
        wait_for_event(&mut events, EventKind::AlreadyActive).await;

        gate.send(true).expect("open gate");
        wait_for_status(&handle, "w", WorkerStatus::Running).await;
        assert_eq!(loads.load(Ordering::SeqCst), 1, "one loader invocation");

        // Still active: a third start is also ignored.
        handle.start("w").expect("third start");
        wait_for_event(&mut events, EventKind::AlreadyActive).await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn stop_during_loading_discards_late_result() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (gate, gate_rx) = watch::channel(false);
        let loads = Arc::new(AtomicUsize::new(0));
        let spec = gated_recording_spec("w", log, gate_rx, loads);
        let handle = spawn_supervisor(Registry::new().with_spec(spec));
        let mut events = handle.events();

        handle.start("w").expect("start");
        wait_for_status(&handle, "w", WorkerStatus::Loading).await;

        handle.stop("w").expect("stop");
        wait_for_event(&mut events, EventKind::WorkerStopped).await;
        assert_eq!(handle.status("w"), WorkerStatus::Absent);

        // The loader may now resolve; nothing must be spawned.
        gate.send(true).expect("open gate");
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(handle.status("w"), WorkerStatus::Absent);
        assert!(handle.get("w").is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn conditional_start_follows_predicate() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let spec = WorkerSpec::new("feature", move || {
            let log = log2.clone();
            async move { Ok(recording_worker(log)) }
        })
        .when(|cfg| cfg["featureX"] == true);
        let handle = spawn_supervisor(Registry::new().with_spec(spec));
        let mut events = handle.events();

        handle
            .config_available(json!({ "featureX": false }))
            .expect("config");
        // Barrier: an unknown-id start is processed after the config signal.
        handle.start("probe").expect("probe");
        wait_for_event(&mut events, EventKind::UnknownWorker).await;
        assert_eq!(handle.status("feature"), WorkerStatus::Absent);

        handle
            .config_available(json!({ "featureX": true }))
            .expect("config");
        wait_for_status(&handle, "feature", WorkerStatus::Running).await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn repeated_config_signals_do_not_double_start() {
        let loads = Arc::new(AtomicUsize::new(0));
        let loads2 = loads.clone();
        let spec = WorkerSpec::new("feature", move || {
            loads2.fetch_add(1, Ordering::SeqCst);
            async move { Ok(WorkerFn::boxed(|mut ctx| async move {
                while ctx.inbox.recv().await.is_some() {}
                Ok(())
            })) }
        })
        .when(|cfg| cfg["featureX"] == true);
        let handle = spawn_supervisor(Registry::new().with_spec(spec));
        let mut events = handle.events();

        handle
            .config_available(json!({ "featureX": true }))
            .expect("config");
        wait_for_status(&handle, "feature", WorkerStatus::Running).await;
        handle
            .config_available(json!({ "featureX": true }))
            .expect("config again");
        wait_for_event(&mut events, EventKind::AlreadyActive).await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn config_derived_input_reaches_worker() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let spec = WorkerSpec::new("feature", move || {
            let seen = seen2.clone();
            async move {
                Ok(WorkerFn::boxed(move |mut ctx| async move {
                    seen.lock().unwrap().push(ctx.input.clone());
                    while ctx.inbox.recv().await.is_some() {}
                    Ok(())
                }))
            }
        })
        .when(|cfg| cfg["featureX"] == true)
        .with_input_from_config(|cfg| json!({ "mode": cfg["mode"] }));
        let handle = spawn_supervisor(Registry::new().with_spec(spec));

        handle
            .config_available(json!({ "featureX": true, "mode": "turbo" }))
            .expect("config");
        wait_for_status(&handle, "feature", WorkerStatus::Running).await;
        wait_for_len(&seen, 1).await;
        assert_eq!(seen.lock().unwrap()[0], json!({ "mode": "turbo" }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn eager_spec_starts_once_at_init() {
        let loads = Arc::new(AtomicUsize::new(0));
        let loads2 = loads.clone();
        let spec = WorkerSpec::new("ticker", move || {
            loads2.fetch_add(1, Ordering::SeqCst);
            async move {
                Ok(WorkerFn::boxed(|mut ctx| async move {
                    while ctx.inbox.recv().await.is_some() {}
                    Ok(())
                }))
            }
        })
        .eager();
        let handle = spawn_supervisor(Registry::new().with_spec(spec));

        wait_for_status(&handle, "ticker", WorkerStatus::Running).await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn input_from_data_sees_loaded_data() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let spec = WorkerSpec::new("w", move || {
            let seen = seen2.clone();
            async move {
                Ok(WorkerFn::boxed(move |mut ctx| async move {
                    seen.lock().unwrap().push(ctx.input.clone());
                    while ctx.inbox.recv().await.is_some() {}
                    Ok(())
                }))
            }
        })
        .with_data(|| async { Ok(json!({ "rows": [10, 20] })) })
        .with_input_from_data(|data| {
            json!({ "first": data.and_then(|d| d["rows"].get(0)).cloned() })
        });
        let handle = spawn_supervisor(Registry::new().with_spec(spec));

        handle.start("w").expect("start");
        wait_for_status(&handle, "w", WorkerStatus::Running).await;
        wait_for_len(&seen, 1).await;
        assert_eq!(seen.lock().unwrap()[0], json!({ "first": 10 }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn explicit_start_input_overrides_spec_input() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        let spec = WorkerSpec::new("w", move || {
            let seen = seen2.clone();
            async move {
                Ok(WorkerFn::boxed(move |mut ctx| async move {
                    seen.lock().unwrap().push(ctx.input.clone());
                    while ctx.inbox.recv().await.is_some() {}
                    Ok(())
                }))
            }
        })
        .with_input(json!({ "from": "spec" }));
        let handle = spawn_supervisor(Registry::new().with_spec(spec));

        handle
            .start_with_input("w", json!({ "from": "caller" }))
            .expect("start");
        wait_for_status(&handle, "w", WorkerStatus::Running).await;
        wait_for_len(&seen, 1).await;
        assert_eq!(seen.lock().unwrap()[0], json!({ "from": "caller" }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn listener_buffered_while_loading_fires_after_spawn() {
        let (gate, gate_rx) = watch::channel(false);
        let spec = WorkerSpec::new("echo", move || {
            let mut gate = gate_rx.clone();
            async move {
                let _ = gate.wait_for(|open| *open).await;
                Ok(WorkerFn::boxed(|mut ctx| async move {
                    loop {
                        tokio::select! {
                            _ = ctx.cancel.cancelled() => return Ok(()),
                            msg = ctx.inbox.recv() => match msg {
                                Some(m) => ctx.emitter.emit("pong", &m.payload),
                                None => return Ok(()),
                            },
                        }
                    }
                }))
            }
        });
        let handle = spawn_supervisor(Registry::new().with_spec(spec));

        handle.start("echo").expect("start");
        wait_for_status(&handle, "echo", WorkerStatus::Loading).await;

        let heard = Arc::new(Mutex::new(Vec::new()));
        let heard2 = heard.clone();
        handle
            .listen("echo", "pong", move |payload| {
                heard2.lock().unwrap().push(payload.clone());
            })
            .expect("listen");
        handle
            .send("echo", Message::new("ping").with_payload(json!({ "n": 7 })))
            .expect("send");

        gate.send(true).expect("open gate");
        wait_for_status(&handle, "echo", WorkerStatus::Running).await;
        wait_for_len(&heard, 1).await;
        assert_eq!(heard.lock().unwrap()[0], json!({ "n": 7 }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn worker_failure_is_isolated() {
        let bad = WorkerSpec::new("bad", || async {
            Ok(WorkerFn::boxed(|_ctx| async {
                Err(WorkerError::fail("boom"))
            }))
        });
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let good = WorkerSpec::new("good", move || {
            let log = log2.clone();
            async move { Ok(recording_worker(log)) }
        });
        let handle = spawn_supervisor(Registry::new().with_spec(bad).with_spec(good));

        handle.start("good").expect("start good");
        handle.start("bad").expect("start bad");
        wait_for_status(&handle, "bad", WorkerStatus::Error).await;
        wait_for_status(&handle, "good", WorkerStatus::Running).await;

        assert!(handle.get("bad").expect("inert").is_inert());
        assert!(!handle.get("good").expect("live").is_inert());

        // The supervisor keeps serving the healthy worker.
        handle
            .send("good", Message::new("m").with_payload(json!(1)))
            .expect("send");
        wait_for_len(&log, 1).await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn worker_panic_is_contained() {
        let spec = WorkerSpec::new("volatile", || async {
            Ok(WorkerFn::boxed(|_ctx| async { panic!("kaboom") }))
        });
        let handle = spawn_supervisor(Registry::new().with_spec(spec));
        let mut events = handle.events();

        handle.start("volatile").expect("start");
        wait_for_status(&handle, "volatile", WorkerStatus::Error).await;

        let ev = wait_for_event(&mut events, EventKind::WorkerFailed).await;
        assert!(ev.reason.as_deref().unwrap_or_default().contains("kaboom"));

        // The loop is still alive and serving commands.
        handle.stop("volatile").expect("stop");
        wait_for_status(&handle, "volatile", WorkerStatus::Absent).await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn restart_after_stop_uses_fresh_buffers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (gate, gate_rx) = watch::channel(false);
        let loads = Arc::new(AtomicUsize::new(0));
        let spec = gated_recording_spec("w", log.clone(), gate_rx, loads);
        let handle = spawn_supervisor(Registry::new().with_spec(spec));

        handle.start("w").expect("start");
        wait_for_status(&handle, "w", WorkerStatus::Loading).await;
        handle
            .send("w", Message::new("m").with_payload(json!("first-attempt")))
            .expect("send");
        handle.stop("w").expect("stop");
        wait_for_status(&handle, "w", WorkerStatus::Absent).await;

        // Second attempt: the first attempt's buffer must be gone.
        gate.send(true).expect("open gate");
        handle.start("w").expect("restart");
        wait_for_status(&handle, "w", WorkerStatus::Running).await;
        handle
            .send("w", Message::new("m").with_payload(json!("second-attempt")))
            .expect("send");
        wait_for_len(&log, 1).await;
        assert_eq!(*log.lock().unwrap(), vec![json!("second-attempt")]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn message_to_inactive_worker_is_dropped() {
        let spec = WorkerSpec::new("w", || async {
            Ok(WorkerFn::boxed(|_ctx| async { Ok(()) }))
        });
        let handle = spawn_supervisor(Registry::new().with_spec(spec));
        let mut events = handle.events();

        handle.send("w", Message::new("m")).expect("send");
        let ev = wait_for_event(&mut events, EventKind::MessageDropped).await;
        assert_eq!(ev.reason.as_deref(), Some("absent"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn unknown_ids_are_config_errors() {
        let handle = spawn_supervisor(Registry::new());
        let mut events = handle.events();

        handle.start("ghost").expect("start");
        wait_for_event(&mut events, EventKind::UnknownWorker).await;
        handle.stop("ghost").expect("stop");
        wait_for_event(&mut events, EventKind::UnknownWorker).await;
        assert_eq!(handle.status("ghost"), WorkerStatus::Absent);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn shutdown_within_grace_succeeds() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = log.clone();
        let spec = WorkerSpec::new("w", move || {
            let log = log2.clone();
            async move { Ok(recording_worker(log)) }
        });
        let handle = spawn_supervisor(Registry::new().with_spec(spec));

        handle.start("w").expect("start");
        wait_for_status(&handle, "w", WorkerStatus::Running).await;

        handle.shutdown().await.expect("graceful shutdown");
        assert_eq!(handle.status("w"), WorkerStatus::Absent);
        assert!(matches!(
            handle.start("w"),
            Err(RuntimeError::Stopped)
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn shutdown_reports_stuck_workers() {
        let spec = WorkerSpec::new("stubborn", || async {
            Ok(WorkerFn::boxed(|_ctx| async {
                // Ignores cancellation entirely.
                std::future::pending::<Result<(), WorkerError>>().await
            }))
        });
        let mut cfg = SupervisorConfig::default();
        cfg.grace = Duration::from_millis(50);
        let handle = Supervisor::spawn(Registry::new().with_spec(spec), cfg, Vec::new());

        handle.start("stubborn").expect("start");
        wait_for_status(&handle, "stubborn", WorkerStatus::Running).await;

        match handle.shutdown().await {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => {
                assert_eq!(stuck, vec!["stubborn".to_string()]);
            }
            other => panic!("expected GraceExceeded, got {other:?}"),
        }
    }
}
