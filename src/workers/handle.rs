//! # Live worker handle.
//!
//! A [`WorkerRef`] is what callers get from
//! [`SupervisorHandle::get`](crate::SupervisorHandle::get): a cheap clonable
//! handle for sending messages to a running worker and registering listeners
//! on its named events.
//!
//! For a worker in `error` status the supervisor hands out an **inert** ref
//! instead of an error: it accepts sends and listener registrations without
//! effect, so UI/consumer code needs no defensive branching at every call
//! site.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::workers::{Emitter, Listener, Message};

/// Handle to a live (or errored-inert) worker.
#[derive(Clone)]
pub struct WorkerRef {
    id: Arc<str>,
    /// `None` marks the inert variant.
    outbox: Option<mpsc::UnboundedSender<Message>>,
    emitter: Option<Emitter>,
}

impl WorkerRef {
    /// Handle to a running worker.
    pub(crate) fn live(id: Arc<str>, outbox: mpsc::UnboundedSender<Message>, emitter: Emitter) -> Self {
        Self {
            id,
            outbox: Some(outbox),
            emitter: Some(emitter),
        }
    }

    /// Harmless handle for an errored worker: swallows every interaction.
    pub(crate) fn inert(id: Arc<str>) -> Self {
        Self {
            id,
            outbox: None,
            emitter: None,
        }
    }

    /// Id of the worker this handle refers to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True if this is the inert variant handed out for an errored worker.
    pub fn is_inert(&self) -> bool {
        self.outbox.is_none()
    }

    /// Sends a message to the worker's inbox.
    ///
    /// Silently dropped when the handle is inert or the worker has since been
    /// torn down; a stale handle is harmless by design.
    pub fn send(&self, message: Message) {
        if let Some(outbox) = &self.outbox {
            if outbox.send(message).is_err() {
                tracing::debug!(worker = %self.id, "send on stale worker handle dropped");
            }
        }
    }

    /// Registers a listener for a named event the worker emits.
    ///
    /// No-op on the inert variant.
    pub fn on(&self, event: impl Into<Arc<str>>, listener: impl Fn(&Value) + Send + Sync + 'static) {
        self.attach(event.into(), Arc::new(listener) as Listener);
    }

    /// Attaches an already-shared listener (supervisor-side registration).
    pub(crate) fn attach(&self, event: Arc<str>, listener: Listener) {
        if let Some(emitter) = &self.emitter {
            emitter.on(event, listener);
        }
    }
}
