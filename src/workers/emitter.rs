//! # Named outbound events with registered listeners.
//!
//! Each live worker owns an [`Emitter`]: consumers register [`Listener`]
//! callbacks under an event name, the worker invokes them by emitting that
//! name with a payload. Listeners registered while the worker was still
//! loading are buffered by the supervisor and attached before any buffered
//! message is replayed, so nothing a freshly-spawned worker emits in response
//! to the replay can be missed.
//!
//! ## Rules
//! - Listeners for one name fire in registration order.
//! - Emission is synchronous with respect to the caller; listeners must be
//!   cheap and non-blocking.
//! - A panicking listener does not take the worker down, and does not stop
//!   the remaining listeners for the same emission.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use serde_json::Value;

/// Callback registered for a named worker event.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Shared registry of listeners for one worker's named events.
///
/// Cheap to clone; all clones share the same listener table. The supervisor
/// keeps one clone to attach listeners registered after spawn, the worker
/// keeps another to emit.
#[derive(Clone, Default)]
pub struct Emitter {
    inner: Arc<RwLock<HashMap<Arc<str>, Vec<Listener>>>>,
}

impl Emitter {
    /// Creates an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for the given event name.
    pub fn on(&self, event: impl Into<Arc<str>>, listener: Listener) {
        let mut table = self.inner.write().unwrap_or_else(|e| e.into_inner());
        table.entry(event.into()).or_default().push(listener);
    }

    /// Invokes every listener registered for `event` with `payload`.
    ///
    /// Listener panics are caught and reported via `tracing`; remaining
    /// listeners still run.
    pub fn emit(&self, event: &str, payload: &Value) {
        let listeners = {
            let table = self.inner.read().unwrap_or_else(|e| e.into_inner());
            match table.get(event) {
                Some(ls) => ls.clone(),
                None => return,
            }
        };
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(payload))).is_err() {
                tracing::warn!(event, "listener panicked during emit");
            }
        }
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        let table = self.inner.read().unwrap_or_else(|e| e.into_inner());
        table.get(event).map(Vec::len).unwrap_or(0)
    }
}
