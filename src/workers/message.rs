//! # Messages addressed to workers.
//!
//! A [`Message`] is a named payload sent to a worker id. While the id is
//! loading, messages are buffered by the supervisor in strict arrival order;
//! once the worker is live they are replayed into its inbox before any newer
//! message, each delivered exactly once.

use std::sync::Arc;

use serde_json::Value;

/// Named payload addressed to a worker.
///
/// ## Example
/// ```rust
/// use serde_json::json;
/// use lazyvisor::Message;
///
/// let msg = Message::new("newMessage").with_payload(json!({ "id": 1 }));
/// assert_eq!(msg.name.as_ref(), "newMessage");
/// assert_eq!(msg.payload["id"], 1);
/// ```
#[derive(Clone, Debug)]
pub struct Message {
    /// Message name, the worker-side dispatch key.
    pub name: Arc<str>,
    /// Arbitrary payload; `Value::Null` when none was attached.
    pub payload: Value,
}

impl Message {
    /// Creates a new message with the given name and no payload.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            payload: Value::Null,
        }
    }

    /// Attaches a payload.
    #[inline]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}
