//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints lifecycle records to stdout in the relay's
//! `[category] message` shape, where the category is the worker id.
//!
//! ## Output format
//! ```text
//! [chatWorker] load_starting
//! [chatWorker] worker_started
//! [chatWorker] load_failed stage=logic reason=module not found
//! [supervisor] shutdown_requested
//! ```
//!
//! Not intended for production use - implement a custom
//! [`Subscribe`](crate::Subscribe) for structured logging or metrics
//! collection.

use async_trait::async_trait;

use crate::events::Event;
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints one human-readable line per
/// event, prefixed with the event's category.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Creates the subscriber.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, event: &Event) {
        println!("[{}] {}", event.category(), event.message());
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
