//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the supervisor.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publisher**: the `Supervisor` command loop (every status transition,
//!   drop, and configuration error produces exactly one event).
//! - **Consumers**: the supervisor's subscriber listener (fans out to
//!   [`SubscriberSet`](crate::SubscriberSet)) and any receiver obtained from
//!   [`SupervisorHandle::events`](crate::SupervisorHandle::events).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
