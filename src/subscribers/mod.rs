//! # Event subscribers: the logging relay.
//!
//! This module provides the [`Subscribe`] trait and the fan-out machinery for
//! handling lifecycle events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Supervisor ── publish(Event) ──► Bus ──► subscriber listener
//!                                              │
//!                                              ▼
//!                                        SubscriberSet
//!                                     ┌────────┼────────┐
//!                                     ▼        ▼        ▼
//!                                LogWriter  Metrics  Custom ...
//! ```
//!
//! Records carry a `{category, message}` shape (category = worker id) via
//! [`Event::category`](crate::Event::category) and
//! [`Event::message`](crate::Event::message); delivery is fire-and-forget.

mod set;
mod subscribe;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogWriter;
