//! # Global supervisor configuration.
//!
//! [`SupervisorConfig`] defines the runtime's behavior: event bus capacity,
//! shutdown grace period, and the debug console switch.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use lazyvisor::SupervisorConfig;
//!
//! let mut cfg = SupervisorConfig::default();
//! cfg.grace = Duration::from_secs(10);
//! cfg.debug = true;
//!
//! assert_eq!(cfg.bus_capacity, 1024);
//! ```

use std::time::Duration;

/// Global configuration for the supervision runtime.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Capacity of the observability event bus channel.
    pub bus_capacity: usize,
    /// Maximum time to wait for workers to stop during shutdown before
    /// force-terminating them.
    pub grace: Duration,
    /// When enabled, load and worker failures are additionally written to
    /// stderr (the diagnostic console), on top of the event bus record.
    pub debug: bool,
}

impl Default for SupervisorConfig {
    /// Provides a default configuration:
    /// - `bus_capacity = 1024`
    /// - `grace = 30s`
    /// - `debug = false`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
            debug: false,
        }
    }
}

impl SupervisorConfig {
    /// Bus capacity with the minimum of 1 enforced.
    pub(crate) fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}
