//! Health Checks
//!
//! The health listener answers liveness on its own. Readiness follows the
//! main listener: raised once it accepts, dropped when it starts draining.

use std::sync::atomic::{AtomicBool, Ordering};

/// Readiness of the main listener
#[derive(Debug, Default)]
pub struct HealthCheck {
    ready: AtomicBool,
}

impl HealthCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Relaxed);
    }
}
