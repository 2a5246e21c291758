//! Clocks used by transports to express blocking.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of transport time.
pub trait Clock {
    /// Time elapsed since the clock started.
    fn now(&self) -> Duration;

    /// Let `duration` pass.
    fn advance(&self, duration: Duration);
}

/// A manually advanced clock.
///
/// Clones share the same time, so an outer scheduler holding one clone can
/// step every device attached to it together.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Arc<Mutex<Duration>>,
}

impl VirtualClock {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }

    fn advance(&self, duration: Duration) {
        *self.now.lock() += duration;
    }
}

/// Wall-clock time; advancing sleeps the current thread.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn advance(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
