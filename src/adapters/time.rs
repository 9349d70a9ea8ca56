//! Host clock adapter.
//!
//! Provides the free-running tick counter used to timestamp subevent
//! responses.  The counter runs at [`TICK_HZ`] like the radio's sleep timer
//! and wraps at `u32::MAX`.

use crate::app::ports::ClockPort;

/// Tick frequency of the sleep timer.
pub const TICK_HZ: u64 = 32_768;

/// Monotonic tick source backed by `std::time::Instant`.
pub struct HostClock {
    start: std::time::Instant,
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since construction.
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl ClockPort for HostClock {
    fn tick_count(&self) -> u32 {
        (self.uptime_us() * TICK_HZ / 1_000_000) as u32
    }
}
