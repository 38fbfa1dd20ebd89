//! Logical time base shared by the scheduler, key tables and timers.

/// Monotonic logical clock.
///
/// `now_ms` only moves forward. `inc_time` hands out strictly increasing
/// sequence stamps used to order same-timestamp events and to tell repeated
/// presses of the same key apart.
#[derive(Debug, Default, Clone)]
pub struct LogicalClock {
    now_ms: u64,
    sequence: u64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Move to `time_ms`; earlier times are ignored.
    #[inline]
    pub fn advance_to(&mut self, time_ms: u64) {
        if time_ms > self.now_ms {
            self.now_ms = time_ms;
        }
    }

    /// Next sequence stamp.
    #[inline]
    pub fn inc_time(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Last stamp handed out (0 if none).
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}
