//! Time source used by the store and its selectors.
//!
//! # Responsibility
//! - Provide "now" with the caller's local UTC offset, so calendar-day
//!   comparisons happen in local time.
//! - Allow tests to pin and advance time deterministically.

use chrono::{DateTime, Duration, FixedOffset, Local, Utc};
use std::sync::{Arc, Mutex};

/// Source of the current instant.
pub trait Clock: Send {
    /// Current instant in the local offset.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Current instant in UTC, used for stored timestamps.
    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

/// Wall clock in the system's local offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        let local = Local::now();
        local.with_timezone(local.offset())
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut current = self.lock();
        *current += by;
    }

    /// Pins the clock at `instant`.
    pub fn set(&self, instant: DateTime<FixedOffset>) {
        *self.lock() = instant;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<FixedOffset>> {
        // A poisoned guard still holds a valid instant.
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock};
    use chrono::{DateTime, Duration};

    #[test]
    fn manual_clock_clones_share_time() {
        let start = DateTime::parse_from_rfc3339("2024-10-29T09:00:00+02:00").unwrap();
        let clock = ManualClock::new(start);
        let observer = clock.clone();

        clock.advance(Duration::minutes(5));

        assert_eq!(observer.now(), start + Duration::minutes(5));
        assert_eq!(observer.now_utc().to_rfc3339(), "2024-10-29T07:05:00+00:00");
    }
}
