//! Time source abstraction
//!
//! Daily spending limits reset at UTC midnight, so every component that
//! stamps or windows time takes its readings from a shared [`Clock`]
//! rather than calling `Utc::now()` directly. Production wiring uses
//! [`SystemClock`]; tests use [`FixedClock`] to place operations on exact
//! days and roll them across midnight deterministically.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;

    /// Current UTC calendar day
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests
///
/// Returns the same instant until [`FixedClock::advance`] moves it.
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock pinned to the given instant
    pub fn new(instant: DateTime<Utc>) -> Self {
        FixedClock {
            instant: Mutex::new(instant),
        }
    }

    /// Move the clock forward by a duration
    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self
            .instant
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .instant
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_holds_and_advances() {
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 23, 30, 0).unwrap();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.today(), start.date_naive());

        clock.advance(chrono::Duration::hours(1));
        assert_eq!(clock.today(), start.date_naive().succ_opt().unwrap());
    }

    #[test]
    fn test_system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
