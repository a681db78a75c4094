//! Wall-clock sources.
//!
//! All instants are local wall-clock `NaiveDateTime`; timezones are not
//! modelled. `ManualClock` provides virtual time for deterministic callers.

use chrono::{Local, NaiveDateTime, TimeDelta};
use std::fmt::Debug;
use std::sync::{Mutex, PoisonError};

/// Source of "now" for the scheduler.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> NaiveDateTime;
}

/// Host local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Virtual clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }

    /// Moves the clock forward and returns the new instant.
    pub fn advance(&self, delta: TimeDelta) -> NaiveDateTime {
        let mut guard = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = guard.checked_add_signed(delta).unwrap_or(*guard);
        *guard
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, ManualClock};
    use chrono::{NaiveDate, TimeDelta};

    #[test]
    fn manual_clock_advances_only_on_request() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        let moved = clock.advance(TimeDelta::minutes(90));
        assert_eq!(moved, start + TimeDelta::minutes(90));
        assert_eq!(clock.now(), moved);
    }
}
