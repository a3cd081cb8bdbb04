
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;

pub use mockable::DefaultClock;

pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// A clock that only moves when told to.
///
/// Used to replay a journal at the timestamps it was recorded with, and by tests
/// that need accrual and overdue checks to happen at a known instant.
pub struct ReplayClock(Mutex<DateTime<Utc>>);

impl ReplayClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.lock() = now;
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.lock() += delta;
    }

    fn lock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        //NOTE: The guarded value is a plain timestamp, a poisoned lock still holds a usable value.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ReplayClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock()
    }
}
