//! Source of "now" for scheduling, injectable so reviews are reproducible.
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::cell::Cell;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to the millisecond precision timestamps are stored with.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// Clock frozen at a chosen instant, moved forward by hand.
#[derive(Clone, Debug)]
pub struct FixedClock {
    current: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            current: Cell::new(at),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.current.set(at);
    }

    pub fn advance_days(&self, days: i64) {
        self.current.set(self.current.get() + Duration::days(days));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.current.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
