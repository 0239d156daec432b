use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Local wall-clock instant. Cooldowns, day keys and night hours are all
/// anchored to wall-clock time, never to tick counts.
pub type WallTime = NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick {
    pub frame: u64,
}

pub const DEFAULT_TICK_MS: u64 = 1_000;

impl Tick {
    pub fn new() -> Self {
        Tick { frame: 0 }
    }

    pub fn next(&self) -> Self {
        Tick { frame: self.frame + 1 }
    }
}

/// Source of "now" for the live driver.
pub trait Clock: Send {
    fn now(&self) -> WallTime;
}

/// Reads the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> WallTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub WallTime);

impl Clock for FixedClock {
    fn now(&self) -> WallTime {
        self.0
    }
}

/// Local calendar day an instant belongs to.
pub fn day_key(now: WallTime) -> NaiveDate {
    now.date()
}

/// Whether `hour` falls in `[start, end)`, wrapping past midnight when
/// `start > end`. Equal bounds mean night is disabled.
pub fn is_night_hour(hour: u32, start: u32, end: u32) -> bool {
    if start == end {
        false
    } else if start < end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

pub fn is_night(now: WallTime, start: u32, end: u32) -> bool {
    is_night_hour(now.hour(), start, end)
}
