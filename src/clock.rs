//! Wall-clock provider. Kept as a trait so tests
//! can advance time deterministically instead of sleeping; production code
//! gets `SystemClock`.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::model::SECONDS_PER_DAY;

pub struct DayTiming {
    pub days_elapsed: i32,
    pub next_day_at: i64,
}

pub trait Clock: Send + Sync {
    fn int_time(&self) -> i64;

    fn int_time_ms(&self) -> i64 {
        self.int_time() * 1000
    }

    /// Day index and the epoch second at which it next rolls over, counting
    /// whole `SECONDS_PER_DAY` periods since `creation_secs` (the collection's
    /// creation time, which anchors the rollover boundary).
    fn timing_today(&self, creation_secs: i64) -> DayTiming {
        let now = self.int_time();
        let days_elapsed = ((now - creation_secs) / SECONDS_PER_DAY) as i32;
        let next_day_at = creation_secs + i64::from(days_elapsed + 1) * SECONDS_PER_DAY;
        DayTiming {
            days_elapsed,
            next_day_at,
        }
    }
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn int_time(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Deterministic clock for tests: starts at a fixed instant and only moves
/// when told to.
#[derive(Debug)]
pub struct FakeClock {
    now: AtomicI64,
}

impl FakeClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn int_time(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::new(1000);
        assert_eq!(clock.int_time(), 1000);
        clock.advance(60);
        assert_eq!(clock.int_time(), 1060);
        assert_eq!(clock.int_time_ms(), 1_060_000);
    }
}
