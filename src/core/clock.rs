//! Time Sources
//!
//! State-transition logic never reads the system clock directly;
//! callers pass an instant obtained from a [`Clock`].

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic now, used for every deadline.
    fn now(&self) -> Instant;

    /// Wall-clock now, used only for timestamps put on the wire.
    fn wall_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The real clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: DateTime<Utc>,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            wall_origin: Utc::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }

    fn offset(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.offset()
    }

    fn wall_now(&self) -> DateTime<Utc> {
        let offset = chrono::Duration::from_std(self.offset()).unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_origin + offset
    }
}

/// Convert a monotonic deadline into wall-clock time relative to `now`.
pub fn to_wall_time(deadline: Instant, now: Instant, wall_now: DateTime<Utc>) -> DateTime<Utc> {
    let delta = if deadline >= now {
        chrono::Duration::from_std(deadline - now).unwrap_or_else(|_| chrono::Duration::zero())
    } else {
        -chrono::Duration::from_std(now - deadline).unwrap_or_else(|_| chrono::Duration::zero())
    };
    wall_now + delta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        let start = clock.now();
        let wall_start = clock.wall_now();

        clock.advance(Duration::from_millis(1500));

        assert_eq!(clock.now() - start, Duration::from_millis(1500));
        assert_eq!((clock.wall_now() - wall_start).num_milliseconds(), 1500);
    }

    #[test]
    fn test_to_wall_time() {
        let now = Instant::now();
        let wall = Utc::now();

        let future = to_wall_time(now + Duration::from_secs(20), now, wall);
        assert_eq!((future - wall).num_seconds(), 20);

        let past = to_wall_time(now, now + Duration::from_secs(3), wall);
        assert_eq!((wall - past).num_seconds(), 3);
    }
}
