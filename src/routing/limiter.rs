//! Global request throttle shared by the geocoder and the router.
//!
//! The pipeline runs on one thread, so the limiter uses `Cell` state and is
//! shared through `Rc`. Only real network calls pass through it; cache hits
//! never do.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Time source, injectable so tests never actually sleep.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

pub struct RateLimiter {
    min_interval: Duration,
    clock: Box<dyn Clock>,
    last_call: Cell<Option<Instant>>,
    calls: Cell<u64>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Box::new(SystemClock))
    }

    pub fn with_clock(min_interval: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            min_interval,
            clock,
            last_call: Cell::new(None),
            calls: Cell::new(0),
        }
    }

    /// An unthrottled limiter that still counts calls.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Block until the minimum interval since the previous call has passed,
    /// then record this call.
    pub fn acquire(&self) {
        if let Some(last) = self.last_call.get() {
            let elapsed = self.clock.now().saturating_duration_since(last);
            if elapsed < self.min_interval {
                self.clock.sleep(self.min_interval - elapsed);
            }
        }
        self.last_call.set(Some(self.clock.now()));
        self.calls.set(self.calls.get() + 1);
    }

    /// Network calls made through this limiter so far.
    pub fn calls(&self) -> u64 {
        self.calls.get()
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;

    #[test]
    fn test_first_call_does_not_wait() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_millis(1715), Box::new(clock.clone()));
        limiter.acquire();
        assert!(clock.sleeps.borrow().is_empty());
        assert_eq!(limiter.calls(), 1);
    }

    #[test]
    fn test_back_to_back_calls_wait_full_interval() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_millis(1500), Box::new(clock.clone()));
        limiter.acquire();
        limiter.acquire();
        limiter.acquire();
        assert_eq!(
            *clock.sleeps.borrow(),
            vec![Duration::from_millis(1500), Duration::from_millis(1500)]
        );
        assert_eq!(limiter.calls(), 3);
    }

    #[test]
    fn test_elapsed_time_is_credited() {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_millis(2000), Box::new(clock.clone()));
        limiter.acquire();
        clock.advance(Duration::from_millis(1200));
        limiter.acquire();
        clock.advance(Duration::from_millis(5000));
        limiter.acquire();
        assert_eq!(*clock.sleeps.borrow(), vec![Duration::from_millis(800)]);
    }
}
