use std::fmt;

use node_problem_ext::jiff;
use node_problem_ext::metav1;
use node_problem_ext::TimeExt as _;
use parking_lot::Mutex;

/// Source of "now" for heartbeat stamps.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> metav1::Time;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> metav1::Time {
        metav1::Time::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct FakeClock {
    now: Mutex<jiff::Timestamp>,
}

impl FakeClock {
    pub fn new(now: jiff::Timestamp) -> Self {
        let now = Mutex::new(now);
        Self { now }
    }

    pub fn set(&self, now: jiff::Timestamp) {
        *self.now.lock() = now;
    }

    /// Advance the clock by `seconds`. Steps leaving the timestamp range are ignored.
    pub fn step(&self, seconds: i64) {
        let mut now = self.now.lock();
        let span = jiff::SignedDuration::from_secs(seconds);
        *now = now.checked_add(span).unwrap_or(*now);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> metav1::Time {
        let now = *self.now.lock();
        metav1::Time(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(second: i64) -> jiff::Timestamp {
        jiff::Timestamp::from_second(second).unwrap()
    }

    #[test]
    fn fake_clock_is_fixed() {
        let clock = FakeClock::new(ts(1_000));
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().0, ts(1_000));
    }

    #[test]
    fn fake_clock_set_and_step() {
        let clock = FakeClock::new(ts(1_000));
        clock.step(30);
        assert_eq!(clock.now().0, ts(1_030));
        clock.set(ts(5));
        assert_eq!(clock.now().0, ts(5));
    }

    #[test]
    fn real_clock_moves_forward() {
        let clock = RealClock;
        let before = clock.now();
        let after = clock.now();
        assert!(after.0 >= before.0);
    }
}
