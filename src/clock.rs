/// Tick source: monotonically increasing milliseconds.

#[cfg(test)]
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Millisecond timestamp used for all deadline arithmetic.
pub type Tick = u64;

pub trait Clock: Send + Sync {
    fn now(&self) -> Tick;
}

/// Milliseconds since construction.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Tick {
        self.origin.elapsed().as_millis() as Tick
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: Tick) -> Self {
        Self { now: AtomicU64::new(start) }
    }

    pub fn set(&self, tick: Tick) {
        self.now.store(tick, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Tick {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_on_request() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);
        clock.advance(25);
        assert_eq!(clock.now(), 125);
        clock.set(7);
        assert_eq!(clock.now(), 7);
    }

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
