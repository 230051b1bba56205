//! Fixed-cadence cycle scheduling driven by elapsed wall-clock time.

use std::time::Duration;

/// What the collector loop should do at a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The next cycle boundary has not been reached yet.
    Wait,
    /// Poll now for `cycle`; `skipped` boundaries passed without a poll.
    Poll { cycle: u64, skipped: u64 },
    /// The cycle budget is spent.
    Done,
}

/// Cycle `k` is due once `k * interval` has elapsed since start.
///
/// A check performs at most one poll. When several boundaries have passed
/// since the last poll, the poll is assigned to the latest one and the
/// others are reported as skipped; they still count against `cycles`.
#[derive(Debug, Clone)]
pub struct Cadence {
    interval: Duration,
    cycles: u64,
    next: u64,
}

impl Cadence {
    pub fn new(interval: Duration, cycles: u64) -> Self {
        Self {
            interval,
            cycles,
            next: 0,
        }
    }

    pub fn check(&mut self, elapsed: Duration) -> Tick {
        if self.next >= self.cycles {
            return Tick::Done;
        }

        let due = if self.interval.is_zero() {
            self.next
        } else {
            (elapsed.as_nanos() / self.interval.as_nanos()) as u64
        };
        if due < self.next {
            return Tick::Wait;
        }

        let cycle = due.min(self.cycles - 1);
        let skipped = cycle - self.next;
        self.next = cycle + 1;
        Tick::Poll { cycle, skipped }
    }

    /// Time until the next boundary, measured from start.
    pub fn next_boundary(&self) -> Duration {
        self.interval.saturating_mul(self.next.min(u32::MAX as u64) as u32)
    }
}
