// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic time for driving deferred work.

use alloc::rc::Rc;
use core::cell::Cell;

use trellis_core::deadline::{Deadline, FrameDeadline};
use trellis_core::time::{Duration, HostTime};

/// A shared, manually advanced clock.
///
/// Clones observe the same time. [`MemoryHost`](crate::MemoryHost) reads it
/// for trace timestamps and advances it by its per-operation cost, so
/// deadlines built with [`deadline`](Self::deadline) run out as the host
/// does work.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    ticks: Rc<Cell<u64>>,
}

impl ManualClock {
    /// Creates a clock at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time.
    #[must_use]
    pub fn now(&self) -> HostTime {
        HostTime(self.ticks.get())
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.ticks.set(self.ticks.get().saturating_add(by.ticks()));
    }

    /// Sets the current time. Time may move backwards.
    pub fn set(&self, now: HostTime) {
        self.ticks.set(now.ticks());
    }

    /// A deadline `budget` ticks from now, measured against this clock.
    #[must_use]
    pub fn deadline(&self, budget: Duration) -> FrameDeadline<impl Fn() -> HostTime + use<>> {
        let clock = self.clone();
        FrameDeadline::new(self.now() + budget, move || clock.now())
    }
}

/// A deadline that allows a fixed number of node visits.
///
/// Each [`time_remaining`](Deadline::time_remaining) call consumes one step
/// and reports an unbounded budget; once the steps are used up it reports
/// zero. The work loop consults the deadline once before every visit, so a
/// slice driven by `StepDeadline::new(n)` performs at most `n` visits.
#[derive(Debug)]
pub struct StepDeadline {
    steps: Cell<u32>,
}

impl StepDeadline {
    /// Allows `steps` visits.
    #[must_use]
    pub fn new(steps: u32) -> Self {
        Self {
            steps: Cell::new(steps),
        }
    }

    /// A deadline that is already exhausted.
    #[must_use]
    pub fn expired() -> Self {
        Self::new(0)
    }

    /// Visits still allowed.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.steps.get()
    }
}

impl Deadline for StepDeadline {
    fn time_remaining(&self) -> Duration {
        match self.steps.get() {
            0 => Duration::ZERO,
            n => {
                self.steps.set(n - 1);
                Duration(u64::MAX)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(Duration(25));
        assert_eq!(other.now(), HostTime(25));
    }

    #[test]
    fn deadline_runs_out_as_the_clock_moves() {
        let clock = ManualClock::new();
        clock.set(HostTime(100));
        let deadline = clock.deadline(Duration(50));
        assert_eq!(deadline.time_remaining(), Duration(50));
        clock.advance(Duration(30));
        assert_eq!(deadline.time_remaining(), Duration(20));
        clock.advance(Duration(30));
        assert_eq!(deadline.time_remaining(), Duration::ZERO);
    }

    #[test]
    fn step_deadline_counts_down() {
        let d = StepDeadline::new(2);
        assert_eq!(d.time_remaining(), Duration(u64::MAX));
        assert_eq!(d.time_remaining(), Duration(u64::MAX));
        assert_eq!(d.time_remaining(), Duration::ZERO);
        assert_eq!(d.remaining(), 0);
        assert_eq!(StepDeadline::expired().time_remaining(), Duration::ZERO);
    }
}
