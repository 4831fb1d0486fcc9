// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cooperative time budgets for deferred work.
//!
//! When a host fires the callback requested through
//! [`Host::schedule_deferred_callback`](crate::host::Host::schedule_deferred_callback)
//! it passes a [`Deadline`] to
//! [`Reconciler::perform_deferred_work`](crate::Reconciler::perform_deferred_work).
//! The work loop consults it between node visits and parks the traversal once
//! the remaining budget drops below
//! [`ReconcilerConfig::yield_threshold`](crate::ReconcilerConfig::yield_threshold).

use crate::time::{Duration, HostTime};

/// Reports how much time the current slice has left.
pub trait Deadline {
    /// Time remaining before the slice must yield back to the host.
    fn time_remaining(&self) -> Duration;
}

impl<D: Deadline + ?Sized> Deadline for &D {
    fn time_remaining(&self) -> Duration {
        (**self).time_remaining()
    }
}

/// A deadline ending at a fixed [`HostTime`], measured against a clock
/// function supplied by the host.
///
/// ```rust
/// use trellis_core::deadline::{Deadline, FrameDeadline};
/// use trellis_core::time::{Duration, HostTime};
///
/// let d = FrameDeadline::new(HostTime(1_000), || HostTime(400));
/// assert_eq!(d.time_remaining(), Duration(600));
/// ```
pub struct FrameDeadline<F> {
    end: HostTime,
    clock: F,
}

impl<F> core::fmt::Debug for FrameDeadline<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameDeadline")
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

impl<F: Fn() -> HostTime> FrameDeadline<F> {
    /// Creates a deadline that expires at `end` according to `clock`.
    #[must_use]
    pub fn new(end: HostTime, clock: F) -> Self {
        Self { end, clock }
    }

    /// Returns the host time at which this deadline expires.
    #[must_use]
    pub fn end(&self) -> HostTime {
        self.end
    }
}

impl<F: Fn() -> HostTime> Deadline for FrameDeadline<F> {
    fn time_remaining(&self) -> Duration {
        self.end.saturating_duration_since((self.clock)())
    }
}

/// A deadline that never runs out.
///
/// Useful for hosts that want to flush deferred work in one go (tests,
/// server-side rendering).
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration(u64::MAX)
    }
}
