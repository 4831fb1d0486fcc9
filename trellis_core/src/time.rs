// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time as the host measures it.
//!
//! Deferred passes are budgeted in the host's own ticks: the host hands a
//! [`Deadline`](crate::deadline::Deadline) to
//! [`perform_deferred_work`](crate::Reconciler::perform_deferred_work) and the
//! work loop compares its [`Duration`] against
//! [`ReconcilerConfig::yield_threshold`](crate::ReconcilerConfig::yield_threshold)
//! before each node visit. [`HostTime`] stamps trace events.
//!
//! Only diagnostics care what a tick is worth; they convert with a
//! [`Timebase`].

use core::fmt;
use core::ops::{Add, Sub};

/// A monotonic host timestamp, in ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// The tick count.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`; zero if `earlier` is later.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

/// Saturates at the last representable tick, so an unbounded budget added
/// to any time is still a valid deadline.
impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

/// Same as [`saturating_duration_since`](HostTime::saturating_duration_since).
impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// A span of host ticks: a slice budget, a yield threshold or a phase
/// length in a pass summary.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// No time at all. An exhausted deadline reports this.
    pub const ZERO: Self = Self(0);

    /// The tick count.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// `self - rhs`, or zero.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Duration {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}

/// What one host tick is worth: `nanoseconds = ticks * numer / denom`.
///
/// Used by trace sinks to print and export timestamps.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator of the ticks-to-nanoseconds ratio.
    pub numer: u32,
    /// Denominator of the ticks-to-nanoseconds ratio.
    pub denom: u32,
}

impl Timebase {
    /// Ticks are nanoseconds. The presets in
    /// [`ReconcilerConfig`](crate::ReconcilerConfig) assume this.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// Ticks are microseconds.
    pub const MICROS: Self = Self {
        numer: 1000,
        denom: 1,
    };

    /// A `numer / denom` timebase.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    #[inline]
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(denom != 0, "timebase denominator must not be zero");
        Self { numer, denom }
    }

    /// Nanoseconds in `ticks`, computed through `u128`.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "results past u64::MAX nanoseconds are not meaningful timestamps"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        (ticks as u128 * self.numer as u128 / self.denom as u128) as u64
    }

    /// Ticks in `nanos`, computed through `u128`. Rounds down.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "results past u64::MAX ticks are not meaningful budgets"
    )]
    pub const fn nanos_to_ticks(self, nanos: u64) -> u64 {
        (nanos as u128 * self.denom as u128 / self.numer as u128) as u64
    }

    /// A budget of `nanos` nanoseconds in this timebase.
    #[inline]
    #[must_use]
    pub const fn budget(self, nanos: u64) -> Duration {
        Duration(self.nanos_to_ticks(nanos))
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}
