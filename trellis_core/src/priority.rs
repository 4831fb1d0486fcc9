// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update priority levels.
//!
//! Every update carries a [`PriorityLevel`]. Levels are totally ordered by
//! urgency: a *lower* level is *more* urgent, so `Ord::min` picks the most
//! urgent of two levels and the derived ordering reads naturally in
//! comparisons (`level <= PriorityLevel::Task` means "task or more urgent").
//!
//! | Level | Performed |
//! |---|---|
//! | `Synchronous` | before the scheduling call returns |
//! | `Task` | at the end of the outermost batch |
//! | `Animation` | in the host's next animation callback |
//! | `High`, `Low`, `Offscreen` | in deferred callbacks, yielding on deadline |
//! | `NoWork` | never; marks the absence of pending work |

use core::fmt;

/// Urgency of an update. Lower is more urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum PriorityLevel {
    /// Committed before the scheduling call returns.
    Synchronous = 0,
    /// Committed when the outermost batch ends.
    Task = 1,
    /// Committed in the next animation callback.
    Animation = 2,
    /// Deferred, interruptible, most urgent of the deferred levels.
    High = 3,
    /// Deferred, interruptible.
    Low = 4,
    /// Deferred, interruptible, for work that is not currently visible.
    Offscreen = 5,
    /// Nothing pending.
    #[default]
    NoWork = 6,
}

impl PriorityLevel {
    /// All levels carrying work, most urgent first.
    pub const WORK_LEVELS: [Self; 6] = [
        Self::Synchronous,
        Self::Task,
        Self::Animation,
        Self::High,
        Self::Low,
        Self::Offscreen,
    ];

    /// Returns whether work at this level runs in deferred callbacks and may
    /// yield to the host between node visits.
    #[inline]
    #[must_use]
    pub const fn is_deferred(self) -> bool {
        matches!(self, Self::High | Self::Low | Self::Offscreen)
    }

    /// Returns whether this level carries work.
    #[inline]
    #[must_use]
    pub const fn has_work(self) -> bool {
        !matches!(self, Self::NoWork)
    }

    /// Returns the more urgent of two levels.
    #[inline]
    #[must_use]
    pub const fn most_urgent(self, other: Self) -> Self {
        if (self as u8) <= (other as u8) {
            self
        } else {
            other
        }
    }

    /// Returns the less urgent of two levels.
    #[inline]
    #[must_use]
    pub const fn least_urgent(self, other: Self) -> Self {
        if (self as u8) >= (other as u8) {
            self
        } else {
            other
        }
    }

    /// Returns a stable numeric code for this level.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`code`](Self::code).
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Synchronous),
            1 => Some(Self::Task),
            2 => Some(Self::Animation),
            3 => Some(Self::High),
            4 => Some(Self::Low),
            5 => Some(Self::Offscreen),
            6 => Some(Self::NoWork),
            _ => None,
        }
    }

    /// Short lowercase name, used by diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Synchronous => "sync",
            Self::Task => "task",
            Self::Animation => "animation",
            Self::High => "high",
            Self::Low => "low",
            Self::Offscreen => "offscreen",
            Self::NoWork => "none",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_by_urgency() {
        assert!(PriorityLevel::Synchronous < PriorityLevel::Task);
        assert!(PriorityLevel::Task < PriorityLevel::Animation);
        assert!(PriorityLevel::Animation < PriorityLevel::High);
        assert!(PriorityLevel::High < PriorityLevel::Low);
        assert!(PriorityLevel::Low < PriorityLevel::Offscreen);
        assert!(PriorityLevel::Offscreen < PriorityLevel::NoWork);
    }

    #[test]
    fn deferred_levels() {
        let deferred: alloc::vec::Vec<_> = PriorityLevel::WORK_LEVELS
            .into_iter()
            .filter(|l| l.is_deferred())
            .collect();
        assert_eq!(
            deferred,
            [
                PriorityLevel::High,
                PriorityLevel::Low,
                PriorityLevel::Offscreen
            ]
        );
        assert!(!PriorityLevel::NoWork.is_deferred());
    }

    #[test]
    fn most_and_least_urgent() {
        let a = PriorityLevel::Animation;
        let b = PriorityLevel::Low;
        assert_eq!(a.most_urgent(b), a);
        assert_eq!(b.most_urgent(a), a);
        assert_eq!(a.least_urgent(b), b);
        assert_eq!(
            PriorityLevel::NoWork.most_urgent(PriorityLevel::Offscreen),
            PriorityLevel::Offscreen
        );
    }

    #[test]
    fn code_round_trips() {
        for level in PriorityLevel::WORK_LEVELS {
            assert_eq!(PriorityLevel::from_code(level.code()), Some(level));
        }
        assert_eq!(PriorityLevel::from_code(42), None);
    }
}
