// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reconciler tuning knobs.

use crate::priority::PriorityLevel;
use crate::time::Duration;

/// Configuration for the [`Reconciler`](crate::Reconciler).
///
/// Plain data with `const` presets; pick the preset closest to the host and
/// adjust individual fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Minimum time a deferred slice must have left to start another node
    /// visit. When the deadline reports less, the traversal parks and the
    /// reconciler asks the host for another deferred callback.
    pub yield_threshold: Duration,
    /// Maximum number of commits of one root a single flush may perform
    /// before it gives up with [`ReconcileError::NestedUpdateLimit`](crate::ReconcileError::NestedUpdateLimit).
    ///
    /// Completion callbacks that keep scheduling synchronous updates would
    /// otherwise loop forever.
    pub nested_update_limit: u32,
    /// Level used by [`deferred_updates`](crate::Reconciler::deferred_updates).
    pub deferred_level: PriorityLevel,
}

impl ReconcilerConfig {
    /// Preset for interactive hosts (UI event loops).
    ///
    /// 1 ms yield threshold at nanosecond ticks.
    #[must_use]
    pub const fn interactive() -> Self {
        Self {
            yield_threshold: Duration(1_000_000),
            nested_update_limit: 1000,
            deferred_level: PriorityLevel::Low,
        }
    }

    /// Preset for background hosts that render mostly offscreen content.
    ///
    /// 4 ms yield threshold at nanosecond ticks.
    #[must_use]
    pub const fn background() -> Self {
        Self {
            yield_threshold: Duration(4_000_000),
            nested_update_limit: 1000,
            deferred_level: PriorityLevel::Offscreen,
        }
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self::interactive()
    }
}
