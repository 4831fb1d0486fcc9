// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-root queue of pending updates.
//!
//! Updates are appended by `update_container` and never modified afterwards.
//! A pass at level `L` processes every update at `L` or more urgent that was
//! enqueued before the pass started (its *snapshot*). The last such update
//! supplies the root element; all of them have their callbacks run once the
//! pass commits. Entries are only removed by that commit.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::element::Element;
use crate::host::Host;
use crate::priority::PriorityLevel;
use crate::reconciler::Reconciler;

/// Completion callback attached to an update. Runs after the update commits.
pub type Callback<H> = Box<dyn FnOnce(&mut Reconciler<H>)>;

/// A request to render a new root element.
pub(crate) struct Update<H: Host> {
    /// New root element; `None` unmounts.
    pub(crate) payload: Option<Element<H>>,
    pub(crate) priority: PriorityLevel,
    pub(crate) callback: Option<Callback<H>>,
    /// Enqueue order across the whole reconciler.
    pub(crate) seq: u64,
}

impl<H: Host> Update<H> {
    fn is_eligible(&self, level: PriorityLevel, snapshot: u64) -> bool {
        self.priority <= level && self.seq <= snapshot
    }
}

impl<H: Host> fmt::Debug for Update<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update")
            .field("payload", &self.payload)
            .field("priority", &self.priority)
            .field("callback", &self.callback.is_some())
            .field("seq", &self.seq)
            .finish()
    }
}

/// Append-only (from the outside) list of updates for one root.
pub(crate) struct UpdateQueue<H: Host> {
    updates: Vec<Update<H>>,
}

impl<H: Host> fmt::Debug for UpdateQueue<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.updates).finish()
    }
}

impl<H: Host> Default for UpdateQueue<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> UpdateQueue<H> {
    pub(crate) const fn new() -> Self {
        Self {
            updates: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, update: Update<H>) {
        debug_assert!(
            self.updates.last().is_none_or(|u| u.seq < update.seq),
            "updates must be enqueued in sequence order"
        );
        self.updates.push(update);
    }

    pub(crate) fn len(&self) -> usize {
        self.updates.len()
    }

    /// Most urgent level among pending updates, or `NoWork`.
    pub(crate) fn pending_priority(&self) -> PriorityLevel {
        self.updates
            .iter()
            .map(|u| u.priority)
            .min()
            .unwrap_or(PriorityLevel::NoWork)
    }

    /// Sequence number of the newest pending update, or 0.
    pub(crate) fn latest_seq(&self) -> u64 {
        self.updates.last().map_or(0, |u| u.seq)
    }

    /// The newest update a pass at `level` with `snapshot` processes, as its
    /// sequence number and payload.
    pub(crate) fn select(
        &self,
        level: PriorityLevel,
        snapshot: u64,
    ) -> Option<(u64, &Option<Element<H>>)> {
        self.updates
            .iter()
            .rev()
            .find(|u| u.is_eligible(level, snapshot))
            .map(|u| (u.seq, &u.payload))
    }

    /// Removes the updates processed by a pass and returns their callbacks in
    /// enqueue order.
    pub(crate) fn take_processed(
        &mut self,
        level: PriorityLevel,
        snapshot: u64,
    ) -> Vec<Callback<H>> {
        let mut callbacks = Vec::new();
        let mut kept = Vec::with_capacity(self.updates.len());
        for u in self.updates.drain(..) {
            if u.is_eligible(level, snapshot) {
                callbacks.extend(u.callback);
            } else {
                kept.push(u);
            }
        }
        self.updates = kept;
        callbacks
    }
}
