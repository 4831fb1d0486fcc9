// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-root state and parked work.

use alloc::vec::Vec;
use core::fmt;

use crate::context::ContextValue;
use crate::host::Host;
use crate::priority::PriorityLevel;
use crate::trace::PassSummaryBuilder;
use crate::tree::NodeId;
use crate::update_queue::UpdateQueue;

/// Handle to a root created by
/// [`Reconciler::create_container`](crate::Reconciler::create_container).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RootId(pub(crate) u32);

impl RootId {
    /// Returns the raw index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Rebuilds a handle from a raw index, e.g. one read back from a trace
    /// recording. Reconciler entry points reject indices they never issued.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Debug for RootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RootId({})", self.0)
    }
}

/// Where a root is in its render cycle.
///
/// `Idle → BuildingAlternate → EffectsReady → Committing → Idle`. A root
/// stays in `BuildingAlternate` while deferred work is parked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RootPhase {
    /// No work in progress.
    #[default]
    Idle,
    /// A work-in-progress tree is being built (possibly parked).
    BuildingAlternate,
    /// The work-in-progress tree is complete and its effects are collected.
    EffectsReady,
    /// Mutations are being applied.
    Committing,
}

/// A recorded side effect, in commit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Effect {
    /// Remove the subtree rooted at this *current* node.
    Delete(NodeId),
    /// Apply the [`EffectTag`](crate::tree::EffectTag)s of this
    /// work-in-progress node.
    Apply(NodeId),
}

/// A pass in progress: the work-in-progress tree plus the cursor to resume.
pub(crate) struct WorkState<H: Host> {
    pub(crate) priority: PriorityLevel,
    /// Updates with a sequence number above this were enqueued after the
    /// pass started and are not part of it.
    pub(crate) snapshot: u64,
    /// Sequence number of the update supplying the root element.
    pub(crate) selected_seq: u64,
    pub(crate) top: NodeId,
    /// Next node to visit. `None` once the tree is complete.
    pub(crate) next: Option<NodeId>,
    pub(crate) effects: Vec<Effect>,
    /// Nodes allocated by this pass; released if it is discarded.
    pub(crate) created: Vec<NodeId>,
    pub(crate) contexts: Vec<H::HostContext>,
    pub(crate) pass: u64,
    pub(crate) summary: PassSummaryBuilder,
}

impl<H: Host> fmt::Debug for WorkState<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkState")
            .field("priority", &self.priority)
            .field("pass", &self.pass)
            .field("top", &self.top)
            .field("next", &self.next)
            .field("effects", &self.effects.len())
            .field("created", &self.created.len())
            .finish_non_exhaustive()
    }
}

/// A container and everything the reconciler tracks for it.
pub(crate) struct Root<H: Host> {
    pub(crate) container: H::Container,
    /// Top node of the committed tree.
    pub(crate) current: NodeId,
    pub(crate) context: Option<ContextValue>,
    pub(crate) pending_context: Option<ContextValue>,
    pub(crate) queue: UpdateQueue<H>,
    pub(crate) work: Option<WorkState<H>>,
    /// Sequence number of the newest update whose element is committed.
    pub(crate) applied_seq: u64,
    pub(crate) phase: RootPhase,
}

impl<H: Host> Root<H> {
    pub(crate) fn new(container: H::Container, current: NodeId) -> Self {
        Self {
            container,
            current,
            context: None,
            pending_context: None,
            queue: UpdateQueue::new(),
            work: None,
            applied_seq: 0,
            phase: RootPhase::Idle,
        }
    }
}

impl<H: Host> fmt::Debug for Root<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("container", &self.container)
            .field("current", &self.current)
            .field("phase", &self.phase)
            .field("queue", &self.queue)
            .field("work", &self.work)
            .finish_non_exhaustive()
    }
}
