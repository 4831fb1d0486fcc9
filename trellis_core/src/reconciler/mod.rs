// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The reconciler: root registry, update entry points and inspection.
//!
//! A [`Reconciler`] owns the host adapter, the node arena shared by all of
//! its roots, the per-root update queues and the ambient priority stack.
//! Everything runs on the caller's thread; long deferred passes are split
//! into slices driven by the host's event loop.
//!
//! ```rust,ignore
//! let mut r = Reconciler::new(host, ReconcilerConfig::interactive());
//! let root = r.create_container(window)?;
//!
//! // Synchronous outside a batch: committed before the call returns.
//! r.update_container(Some(tree), root, None, None)?;
//!
//! // Deferred: rendered in slices from the host's idle callback.
//! r.deferred_updates(|r| r.update_container(Some(next), root, None, None))?;
//! ```

mod batch;
mod children;
mod commit;
mod host_tree;
mod root;
mod scheduler;
mod work_loop;

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

pub use batch::PriorityScope;
pub use root::{RootId, RootPhase};

use crate::config::ReconcilerConfig;
use crate::context::{ContextResolver, ContextValue};
use crate::element::Element;
use crate::error::{ReconcileError, Result};
use crate::host::{Host, HostHandle};
use crate::priority::PriorityLevel;
use crate::trace::{TraceSink, Tracer, UpdateScheduledEvent};
use crate::tree::{Content, INVALID, NodeId, NodeKind, NodeRef, NodeStore};
use crate::update_queue::{Callback, Update};

use host_tree::first_host_node;
use root::Root;

/// Schedules, renders and commits element trees into host containers.
pub struct Reconciler<H: Host> {
    host: H,
    config: ReconcilerConfig,
    nodes: NodeStore<H>,
    roots: Vec<Root<H>>,
    /// Roots with pending updates, in the order they were first scheduled.
    scheduled: Vec<RootId>,
    next_seq: u64,
    priority_stack: Vec<PriorityLevel>,
    batching: bool,
    is_performing: bool,
    is_committing: bool,
    animation_requested: bool,
    deferred_requested: bool,
    resolver: Option<ContextResolver<H>>,
    tracer: Tracer,
    passes: u64,
}

impl<H: Host + fmt::Debug> fmt::Debug for Reconciler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("host", &self.host)
            .field("config", &self.config)
            .field("nodes", &self.nodes)
            .field("roots", &self.roots)
            .field("scheduled", &self.scheduled)
            .field("priority_stack", &self.priority_stack)
            .field("batching", &self.batching)
            .field("is_performing", &self.is_performing)
            .field("is_committing", &self.is_committing)
            .field("tracer", &self.tracer)
            .finish_non_exhaustive()
    }
}

impl<H: Host> Reconciler<H> {
    /// Creates a reconciler with no roots.
    #[must_use]
    pub fn new(host: H, config: ReconcilerConfig) -> Self {
        Self {
            host,
            config,
            nodes: NodeStore::new(),
            roots: Vec::new(),
            scheduled: Vec::new(),
            next_seq: 0,
            priority_stack: Vec::new(),
            batching: false,
            is_performing: false,
            is_committing: false,
            animation_requested: false,
            deferred_requested: false,
            resolver: None,
            tracer: Tracer::none(),
            passes: 0,
        }
    }

    /// Installs the context resolver consulted by
    /// [`update_container`](Self::update_container).
    ///
    /// # Panics
    ///
    /// Panics if a resolver is already installed.
    #[must_use]
    pub fn with_context_resolver(
        mut self,
        resolver: impl Fn(Option<NodeRef<'_, H>>) -> ContextValue + 'static,
    ) -> Self {
        assert!(self.resolver.is_none(), "context resolver already installed");
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Routes trace events to `sink`, replacing any previous sink.
    ///
    /// Without the `trace` feature the sink is dropped.
    pub fn set_trace_sink(&mut self, sink: impl TraceSink + 'static) {
        self.tracer = Tracer::new(Box::new(sink));
    }

    /// Rejects entry while a commit is active.
    fn check_entry(&self) -> Result<(), H::Error> {
        if self.is_committing {
            return Err(ReconcileError::ReentrantCommit);
        }
        Ok(())
    }

    fn root_state(&self, root: RootId) -> Result<&Root<H>, H::Error> {
        self.roots
            .get(root.0 as usize)
            .ok_or(ReconcileError::UnknownRoot(root))
    }

    // -- Containers --

    /// Registers `container` as a new root with an empty tree.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidContainer`] if the host rejects the
    /// container (no root is allocated) and
    /// [`ReconcileError::ReentrantCommit`] if called during a commit.
    pub fn create_container(&mut self, container: H::Container) -> Result<RootId, H::Error> {
        self.check_entry()?;
        self.host
            .validate_container(&container)
            .map_err(ReconcileError::InvalidContainer)?;

        let id = RootId(u32::try_from(self.roots.len()).unwrap_or(INVALID));
        let current = self.nodes.create(NodeKind::Root, None, Content::Root(None));
        self.nodes.root[current.idx as usize] = id.0;
        self.roots.push(Root::new(container, current));
        Ok(id)
    }

    /// Enqueues `element` as the new content of `root`.
    ///
    /// The context for the update is resolved from `parent` by the installed
    /// resolver. The first update of a root sets its context; later ones set
    /// the pending context, which becomes current when they commit.
    ///
    /// The update gets the ambient priority (see
    /// [`priority_context`](Self::priority_context)). Synchronous updates are
    /// committed before this returns; `callback` runs after the update
    /// commits.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownRoot`] for a foreign handle,
    /// [`ReconcileError::ReentrantCommit`] during a commit, and any error of
    /// work performed synchronously.
    pub fn update_container(
        &mut self,
        element: Option<Element<H>>,
        root: RootId,
        parent: Option<NodeId>,
        callback: Option<Callback<H>>,
    ) -> Result<(), H::Error> {
        self.check_entry()?;
        self.root_state(root)?;

        let context = match &self.resolver {
            Some(resolve) => resolve(parent.and_then(|id| NodeRef::new(&self.nodes, id))),
            None => ContextValue::empty(),
        };
        let priority = self.priority_context();
        self.next_seq += 1;
        let seq = self.next_seq;

        let state = &mut self.roots[root.0 as usize];
        if state.context.is_none() {
            state.context = Some(context);
        } else {
            state.pending_context = Some(context);
        }
        state.queue.push(Update {
            payload: element,
            priority,
            callback,
            seq,
        });

        let timestamp = self.trace_now();
        self.tracer.update_scheduled(&UpdateScheduledEvent {
            root,
            seq,
            priority,
            timestamp,
        });
        self.schedule_update(root, priority)
    }

    /// Enqueues removal of everything rendered into `root`.
    ///
    /// # Errors
    ///
    /// As for [`update_container`](Self::update_container).
    pub fn unmount_container(
        &mut self,
        root: RootId,
        callback: Option<Callback<H>>,
    ) -> Result<(), H::Error> {
        self.update_container(None, root, None, callback)
    }

    // -- Host output lookup --

    /// Output of the first host node of `root`'s committed tree, descending
    /// through fragments. `None` when nothing is rendered or the handle is
    /// unknown.
    #[must_use]
    pub fn get_public_root_instance(&self, root: RootId) -> Option<HostHandle<H>> {
        let current = self.root_state(root).ok()?.current;
        let first = first_host_node(&self.nodes, current)?;
        self.nodes.output[first as usize].to_handle()
    }

    /// Nearest committed host output at or below `node`.
    ///
    /// `node` may name either buffer of a pair; the lookup always uses the
    /// committed one. `None` when the node is stale, not mounted, or renders
    /// nothing.
    #[must_use]
    pub fn find_host_instance(&self, node: NodeId) -> Option<HostHandle<H>> {
        let current = self.current_buffer(node)?;
        let first = first_host_node(&self.nodes, current)?;
        self.nodes.output[first as usize].to_handle()
    }

    /// The member of `node`'s pair that is reachable from a root's current
    /// top node.
    fn current_buffer(&self, node: NodeId) -> Option<NodeId> {
        if !self.nodes.is_alive(node) {
            return None;
        }
        [Some(node), self.nodes.alternate(node)]
            .into_iter()
            .flatten()
            .find(|&n| self.is_current(n))
    }

    fn is_current(&self, node: NodeId) -> bool {
        let mut n = node.idx;
        // Idle buffers can hold stale links; check both directions and bound
        // the walk.
        for _ in 0..=self.nodes.live_count() {
            let p = self.nodes.parent[n as usize];
            if p == INVALID {
                let r = self.nodes.root[n as usize];
                return self.nodes.kind[n as usize] == NodeKind::Root
                    && self
                        .roots
                        .get(r as usize)
                        .is_some_and(|root| root.current == self.nodes.id_at(n));
            }
            if !self.nodes.children(self.nodes.id_at(p)).any(|c| c.idx == n) {
                return false;
            }
            n = p;
        }
        false
    }

    // -- Inspection --

    /// The host adapter.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The host adapter, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Where `root` is in its render cycle.
    #[must_use]
    pub fn root_phase(&self, root: RootId) -> Option<RootPhase> {
        self.root_state(root).ok().map(|r| r.phase)
    }

    /// The committed context of `root`, once set.
    #[must_use]
    pub fn root_context(&self, root: RootId) -> Option<&ContextValue> {
        self.root_state(root).ok()?.context.as_ref()
    }

    /// Context waiting for `root`'s next commit.
    #[must_use]
    pub fn root_pending_context(&self, root: RootId) -> Option<&ContextValue> {
        self.root_state(root).ok()?.pending_context.as_ref()
    }

    /// The container `root` renders into.
    #[must_use]
    pub fn root_container(&self, root: RootId) -> Option<&H::Container> {
        self.root_state(root).ok().map(|r| &r.container)
    }

    /// Top node of `root`'s committed tree.
    #[must_use]
    pub fn root_node(&self, root: RootId) -> Option<NodeRef<'_, H>> {
        let current = self.root_state(root).ok()?.current;
        NodeRef::new(&self.nodes, current)
    }

    /// A read-only view of `node`, or `None` if the handle is stale.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<NodeRef<'_, H>> {
        NodeRef::new(&self.nodes, node)
    }

    /// Most urgent pending level of `root`; `NoWork` when idle or unknown.
    #[must_use]
    pub fn pending_priority(&self, root: RootId) -> PriorityLevel {
        self.root_state(root)
            .map_or(PriorityLevel::NoWork, |r| r.queue.pending_priority())
    }

    /// Number of live work nodes across all roots and both buffers.
    #[must_use]
    pub fn live_nodes(&self) -> usize {
        self.nodes.live_count()
    }
}
