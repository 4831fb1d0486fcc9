// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only views over the node store.

use core::fmt;

use crate::element::Key;
use crate::host::{Host, HostHandle};

use super::id::{INVALID, NodeId};
use super::node::{EffectTag, NodeKind};
use super::store::NodeStore;

/// An iterator over the direct children of a node.
pub struct Children<'a, H: Host> {
    store: &'a NodeStore<H>,
    current: u32,
}

impl<'a, H: Host> Children<'a, H> {
    pub(crate) fn new(store: &'a NodeStore<H>, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl<H: Host> fmt::Debug for Children<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Children")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<H: Host> Iterator for Children<'_, H> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.sibling[idx as usize];
        Some(self.store.id_at(idx))
    }
}

/// A borrowed, read-only view of one work node.
///
/// Obtained from [`Reconciler::node`](crate::Reconciler::node) and handed to
/// the context resolver. The view may show either buffer of a pair; use
/// [`Reconciler::find_host_instance`](crate::Reconciler::find_host_instance)
/// to reach committed output.
pub struct NodeRef<'a, H: Host> {
    store: &'a NodeStore<H>,
    id: NodeId,
}

impl<H: Host> Clone for NodeRef<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: Host> Copy for NodeRef<'_, H> {}

impl<H: Host> fmt::Debug for NodeRef<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("key", &self.key())
            .field("ty", &self.ty())
            .finish()
    }
}

impl<'a, H: Host> NodeRef<'a, H> {
    /// Creates a view, or `None` if `id` is stale.
    pub(crate) fn new(store: &'a NodeStore<H>, id: NodeId) -> Option<Self> {
        store.is_alive(id).then_some(Self { store, id })
    }

    fn at(self, id: Option<NodeId>) -> Option<Self> {
        id.map(|id| Self {
            store: self.store,
            id,
        })
    }

    /// The node's handle.
    #[must_use]
    pub fn id(self) -> NodeId {
        self.id
    }

    /// What the node stands for.
    #[must_use]
    pub fn kind(self) -> NodeKind {
        self.store.kind[self.id.idx as usize]
    }

    /// Sibling identity, if keyed.
    #[must_use]
    pub fn key(self) -> Option<&'a Key> {
        self.store.key[self.id.idx as usize].as_ref()
    }

    /// Position among its siblings.
    #[must_use]
    pub fn index(self) -> u32 {
        self.store.index[self.id.idx as usize]
    }

    /// Host type, for host nodes.
    #[must_use]
    pub fn ty(self) -> Option<&'a H::Type> {
        self.store.content[self.id.idx as usize].ty()
    }

    /// Properties, for host nodes.
    #[must_use]
    pub fn props(self) -> Option<&'a H::Props> {
        self.store.content[self.id.idx as usize].props()
    }

    /// Text, for text nodes.
    #[must_use]
    pub fn text(self) -> Option<&'a str> {
        self.store.content[self.id.idx as usize].text()
    }

    /// Host output owned by the node, if it renders and was constructed.
    #[must_use]
    pub fn output(self) -> Option<HostHandle<H>> {
        self.store.output[self.id.idx as usize].to_handle()
    }

    /// Effects pending on this buffer. Always empty for committed nodes.
    #[must_use]
    pub fn effect(self) -> EffectTag {
        self.store.effect[self.id.idx as usize]
    }

    /// Parent node, if any.
    #[must_use]
    pub fn parent(self) -> Option<Self> {
        self.at(self.store.parent(self.id))
    }

    /// First child, if any.
    #[must_use]
    pub fn first_child(self) -> Option<Self> {
        self.at(self.store.first_child(self.id))
    }

    /// Next sibling, if any.
    #[must_use]
    pub fn next_sibling(self) -> Option<Self> {
        self.at(self.store.next_sibling(self.id))
    }

    /// Iterator over the direct children's handles.
    #[must_use]
    pub fn children(self) -> Children<'a, H> {
        self.store.children(self.id)
    }
}
