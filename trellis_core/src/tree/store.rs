// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays work node storage with allocation and topology.

use alloc::vec::Vec;

use crate::element::Key;
use crate::host::Host;

use super::id::{INVALID, NodeId};
use super::node::{Content, EffectTag, NodeKind, Output};
use super::traverse::Children;

/// Struct-of-arrays storage for the work nodes of every root.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Released nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
pub(crate) struct NodeStore<H: Host> {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) child: Vec<u32>,
    pub(crate) sibling: Vec<u32>,
    pub(crate) alternate: Vec<u32>,

    // -- Description --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) key: Vec<Option<Key>>,
    pub(crate) index: Vec<u32>,
    pub(crate) content: Vec<Content<H>>,
    /// Owning root index for `Root` nodes, [`INVALID`] otherwise.
    pub(crate) root: Vec<u32>,

    // -- Output & pending effects --
    pub(crate) output: Vec<Output<H>>,
    pub(crate) effect: Vec<EffectTag>,
    pub(crate) payload: Vec<Option<H::UpdatePayload>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl<H: Host> core::fmt::Debug for NodeStore<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeStore")
            .field("len", &self.len)
            .field("free", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl<H: Host> Default for NodeStore<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> NodeStore<H> {
    /// Creates an empty store.
    pub(crate) fn new() -> Self {
        Self {
            parent: Vec::new(),
            child: Vec::new(),
            sibling: Vec::new(),
            alternate: Vec::new(),
            kind: Vec::new(),
            key: Vec::new(),
            index: Vec::new(),
            content: Vec::new(),
            root: Vec::new(),
            output: Vec::new(),
            effect: Vec::new(),
            payload: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    // -- Allocation API --

    /// Allocates a detached node with no output, no effects and no alternate.
    pub(crate) fn create(
        &mut self,
        kind: NodeKind,
        key: Option<Key>,
        content: Content<H>,
    ) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.child[i] = INVALID;
            self.sibling[i] = INVALID;
            self.alternate[i] = INVALID;
            self.kind[i] = kind;
            self.key[i] = key;
            self.index[i] = 0;
            self.content[i] = content;
            self.root[i] = INVALID;
            self.output[i] = Output::None;
            self.effect[i] = EffectTag::empty();
            self.payload[i] = None;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.child.push(INVALID);
            self.sibling.push(INVALID);
            self.alternate.push(INVALID);
            self.kind.push(kind);
            self.key.push(key);
            self.index.push(0);
            self.content.push(content);
            self.root.push(INVALID);
            self.output.push(Output::None);
            self.effect.push(EffectTag::empty());
            self.payload.push(None);
            self.generation.push(0);
            idx
        };

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Releases a node, freeing its slot for reuse.
    ///
    /// The node's alternate, if still linked back to it, loses its partner.
    /// Topology of other nodes is not touched; callers release whole subtrees.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub(crate) fn release(&mut self, id: NodeId) {
        self.validate(id);
        let i = id.idx as usize;

        let alt = self.alternate[i];
        if alt != INVALID && self.alternate[alt as usize] == id.idx {
            self.alternate[alt as usize] = INVALID;
        }

        self.parent[i] = INVALID;
        self.child[i] = INVALID;
        self.sibling[i] = INVALID;
        self.alternate[i] = INVALID;
        self.key[i] = None;
        self.content[i] = Content::Vacant;
        self.output[i] = Output::None;
        self.effect[i] = EffectTag::empty();
        self.payload[i] = None;

        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.free_list.push(id.idx);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub(crate) fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len && self.generation[id.idx as usize] == id.generation
    }

    /// Number of live nodes.
    #[must_use]
    pub(crate) fn live_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Returns the handle for a live slot index.
    #[inline]
    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        debug_assert!(idx < self.len, "slot {idx} out of range");
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn link(&self, idx: u32) -> Option<NodeId> {
        (idx != INVALID).then(|| self.id_at(idx))
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.link(self.parent[id.idx as usize])
    }

    /// Returns the first child of a node, if any.
    #[must_use]
    pub(crate) fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.link(self.child[id.idx as usize])
    }

    /// Returns the next sibling of a node, if any.
    #[must_use]
    pub(crate) fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.link(self.sibling[id.idx as usize])
    }

    /// Returns the double-buffer partner of a node, if any.
    #[must_use]
    pub(crate) fn alternate(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.link(self.alternate[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub(crate) fn children(&self, id: NodeId) -> Children<'_, H> {
        self.validate(id);
        Children::new(self, self.child[id.idx as usize])
    }

    /// Makes `children` the ordered child list of `parent`, replacing any
    /// previous list.
    pub(crate) fn set_children(&mut self, parent: NodeId, children: &[NodeId]) {
        self.validate(parent);
        let mut prev = INVALID;
        for (i, &c) in children.iter().enumerate() {
            self.validate(c);
            self.parent[c.idx as usize] = parent.idx;
            self.sibling[c.idx as usize] = INVALID;
            self.index[c.idx as usize] = u32::try_from(i).unwrap_or(u32::MAX);
            if prev == INVALID {
                self.child[parent.idx as usize] = c.idx;
            } else {
                self.sibling[prev as usize] = c.idx;
            }
            prev = c.idx;
        }
        if children.is_empty() {
            self.child[parent.idx as usize] = INVALID;
        }
    }

    /// Returns the work-in-progress partner of `current` carrying `content`.
    ///
    /// Reuses the existing alternate buffer when there is one, resetting its
    /// links and effects; otherwise allocates a fresh node and pairs it. The
    /// output handle is copied from `current`. The second value is `true` when
    /// a node was allocated.
    pub(crate) fn work_in_progress(&mut self, current: NodeId, content: Content<H>) -> (NodeId, bool) {
        self.validate(current);
        let c = current.idx as usize;
        let alt = self.alternate[c];
        if alt != INVALID {
            let a = alt as usize;
            self.parent[a] = INVALID;
            self.child[a] = INVALID;
            self.sibling[a] = INVALID;
            self.index[a] = self.index[c];
            self.content[a] = content;
            self.root[a] = self.root[c];
            self.output[a] = self.output[c].clone();
            self.effect[a] = EffectTag::empty();
            self.payload[a] = None;
            (self.id_at(alt), false)
        } else {
            let kind = self.kind[c];
            let key = self.key[c].clone();
            let id = self.create(kind, key, content);
            let i = id.idx as usize;
            self.index[i] = self.index[c];
            self.root[i] = self.root[c];
            self.output[i] = self.output[c].clone();
            self.pair(current, id);
            (id, true)
        }
    }

    /// Links two nodes as each other's alternate.
    pub(crate) fn pair(&mut self, a: NodeId, b: NodeId) {
        self.validate(a);
        self.validate(b);
        self.alternate[a.idx as usize] = b.idx;
        self.alternate[b.idx as usize] = a.idx;
    }

    /// Collects `id` and all its descendants in pre-order.
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = alloc::vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            let mark = stack.len();
            let mut c = self.child[n.idx as usize];
            while c != INVALID {
                stack.push(self.id_at(c));
                c = self.sibling[c as usize];
            }
            stack[mark..].reverse();
        }
        out
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }
}
