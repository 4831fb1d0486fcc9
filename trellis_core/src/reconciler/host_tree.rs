// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapping between work nodes and the host tree.
//!
//! Fragments and roots own no host output, so a node's host parent, host
//! siblings and host children have to be found by walking past them.

use alloc::vec::Vec;

use crate::host::{Host, HostParent};
use crate::tree::{EffectTag, INVALID, NodeId, NodeKind, NodeStore};

/// Rendering nodes at the top of `node`'s subtree, in order: `node` itself
/// if it renders, else the nearest rendering descendants.
pub(crate) fn top_host_nodes<H: Host>(nodes: &NodeStore<H>, node: NodeId) -> Vec<u32> {
    let mut out = Vec::new();
    if nodes.kind[node.idx as usize].renders() {
        out.push(node.idx);
        return out;
    }
    collect_host_children(nodes, nodes.child[node.idx as usize], &mut out);
    out
}

/// Appends the nearest rendering nodes reachable from the sibling chain
/// starting at `first`, descending through non-rendering nodes.
pub(crate) fn collect_host_children<H: Host>(nodes: &NodeStore<H>, first: u32, out: &mut Vec<u32>) {
    let mut stack = Vec::new();
    let mut c = first;
    loop {
        while c == INVALID {
            match stack.pop() {
                Some(next) => c = next,
                None => return,
            }
        }
        let i = c as usize;
        if nodes.kind[i].renders() {
            out.push(c);
            c = nodes.sibling[i];
        } else {
            stack.push(nodes.sibling[i]);
            c = nodes.child[i];
        }
    }
}

/// Host parent of `node`: the output of the nearest host ancestor, or the
/// container when the nearest is the root.
///
/// # Panics
///
/// Panics if `node` is detached or an ancestor host node has no output.
pub(crate) fn host_parent<'a, H: Host>(
    nodes: &'a NodeStore<H>,
    container: &'a H::Container,
    node: NodeId,
) -> HostParent<'a, H> {
    let mut p = nodes.parent[node.idx as usize];
    while p != INVALID {
        let i = p as usize;
        match nodes.kind[i] {
            NodeKind::Root => return HostParent::Container(container),
            NodeKind::Host => match nodes.output[i].instance() {
                Some(instance) => return HostParent::Instance(instance),
                None => panic!("host ancestor {p} has no output"),
            },
            NodeKind::Text | NodeKind::Fragment => {}
        }
        p = nodes.parent[i];
    }
    panic!("node {node:?} has no host parent");
}

/// The rendering node that `node`'s output should be inserted before: the
/// next host node in document order under the same host parent that is not
/// itself about to be placed.
pub(crate) fn host_sibling<H: Host>(nodes: &NodeStore<H>, node: NodeId) -> Option<u32> {
    let mut n = node.idx;
    'siblings: loop {
        while nodes.sibling[n as usize] == INVALID {
            let p = nodes.parent[n as usize];
            if p == INVALID || nodes.kind[p as usize].is_host_parent() {
                return None;
            }
            n = p;
        }
        n = nodes.sibling[n as usize];
        while !nodes.kind[n as usize].renders() {
            // Placed subtrees are not stable anchors.
            if nodes.effect[n as usize].contains(EffectTag::PLACEMENT) {
                continue 'siblings;
            }
            let c = nodes.child[n as usize];
            if c == INVALID {
                continue 'siblings;
            }
            n = c;
        }
        if !nodes.effect[n as usize].contains(EffectTag::PLACEMENT) {
            return Some(n);
        }
    }
}

/// First rendering node of `node`'s subtree in document order.
pub(crate) fn first_host_node<H: Host>(nodes: &NodeStore<H>, node: NodeId) -> Option<u32> {
    if nodes.kind[node.idx as usize].renders() {
        return Some(node.idx);
    }
    let mut out = Vec::new();
    collect_host_children(nodes, nodes.child[node.idx as usize], &mut out);
    out.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_host::{Tag, TestHost};
    use crate::tree::{Content, Output};

    fn node(store: &mut NodeStore<TestHost>, kind: NodeKind, out: u32) -> NodeId {
        let content = match kind {
            NodeKind::Host => Content::Host {
                ty: Tag::Div,
                props: 0,
                children: alloc::vec::Vec::new().into(),
            },
            NodeKind::Text => Content::Text("t".into()),
            NodeKind::Fragment => Content::Fragment(alloc::vec::Vec::new().into()),
            NodeKind::Root => Content::Root(None),
        };
        let id = store.create(kind, None, content);
        match kind {
            NodeKind::Host => store.output[id.idx as usize] = Output::Instance(out),
            NodeKind::Text => store.output[id.idx as usize] = Output::Text(out),
            _ => {}
        }
        id
    }

    /// root
    /// ├─ frag
    /// │  ├─ a (host 1)
    /// │  └─ frag2 (empty)
    /// ├─ b (host 2)
    /// └─ t (text 3)
    fn fixture() -> (NodeStore<TestHost>, [NodeId; 6]) {
        let mut s = NodeStore::new();
        let root = node(&mut s, NodeKind::Root, 0);
        let frag = node(&mut s, NodeKind::Fragment, 0);
        let a = node(&mut s, NodeKind::Host, 1);
        let frag2 = node(&mut s, NodeKind::Fragment, 0);
        let b = node(&mut s, NodeKind::Host, 2);
        let t = node(&mut s, NodeKind::Text, 3);
        s.set_children(root, &[frag, b, t]);
        s.set_children(frag, &[a, frag2]);
        (s, [root, frag, a, frag2, b, t])
    }

    #[test]
    fn host_children_descend_through_fragments() {
        let (s, [root, frag, a, _, b, t]) = fixture();
        assert_eq!(top_host_nodes(&s, root), [a.idx, b.idx, t.idx]);
        assert_eq!(top_host_nodes(&s, frag), [a.idx]);
        assert_eq!(top_host_nodes(&s, b), [b.idx]);
        assert_eq!(first_host_node(&s, root), Some(a.idx));
    }

    #[test]
    fn host_parent_skips_fragments() {
        let (s, [_, _, a, _, b, _]) = fixture();
        let container = 9;
        assert!(matches!(
            host_parent(&s, &container, a),
            HostParent::Container(&9)
        ));
        assert!(matches!(
            host_parent(&s, &container, b),
            HostParent::Container(&9)
        ));
    }

    #[test]
    fn host_sibling_climbs_out_of_fragments_and_skips_placements() {
        let (mut s, [_, _, a, _, b, t]) = fixture();
        assert_eq!(host_sibling(&s, a), Some(b.idx));
        s.effect[b.idx as usize] = EffectTag::PLACEMENT;
        assert_eq!(host_sibling(&s, a), Some(t.idx), "placed sibling skipped");
        assert_eq!(host_sibling(&s, t), None);
    }
}
