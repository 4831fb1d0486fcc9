// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Matching new child descriptions against the committed children.

use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::element::{Element, Key};
use crate::host::Host;
use crate::tree::{Content, EffectTag, NodeId, NodeKind};

use super::root::Effect;
use super::work_loop::WorkCx;

/// Sibling identity used for matching.
#[derive(Clone, PartialEq, Eq, Hash)]
enum ChildKey {
    Explicit(Key),
    Index(u32),
}

impl ChildKey {
    fn new(key: Option<&Key>, index: u32) -> Self {
        match key {
            Some(k) => Self::Explicit(k.clone()),
            None => Self::Index(index),
        }
    }
}

fn kind_of<H: Host>(element: &Element<H>) -> NodeKind {
    match element {
        Element::Host(_) => NodeKind::Host,
        Element::Text(_) => NodeKind::Text,
        Element::Fragment(_) => NodeKind::Fragment,
    }
}

impl<H: Host> WorkCx<'_, H> {
    /// Makes `elements` the children of `wip`.
    ///
    /// Old children are those of `wip`'s committed alternate. A child is
    /// reused when its key (explicit, else position) matches and it has the
    /// same kind and host type. Placement and deletion effects are only
    /// recorded when `wip` has a committed alternate; otherwise the whole
    /// subtree is new and is attached through its top node.
    pub(crate) fn reconcile_children(&mut self, wip: NodeId, elements: &[Element<H>]) {
        let current = self.nodes.alternate(wip);
        let track = current.is_some();
        let old: Vec<NodeId> = match current {
            Some(c) => self.nodes.children(c).collect(),
            None => Vec::new(),
        };

        let mut by_key = HashMap::with_capacity(old.len());
        for (pos, &o) in old.iter().enumerate() {
            let i = o.idx as usize;
            by_key.insert(ChildKey::new(self.nodes.key[i].as_ref(), self.nodes.index[i]), pos);
        }
        let mut used = vec![false; old.len()];

        let mut last_placed = 0_u32;
        let mut new_ids = Vec::with_capacity(elements.len());
        for (n, element) in elements.iter().enumerate() {
            let key = ChildKey::new(element.key(), u32::try_from(n).unwrap_or(u32::MAX));
            let matched = by_key
                .get(&key)
                .copied()
                .filter(|&p| !used[p] && self.same_type(old[p], element));

            let id = if let Some(p) = matched {
                used[p] = true;
                let old_index = self.nodes.index[old[p].idx as usize];
                let (id, fresh) = self
                    .nodes
                    .work_in_progress(old[p], Content::from_element(element));
                if fresh {
                    self.work.created.push(id);
                }
                if track {
                    if old_index < last_placed {
                        self.nodes.effect[id.idx as usize] |= EffectTag::PLACEMENT;
                    } else {
                        last_placed = old_index;
                    }
                }
                id
            } else {
                let id = self.nodes.create(
                    kind_of(element),
                    element.key().cloned(),
                    Content::from_element(element),
                );
                self.work.created.push(id);
                if track {
                    self.nodes.effect[id.idx as usize] |= EffectTag::PLACEMENT;
                }
                id
            };
            new_ids.push(id);
        }

        if track {
            for (p, &o) in old.iter().enumerate() {
                if !used[p] {
                    self.work.effects.push(Effect::Delete(o));
                }
            }
        }

        self.nodes.set_children(wip, &new_ids);
    }

    fn same_type(&self, old: NodeId, element: &Element<H>) -> bool {
        let i = old.idx as usize;
        self.nodes.kind[i] == kind_of(element) && self.nodes.content[i].ty() == element.ty()
    }
}

#[cfg(test)]
mod tests {
    use crate::element::Element;
    use crate::test_host::{Tag, div, reconciler, span};

    fn keyed(key: &str, props: i32) -> Element<crate::test_host::TestHost> {
        span(props).with_key(key)
    }

    #[test]
    fn keyed_move_inserts_without_recreating() {
        let mut r = reconciler();
        let root = r.create_container(1).unwrap();
        r.update_container(
            Some(div(0).with_children([keyed("a", 1), keyed("b", 2), keyed("c", 3)])),
            root,
            None,
            None,
        )
        .unwrap();
        let before = r.host().log.len();

        r.update_container(
            Some(div(0).with_children([keyed("b", 2), keyed("a", 1), keyed("c", 3)])),
            root,
            None,
            None,
        )
        .unwrap();

        let log = &r.host().log[before..];
        assert!(
            !log.iter().any(|l| l.starts_with("create")),
            "moves reuse instances: {log:?}"
        );
        // Children complete first: a=#1 b=#2 c=#3 inside div #4. Only `a`
        // moves, in front of `c`.
        assert_eq!(
            r.host().mutations(),
            [
                "append Container(1)<-Inst(4)",
                "insert Inst(4)<-Inst(1) before Inst(3)",
            ]
        );
        assert_eq!(r.host().rendered(1), "<4:0>[<2:2> <1:1> <3:3>]");
    }

    #[test]
    fn type_change_replaces_node() {
        let mut r = reconciler();
        let root = r.create_container(1).unwrap();
        r.update_container(Some(div(0).with_children([span(1)])), root, None, None)
            .unwrap();
        let before = r.host().log.len();

        r.update_container(
            Some(div(0).with_children([Element::host(Tag::Input, 1)])),
            root,
            None,
            None,
        )
        .unwrap();

        let log: alloc::vec::Vec<&str> =
            r.host().log[before..].iter().map(alloc::string::String::as_str).collect();
        assert_eq!(
            log,
            [
                "create Input#3 depth=1",
                "prepare",
                "remove Inst(2)<-Inst(1)",
                "append Inst(2)<-Inst(3)",
                "reset",
                "mount 3",
            ]
        );
    }

    #[test]
    fn unkeyed_children_match_by_position() {
        let mut r = reconciler();
        let root = r.create_container(1).unwrap();
        r.update_container(
            Some(div(0).with_children([span(1), Element::text("x")])),
            root,
            None,
            None,
        )
        .unwrap();
        let before = r.host().log.len();

        r.update_container(
            Some(div(0).with_children([span(5), Element::text("y"), span(6)])),
            root,
            None,
            None,
        )
        .unwrap();

        let log: alloc::vec::Vec<&str> =
            r.host().log[before..].iter().map(alloc::string::String::as_str).collect();
        assert_eq!(
            log,
            [
                "create Span#4 depth=1",
                "prepare",
                "update 1 1->5",
                "text 2 \"x\"->\"y\"",
                "append Inst(3)<-Inst(4)",
                "reset",
            ]
        );
        assert_eq!(r.host().rendered(1), "<3:0>[<1:5> \"y\" <4:6>]");
    }
}
