// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resumable depth-first construction of the work-in-progress tree.
//!
//! One *unit* visits one node. The begin step runs top-down: it derives the
//! node's host context and reconciles its children. When a node has no
//! children left to visit, the complete step runs bottom-up: it creates or
//! diffs host output, pops the host context and records the node's effects.
//! Effects therefore land in completion (post-) order.
//!
//! The cursor and the host context stack live in [`WorkState`], so a deferred
//! pass can stop between any two units and pick up later.

use alloc::vec::Vec;

use crate::deadline::Deadline;
use crate::host::Host;
use crate::time::Duration;
use crate::tree::{Content, EffectTag, NodeId, NodeStore, Output};

use super::host_tree::collect_host_children;
use super::root::{Effect, WorkState};

/// Borrowed state for building one root's work-in-progress tree.
pub(crate) struct WorkCx<'a, H: Host> {
    pub(crate) host: &'a mut H,
    pub(crate) nodes: &'a mut NodeStore<H>,
    pub(crate) container: &'a H::Container,
    pub(crate) work: &'a mut WorkState<H>,
}

impl<H: Host> WorkCx<'_, H> {
    /// Visits nodes until the tree is complete or `deadline` runs low.
    ///
    /// Returns whether the tree is complete. Without a deadline the pass runs
    /// to completion.
    pub(crate) fn run(
        &mut self,
        deadline: Option<&dyn Deadline>,
        threshold: Duration,
    ) -> Result<bool, H::Error> {
        let mut units = 0_u32;
        let result = loop {
            let Some(node) = self.work.next else {
                break Ok(true);
            };
            if deadline.is_some_and(|d| d.time_remaining() < threshold) {
                break Ok(false);
            }
            match self.perform_unit(node) {
                Ok(next) => self.work.next = next,
                Err(e) => break Err(e),
            }
            units += 1;
        };
        self.work.summary.add_units(units);
        result
    }

    fn perform_unit(&mut self, node: NodeId) -> Result<Option<NodeId>, H::Error> {
        if let Some(child) = self.begin(node) {
            return Ok(Some(child));
        }
        self.complete_unit(node)
    }

    /// Completes `node` and its ancestors until one has a sibling left to
    /// visit.
    fn complete_unit(&mut self, mut node: NodeId) -> Result<Option<NodeId>, H::Error> {
        loop {
            self.complete(node)?;
            if !self.nodes.effect[node.idx as usize].is_empty() {
                self.work.effects.push(Effect::Apply(node));
            }
            if node == self.work.top {
                return Ok(None);
            }
            if let Some(sibling) = self.nodes.next_sibling(node) {
                return Ok(Some(sibling));
            }
            match self.nodes.parent(node) {
                Some(parent) => node = parent,
                None => return Ok(None),
            }
        }
    }

    fn context(&self) -> &H::HostContext {
        match self.work.contexts.last() {
            Some(ctx) => ctx,
            None => panic!("host context stack is empty"),
        }
    }

    /// Begin step: returns the first child to visit, if any.
    fn begin(&mut self, node: NodeId) -> Option<NodeId> {
        let i = node.idx as usize;
        match &self.nodes.content[i] {
            Content::Root(element) => {
                let element = element.clone();
                let ctx = self.host.root_host_context(self.container);
                self.work.contexts.push(ctx);
                self.reconcile_children(node, element.as_slice());
            }
            Content::Host { ty, children, .. } => {
                let children = children.clone();
                let ctx = self.host.child_host_context(self.context(), ty);
                self.work.contexts.push(ctx);
                self.reconcile_children(node, &children);
            }
            Content::Fragment(children) => {
                let children = children.clone();
                self.reconcile_children(node, &children);
            }
            Content::Text(_) => {}
            Content::Vacant => panic!("visited released node {node:?}"),
        }
        self.nodes.first_child(node)
    }

    /// Complete step: creates or diffs host output.
    fn complete(&mut self, node: NodeId) -> Result<(), H::Error> {
        let i = node.idx as usize;
        match &self.nodes.content[i] {
            Content::Root(_) => {
                self.work.contexts.pop();
            }
            Content::Fragment(_) => {}
            Content::Host { .. } => {
                self.work.contexts.pop();
                self.complete_host(node)?;
            }
            Content::Text(_) => self.complete_text(node)?,
            Content::Vacant => panic!("completed released node {node:?}"),
        }
        Ok(())
    }

    fn complete_host(&mut self, node: NodeId) -> Result<(), H::Error> {
        let i = node.idx as usize;
        let Some(ctx) = self.work.contexts.last() else {
            panic!("host context stack is empty");
        };
        let Content::Host { ty, props, .. } = &self.nodes.content[i] else {
            return Ok(());
        };

        if let Some(instance) = self.nodes.output[i].instance() {
            // Reused node: diff against the committed buffer.
            let old = self
                .nodes
                .alternate(node)
                .and_then(|alt| self.nodes.content[alt.idx as usize].props());
            let Some(old) = old else {
                return Ok(());
            };
            let payload =
                self.host
                    .prepare_update(instance, ty, old, props, self.container, ctx);
            if payload.is_some() {
                self.nodes.payload[i] = payload;
                self.nodes.effect[i] |= EffectTag::UPDATE;
            }
            return Ok(());
        }

        let instance = self
            .host
            .create_instance(ty, props, self.container, ctx, node)?;

        let mut children = Vec::new();
        collect_host_children(self.nodes, self.nodes.child[i], &mut children);
        for c in children {
            if let Some(child) = self.nodes.output[c as usize].as_child() {
                self.host.append_initial_child(&instance, child)?;
            }
        }

        let Content::Host { ty, props, .. } = &self.nodes.content[i] else {
            return Ok(());
        };
        if self
            .host
            .finalize_initial_children(&instance, ty, props, self.container)?
        {
            self.nodes.effect[i] |= EffectTag::MOUNT;
        }
        self.nodes.output[i] = Output::Instance(instance);
        Ok(())
    }

    fn complete_text(&mut self, node: NodeId) -> Result<(), H::Error> {
        let i = node.idx as usize;
        let Content::Text(text) = &self.nodes.content[i] else {
            return Ok(());
        };

        if !self.nodes.output[i].is_none() {
            let changed = self
                .nodes
                .alternate(node)
                .and_then(|alt| self.nodes.content[alt.idx as usize].text())
                .is_some_and(|old| old != &**text);
            if changed {
                self.nodes.effect[i] |= EffectTag::UPDATE;
            }
            return Ok(());
        }

        let Some(ctx) = self.work.contexts.last() else {
            panic!("host context stack is empty");
        };
        let instance = self
            .host
            .create_text_instance(text, self.container, ctx, node)?;
        self.nodes.output[i] = Output::Text(instance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::deadline::Unbounded;
    use crate::element::Element;
    use crate::priority::PriorityLevel;
    use crate::reconciler::RootId;
    use crate::test_host::{Tag, TestHost, div, span};
    use crate::trace::PassSummaryBuilder;

    struct Fixture {
        host: TestHost,
        nodes: NodeStore<TestHost>,
        current: NodeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut nodes = NodeStore::new();
            let current = nodes.create(crate::tree::NodeKind::Root, None, Content::Root(None));
            Self {
                host: TestHost::default(),
                nodes,
                current,
            }
        }

        fn work(&mut self, element: Element<TestHost>) -> WorkState<TestHost> {
            let (top, _) = self
                .nodes
                .work_in_progress(self.current, Content::Root(Some(element)));
            WorkState {
                priority: PriorityLevel::Low,
                snapshot: 0,
                selected_seq: 0,
                top,
                next: Some(top),
                effects: Vec::new(),
                created: Vec::new(),
                contexts: Vec::new(),
                pass: 1,
                summary: PassSummaryBuilder::new(RootId(0), 1, PriorityLevel::Low),
            }
        }

        fn cx<'a>(&'a mut self, work: &'a mut WorkState<TestHost>) -> WorkCx<'a, TestHost> {
            WorkCx {
                host: &mut self.host,
                nodes: &mut self.nodes,
                container: &1,
                work,
            }
        }
    }

    struct Expired;

    impl Deadline for Expired {
        fn time_remaining(&self) -> Duration {
            Duration::ZERO
        }
    }

    #[test]
    fn builds_detached_subtree_bottom_up() {
        let mut f = Fixture::new();
        let mut work = f.work(div(1).with_children([span(2), Element::text("hi")]));
        let done = f.cx(&mut work).run(None, Duration::ZERO);
        assert!(matches!(done, Ok(true)));

        // Children are created before their parent and appended to it before
        // anything is attached.
        assert_eq!(
            f.host.log,
            [
                "create Span#1 depth=1",
                "create text#2 \"hi\"",
                "create Div#3 depth=0",
                "initial 3<-Inst(1)",
                "initial 3<-Text(2)",
            ]
        );
        assert_eq!(work.effects.len(), 1, "only the top host node is placed");
        assert!(work.contexts.is_empty(), "context stack balanced");
    }

    #[test]
    fn expired_deadline_parks_without_progress() {
        let mut f = Fixture::new();
        let mut work = f.work(div(1));
        let done = f.cx(&mut work).run(Some(&Expired), Duration(1));
        assert!(matches!(done, Ok(false)));
        assert_eq!(work.next, Some(work.top), "cursor untouched");
        assert!(f.host.log.is_empty());

        let done = f.cx(&mut work).run(Some(&Unbounded), Duration(1));
        assert!(matches!(done, Ok(true)));
        assert_eq!(work.summary.units(), 2);
    }

    #[test]
    fn input_requests_mount() {
        let mut f = Fixture::new();
        let mut work = f.work(Element::host(Tag::Input, 0));
        assert!(matches!(f.cx(&mut work).run(None, Duration::ZERO), Ok(true)));
        let Some(Effect::Apply(n)) = work.effects.first().copied() else {
            panic!("expected an effect");
        };
        assert!(
            f.nodes.effect[n.idx as usize].contains(EffectTag::MOUNT | EffectTag::PLACEMENT)
        );
    }

    #[test]
    fn host_error_stops_the_pass() {
        let mut f = Fixture::new();
        f.host.fail_on = Some("create text");
        let mut work = f.work(div(1).with_children([Element::text("x")]));
        let done = f.cx(&mut work).run(None, Duration::ZERO);
        assert!(matches!(done, Err(ref e) if e.0.starts_with("create text")));
    }
}
