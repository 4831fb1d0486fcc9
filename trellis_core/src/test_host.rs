// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal recording host for unit tests.

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::element::Element;
use crate::host::{Host, HostChild, HostParent};
use crate::reconciler::Reconciler;
use crate::tree::NodeId;
use crate::{ReconcilerConfig, time::HostTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tag {
    Div,
    Span,
    /// Requests `commit_mount`.
    Input,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Slot {
    Container(u32),
    Inst(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Item {
    Inst(u32),
    Text(u32),
}

#[derive(Debug)]
pub(crate) struct TestError(pub(crate) String);

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Records every call as a short string and keeps a materialized tree.
#[derive(Debug, Default)]
pub(crate) struct TestHost {
    pub(crate) log: Vec<String>,
    pub(crate) tree: BTreeMap<Slot, Vec<Item>>,
    pub(crate) texts: BTreeMap<u32, String>,
    pub(crate) props: BTreeMap<u32, i32>,
    pub(crate) next_id: u32,
    /// Fail the first call whose log line starts with this prefix.
    pub(crate) fail_on: Option<&'static str>,
    pub(crate) animation_requests: u32,
    pub(crate) deferred_requests: u32,
    pub(crate) clock: u64,
}

impl TestHost {
    fn record(&mut self, line: String) -> Result<(), TestError> {
        if let Some(prefix) = self.fail_on
            && line.starts_with(prefix)
        {
            self.fail_on = None;
            return Err(TestError(line));
        }
        self.log.push(line);
        Ok(())
    }

    fn alloc(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn slot(parent: HostParent<'_, Self>) -> Slot {
        match parent {
            HostParent::Container(c) => Slot::Container(*c),
            HostParent::Instance(i) => Slot::Inst(*i),
        }
    }

    fn item(child: HostChild<'_, Self>) -> Item {
        match child {
            HostChild::Instance(i) => Item::Inst(*i),
            HostChild::Text(t) => Item::Text(*t),
        }
    }

    fn detach(&mut self, item: Item) {
        for list in self.tree.values_mut() {
            list.retain(|c| *c != item);
        }
    }

    /// Children of the container, as in the log notation.
    pub(crate) fn rendered(&self, container: u32) -> String {
        let mut out = String::new();
        self.render_into(Slot::Container(container), &mut out);
        out
    }

    fn render_into(&self, slot: Slot, out: &mut String) {
        let Some(items) = self.tree.get(&slot) else {
            return;
        };
        for (n, item) in items.iter().enumerate() {
            if n > 0 {
                out.push(' ');
            }
            match *item {
                Item::Inst(i) => {
                    out.push_str(&format!("<{i}:{}>", self.props.get(&i).copied().unwrap_or(0)));
                    let mut inner = String::new();
                    self.render_into(Slot::Inst(i), &mut inner);
                    if !inner.is_empty() {
                        out.push('[');
                        out.push_str(&inner);
                        out.push(']');
                    }
                }
                Item::Text(t) => {
                    out.push('"');
                    out.push_str(self.texts.get(&t).map_or("", String::as_str));
                    out.push('"');
                }
            }
        }
    }

    /// Log lines that mutate attached output.
    pub(crate) fn mutations(&self) -> Vec<&str> {
        self.log
            .iter()
            .map(String::as_str)
            .filter(|l| {
                ["append ", "insert ", "remove ", "update ", "text "]
                    .iter()
                    .any(|p| l.starts_with(p))
            })
            .collect()
    }
}

impl Host for TestHost {
    type Type = Tag;
    type Props = i32;
    type Container = u32;
    type Instance = u32;
    type TextInstance = u32;
    type HostContext = u32;
    type UpdatePayload = (i32, i32);
    type Error = TestError;

    fn validate_container(&mut self, container: &u32) -> Result<(), TestError> {
        if *container == 0 {
            return Err(TestError("container 0 is reserved".to_string()));
        }
        Ok(())
    }

    fn root_host_context(&self, _: &u32) -> u32 {
        0
    }

    fn child_host_context(&self, parent: &u32, _: &Tag) -> u32 {
        parent + 1
    }

    fn create_instance(
        &mut self,
        ty: &Tag,
        props: &i32,
        _: &u32,
        ctx: &u32,
        _: NodeId,
    ) -> Result<u32, TestError> {
        let id = self.alloc();
        self.record(format!("create {ty:?}#{id} depth={ctx}"))?;
        self.props.insert(id, *props);
        Ok(id)
    }

    fn append_initial_child(
        &mut self,
        parent: &u32,
        child: HostChild<'_, Self>,
    ) -> Result<(), TestError> {
        let item = Self::item(child);
        self.record(format!("initial {parent}<-{item:?}"))?;
        self.tree.entry(Slot::Inst(*parent)).or_default().push(item);
        Ok(())
    }

    fn finalize_initial_children(
        &mut self,
        _: &u32,
        ty: &Tag,
        _: &i32,
        _: &u32,
    ) -> Result<bool, TestError> {
        Ok(*ty == Tag::Input)
    }

    fn prepare_update(
        &mut self,
        _: &u32,
        _: &Tag,
        old: &i32,
        new: &i32,
        _: &u32,
        _: &u32,
    ) -> Option<(i32, i32)> {
        (old != new).then_some((*old, *new))
    }

    fn commit_update(
        &mut self,
        instance: &u32,
        payload: (i32, i32),
        _: &Tag,
        _: &i32,
        _: &i32,
        _: NodeId,
    ) -> Result<(), TestError> {
        self.record(format!("update {instance} {}->{}", payload.0, payload.1))?;
        self.props.insert(*instance, payload.1);
        Ok(())
    }

    fn commit_mount(&mut self, instance: &u32, _: &Tag, _: &i32, _: NodeId) -> Result<(), TestError> {
        self.record(format!("mount {instance}"))
    }

    fn create_text_instance(
        &mut self,
        text: &str,
        _: &u32,
        _: &u32,
        _: NodeId,
    ) -> Result<u32, TestError> {
        let id = self.alloc();
        self.record(format!("create text#{id} {text:?}"))?;
        self.texts.insert(id, text.to_string());
        Ok(id)
    }

    fn commit_text_update(&mut self, t: &u32, old: &str, new: &str) -> Result<(), TestError> {
        self.record(format!("text {t} {old:?}->{new:?}"))?;
        self.texts.insert(*t, new.to_string());
        Ok(())
    }

    fn append_child(
        &mut self,
        parent: HostParent<'_, Self>,
        child: HostChild<'_, Self>,
    ) -> Result<(), TestError> {
        let (slot, item) = (Self::slot(parent), Self::item(child));
        self.record(format!("append {slot:?}<-{item:?}"))?;
        self.detach(item);
        self.tree.entry(slot).or_default().push(item);
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: HostParent<'_, Self>,
        child: HostChild<'_, Self>,
        before: HostChild<'_, Self>,
    ) -> Result<(), TestError> {
        let (slot, item, before) = (Self::slot(parent), Self::item(child), Self::item(before));
        self.record(format!("insert {slot:?}<-{item:?} before {before:?}"))?;
        self.detach(item);
        let list = self.tree.entry(slot).or_default();
        let at = list.iter().position(|c| *c == before).unwrap_or(list.len());
        list.insert(at, item);
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: HostParent<'_, Self>,
        child: HostChild<'_, Self>,
    ) -> Result<(), TestError> {
        let (slot, item) = (Self::slot(parent), Self::item(child));
        self.record(format!("remove {slot:?}<-{item:?}"))?;
        if let Some(list) = self.tree.get_mut(&slot) {
            list.retain(|c| *c != item);
        }
        Ok(())
    }

    fn schedule_animation_callback(&mut self) {
        self.animation_requests += 1;
    }

    fn schedule_deferred_callback(&mut self) {
        self.deferred_requests += 1;
    }

    fn prepare_for_commit(&mut self) {
        self.log.push("prepare".to_string());
    }

    fn reset_after_commit(&mut self) {
        self.log.push("reset".to_string());
    }

    fn now(&self) -> HostTime {
        HostTime(self.clock)
    }
}

pub(crate) fn reconciler() -> Reconciler<TestHost> {
    Reconciler::new(TestHost::default(), ReconcilerConfig::interactive())
}

pub(crate) fn div(props: i32) -> Element<TestHost> {
    Element::host(Tag::Div, props)
}

pub(crate) fn span(props: i32) -> Element<TestHost> {
    Element::host(Tag::Span, props)
}
