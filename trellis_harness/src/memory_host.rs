// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory reference [`Host`].
//!
//! [`MemoryHost`] keeps a materialized output tree, logs every adapter call
//! as an [`Op`] and can be told to fail the next call of a given
//! [`OpKind`]. It checks the mutations it receives the way a real target
//! would: removing or inserting relative to a node that is not a child of
//! the given parent is an error.
//!
//! Instances are plain indices and are never freed, so handles stay valid
//! for inspection after the reconciler detaches them.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use trellis_core::host::{Host, HostChild, HostParent};
use trellis_core::time::{Duration, HostTime};
use trellis_core::tree::NodeId;

use crate::clock::ManualClock;

/// Handle to a root container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(pub u32);

/// Handle to an element instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u32);

/// Handle to a text instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextId(pub u32);

/// A parent slot in the materialized tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Parent {
    /// A root container.
    Container(ContainerId),
    /// An element instance.
    Instance(InstanceId),
}

/// A child in the materialized tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Child {
    /// An element instance.
    Instance(InstanceId),
    /// A text instance.
    Text(TextId),
}

/// Element namespace, derived from the host context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Namespace {
    /// Ordinary elements.
    #[default]
    Html,
    /// Elements below an `svg` element.
    Svg,
}

/// Context handed down the tree while rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct MemoryContext {
    /// Namespace new elements are created in.
    pub namespace: Namespace,
    /// Element nesting depth below the container.
    pub depth: u32,
}

/// Element properties, ordered by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Props(BTreeMap<String, String>);

impl Props {
    /// No properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `self` with `name` set to `value`.
    #[must_use]
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Changes that turn `self` into `new`: set or changed names with their
    /// new value, removed names with `None`.
    #[must_use]
    pub fn diff(&self, new: &Self) -> PropsDiff {
        let mut changes = Vec::new();
        for (name, value) in &new.0 {
            if self.0.get(name) != Some(value) {
                changes.push((name.clone(), Some(value.clone())));
            }
        }
        for name in self.0.keys() {
            if !new.0.contains_key(name) {
                changes.push((name.clone(), None));
            }
        }
        changes.sort();
        PropsDiff(changes)
    }

    fn apply(&mut self, diff: &PropsDiff) {
        for (name, value) in &diff.0 {
            match value {
                Some(v) => {
                    self.0.insert(name.clone(), v.clone());
                }
                None => {
                    self.0.remove(name);
                }
            }
        }
    }
}

/// Property changes computed by `prepare_update`, sorted by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropsDiff(pub Vec<(String, Option<String>)>);

/// Which adapter call an [`Op`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `create_instance`.
    CreateInstance,
    /// `create_text_instance`.
    CreateText,
    /// `append_initial_child`.
    AppendInitial,
    /// `finalize_initial_children`.
    Finalize,
    /// `commit_update`.
    Update,
    /// `commit_text_update`.
    TextUpdate,
    /// `append_child`.
    Append,
    /// `insert_before`.
    Insert,
    /// `remove_child`.
    Remove,
    /// `commit_mount`.
    Mount,
    /// `prepare_for_commit`.
    PrepareForCommit,
    /// `reset_after_commit`.
    ResetAfterCommit,
}

/// One logged adapter call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// An element was created, detached.
    CreateInstance {
        /// New handle.
        id: InstanceId,
        /// Element type.
        ty: &'static str,
    },
    /// A text instance was created, detached.
    CreateText {
        /// New handle.
        id: TextId,
        /// Initial content.
        text: String,
    },
    /// A child was appended to an element under construction.
    AppendInitial {
        /// Element under construction.
        parent: InstanceId,
        /// Appended child.
        child: Child,
    },
    /// An element's initial children are complete.
    Finalize {
        /// The element.
        id: InstanceId,
        /// Whether it asked for `commit_mount`.
        needs_mount: bool,
    },
    /// Element properties were changed.
    Update {
        /// The element.
        id: InstanceId,
        /// Applied changes.
        diff: PropsDiff,
    },
    /// Text content was replaced.
    TextUpdate {
        /// The text instance.
        id: TextId,
        /// New content.
        text: String,
    },
    /// A child was appended, moving it if attached elsewhere.
    Append {
        /// New parent.
        parent: Parent,
        /// Appended child.
        child: Child,
    },
    /// A child was inserted before a sibling.
    Insert {
        /// New parent.
        parent: Parent,
        /// Inserted child.
        child: Child,
        /// Existing sibling.
        before: Child,
    },
    /// A child was detached.
    Remove {
        /// Former parent.
        parent: Parent,
        /// Detached child.
        child: Child,
    },
    /// An element was told it is attached.
    Mount {
        /// The element.
        id: InstanceId,
    },
    /// A commit started.
    PrepareForCommit,
    /// A commit ended.
    ResetAfterCommit,
}

impl Op {
    /// The call this op records.
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Self::CreateInstance { .. } => OpKind::CreateInstance,
            Self::CreateText { .. } => OpKind::CreateText,
            Self::AppendInitial { .. } => OpKind::AppendInitial,
            Self::Finalize { .. } => OpKind::Finalize,
            Self::Update { .. } => OpKind::Update,
            Self::TextUpdate { .. } => OpKind::TextUpdate,
            Self::Append { .. } => OpKind::Append,
            Self::Insert { .. } => OpKind::Insert,
            Self::Remove { .. } => OpKind::Remove,
            Self::Mount { .. } => OpKind::Mount,
            Self::PrepareForCommit => OpKind::PrepareForCommit,
            Self::ResetAfterCommit => OpKind::ResetAfterCommit,
        }
    }

    /// Whether this op changed output that may already be visible.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Update { .. }
                | Self::TextUpdate { .. }
                | Self::Append { .. }
                | Self::Insert { .. }
                | Self::Remove { .. }
        )
    }
}

/// Failures reported by [`MemoryHost`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MemoryHostError {
    /// Injected with [`MemoryHost::fail_next`].
    #[error("injected failure in {0:?}")]
    Injected(OpKind),
    /// The container was not created by [`MemoryHost::add_container`].
    #[error("{0:?} is not a container of this host")]
    UnknownContainer(ContainerId),
    /// A mutation named a child that is not under the given parent.
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Parent named by the call.
        parent: Parent,
        /// Child that was expected under it.
        child: Child,
    },
}

/// An element in the materialized tree.
#[derive(Clone, Debug)]
pub struct InstanceRecord {
    /// Element type.
    pub ty: &'static str,
    /// Current properties.
    pub props: Props,
    /// Namespace it was created in.
    pub namespace: Namespace,
    /// Work node that created it.
    pub node: NodeId,
    /// Attached children in order.
    pub children: Vec<Child>,
}

#[derive(Clone, Debug)]
struct TextRecord {
    text: String,
    node: NodeId,
}

/// In-memory [`Host`] with an operation log and failure injection.
///
/// Element types are `&'static str`; an element whose props contain
/// `autofocus` asks for `commit_mount`.
#[derive(Debug, Default)]
pub struct MemoryHost {
    ops: Vec<Op>,
    containers: Vec<Vec<Child>>,
    instances: Vec<InstanceRecord>,
    texts: Vec<TextRecord>,
    parents: BTreeMap<Child, Parent>,
    fail_next: Option<OpKind>,
    animation_requested: bool,
    deferred_requested: bool,
    clock: ManualClock,
    op_cost: Duration,
}

impl MemoryHost {
    /// Creates an empty host with its own clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty host reading `clock`. Every logged call advances
    /// the clock by `op_cost`.
    #[must_use]
    pub fn with_clock(clock: ManualClock, op_cost: Duration) -> Self {
        Self {
            clock,
            op_cost,
            ..Self::default()
        }
    }

    /// Registers a new, empty container.
    pub fn add_container(&mut self) -> ContainerId {
        let id = ContainerId(index_u32(self.containers.len()));
        self.containers.push(Vec::new());
        id
    }

    /// Makes the next call of `kind` fail with
    /// [`MemoryHostError::Injected`] without applying it.
    pub fn fail_next(&mut self, kind: OpKind) {
        self.fail_next = Some(kind);
    }

    /// The clock this host reads.
    #[must_use]
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    // -- Log --

    /// Every call since creation (or the last [`take_ops`](Self::take_ops)).
    #[must_use]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Drains the log.
    pub fn take_ops(&mut self) -> Vec<Op> {
        core::mem::take(&mut self.ops)
    }

    /// Logged ops that changed possibly visible output.
    pub fn mutations(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter().filter(|op| op.is_mutation())
    }

    /// Number of logged ops of `kind`.
    #[must_use]
    pub fn count(&self, kind: OpKind) -> usize {
        self.ops.iter().filter(|op| op.kind() == kind).count()
    }

    // -- Event loop --

    /// Consumes a pending animation callback request.
    pub fn take_animation_request(&mut self) -> bool {
        core::mem::take(&mut self.animation_requested)
    }

    /// Consumes a pending deferred callback request.
    pub fn take_deferred_request(&mut self) -> bool {
        core::mem::take(&mut self.deferred_requested)
    }

    /// Whether any callback request is pending.
    #[must_use]
    pub fn has_pending_requests(&self) -> bool {
        self.animation_requested || self.deferred_requested
    }

    // -- Materialized tree --

    /// Children attached to `container`.
    #[must_use]
    pub fn container_children(&self, container: ContainerId) -> &[Child] {
        self.containers
            .get(container.0 as usize)
            .map_or(&[], Vec::as_slice)
    }

    /// An element, attached or not.
    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<&InstanceRecord> {
        self.instances.get(id.0 as usize)
    }

    /// Content of a text instance.
    #[must_use]
    pub fn text(&self, id: TextId) -> Option<&str> {
        self.texts.get(id.0 as usize).map(|t| t.text.as_str())
    }

    /// Work node that created `child`.
    #[must_use]
    pub fn node_of(&self, child: Child) -> Option<NodeId> {
        match child {
            Child::Instance(i) => self.instance(i).map(|r| r.node),
            Child::Text(t) => self.texts.get(t.0 as usize).map(|r| r.node),
        }
    }

    /// Where `child` is attached.
    #[must_use]
    pub fn parent_of(&self, child: Child) -> Option<Parent> {
        self.parents.get(&child).copied()
    }

    /// Elements created so far, attached or not.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Markup for the tree attached to `container`.
    ///
    /// Elements print as `<ty name="value">children</ty>` with properties in
    /// name order; text prints verbatim.
    #[must_use]
    pub fn render(&self, container: ContainerId) -> String {
        let mut out = String::new();
        for &child in self.container_children(container) {
            self.render_child(child, &mut out);
        }
        out
    }

    fn render_child(&self, child: Child, out: &mut String) {
        match child {
            Child::Text(t) => out.push_str(self.text(t).unwrap_or_default()),
            Child::Instance(i) => {
                let Some(record) = self.instance(i) else {
                    return;
                };
                let _ = write!(out, "<{}", record.ty);
                for (name, value) in &record.props.0 {
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                out.push('>');
                for &c in &record.children {
                    self.render_child(c, out);
                }
                let _ = write!(out, "</{}>", record.ty);
            }
        }
    }

    // -- Internals --

    fn check(&mut self, kind: OpKind) -> Result<(), MemoryHostError> {
        if self.fail_next == Some(kind) {
            self.fail_next = None;
            return Err(MemoryHostError::Injected(kind));
        }
        Ok(())
    }

    fn log(&mut self, op: Op) {
        self.ops.push(op);
        self.clock.advance(self.op_cost);
    }

    fn parent_key(parent: HostParent<'_, Self>) -> Parent {
        match parent {
            HostParent::Container(c) => Parent::Container(*c),
            HostParent::Instance(i) => Parent::Instance(*i),
        }
    }

    fn child_key(child: HostChild<'_, Self>) -> Child {
        match child {
            HostChild::Instance(i) => Child::Instance(*i),
            HostChild::Text(t) => Child::Text(*t),
        }
    }

    fn children_mut(&mut self, parent: Parent) -> &mut Vec<Child> {
        match parent {
            Parent::Container(c) => &mut self.containers[c.0 as usize],
            Parent::Instance(i) => &mut self.instances[i.0 as usize].children,
        }
    }

    fn detach(&mut self, child: Child) {
        if let Some(parent) = self.parents.remove(&child) {
            self.children_mut(parent).retain(|&c| c != child);
        }
    }
}

fn index_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl Host for MemoryHost {
    type Type = &'static str;
    type Props = Props;
    type Container = ContainerId;
    type Instance = InstanceId;
    type TextInstance = TextId;
    type HostContext = MemoryContext;
    type UpdatePayload = PropsDiff;
    type Error = MemoryHostError;

    fn validate_container(&mut self, container: &ContainerId) -> Result<(), MemoryHostError> {
        if container.0 as usize >= self.containers.len() {
            return Err(MemoryHostError::UnknownContainer(*container));
        }
        Ok(())
    }

    fn root_host_context(&self, _: &ContainerId) -> MemoryContext {
        MemoryContext::default()
    }

    fn child_host_context(&self, parent: &MemoryContext, ty: &&'static str) -> MemoryContext {
        let namespace = match *ty {
            "svg" => Namespace::Svg,
            "foreignObject" => Namespace::Html,
            _ => parent.namespace,
        };
        MemoryContext {
            namespace,
            depth: parent.depth + 1,
        }
    }

    fn create_instance(
        &mut self,
        ty: &&'static str,
        props: &Props,
        _: &ContainerId,
        ctx: &MemoryContext,
        node: NodeId,
    ) -> Result<InstanceId, MemoryHostError> {
        self.check(OpKind::CreateInstance)?;
        let id = InstanceId(index_u32(self.instances.len()));
        let namespace = if *ty == "svg" {
            Namespace::Svg
        } else {
            ctx.namespace
        };
        self.instances.push(InstanceRecord {
            ty,
            props: props.clone(),
            namespace,
            node,
            children: Vec::new(),
        });
        self.log(Op::CreateInstance { id, ty });
        Ok(id)
    }

    fn append_initial_child(
        &mut self,
        parent: &InstanceId,
        child: HostChild<'_, Self>,
    ) -> Result<(), MemoryHostError> {
        self.check(OpKind::AppendInitial)?;
        let child = Self::child_key(child);
        self.detach(child);
        self.instances[parent.0 as usize].children.push(child);
        self.parents.insert(child, Parent::Instance(*parent));
        self.log(Op::AppendInitial {
            parent: *parent,
            child,
        });
        Ok(())
    }

    fn finalize_initial_children(
        &mut self,
        instance: &InstanceId,
        _: &&'static str,
        props: &Props,
        _: &ContainerId,
    ) -> Result<bool, MemoryHostError> {
        self.check(OpKind::Finalize)?;
        let needs_mount = props.get("autofocus").is_some();
        self.log(Op::Finalize {
            id: *instance,
            needs_mount,
        });
        Ok(needs_mount)
    }

    fn prepare_update(
        &mut self,
        _: &InstanceId,
        _: &&'static str,
        old: &Props,
        new: &Props,
        _: &ContainerId,
        _: &MemoryContext,
    ) -> Option<PropsDiff> {
        let diff = old.diff(new);
        (!diff.0.is_empty()).then_some(diff)
    }

    fn commit_update(
        &mut self,
        instance: &InstanceId,
        payload: PropsDiff,
        _: &&'static str,
        _: &Props,
        _: &Props,
        _: NodeId,
    ) -> Result<(), MemoryHostError> {
        self.check(OpKind::Update)?;
        self.instances[instance.0 as usize].props.apply(&payload);
        self.log(Op::Update {
            id: *instance,
            diff: payload,
        });
        Ok(())
    }

    fn commit_mount(
        &mut self,
        instance: &InstanceId,
        _: &&'static str,
        _: &Props,
        _: NodeId,
    ) -> Result<(), MemoryHostError> {
        self.check(OpKind::Mount)?;
        self.log(Op::Mount { id: *instance });
        Ok(())
    }

    fn create_text_instance(
        &mut self,
        text: &str,
        _: &ContainerId,
        _: &MemoryContext,
        node: NodeId,
    ) -> Result<TextId, MemoryHostError> {
        self.check(OpKind::CreateText)?;
        let id = TextId(index_u32(self.texts.len()));
        self.texts.push(TextRecord {
            text: text.into(),
            node,
        });
        self.log(Op::CreateText {
            id,
            text: text.into(),
        });
        Ok(id)
    }

    fn commit_text_update(
        &mut self,
        text_instance: &TextId,
        _: &str,
        new: &str,
    ) -> Result<(), MemoryHostError> {
        self.check(OpKind::TextUpdate)?;
        self.texts[text_instance.0 as usize].text = new.into();
        self.log(Op::TextUpdate {
            id: *text_instance,
            text: new.into(),
        });
        Ok(())
    }

    fn append_child(
        &mut self,
        parent: HostParent<'_, Self>,
        child: HostChild<'_, Self>,
    ) -> Result<(), MemoryHostError> {
        self.check(OpKind::Append)?;
        let (parent, child) = (Self::parent_key(parent), Self::child_key(child));
        self.detach(child);
        self.children_mut(parent).push(child);
        self.parents.insert(child, parent);
        self.log(Op::Append { parent, child });
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: HostParent<'_, Self>,
        child: HostChild<'_, Self>,
        before: HostChild<'_, Self>,
    ) -> Result<(), MemoryHostError> {
        self.check(OpKind::Insert)?;
        let parent = Self::parent_key(parent);
        let (child, before) = (Self::child_key(child), Self::child_key(before));
        if self.parents.get(&before) != Some(&parent) {
            return Err(MemoryHostError::NotAChild {
                parent,
                child: before,
            });
        }
        self.detach(child);
        let list = self.children_mut(parent);
        let at = list.iter().position(|&c| c == before).unwrap_or(list.len());
        list.insert(at, child);
        self.parents.insert(child, parent);
        self.log(Op::Insert {
            parent,
            child,
            before,
        });
        Ok(())
    }

    fn remove_child(
        &mut self,
        parent: HostParent<'_, Self>,
        child: HostChild<'_, Self>,
    ) -> Result<(), MemoryHostError> {
        self.check(OpKind::Remove)?;
        let (parent, child) = (Self::parent_key(parent), Self::child_key(child));
        if self.parents.get(&child) != Some(&parent) {
            return Err(MemoryHostError::NotAChild { parent, child });
        }
        self.detach(child);
        self.log(Op::Remove { parent, child });
        Ok(())
    }

    fn schedule_animation_callback(&mut self) {
        self.animation_requested = true;
    }

    fn schedule_deferred_callback(&mut self) {
        self.deferred_requested = true;
    }

    fn prepare_for_commit(&mut self) {
        self.log(Op::PrepareForCommit);
    }

    fn reset_after_commit(&mut self) {
        self.log(Op::ResetAfterCommit);
    }

    fn now(&self) -> HostTime {
        self.clock.now()
    }
}
