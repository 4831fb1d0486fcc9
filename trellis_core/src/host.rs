// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host adapter contract.
//!
//! The reconciler knows nothing about the system it renders into. Everything
//! target-specific goes through the [`Host`] trait, which an adapter crate
//! implements for DOM nodes, native widgets, a terminal grid or an in-memory
//! test double. The calls fall into four groups:
//!
//! - **Context derivation**: [`root_host_context`](Host::root_host_context)
//!   and [`child_host_context`](Host::child_host_context) compute a value
//!   passed down the tree while rendering (e.g. an SVG namespace). They must
//!   be deterministic.
//!
//! - **Construction**: [`create_instance`](Host::create_instance),
//!   [`append_initial_child`](Host::append_initial_child),
//!   [`finalize_initial_children`](Host::finalize_initial_children),
//!   [`prepare_update`](Host::prepare_update) and
//!   [`create_text_instance`](Host::create_text_instance) run while the
//!   work-in-progress tree is built, possibly across several deferred slices
//!   and possibly for work that is later thrown away. They must not touch
//!   anything that is already visible.
//!
//! - **Mutation**: [`append_child`](Host::append_child),
//!   [`insert_before`](Host::insert_before),
//!   [`remove_child`](Host::remove_child),
//!   [`commit_update`](Host::commit_update),
//!   [`commit_text_update`](Host::commit_text_update) and
//!   [`commit_mount`](Host::commit_mount) run only inside a commit, bracketed
//!   by [`prepare_for_commit`](Host::prepare_for_commit) and
//!   [`reset_after_commit`](Host::reset_after_commit).
//!
//! - **Scheduling**: [`schedule_animation_callback`](Host::schedule_animation_callback)
//!   and [`schedule_deferred_callback`](Host::schedule_deferred_callback) ask
//!   the host's event loop to call back into
//!   [`Reconciler::perform_animation_work`](crate::Reconciler::perform_animation_work)
//!   and [`Reconciler::perform_deferred_work`](crate::Reconciler::perform_deferred_work).
//!
//! # Event loop pseudocode
//!
//! ```rust,ignore
//! loop {
//!     match host_event_loop.next() {
//!         Event::Input(e) => reconciler.sync_updates(|r| handle(r, e))?,
//!         Event::AnimationFrame => reconciler.perform_animation_work()?,
//!         Event::Idle(deadline) => reconciler.perform_deferred_work(&deadline)?,
//!     }
//! }
//! ```

use core::fmt;

use crate::time::HostTime;
use crate::tree::NodeId;

/// A parent slot in the host tree: either a root container or an instance.
pub enum HostParent<'a, H: Host + ?Sized> {
    /// The root container.
    Container(&'a H::Container),
    /// A host instance.
    Instance(&'a H::Instance),
}

impl<H: Host + ?Sized> Clone for HostParent<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: Host + ?Sized> Copy for HostParent<'_, H> {}

impl<H: Host + ?Sized> fmt::Debug for HostParent<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container(c) => f.debug_tuple("Container").field(c).finish(),
            Self::Instance(i) => f.debug_tuple("Instance").field(i).finish(),
        }
    }
}

/// A child in the host tree: either an instance or a text instance.
pub enum HostChild<'a, H: Host + ?Sized> {
    /// A host instance.
    Instance(&'a H::Instance),
    /// A text instance.
    Text(&'a H::TextInstance),
}

impl<H: Host + ?Sized> Clone for HostChild<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: Host + ?Sized> Copy for HostChild<'_, H> {}

impl<H: Host + ?Sized> fmt::Debug for HostChild<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(i) => f.debug_tuple("Instance").field(i).finish(),
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
        }
    }
}

/// An owned handle to a committed host output, returned by the query API.
pub enum HostHandle<H: Host> {
    /// A host instance.
    Instance(H::Instance),
    /// A text instance.
    Text(H::TextInstance),
}

impl<H: Host> HostHandle<H> {
    /// Returns the instance, if this is one.
    #[must_use]
    pub fn as_instance(&self) -> Option<&H::Instance> {
        match self {
            Self::Instance(i) => Some(i),
            Self::Text(_) => None,
        }
    }

    /// Returns the text instance, if this is one.
    #[must_use]
    pub fn as_text(&self) -> Option<&H::TextInstance> {
        match self {
            Self::Text(t) => Some(t),
            Self::Instance(_) => None,
        }
    }
}

impl<H: Host> Clone for HostHandle<H> {
    fn clone(&self) -> Self {
        match self {
            Self::Instance(i) => Self::Instance(i.clone()),
            Self::Text(t) => Self::Text(t.clone()),
        }
    }
}

impl<H: Host> fmt::Debug for HostHandle<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(i) => f.debug_tuple("Instance").field(i).finish(),
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
        }
    }
}

impl<H: Host> PartialEq for HostHandle<H>
where
    H::Instance: PartialEq,
    H::TextInstance: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Instance(a), Self::Instance(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

/// Target-system adapter.
///
/// All fallible calls return `Result<_, Self::Error>`; the reconciler passes
/// errors through unmodified as
/// [`ReconcileError::Host`](crate::ReconcileError::Host).
pub trait Host {
    /// Host type tag of an instance (e.g. an element name).
    type Type: Clone + PartialEq + fmt::Debug;
    /// Properties describing an instance.
    type Props: Clone + fmt::Debug;
    /// Root container a tree renders into.
    type Container: fmt::Debug;
    /// Handle to a host instance. Cloning must yield a handle to the *same*
    /// instance.
    type Instance: Clone + fmt::Debug;
    /// Handle to a text instance. Cloning must yield a handle to the *same*
    /// instance.
    type TextInstance: Clone + fmt::Debug;
    /// Value passed down the tree while rendering.
    type HostContext: Clone + fmt::Debug;
    /// Diff computed by [`prepare_update`](Self::prepare_update) and applied
    /// by [`commit_update`](Self::commit_update).
    type UpdatePayload: fmt::Debug;
    /// Adapter failure.
    type Error: fmt::Debug + fmt::Display;

    /// Checks that `container` can host a tree.
    ///
    /// Called by [`Reconciler::create_container`](crate::Reconciler::create_container)
    /// before a root is allocated.
    fn validate_container(&mut self, container: &Self::Container) -> Result<(), Self::Error> {
        _ = container;
        Ok(())
    }

    /// Context for the top-level children of `container`.
    fn root_host_context(&self, container: &Self::Container) -> Self::HostContext;

    /// Context for the children of an instance of type `ty` created under
    /// `parent`.
    fn child_host_context(&self, parent: &Self::HostContext, ty: &Self::Type)
    -> Self::HostContext;

    /// Creates a detached instance.
    ///
    /// `ctx` is the context the instance is created in (its parent's).
    /// `node` identifies the work node; it stays valid while the instance is
    /// mounted and may be passed to
    /// [`Reconciler::find_host_instance`](crate::Reconciler::find_host_instance).
    fn create_instance(
        &mut self,
        ty: &Self::Type,
        props: &Self::Props,
        container: &Self::Container,
        ctx: &Self::HostContext,
        node: NodeId,
    ) -> Result<Self::Instance, Self::Error>;

    /// Appends a child to an instance that is still being constructed.
    fn append_initial_child(
        &mut self,
        parent: &Self::Instance,
        child: HostChild<'_, Self>,
    ) -> Result<(), Self::Error>;

    /// Finishes constructing an instance after its children were appended.
    ///
    /// Returning `true` requests a [`commit_mount`](Self::commit_mount) call
    /// once the instance is attached.
    fn finalize_initial_children(
        &mut self,
        instance: &Self::Instance,
        ty: &Self::Type,
        props: &Self::Props,
        container: &Self::Container,
    ) -> Result<bool, Self::Error>;

    /// Diffs `old` against `new`. `None` means nothing changed.
    fn prepare_update(
        &mut self,
        instance: &Self::Instance,
        ty: &Self::Type,
        old: &Self::Props,
        new: &Self::Props,
        container: &Self::Container,
        ctx: &Self::HostContext,
    ) -> Option<Self::UpdatePayload>;

    /// Applies a payload produced by [`prepare_update`](Self::prepare_update).
    fn commit_update(
        &mut self,
        instance: &Self::Instance,
        payload: Self::UpdatePayload,
        ty: &Self::Type,
        old: &Self::Props,
        new: &Self::Props,
        node: NodeId,
    ) -> Result<(), Self::Error>;

    /// Called after the commit for instances whose
    /// [`finalize_initial_children`](Self::finalize_initial_children) returned
    /// `true`.
    fn commit_mount(
        &mut self,
        instance: &Self::Instance,
        ty: &Self::Type,
        props: &Self::Props,
        node: NodeId,
    ) -> Result<(), Self::Error>;

    /// Creates a detached text instance.
    fn create_text_instance(
        &mut self,
        text: &str,
        container: &Self::Container,
        ctx: &Self::HostContext,
        node: NodeId,
    ) -> Result<Self::TextInstance, Self::Error>;

    /// Replaces the content of a text instance.
    fn commit_text_update(
        &mut self,
        text_instance: &Self::TextInstance,
        old: &str,
        new: &str,
    ) -> Result<(), Self::Error>;

    /// Appends `child` as the last child of `parent`, moving it if it is
    /// already attached.
    fn append_child(
        &mut self,
        parent: HostParent<'_, Self>,
        child: HostChild<'_, Self>,
    ) -> Result<(), Self::Error>;

    /// Inserts `child` before `before` under `parent`, moving it if it is
    /// already attached.
    fn insert_before(
        &mut self,
        parent: HostParent<'_, Self>,
        child: HostChild<'_, Self>,
        before: HostChild<'_, Self>,
    ) -> Result<(), Self::Error>;

    /// Detaches `child` from `parent`.
    fn remove_child(
        &mut self,
        parent: HostParent<'_, Self>,
        child: HostChild<'_, Self>,
    ) -> Result<(), Self::Error>;

    /// Requests one future call of
    /// [`Reconciler::perform_animation_work`](crate::Reconciler::perform_animation_work).
    fn schedule_animation_callback(&mut self);

    /// Requests one future call of
    /// [`Reconciler::perform_deferred_work`](crate::Reconciler::perform_deferred_work).
    fn schedule_deferred_callback(&mut self);

    /// Called once before the mutations of every commit.
    fn prepare_for_commit(&mut self);

    /// Called once after the mutations of every commit, including commits
    /// that applied nothing and commits that failed part way.
    fn reset_after_commit(&mut self);

    /// Current host time, used to stamp trace events.
    fn now(&self) -> HostTime {
        HostTime(0)
    }
}
