// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node payload types.

use alloc::rc::Rc;
use core::fmt;

use bitflags::bitflags;

use crate::element::Element;
use crate::host::{Host, HostChild, HostHandle};

/// What a work node stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Top of a root's tree. Its host parent is the container.
    Root,
    /// A host instance.
    Host,
    /// A text instance.
    Text,
    /// A group of children with no output of its own.
    Fragment,
}

impl NodeKind {
    /// Returns whether nodes of this kind own a host output.
    #[inline]
    #[must_use]
    pub const fn renders(self) -> bool {
        matches!(self, Self::Host | Self::Text)
    }

    /// Returns whether nodes of this kind can be the host parent of their
    /// descendants.
    #[inline]
    #[must_use]
    pub const fn is_host_parent(self) -> bool {
        matches!(self, Self::Host | Self::Root)
    }
}

bitflags! {
    /// Side effects a work node needs applied at commit.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EffectTag: u8 {
        /// Insert (or move) the node's host output under its host parent.
        const PLACEMENT = 1 << 0;
        /// Apply the pending update payload or text change.
        const UPDATE = 1 << 1;
        /// Call `commit_mount` after the commit.
        const MOUNT = 1 << 2;
    }
}

/// Description data held by a node buffer.
pub(crate) enum Content<H: Host> {
    /// Freed slot.
    Vacant,
    /// Root node: the element rendered into the container, if any.
    Root(Option<Element<H>>),
    /// Host node.
    Host {
        ty: H::Type,
        props: H::Props,
        children: Rc<[Element<H>]>,
    },
    /// Text node.
    Text(Rc<str>),
    /// Fragment node.
    Fragment(Rc<[Element<H>]>),
}

impl<H: Host> Content<H> {
    /// Content for a node created from `element`.
    pub(crate) fn from_element(element: &Element<H>) -> Self {
        match element {
            Element::Host(h) => Self::Host {
                ty: h.ty.clone(),
                props: h.props.clone(),
                children: h.children.clone(),
            },
            Element::Text(t) => Self::Text(t.clone()),
            Element::Fragment(g) => Self::Fragment(g.children.clone()),
        }
    }

    pub(crate) fn ty(&self) -> Option<&H::Type> {
        match self {
            Self::Host { ty, .. } => Some(ty),
            _ => None,
        }
    }

    pub(crate) fn props(&self) -> Option<&H::Props> {
        match self {
            Self::Host { props, .. } => Some(props),
            _ => None,
        }
    }

    pub(crate) fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl<H: Host> fmt::Debug for Content<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vacant => f.write_str("Vacant"),
            Self::Root(e) => f.debug_tuple("Root").field(e).finish(),
            Self::Host {
                ty,
                props,
                children,
            } => f
                .debug_struct("Host")
                .field("ty", ty)
                .field("props", props)
                .field("children", &children.len())
                .finish(),
            Self::Text(t) => f.debug_tuple("Text").field(&&**t).finish(),
            Self::Fragment(c) => f.debug_tuple("Fragment").field(&c.len()).finish(),
        }
    }
}

/// Host output owned by a node pair. Both buffers hold a handle to the same
/// instance.
pub(crate) enum Output<H: Host> {
    None,
    Instance(H::Instance),
    Text(H::TextInstance),
}

impl<H: Host> Output<H> {
    pub(crate) fn as_child(&self) -> Option<HostChild<'_, H>> {
        match self {
            Self::None => None,
            Self::Instance(i) => Some(HostChild::Instance(i)),
            Self::Text(t) => Some(HostChild::Text(t)),
        }
    }

    pub(crate) fn to_handle(&self) -> Option<HostHandle<H>> {
        match self {
            Self::None => None,
            Self::Instance(i) => Some(HostHandle::Instance(i.clone())),
            Self::Text(t) => Some(HostHandle::Text(t.clone())),
        }
    }

    pub(crate) fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub(crate) fn instance(&self) -> Option<&H::Instance> {
        match self {
            Self::Instance(i) => Some(i),
            _ => None,
        }
    }
}

impl<H: Host> Clone for Output<H> {
    fn clone(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Instance(i) => Self::Instance(i.clone()),
            Self::Text(t) => Self::Text(t.clone()),
        }
    }
}

impl<H: Host> fmt::Debug for Output<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Instance(i) => f.debug_tuple("Instance").field(i).finish(),
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
        }
    }
}
