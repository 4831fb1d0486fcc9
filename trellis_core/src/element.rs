// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable descriptions of the desired output tree.
//!
//! An [`Element`] says *what* the tree should look like; the reconciler works
//! out *how* to get there from the committed tree. Elements are cheap to
//! clone: children live behind an `Rc<[Element]>` shared between the caller
//! and both node buffers.
//!
//! ```rust,ignore
//! let tree = Element::host(Tag::Column, props)
//!     .with_children([
//!         Element::host(Tag::Label, label_props).with_key("title"),
//!         Element::text("hello"),
//!     ]);
//! ```

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::host::Host;

/// Identity of a child among its siblings.
///
/// Keyed children are matched across renders by key; unkeyed children by
/// position.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key(Rc<str>);

impl Key {
    /// Creates a key.
    #[must_use]
    pub fn new(key: &str) -> Self {
        Self(Rc::from(key))
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", &*self.0)
    }
}

/// A node the host renders: an instance of `ty` configured by `props`.
pub struct HostElement<H: Host> {
    /// Host type tag.
    pub ty: H::Type,
    /// Sibling identity.
    pub key: Option<Key>,
    /// Host-defined properties.
    pub props: H::Props,
    /// Child descriptions.
    pub children: Rc<[Element<H>]>,
}

impl<H: Host> Clone for HostElement<H> {
    fn clone(&self) -> Self {
        Self {
            ty: self.ty.clone(),
            key: self.key.clone(),
            props: self.props.clone(),
            children: self.children.clone(),
        }
    }
}

impl<H: Host> fmt::Debug for HostElement<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostElement")
            .field("ty", &self.ty)
            .field("key", &self.key)
            .field("props", &self.props)
            .field("children", &self.children)
            .finish()
    }
}

/// A group of children with no host output of its own.
pub struct Fragment<H: Host> {
    /// Sibling identity.
    pub key: Option<Key>,
    /// Child descriptions.
    pub children: Rc<[Element<H>]>,
}

impl<H: Host> Clone for Fragment<H> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            children: self.children.clone(),
        }
    }
}

impl<H: Host> fmt::Debug for Fragment<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("key", &self.key)
            .field("children", &self.children)
            .finish()
    }
}

/// Description of one node of the desired tree.
pub enum Element<H: Host> {
    /// A host node.
    Host(HostElement<H>),
    /// A run of text.
    Text(Rc<str>),
    /// A non-rendering group of children.
    Fragment(Fragment<H>),
}

impl<H: Host> Clone for Element<H> {
    fn clone(&self) -> Self {
        match self {
            Self::Host(h) => Self::Host(h.clone()),
            Self::Text(t) => Self::Text(t.clone()),
            Self::Fragment(f) => Self::Fragment(f.clone()),
        }
    }
}

impl<H: Host> fmt::Debug for Element<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(h) => h.fmt(f),
            Self::Text(t) => write!(f, "Text({:?})", &**t),
            Self::Fragment(g) => g.fmt(f),
        }
    }
}

impl<H: Host> Element<H> {
    /// A host element with no key and no children.
    #[must_use]
    pub fn host(ty: H::Type, props: H::Props) -> Self {
        Self::Host(HostElement {
            ty,
            key: None,
            props,
            children: Rc::from(Vec::new()),
        })
    }

    /// A text element.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::Text(Rc::from(text))
    }

    /// An unkeyed fragment.
    #[must_use]
    pub fn fragment(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Fragment(Fragment {
            key: None,
            children: children.into_iter().collect(),
        })
    }

    /// Sets the key. Text elements cannot be keyed and are returned unchanged.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Key>) -> Self {
        match &mut self {
            Self::Host(h) => h.key = Some(key.into()),
            Self::Fragment(g) => g.key = Some(key.into()),
            Self::Text(_) => {}
        }
        self
    }

    /// Replaces the children. Text elements are returned unchanged.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        let children: Rc<[Self]> = children.into_iter().collect();
        match &mut self {
            Self::Host(h) => h.children = children,
            Self::Fragment(g) => g.children = children,
            Self::Text(_) => {}
        }
        self
    }

    /// Returns the key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        match self {
            Self::Host(h) => h.key.as_ref(),
            Self::Fragment(g) => g.key.as_ref(),
            Self::Text(_) => None,
        }
    }

    /// Returns the host type, for host elements.
    #[must_use]
    pub fn ty(&self) -> Option<&H::Type> {
        match self {
            Self::Host(h) => Some(&h.ty),
            _ => None,
        }
    }

    /// Returns the child descriptions (empty for text).
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Host(h) => &h.children,
            Self::Fragment(g) => &g.children,
            Self::Text(_) => &[],
        }
    }
}
