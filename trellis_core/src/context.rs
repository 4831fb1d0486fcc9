// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque per-root context values.
//!
//! The reconciler does not interpret context. It asks an injected resolver
//! for the value belonging to an update's parent node and stores the result on
//! the root (see [`Reconciler::update_container`](crate::Reconciler::update_container)).

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::any::Any;
use core::fmt;

use crate::tree::NodeRef;

/// A shared, type-erased context value.
#[derive(Clone, Default)]
pub struct ContextValue(Option<Rc<dyn Any>>);

impl ContextValue {
    /// The empty context.
    #[must_use]
    pub const fn empty() -> Self {
        Self(None)
    }

    /// Wraps a value.
    #[must_use]
    pub fn new<T: Any>(value: T) -> Self {
        Self(Some(Rc::new(value)))
    }

    /// Returns whether this is the empty context.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Downcasts the stored value.
    #[must_use]
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref())
    }

    /// Returns whether both values refer to the same allocation (or are both
    /// empty).
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_some() {
            f.write_str("ContextValue(..)")
        } else {
            f.write_str("ContextValue(empty)")
        }
    }
}

/// Computes the context for an update given its parent node, if any.
///
/// Without an injected resolver every update resolves to
/// [`ContextValue::empty`].
pub type ContextResolver<H> = Box<dyn Fn(Option<NodeRef<'_, H>>) -> ContextValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_and_identity() {
        let a = ContextValue::new(7_u32);
        let b = a.clone();
        assert_eq!(a.get::<u32>(), Some(&7));
        assert_eq!(a.get::<i64>(), None, "wrong type does not downcast");
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&ContextValue::new(7_u32)));
        assert!(ContextValue::empty().ptr_eq(&ContextValue::default()));
        assert!(ContextValue::empty().is_empty());
    }
}
