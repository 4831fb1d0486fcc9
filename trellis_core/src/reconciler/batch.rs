// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ambient priority and batching.
//!
//! Every update is tagged with the priority in effect when it is enqueued.
//! That priority comes from an explicit stack owned by the reconciler:
//! wrappers push a level, run a closure with `&mut Reconciler`, and pop it
//! again through a guard, so the stack is restored on every exit path
//! including unwinding.

use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::error::Result;
use crate::host::Host;
use crate::priority::PriorityLevel;

use super::Reconciler;

/// Guard returned by [`Reconciler::enter_priority`].
///
/// Dereferences to the reconciler. Updates enqueued through it are tagged
/// with the entered level until it is dropped.
pub struct PriorityScope<'a, H: Host> {
    reconciler: &'a mut Reconciler<H>,
}

impl<H: Host> Deref for PriorityScope<'_, H> {
    type Target = Reconciler<H>;

    fn deref(&self) -> &Reconciler<H> {
        self.reconciler
    }
}

impl<H: Host> DerefMut for PriorityScope<'_, H> {
    fn deref_mut(&mut self) -> &mut Reconciler<H> {
        self.reconciler
    }
}

impl<H: Host> Drop for PriorityScope<'_, H> {
    fn drop(&mut self) {
        self.reconciler.priority_stack.pop();
    }
}

impl<H: Host> fmt::Debug for PriorityScope<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityScope")
            .field("level", &self.reconciler.priority_context())
            .finish_non_exhaustive()
    }
}

/// Restores the batching flag on drop.
struct BatchScope<'a, H: Host> {
    reconciler: &'a mut Reconciler<H>,
    previous: bool,
}

impl<'a, H: Host> BatchScope<'a, H> {
    fn enter(reconciler: &'a mut Reconciler<H>, batching: bool) -> Self {
        let previous = core::mem::replace(&mut reconciler.batching, batching);
        Self {
            reconciler,
            previous,
        }
    }
}

impl<H: Host> Drop for BatchScope<'_, H> {
    fn drop(&mut self) {
        self.reconciler.batching = self.previous;
    }
}

impl<H: Host> Reconciler<H> {
    /// Pushes `level` as the ambient priority until the guard is dropped.
    pub fn enter_priority(&mut self, level: PriorityLevel) -> PriorityScope<'_, H> {
        self.priority_stack.push(level);
        PriorityScope { reconciler: self }
    }

    /// Runs `f` with `level` as the ambient priority.
    pub fn perform_with_priority<R>(
        &mut self,
        level: PriorityLevel,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let mut scope = self.enter_priority(level);
        f(&mut *scope)
    }

    /// The priority an update enqueued now would get.
    ///
    /// The innermost explicit level if any, else `Task` inside a batch and
    /// `Synchronous` outside one.
    #[must_use]
    pub fn priority_context(&self) -> PriorityLevel {
        match self.priority_stack.last() {
            Some(&level) => level,
            None if self.batching => PriorityLevel::Task,
            None => PriorityLevel::Synchronous,
        }
    }

    /// Runs `f` at `Synchronous` priority. Updates enqueued by `f` are
    /// committed before they return, even inside a batch.
    pub fn sync_updates<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.perform_with_priority(PriorityLevel::Synchronous, f)
    }

    /// Runs `f` at the configured deferred level
    /// ([`ReconcilerConfig::deferred_level`](crate::ReconcilerConfig::deferred_level)).
    pub fn deferred_updates<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let level = self.config.deferred_level;
        self.perform_with_priority(level, f)
    }

    /// Runs `f` as if outside any batch: task work it schedules is performed
    /// immediately.
    pub fn unbatched_updates<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let scope = BatchScope::enter(self, false);
        f(&mut *scope.reconciler)
    }

    /// Runs `f` as a batch. Updates it enqueues default to `Task` priority
    /// and are committed together when the outermost batch returns, one
    /// commit per root.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ReentrantCommit`](crate::ReconcileError::ReentrantCommit)
    /// if called during a commit, or the error of the flush that ends the
    /// outermost batch. `f` has run in either case unless the call was
    /// rejected up front.
    pub fn batched_updates<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Result<R, H::Error> {
        self.check_entry()?;
        let outermost = !self.batching;
        let value = {
            let scope = BatchScope::enter(self, true);
            f(&mut *scope.reconciler)
        };
        if outermost && !self.is_performing {
            self.perform_work(PriorityLevel::Task, None)?;
        }
        Ok(value)
    }
}
