// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors surfaced by the reconciler's public entry points.

use crate::reconciler::RootId;

/// Failure of a [`Reconciler`](crate::Reconciler) entry point.
///
/// `E` is the host adapter's error type. Adapter failures are passed through
/// unmodified in [`Host`](Self::Host).
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError<E> {
    /// A host adapter call failed.
    #[error("host adapter failed: {0}")]
    Host(E),
    /// The host rejected the container passed to `create_container`.
    #[error("invalid container: {0}")]
    InvalidContainer(E),
    /// The root handle was not issued by this reconciler.
    #[error("unknown root {0:?}")]
    UnknownRoot(RootId),
    /// An entry point was invoked while a commit was in progress.
    #[error("reconciler entered while a commit is in progress")]
    ReentrantCommit,
    /// A single flush performed more commits than allowed.
    #[error("exceeded {limit} nested commits in one flush")]
    NestedUpdateLimit {
        /// The configured limit.
        limit: u32,
    },
}

impl<E> ReconcileError<E> {
    /// Returns the host error, if this is an adapter failure.
    #[must_use]
    pub fn host_error(&self) -> Option<&E> {
        match self {
            Self::Host(e) | Self::InvalidContainer(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias used by the reconciler.
pub type Result<T, E> = core::result::Result<T, ReconcileError<E>>;
