// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priority-scheduled, interruptible tree reconciliation.
//!
//! `trellis_core` turns descriptions of a desired output tree
//! ([`Element`]s) into a minimal sequence of mutations against the tree that
//! was last committed, and applies them through a pluggable target adapter
//! ([`Host`]). Rendering work is tagged with a [`PriorityLevel`]; urgent work
//! commits immediately, deferred work runs in host-driven slices that yield
//! when a [`Deadline`] runs low, and parked work is thrown away when more
//! urgent work arrives. It is `no_std` compatible (with `alloc`) and keeps
//! work nodes in a struct-of-arrays arena addressed by generational handles.
//!
//! # Architecture
//!
//! ```text
//!   update_container(element) ──► UpdateQueue (tagged with ambient priority)
//!                                      │
//!                 ┌────────────────────┘
//!                 ▼
//!   scheduler: Synchronous/Task now, Animation/deferred via host callbacks
//!                 │
//!                 ▼
//!   work loop: begin/complete per node ──► work-in-progress tree + effects
//!                 │            (yields on Deadline, resumes later)
//!                 ▼
//!   commit: prepare_for_commit ──► mutations ──► reset_after_commit
//!                 │                 (tree swap)
//!                 ▼
//!   commit_mount ──► completion callbacks
//! ```
//!
//! **[`reconciler`]**: [`Reconciler`] owns the node arena, the roots and the
//! scheduler state. Every public operation lives on it.
//!
//! **[`tree`]**: Struct-of-arrays work-node store with generational
//! [`NodeId`] handles and the read-only [`NodeRef`] view.
//!
//! **[`host`]**: The [`Host`] trait target systems implement.
//!
//! **[`element`]**: Immutable, cheaply cloned tree descriptions.
//!
//! **[`priority`]**: [`PriorityLevel`] and its ordering.
//!
//! **[`deadline`]**: [`Deadline`] budgets for deferred slices.
//!
//! **[`context`]**: Opaque [`ContextValue`]s attached to roots.
//!
//! **[`config`]**: [`ReconcilerConfig`] presets.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types with a
//! zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! **[`time`]**: Host tick types.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-effect
//!   commit records.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod config;
pub mod context;
pub mod deadline;
pub mod element;
pub mod error;
pub mod host;
pub mod priority;
pub mod reconciler;
pub mod time;
pub mod trace;
pub mod tree;
pub mod update_queue;

#[cfg(test)]
mod test_host;

pub use config::ReconcilerConfig;
pub use context::ContextValue;
pub use deadline::Deadline;
pub use element::{Element, Key};
pub use error::ReconcileError;
pub use host::{Host, HostChild, HostHandle, HostParent};
pub use priority::PriorityLevel;
pub use reconciler::{PriorityScope, Reconciler, RootId, RootPhase};
pub use tree::{NodeId, NodeRef};
pub use update_queue::Callback;
