// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference host and deterministic drivers for trellis reconcilers.
//!
//! - [`MemoryHost`]: an in-memory [`Host`](trellis_core::Host) with an
//!   operation log, failure injection and a materialized output tree.
//! - [`ManualClock`] and [`StepDeadline`]: time and budgets that only move
//!   when told to, for reproducible deferred work.
//! - [`run_pending`]: fires requested host callbacks like an event loop
//!   would.

#![no_std]

extern crate alloc;

pub mod clock;
pub mod driver;
pub mod memory_host;

pub use clock::{ManualClock, StepDeadline};
pub use driver::run_pending;
pub use memory_host::{
    Child, ContainerId, InstanceId, InstanceRecord, MemoryContext, MemoryHost, MemoryHostError,
    Namespace, Op, OpKind, Parent, Props, PropsDiff, TextId,
};
