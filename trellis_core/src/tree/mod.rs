// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Work node data model.
//!
//! A *work node* is the reconciler's record of one element in a rendered
//! tree. Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is released, preventing use-after-free bugs at the API level.
//! - Topology: parent, first-child and sibling links forming an ordered tree,
//!   plus an *alternate* link to the node's double-buffer partner.
//! - Description: [`NodeKind`], key, sibling index, host type and the props,
//!   text or child elements it was built from.
//! - Output: the host instance handle, shared by both buffers of a pair.
//! - Pending [`EffectTag`]s for the next commit.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.
//!
//! # Double buffering
//!
//! Every mounted node has up to two buffers. The *current* buffer is
//! reachable from its root's current top node and reflects what the host
//! shows. The *alternate* is reused as the work-in-progress buffer by the next
//! pass over that node. A commit flips which buffer is current by swapping
//! the root's top node; nothing is copied.

mod id;
mod node;
mod store;
mod traverse;

pub use id::{INVALID, NodeId};
pub use node::{EffectTag, NodeKind};
pub use traverse::{Children, NodeRef};

pub(crate) use node::{Content, Output};
pub(crate) use store::NodeStore;
