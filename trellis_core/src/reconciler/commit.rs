// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The commit pipeline: apply a finished pass to the host and swap it in.
//!
//! 1. `prepare_for_commit`.
//! 2. Walk the effect list in order: remove deleted subtrees, insert placed
//!    output before the next stable host sibling, apply updates.
//! 3. On success, make the finished tree current, promote the pending
//!    context, drop the processed updates and free the deleted nodes.
//! 4. `reset_after_commit`, whether or not step 2 failed.
//! 5. `commit_mount` for nodes that asked for it.
//!
//! Completion callbacks are returned to the caller, which runs them once the
//! reconciler is no longer committing.

use alloc::vec::Vec;

use crate::error::{ReconcileError, Result};
use crate::host::{Host, HostChild};
use crate::trace::{CommitEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind};
#[cfg(feature = "trace-rich")]
use crate::trace::{EffectKind, EffectRecord};
use crate::tree::{EffectTag, NodeId, NodeKind, NodeStore};
use crate::update_queue::Callback;

use super::host_tree::{host_parent, host_sibling, top_host_nodes};
use super::root::{Effect, RootPhase, WorkState};
use super::{Reconciler, RootId};

/// What step 2 did, for bookkeeping and tracing.
#[derive(Default)]
struct Applied {
    placements: u32,
    updates: u32,
    deleted: Vec<NodeId>,
    mounts: Vec<NodeId>,
    #[cfg(feature = "trace-rich")]
    records: Vec<EffectRecord>,
}

impl Applied {
    #[cfg(feature = "trace-rich")]
    fn record(&mut self, node: NodeId, kind: EffectKind) {
        self.records.push(EffectRecord { node, kind });
    }
}

/// Applies `effects` to the host in order.
fn apply_mutations<H: Host>(
    host: &mut H,
    nodes: &mut NodeStore<H>,
    container: &H::Container,
    effects: &[Effect],
    out: &mut Applied,
) -> core::result::Result<(), H::Error> {
    for effect in effects {
        match *effect {
            Effect::Delete(node) => {
                // Deleted nodes belong to the committed tree, so their
                // ancestors' output is attached.
                let parent = host_parent(nodes, container, node);
                for h in top_host_nodes(nodes, node) {
                    if let Some(child) = nodes.output[h as usize].as_child() {
                        host.remove_child(parent, child)?;
                    }
                }
                out.deleted.push(node);
                #[cfg(feature = "trace-rich")]
                out.record(node, EffectKind::Deletion);
            }
            Effect::Apply(node) => {
                let i = node.idx as usize;
                let tag = nodes.effect[i];

                if tag.contains(EffectTag::PLACEMENT) {
                    let parent = host_parent(nodes, container, node);
                    let before = host_sibling(nodes, node);
                    for h in top_host_nodes(nodes, node) {
                        let Some(child) = nodes.output[h as usize].as_child() else {
                            continue;
                        };
                        match before.and_then(|b| nodes.output[b as usize].as_child()) {
                            Some(before) => host.insert_before(parent, child, before)?,
                            None => host.append_child(parent, child)?,
                        }
                    }
                    nodes.effect[i].remove(EffectTag::PLACEMENT);
                    out.placements += 1;
                    #[cfg(feature = "trace-rich")]
                    out.record(node, EffectKind::Placement);
                }

                if tag.contains(EffectTag::UPDATE) {
                    commit_work(host, nodes, node)?;
                    nodes.effect[i].remove(EffectTag::UPDATE);
                    out.updates += 1;
                    #[cfg(feature = "trace-rich")]
                    out.record(node, EffectKind::Update);
                }

                if tag.contains(EffectTag::MOUNT) {
                    out.mounts.push(node);
                }
                nodes.effect[i] = EffectTag::empty();
            }
        }
    }
    Ok(())
}

/// Applies the pending props or text change of one node.
fn commit_work<H: Host>(
    host: &mut H,
    nodes: &mut NodeStore<H>,
    node: NodeId,
) -> core::result::Result<(), H::Error> {
    let i = node.idx as usize;
    let Some(alt) = nodes.alternate(node) else {
        return Ok(());
    };
    let a = alt.idx as usize;
    match nodes.kind[i] {
        NodeKind::Host => {
            let Some(payload) = nodes.payload[i].take() else {
                return Ok(());
            };
            let (Some(instance), Some(ty), Some(new), Some(old)) = (
                nodes.output[i].instance(),
                nodes.content[i].ty(),
                nodes.content[i].props(),
                nodes.content[a].props(),
            ) else {
                return Ok(());
            };
            host.commit_update(instance, payload, ty, old, new, node)
        }
        NodeKind::Text => {
            let (Some(HostChild::Text(t)), Some(new), Some(old)) = (
                nodes.output[i].as_child(),
                nodes.content[i].text(),
                nodes.content[a].text(),
            ) else {
                return Ok(());
            };
            host.commit_text_update(t, old, new)
        }
        NodeKind::Root | NodeKind::Fragment => Ok(()),
    }
}

impl<H: Host> Reconciler<H> {
    /// Commits a finished pass of root `id`.
    ///
    /// On a mutation failure the root keeps its previous tree and the pass's
    /// fresh nodes are released; the host may be partially mutated.
    ///
    /// # Panics
    ///
    /// Panics if a commit is already in progress or `work` is unfinished.
    pub(crate) fn commit_root(
        &mut self,
        id: RootId,
        work: &mut WorkState<H>,
    ) -> Result<Vec<Callback<H>>, H::Error> {
        assert!(!self.is_committing, "commit already in progress");
        assert!(work.next.is_none(), "committing unfinished work");
        let idx = id.0 as usize;
        self.is_committing = true;
        self.roots[idx].phase = RootPhase::Committing;

        let now = self.trace_now();
        work.summary.phase_begin(PhaseKind::Mutation, now);
        self.tracer.phase_begin(&PhaseBeginEvent {
            root: id,
            pass: work.pass,
            phase: PhaseKind::Mutation,
            priority: work.priority,
            timestamp: now,
        });

        self.host.prepare_for_commit();
        let mut applied = Applied::default();
        let result = apply_mutations(
            &mut self.host,
            &mut self.nodes,
            &self.roots[idx].container,
            &work.effects,
            &mut applied,
        );

        let mut callbacks = Vec::new();
        if result.is_ok() {
            let root = &mut self.roots[idx];
            root.current = work.top;
            if let Some(pending) = root.pending_context.take() {
                root.context = Some(pending);
            }
            callbacks = root.queue.take_processed(work.priority, work.snapshot);
            root.applied_seq = root.applied_seq.max(work.selected_seq);
            for &deleted in &applied.deleted {
                self.release_subtree(deleted);
            }
        } else {
            for &id in &work.created {
                if self.nodes.is_alive(id) {
                    self.nodes.release(id);
                }
            }
        }

        self.host.reset_after_commit();
        self.is_committing = false;
        self.roots[idx].phase = RootPhase::Idle;

        let now = self.trace_now();
        work.summary.phase_end(PhaseKind::Mutation, now);
        self.tracer.phase_end(&PhaseEndEvent {
            root: id,
            pass: work.pass,
            phase: PhaseKind::Mutation,
            timestamp: now,
        });
        result.map_err(ReconcileError::Host)?;

        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        self.tracer.commit(&CommitEvent {
            root: id,
            pass: work.pass,
            priority: work.priority,
            placements: applied.placements,
            updates: applied.updates,
            deletions: count(applied.deleted.len()),
            mounts: count(applied.mounts.len()),
            callbacks: count(callbacks.len()),
            timestamp: now,
        });
        #[cfg(feature = "trace-rich")]
        self.tracer.effects(work.pass, &applied.records);

        if !applied.mounts.is_empty() {
            let now = self.trace_now();
            work.summary.phase_begin(PhaseKind::Mount, now);
            self.tracer.phase_begin(&PhaseBeginEvent {
                root: id,
                pass: work.pass,
                phase: PhaseKind::Mount,
                priority: work.priority,
                timestamp: now,
            });
            let mounted = self.commit_mounts(&applied.mounts);
            let now = self.trace_now();
            work.summary.phase_end(PhaseKind::Mount, now);
            self.tracer.phase_end(&PhaseEndEvent {
                root: id,
                pass: work.pass,
                phase: PhaseKind::Mount,
                timestamp: now,
            });
            mounted.map_err(ReconcileError::Host)?;
        }

        Ok(callbacks)
    }

    fn commit_mounts(&mut self, mounts: &[NodeId]) -> core::result::Result<(), H::Error> {
        for &node in mounts {
            if !self.nodes.is_alive(node) {
                continue;
            }
            let i = node.idx as usize;
            let (Some(instance), Some(ty), Some(props)) = (
                self.nodes.output[i].instance(),
                self.nodes.content[i].ty(),
                self.nodes.content[i].props(),
            ) else {
                continue;
            };
            self.host.commit_mount(instance, ty, props, node)?;
        }
        Ok(())
    }

    /// Frees a committed subtree and the alternates of its nodes.
    fn release_subtree(&mut self, top: NodeId) {
        let pairs: Vec<(NodeId, Option<NodeId>)> = self
            .nodes
            .subtree(top)
            .into_iter()
            .map(|n| (n, self.nodes.alternate(n)))
            .collect();
        for (node, alt) in pairs {
            self.nodes.release(node);
            if let Some(alt) = alt.filter(|&a| self.nodes.is_alive(a)) {
                self.nodes.release(alt);
            }
        }
    }
}
