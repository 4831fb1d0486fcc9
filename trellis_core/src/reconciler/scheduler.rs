// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deciding which root to work on, at which level, and when.
//!
//! Synchronous work is performed before `update_container` returns. Task
//! work is performed immediately outside a batch and when the outermost batch
//! ends inside one. Animation and deferred work wait for the host to call
//! [`Reconciler::perform_animation_work`] or
//! [`Reconciler::perform_deferred_work`], which the reconciler requests at
//! most once per kind until the host calls back.
//!
//! Each pass works on one root at that root's most urgent pending level.
//! Only deferred passes consult the deadline; they park between node visits
//! and resume on the next deferred callback.
//!
//! A root whose pass fails is unscheduled. Its updates stay queued and are
//! retried by the next update of that root, never by another root's flush.

use alloc::vec::Vec;

use crate::deadline::Deadline;
use crate::error::{ReconcileError, Result};
use crate::host::Host;
use crate::priority::PriorityLevel;
use crate::time::HostTime;
use crate::trace::{
    InterruptEvent, PassSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind, YieldEvent,
};
use crate::tree::Content;

use super::root::{RootPhase, WorkState};
use super::work_loop::WorkCx;
use super::{Reconciler, RootId};

/// How a pass ended when it did not fail.
enum Pass {
    Committed,
    Yielded,
}

impl<H: Host> Reconciler<H> {
    /// Host time for trace events; zero when no sink is installed.
    pub(crate) fn trace_now(&self) -> HostTime {
        if self.tracer.is_enabled() {
            self.host.now()
        } else {
            HostTime(0)
        }
    }

    /// Most urgent level that may be performed synchronously right now.
    fn flush_level(&self) -> PriorityLevel {
        if self.batching {
            PriorityLevel::Synchronous
        } else {
            PriorityLevel::Task
        }
    }

    /// Registers pending work on `root` and performs or requests it according
    /// to `priority`.
    pub(crate) fn schedule_update(&mut self, root: RootId, priority: PriorityLevel) -> Result<(), H::Error> {
        let parked = self.roots[root.0 as usize].work.as_ref().map(|w| w.priority);
        if parked.is_some_and(|p| priority < p) {
            self.discard_work(root, priority);
        }
        if !self.scheduled.contains(&root) {
            self.scheduled.push(root);
        }

        match priority {
            PriorityLevel::Synchronous => {
                if !self.is_performing {
                    self.perform_work(self.flush_level(), None)?;
                }
            }
            PriorityLevel::Task => {
                if !self.batching && !self.is_performing {
                    self.perform_work(PriorityLevel::Task, None)?;
                }
            }
            PriorityLevel::Animation => self.request_animation(),
            PriorityLevel::High | PriorityLevel::Low | PriorityLevel::Offscreen => {
                self.request_deferred();
            }
            PriorityLevel::NoWork => {}
        }
        Ok(())
    }

    fn request_animation(&mut self) {
        if !self.animation_requested {
            self.animation_requested = true;
            self.host.schedule_animation_callback();
        }
    }

    fn request_deferred(&mut self) {
        if !self.deferred_requested {
            self.deferred_requested = true;
            self.host.schedule_deferred_callback();
        }
    }

    /// Performs pending animation work. Called by the host in response to
    /// [`Host::schedule_animation_callback`].
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Host`] if the host fails during a pass and
    /// [`ReconcileError::ReentrantCommit`] if called during a commit.
    pub fn perform_animation_work(&mut self) -> Result<(), H::Error> {
        self.check_entry()?;
        self.animation_requested = false;
        self.perform_work(PriorityLevel::Animation, None)
    }

    /// Performs pending work of any level until `deadline` runs low. Called
    /// by the host in response to [`Host::schedule_deferred_callback`].
    ///
    /// Unfinished deferred work is parked and another callback is requested.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Host`] if the host fails during a pass and
    /// [`ReconcileError::ReentrantCommit`] if called during a commit.
    pub fn perform_deferred_work(&mut self, deadline: &dyn Deadline) -> Result<(), H::Error> {
        self.check_entry()?;
        self.deferred_requested = false;
        self.perform_work(PriorityLevel::Offscreen, Some(deadline))
    }

    /// Runs passes for pending work at `limit` or more urgent.
    ///
    /// Does nothing when already performing; the running loop picks up new
    /// work before it returns.
    pub(crate) fn perform_work(
        &mut self,
        limit: PriorityLevel,
        deadline: Option<&dyn Deadline>,
    ) -> Result<(), H::Error> {
        if self.is_performing {
            return Ok(());
        }
        self.is_performing = true;
        let result = self.work_loop(limit, deadline);
        self.is_performing = false;
        self.request_remaining();
        result
    }

    fn work_loop(&mut self, limit: PriorityLevel, deadline: Option<&dyn Deadline>) -> Result<(), H::Error> {
        // Commits per root index in this flush.
        let mut commits: Vec<u32> = Vec::new();
        loop {
            // Outside a batch, synchronous passes also flush task work.
            let level = limit.least_urgent(self.flush_level());
            let Some((root, priority)) = self.next_root(level) else {
                return Ok(());
            };
            let pass = match self.run_root(root, priority, deadline) {
                Ok(pass) => pass,
                Err(e) => {
                    // The failed updates stay queued but wait for the next
                    // update of their own root.
                    self.scheduled.retain(|&id| id != root);
                    return Err(e);
                }
            };
            match pass {
                Pass::Committed => {
                    let slot = root.0 as usize;
                    if commits.len() <= slot {
                        commits.resize(slot + 1, 0);
                    }
                    commits[slot] += 1;
                    if commits[slot] > self.config.nested_update_limit {
                        return Err(ReconcileError::NestedUpdateLimit {
                            limit: self.config.nested_update_limit,
                        });
                    }
                }
                Pass::Yielded => return Ok(()),
            }
        }
    }

    /// The scheduled root with the most urgent pending work at `level` or
    /// more urgent. Ties go to the root scheduled first.
    fn next_root(&mut self, level: PriorityLevel) -> Option<(RootId, PriorityLevel)> {
        let roots = &self.roots;
        self.scheduled
            .retain(|id| roots[id.0 as usize].queue.pending_priority().has_work());

        let mut best: Option<(RootId, PriorityLevel)> = None;
        for &id in &self.scheduled {
            let pending = self.roots[id.0 as usize].queue.pending_priority();
            if pending <= level && best.is_none_or(|(_, p)| pending < p) {
                best = Some((id, pending));
            }
        }
        best
    }

    /// Requests host callbacks for work left after a flush.
    fn request_remaining(&mut self) {
        let mut animation = false;
        let mut deferred = false;
        for id in &self.scheduled {
            let pending = self.roots[id.0 as usize].queue.pending_priority();
            animation |= pending == PriorityLevel::Animation;
            deferred |= pending.is_deferred();
        }
        if animation {
            self.request_animation();
        }
        if deferred {
            self.request_deferred();
        }
    }

    /// Starts or resumes a pass of `id` at `priority` and commits it if it
    /// finishes.
    fn run_root(
        &mut self,
        id: RootId,
        priority: PriorityLevel,
        deadline: Option<&dyn Deadline>,
    ) -> Result<Pass, H::Error> {
        let idx = id.0 as usize;
        let mut work = match self.roots[idx].work.take() {
            Some(w) if w.priority == priority => w,
            Some(w) => {
                self.abandon(id, w, priority);
                self.start_work(id, priority)
            }
            None => self.start_work(id, priority),
        };

        let now = self.trace_now();
        work.summary.phase_begin(PhaseKind::Render, now);
        self.tracer.phase_begin(&PhaseBeginEvent {
            root: id,
            pass: work.pass,
            phase: PhaseKind::Render,
            priority,
            timestamp: now,
        });

        let deadline = deadline.filter(|_| priority.is_deferred());
        let finished = WorkCx {
            host: &mut self.host,
            nodes: &mut self.nodes,
            container: &self.roots[idx].container,
            work: &mut work,
        }
        .run(deadline, self.config.yield_threshold);

        let now = self.trace_now();
        work.summary.phase_end(PhaseKind::Render, now);
        self.tracer.phase_end(&PhaseEndEvent {
            root: id,
            pass: work.pass,
            phase: PhaseKind::Render,
            timestamp: now,
        });

        match finished {
            Err(e) => {
                self.release_created(&work);
                self.roots[idx].phase = RootPhase::Idle;
                self.tracer.pass_summary(&work.summary.finish(false));
                return Err(ReconcileError::Host(e));
            }
            Ok(false) => {
                self.tracer.yielded(&YieldEvent {
                    root: id,
                    pass: work.pass,
                    priority,
                    units: work.summary.units(),
                    timestamp: now,
                });
                self.roots[idx].work = Some(work);
                return Ok(Pass::Yielded);
            }
            Ok(true) => {}
        }

        self.roots[idx].phase = RootPhase::EffectsReady;
        let callbacks = match self.commit_root(id, &mut work) {
            Ok(callbacks) => callbacks,
            Err(e) => {
                self.tracer.pass_summary(&work.summary.finish(false));
                return Err(e);
            }
        };

        if !callbacks.is_empty() {
            let now = self.trace_now();
            work.summary.phase_begin(PhaseKind::Callbacks, now);
            self.tracer.phase_begin(&PhaseBeginEvent {
                root: id,
                pass: work.pass,
                phase: PhaseKind::Callbacks,
                priority,
                timestamp: now,
            });
            for callback in callbacks {
                callback(self);
            }
            let now = self.trace_now();
            work.summary.phase_end(PhaseKind::Callbacks, now);
            self.tracer.phase_end(&PhaseEndEvent {
                root: id,
                pass: work.pass,
                phase: PhaseKind::Callbacks,
                timestamp: now,
            });
        }

        self.tracer.pass_summary(&work.summary.finish(true));
        Ok(Pass::Committed)
    }

    /// Sets up a new pass: snapshots the queue, picks the root element and
    /// prepares the top work-in-progress node.
    fn start_work(&mut self, id: RootId, priority: PriorityLevel) -> WorkState<H> {
        self.passes += 1;
        let root = &mut self.roots[id.0 as usize];
        let snapshot = root.queue.latest_seq();
        let (selected_seq, element) = match root.queue.select(priority, snapshot) {
            // A newer update may already be committed by a more urgent pass.
            Some((seq, payload)) if seq > root.applied_seq => (seq, payload.clone()),
            _ => {
                let committed = match &self.nodes.content[root.current.idx as usize] {
                    Content::Root(element) => element.clone(),
                    _ => None,
                };
                (root.applied_seq, committed)
            }
        };

        let (top, fresh) = self
            .nodes
            .work_in_progress(root.current, Content::Root(element));
        root.phase = RootPhase::BuildingAlternate;

        let mut created = Vec::new();
        if fresh {
            created.push(top);
        }
        WorkState {
            priority,
            snapshot,
            selected_seq,
            top,
            next: Some(top),
            effects: Vec::new(),
            created,
            contexts: Vec::new(),
            pass: self.passes,
            summary: PassSummaryBuilder::new(id, self.passes, priority),
        }
    }

    /// Throws away parked work on `root` in favour of work at `by`.
    pub(crate) fn discard_work(&mut self, root: RootId, by: PriorityLevel) {
        if let Some(work) = self.roots[root.0 as usize].work.take() {
            self.abandon(root, work, by);
        }
    }

    fn abandon(&mut self, root: RootId, work: WorkState<H>, by: PriorityLevel) {
        let discarded = self.release_created(&work);
        self.roots[root.0 as usize].phase = RootPhase::Idle;
        let timestamp = self.trace_now();
        self.tracer.interrupt(&InterruptEvent {
            root,
            pass: work.pass,
            interrupted: work.priority,
            by,
            discarded_nodes: discarded,
            timestamp,
        });
        self.tracer.pass_summary(&work.summary.finish(false));
    }

    /// Frees the nodes a pass allocated. Returns how many were freed.
    fn release_created(&mut self, work: &WorkState<H>) -> u32 {
        let mut released = 0_u32;
        for &id in &work.created {
            if self.nodes.is_alive(id) {
                self.nodes.release(id);
                released += 1;
            }
        }
        released
    }
}
