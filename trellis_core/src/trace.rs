// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for render passes.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! reconciler calls as it schedules, renders and commits. All method bodies
//! default to no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional boxed sink and is owned by the
//! [`Reconciler`](crate::Reconciler) (install one with
//! [`set_trace_sink`](crate::Reconciler::set_trace_sink)). When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead) and installed sinks are dropped. When **on**, each method
//! performs a single `Option` branch before dispatching.
//!
//! [`PassSummaryBuilder`] collects phase durations across the slices of one
//! pass and produces a [`PassSummary`] when the pass commits or is abandoned.
//!
//! To observe events after handing a sink to the reconciler, share it:
//! `Rc<RefCell<S>>` implements [`TraceSink`] for any sink `S`, and a pair
//! `(A, B)` tees every event to both.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`EffectRecord`] lists plus the
//!   corresponding `TraceSink` method.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use crate::priority::PriorityLevel;
use crate::reconciler::RootId;
use crate::time::HostTime;
#[cfg(feature = "trace-rich")]
use crate::tree::NodeId;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a pass is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// One slice of building the work-in-progress tree.
    Render,
    /// Applying host mutations and swapping the tree.
    Mutation,
    /// `commit_mount` calls after the swap.
    Mount,
    /// Completion callbacks of the processed updates.
    Callbacks,
}

impl PhaseKind {
    /// All phases, in pass order.
    pub const ALL: [Self; 4] = [Self::Render, Self::Mutation, Self::Mount, Self::Callbacks];

    /// Short lowercase name, used by diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Mutation => "mutation",
            Self::Mount => "mount",
            Self::Callbacks => "callbacks",
        }
    }
}

/// What a committed effect did.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    /// Host output inserted or moved.
    Placement,
    /// Props or text updated.
    Update,
    /// Subtree removed.
    Deletion,
    /// `commit_mount` called.
    Mount,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when an update is enqueued on a root.
#[derive(Clone, Copy, Debug)]
pub struct UpdateScheduledEvent {
    /// Target root.
    pub root: RootId,
    /// Enqueue sequence number.
    pub seq: u64,
    /// Ambient priority the update was tagged with.
    pub priority: PriorityLevel,
    /// Host time at enqueue.
    pub timestamp: HostTime,
}

/// Marks the beginning of a pass phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Root being worked on.
    pub root: RootId,
    /// Pass counter.
    pub pass: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Level of the pass.
    pub priority: PriorityLevel,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a pass phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Root being worked on.
    pub root: RootId,
    /// Pass counter.
    pub pass: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted when a deferred pass parks because its deadline ran low.
#[derive(Clone, Copy, Debug)]
pub struct YieldEvent {
    /// Root whose work is parked.
    pub root: RootId,
    /// Pass counter.
    pub pass: u64,
    /// Level of the parked work.
    pub priority: PriorityLevel,
    /// Node visits performed so far in this pass.
    pub units: u32,
    /// Host time of the yield.
    pub timestamp: HostTime,
}

/// Emitted when parked work is thrown away in favour of more urgent work.
#[derive(Clone, Copy, Debug)]
pub struct InterruptEvent {
    /// Root whose work was discarded.
    pub root: RootId,
    /// Pass counter of the discarded pass.
    pub pass: u64,
    /// Level of the discarded work.
    pub interrupted: PriorityLevel,
    /// Level of the work that caused the discard.
    pub by: PriorityLevel,
    /// Freshly created nodes released with the work.
    pub discarded_nodes: u32,
    /// Host time of the discard.
    pub timestamp: HostTime,
}

/// Emitted after a pass's tree is swapped in.
#[derive(Clone, Copy, Debug)]
pub struct CommitEvent {
    /// Root that committed.
    pub root: RootId,
    /// Pass counter.
    pub pass: u64,
    /// Level of the pass.
    pub priority: PriorityLevel,
    /// Host outputs inserted or moved.
    pub placements: u32,
    /// Host outputs updated in place.
    pub updates: u32,
    /// Subtrees removed.
    pub deletions: u32,
    /// Nodes scheduled for `commit_mount`.
    pub mounts: u32,
    /// Completion callbacks to run.
    pub callbacks: u32,
    /// Host time of the swap.
    pub timestamp: HostTime,
}

/// Per-pass timing summary produced by [`PassSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct PassSummary {
    /// Root worked on.
    pub root: RootId,
    /// Pass counter.
    pub pass: u64,
    /// Level of the pass.
    pub priority: PriorityLevel,
    /// Render slices the pass took (1 unless it yielded).
    pub slices: u32,
    /// Node visits performed.
    pub units: u32,
    /// Total render time in ticks across all slices.
    pub render_ticks: u64,
    /// Mutation phase duration in ticks (0 if not reached).
    pub mutation_ticks: u64,
    /// Mount phase duration in ticks (0 if not reached).
    pub mount_ticks: u64,
    /// Callback phase duration in ticks (0 if not reached).
    pub callback_ticks: u64,
    /// Whether the pass committed (false when it was discarded or failed).
    pub committed: bool,
}

/// A committed effect.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct EffectRecord {
    /// Node the effect applied to.
    pub node: NodeId,
    /// What the effect did.
    pub kind: EffectKind,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the reconciler.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an update is enqueued.
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        _ = e;
    }

    /// Called at the beginning of a pass phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a pass phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when deferred work parks.
    fn on_yield(&mut self, e: &YieldEvent) {
        _ = e;
    }

    /// Called when parked work is discarded.
    fn on_interrupt(&mut self, e: &InterruptEvent) {
        _ = e;
    }

    /// Called after a tree swap.
    fn on_commit(&mut self, e: &CommitEvent) {
        _ = e;
    }

    /// Called with a per-pass summary.
    fn on_pass_summary(&mut self, s: &PassSummary) {
        _ = s;
    }

    /// Called with the effects a commit applied (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_effects(&mut self, pass: u64, effects: &[EffectRecord]) {
        _ = (pass, effects);
    }
}

// ---------------------------------------------------------------------------
// Sinks and combinators
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

impl<T: TraceSink + ?Sized> TraceSink for Rc<RefCell<T>> {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        self.borrow_mut().on_update_scheduled(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.borrow_mut().on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.borrow_mut().on_phase_end(e);
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        self.borrow_mut().on_yield(e);
    }

    fn on_interrupt(&mut self, e: &InterruptEvent) {
        self.borrow_mut().on_interrupt(e);
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.borrow_mut().on_commit(e);
    }

    fn on_pass_summary(&mut self, s: &PassSummary) {
        self.borrow_mut().on_pass_summary(s);
    }

    #[cfg(feature = "trace-rich")]
    fn on_effects(&mut self, pass: u64, effects: &[EffectRecord]) {
        self.borrow_mut().on_effects(pass, effects);
    }
}

impl<A: TraceSink, B: TraceSink> TraceSink for (A, B) {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        self.0.on_update_scheduled(e);
        self.1.on_update_scheduled(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.0.on_phase_begin(e);
        self.1.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.0.on_phase_end(e);
        self.1.on_phase_end(e);
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        self.0.on_yield(e);
        self.1.on_yield(e);
    }

    fn on_interrupt(&mut self, e: &InterruptEvent) {
        self.0.on_interrupt(e);
        self.1.on_interrupt(e);
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.0.on_commit(e);
        self.1.on_commit(e);
    }

    fn on_pass_summary(&mut self, s: &PassSummary) {
        self.0.on_pass_summary(s);
        self.1.on_pass_summary(s);
    }

    #[cfg(feature = "trace-rich")]
    fn on_effects(&mut self, pass: u64, effects: &[EffectRecord]) {
        self.0.on_effects(pass, effects);
        self.1.on_effects(pass, effects);
    }
}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional boxed [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
    #[cfg(not(feature = "trace"))]
    _private: (),
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self { _private: () }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self { _private: () }
        }
    }

    /// Returns whether events reach a sink. Always `false` without the
    /// `trace` feature.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits an [`UpdateScheduledEvent`].
    #[inline]
    pub fn update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_update_scheduled(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`YieldEvent`].
    #[inline]
    pub fn yielded(&mut self, e: &YieldEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_yield(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`InterruptEvent`].
    #[inline]
    pub fn interrupt(&mut self, e: &InterruptEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_interrupt(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CommitEvent`].
    #[inline]
    pub fn commit(&mut self, e: &CommitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_commit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PassSummary`].
    #[inline]
    pub fn pass_summary(&mut self, s: &PassSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_pass_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits the effects of a commit (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn effects(&mut self, pass: u64, effects: &[EffectRecord]) {
        if let Some(s) = &mut self.sink {
            s.on_effects(pass, effects);
        }
    }
}

// ---------------------------------------------------------------------------
// PassSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a pass and produces a [`PassSummary`].
///
/// The render phase may span several slices; its durations accumulate.
#[derive(Clone, Debug)]
pub struct PassSummaryBuilder {
    root: RootId,
    pass: u64,
    priority: PriorityLevel,
    slices: u32,
    units: u32,
    phase_starts: [Option<HostTime>; 4],
    phase_ticks: [u64; 4],
}

impl PassSummaryBuilder {
    /// Starts building a summary for one pass.
    #[must_use]
    pub fn new(root: RootId, pass: u64, priority: PriorityLevel) -> Self {
        Self {
            root,
            pass,
            priority,
            slices: 0,
            units: 0,
            phase_starts: [None; 4],
            phase_ticks: [0; 4],
        }
    }

    /// Records the start of a phase. A render start also counts a slice.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        if phase == PhaseKind::Render {
            self.slices += 1;
        }
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase, adding its duration to the total.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime) {
        let idx = phase_index(phase);
        if let Some(start) = self.phase_starts[idx].take() {
            self.phase_ticks[idx] += t.saturating_duration_since(start).ticks();
        }
    }

    /// Adds node visits.
    pub fn add_units(&mut self, units: u32) {
        self.units = self.units.saturating_add(units);
    }

    /// Node visits recorded so far.
    #[must_use]
    pub fn units(&self) -> u32 {
        self.units
    }

    /// Consumes the builder and produces the final [`PassSummary`].
    #[must_use]
    pub fn finish(self, committed: bool) -> PassSummary {
        PassSummary {
            root: self.root,
            pass: self.pass,
            priority: self.priority,
            slices: self.slices,
            units: self.units,
            render_ticks: self.phase_ticks[phase_index(PhaseKind::Render)],
            mutation_ticks: self.phase_ticks[phase_index(PhaseKind::Mutation)],
            mount_ticks: self.phase_ticks[phase_index(PhaseKind::Mount)],
            callback_ticks: self.phase_ticks[phase_index(PhaseKind::Callbacks)],
            committed,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Render => 0,
        PhaseKind::Mutation => 1,
        PhaseKind::Mount => 2,
        PhaseKind::Callbacks => 3,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
