// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to microseconds using a [`Timebase`].

use std::io::Write;

use trellis_core::time::{HostTime, Timebase};
use trellis_core::trace::{
    CommitEvent, EffectKind, EffectRecord, InterruptEvent, PassSummary, PhaseBeginEvent,
    PhaseEndEvent, TraceSink, UpdateScheduledEvent, YieldEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Consumes the sink and returns its destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_nanos(ticks) as f64 / 1000.0
    }

    fn host_us(&self, t: HostTime) -> f64 {
        self.ticks_to_us(t.ticks())
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        let _ = writeln!(
            self.writer,
            "[update] root={} seq={} {} at {:.1}µs",
            e.root.index(),
            e.seq,
            e.priority,
            self.host_us(e.timestamp),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] root={} pass={} {} {} at {:.1}µs",
            e.root.index(),
            e.pass,
            e.phase.name(),
            e.priority,
            self.host_us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] root={} pass={} {} at {:.1}µs",
            e.root.index(),
            e.pass,
            e.phase.name(),
            self.host_us(e.timestamp),
        );
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        let _ = writeln!(
            self.writer,
            "[yield] root={} pass={} {} units={} at {:.1}µs",
            e.root.index(),
            e.pass,
            e.priority,
            e.units,
            self.host_us(e.timestamp),
        );
    }

    fn on_interrupt(&mut self, e: &InterruptEvent) {
        let _ = writeln!(
            self.writer,
            "[interrupt] root={} pass={} {} by {} discarded={} at {:.1}µs",
            e.root.index(),
            e.pass,
            e.interrupted,
            e.by,
            e.discarded_nodes,
            self.host_us(e.timestamp),
        );
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        let _ = writeln!(
            self.writer,
            "[commit] root={} pass={} {} place={} update={} delete={} mount={} callbacks={} at {:.1}µs",
            e.root.index(),
            e.pass,
            e.priority,
            e.placements,
            e.updates,
            e.deletions,
            e.mounts,
            e.callbacks,
            self.host_us(e.timestamp),
        );
    }

    fn on_pass_summary(&mut self, s: &PassSummary) {
        let outcome = if s.committed { "committed" } else { "dropped" };
        let _ = writeln!(
            self.writer,
            "[summary] root={} pass={} {} slices={} units={} render={:.1}µs \
             mutation={:.1}µs mount={:.1}µs callbacks={:.1}µs {outcome}",
            s.root.index(),
            s.pass,
            s.priority,
            s.slices,
            s.units,
            self.ticks_to_us(s.render_ticks),
            self.ticks_to_us(s.mutation_ticks),
            self.ticks_to_us(s.mount_ticks),
            self.ticks_to_us(s.callback_ticks),
        );
    }

    fn on_effects(&mut self, pass: u64, effects: &[EffectRecord]) {
        let count = |kind: EffectKind| effects.iter().filter(|r| r.kind == kind).count();
        let _ = writeln!(
            self.writer,
            "[effects] pass={pass} place={} update={} delete={} mount={}",
            count(EffectKind::Placement),
            count(EffectKind::Update),
            count(EffectKind::Deletion),
            count(EffectKind::Mount),
        );
    }
}
