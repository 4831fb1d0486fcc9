// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Effect lists ([`on_effects`](TraceSink::on_effects)) store per-kind
//! counts only.

use trellis_core::priority::PriorityLevel;
use trellis_core::reconciler::RootId;
use trellis_core::time::HostTime;
use trellis_core::trace::{
    CommitEvent, EffectKind, EffectRecord, InterruptEvent, PassSummary, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, TraceSink, UpdateScheduledEvent, YieldEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_UPDATE_SCHEDULED: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_YIELD: u8 = 4;
const TAG_INTERRUPT: u8 = 5;
const TAG_COMMIT: u8 = 6;
const TAG_PASS_SUMMARY: u8 = 7;
const TAG_EFFECT_COUNTS: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_root(&mut self, root: RootId) {
        self.write_u32(root.index());
    }

    fn write_priority(&mut self, p: PriorityLevel) {
        self.write_u8(p.code());
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Render => 0,
            PhaseKind::Mutation => 1,
            PhaseKind::Mount => 2,
            PhaseKind::Callbacks => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_update_scheduled(&mut self, e: &UpdateScheduledEvent) {
        self.write_u8(TAG_UPDATE_SCHEDULED);
        self.write_root(e.root);
        self.write_u64(e.seq);
        self.write_priority(e.priority);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_root(e.root);
        self.write_u64(e.pass);
        self.write_phase(e.phase);
        self.write_priority(e.priority);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_root(e.root);
        self.write_u64(e.pass);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_yield(&mut self, e: &YieldEvent) {
        self.write_u8(TAG_YIELD);
        self.write_root(e.root);
        self.write_u64(e.pass);
        self.write_priority(e.priority);
        self.write_u32(e.units);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_interrupt(&mut self, e: &InterruptEvent) {
        self.write_u8(TAG_INTERRUPT);
        self.write_root(e.root);
        self.write_u64(e.pass);
        self.write_priority(e.interrupted);
        self.write_priority(e.by);
        self.write_u32(e.discarded_nodes);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_commit(&mut self, e: &CommitEvent) {
        self.write_u8(TAG_COMMIT);
        self.write_root(e.root);
        self.write_u64(e.pass);
        self.write_priority(e.priority);
        self.write_u32(e.placements);
        self.write_u32(e.updates);
        self.write_u32(e.deletions);
        self.write_u32(e.mounts);
        self.write_u32(e.callbacks);
        self.write_u64(e.timestamp.ticks());
    }

    fn on_pass_summary(&mut self, s: &PassSummary) {
        self.write_u8(TAG_PASS_SUMMARY);
        self.write_root(s.root);
        self.write_u64(s.pass);
        self.write_priority(s.priority);
        self.write_u32(s.slices);
        self.write_u32(s.units);
        self.write_u64(s.render_ticks);
        self.write_u64(s.mutation_ticks);
        self.write_u64(s.mount_ticks);
        self.write_u64(s.callback_ticks);
        self.write_u8(u8::from(s.committed));
    }

    fn on_effects(&mut self, pass: u64, effects: &[EffectRecord]) {
        let mut counts = EffectCounts::default();
        for record in effects {
            let slot = match record.kind {
                EffectKind::Placement => &mut counts.placements,
                EffectKind::Update => &mut counts.updates,
                EffectKind::Deletion => &mut counts.deletions,
                EffectKind::Mount => &mut counts.mounts,
            };
            *slot = slot.saturating_add(1);
        }
        self.write_u8(TAG_EFFECT_COUNTS);
        self.write_u64(pass);
        self.write_u32(counts.placements);
        self.write_u32(counts.updates);
        self.write_u32(counts.deletions);
        self.write_u32(counts.mounts);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Per-kind effect totals of one commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EffectCounts {
    /// Placement effects.
    pub placements: u32,
    /// Update effects.
    pub updates: u32,
    /// Deletion effects.
    pub deletions: u32,
    /// Mount effects.
    pub mounts: u32,
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// An [`UpdateScheduledEvent`].
    UpdateScheduled(UpdateScheduledEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`YieldEvent`].
    Yield(YieldEvent),
    /// An [`InterruptEvent`].
    Interrupt(InterruptEvent),
    /// A [`CommitEvent`].
    Commit(CommitEvent),
    /// A [`PassSummary`].
    PassSummary(PassSummary),
    /// Effect totals for a pass.
    EffectCounts {
        /// Pass counter.
        pass: u64,
        /// Totals by kind.
        counts: EffectCounts,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first truncated record, unknown tag, or invalid
/// priority code.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_root(&mut self) -> Option<RootId> {
        self.read_u32().map(RootId::from_index)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_priority(&mut self) -> Option<PriorityLevel> {
        PriorityLevel::from_code(self.read_u8()?)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Render,
            1 => PhaseKind::Mutation,
            2 => PhaseKind::Mount,
            _ => PhaseKind::Callbacks,
        })
    }

    fn decode_update_scheduled(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::UpdateScheduled(UpdateScheduledEvent {
            root: self.read_root()?,
            seq: self.read_u64()?,
            priority: self.read_priority()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            root: self.read_root()?,
            pass: self.read_u64()?,
            phase: self.read_phase()?,
            priority: self.read_priority()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            root: self.read_root()?,
            pass: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_yield(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Yield(YieldEvent {
            root: self.read_root()?,
            pass: self.read_u64()?,
            priority: self.read_priority()?,
            units: self.read_u32()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_interrupt(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Interrupt(InterruptEvent {
            root: self.read_root()?,
            pass: self.read_u64()?,
            interrupted: self.read_priority()?,
            by: self.read_priority()?,
            discarded_nodes: self.read_u32()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_commit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Commit(CommitEvent {
            root: self.read_root()?,
            pass: self.read_u64()?,
            priority: self.read_priority()?,
            placements: self.read_u32()?,
            updates: self.read_u32()?,
            deletions: self.read_u32()?,
            mounts: self.read_u32()?,
            callbacks: self.read_u32()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_pass_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PassSummary(PassSummary {
            root: self.read_root()?,
            pass: self.read_u64()?,
            priority: self.read_priority()?,
            slices: self.read_u32()?,
            units: self.read_u32()?,
            render_ticks: self.read_u64()?,
            mutation_ticks: self.read_u64()?,
            mount_ticks: self.read_u64()?,
            callback_ticks: self.read_u64()?,
            committed: self.read_u8()? != 0,
        }))
    }

    fn decode_effect_counts(&mut self) -> Option<RecordedEvent> {
        let pass = self.read_u64()?;
        let counts = EffectCounts {
            placements: self.read_u32()?,
            updates: self.read_u32()?,
            deletions: self.read_u32()?,
            mounts: self.read_u32()?,
        };
        Some(RecordedEvent::EffectCounts { pass, counts })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_UPDATE_SCHEDULED => self.decode_update_scheduled(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_YIELD => self.decode_yield(),
            TAG_INTERRUPT => self.decode_interrupt(),
            TAG_COMMIT => self.decode_commit(),
            TAG_PASS_SUMMARY => self.decode_pass_summary(),
            TAG_EFFECT_COUNTS => self.decode_effect_counts(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::tree::NodeId;

    fn sample_commit() -> CommitEvent {
        CommitEvent {
            root: RootId::from_index(1),
            pass: 7,
            priority: PriorityLevel::Animation,
            placements: 2,
            updates: 5,
            deletions: 1,
            mounts: 0,
            callbacks: 3,
            timestamp: HostTime(1_016_667),
        }
    }

    fn sample_summary() -> PassSummary {
        PassSummary {
            root: RootId::from_index(1),
            pass: 7,
            priority: PriorityLevel::Low,
            slices: 4,
            units: 40,
            render_ticks: 1_500,
            mutation_ticks: 100,
            mount_ticks: 20,
            callback_ticks: 5,
            committed: true,
        }
    }

    #[test]
    fn commit_survives_recording() {
        let mut rec = RecorderSink::new();
        let orig = sample_commit();
        rec.on_commit(&orig);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::Commit(e) => {
                assert_eq!(e.root, orig.root);
                assert_eq!(e.pass, orig.pass);
                assert_eq!(e.priority, orig.priority);
                assert_eq!(
                    (e.placements, e.updates, e.deletions, e.callbacks),
                    (2, 5, 1, 3)
                );
                assert_eq!(e.timestamp, orig.timestamp);
            }
            other => panic!("expected Commit, got {other:?}"),
        }
    }

    #[test]
    fn phase_events_keep_order_and_kind() {
        let mut rec = RecorderSink::new();
        rec.on_phase_begin(&PhaseBeginEvent {
            root: RootId::from_index(0),
            pass: 5,
            phase: PhaseKind::Mount,
            priority: PriorityLevel::Synchronous,
            timestamp: HostTime(2000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            root: RootId::from_index(0),
            pass: 5,
            phase: PhaseKind::Mount,
            timestamp: HostTime(3000),
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            RecordedEvent::PhaseBegin(e) => {
                assert_eq!(e.phase, PhaseKind::Mount);
                assert_eq!(e.priority, PriorityLevel::Synchronous);
                assert_eq!(e.timestamp, HostTime(2000));
            }
            other => panic!("expected PhaseBegin, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::PhaseEnd(e) => {
                assert_eq!(e.phase, PhaseKind::Mount);
                assert_eq!(e.timestamp, HostTime(3000));
            }
            other => panic!("expected PhaseEnd, got {other:?}"),
        }
    }

    #[test]
    fn interrupt_keeps_both_levels() {
        let mut rec = RecorderSink::new();
        rec.on_interrupt(&InterruptEvent {
            root: RootId::from_index(3),
            pass: 2,
            interrupted: PriorityLevel::Offscreen,
            by: PriorityLevel::Synchronous,
            discarded_nodes: 11,
            timestamp: HostTime(9),
        });

        match decode(rec.as_bytes()).next() {
            Some(RecordedEvent::Interrupt(e)) => {
                assert_eq!(e.interrupted, PriorityLevel::Offscreen);
                assert_eq!(e.by, PriorityLevel::Synchronous);
                assert_eq!(e.discarded_nodes, 11);
            }
            other => panic!("expected Interrupt, got {other:?}"),
        }
    }

    #[test]
    fn mixed_stream_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_update_scheduled(&UpdateScheduledEvent {
            root: RootId::from_index(1),
            seq: 1,
            priority: PriorityLevel::Low,
            timestamp: HostTime(10),
        });
        rec.on_yield(&YieldEvent {
            root: RootId::from_index(1),
            pass: 7,
            priority: PriorityLevel::Low,
            units: 3,
            timestamp: HostTime(20),
        });
        rec.on_commit(&sample_commit());
        rec.on_pass_summary(&sample_summary());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], RecordedEvent::UpdateScheduled(_)));
        assert!(matches!(events[1], RecordedEvent::Yield(ref y) if y.units == 3));
        assert!(matches!(events[2], RecordedEvent::Commit(_)));
        match &events[3] {
            RecordedEvent::PassSummary(s) => {
                assert_eq!(s.slices, 4);
                assert_eq!(s.render_ticks, 1_500);
                assert!(s.committed, "summary flag survives");
            }
            other => panic!("expected PassSummary, got {other:?}"),
        }
    }

    #[test]
    fn effects_are_recorded_as_counts() {
        let node = |i| NodeId::from_parts(i, 0);
        let mut rec = RecorderSink::new();
        rec.on_effects(
            42,
            &[
                EffectRecord {
                    node: node(0),
                    kind: EffectKind::Placement,
                },
                EffectRecord {
                    node: node(1),
                    kind: EffectKind::Update,
                },
                EffectRecord {
                    node: node(2),
                    kind: EffectKind::Update,
                },
            ],
        );

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::EffectCounts { pass, counts } => {
                assert_eq!(*pass, 42);
                assert_eq!(
                    *counts,
                    EffectCounts {
                        placements: 1,
                        updates: 2,
                        deletions: 0,
                        mounts: 0,
                    }
                );
            }
            other => panic!("expected EffectCounts, got {other:?}"),
        }
    }

    #[test]
    fn truncated_record_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_commit(&sample_commit());
        rec.on_commit(&sample_commit());
        let bytes = rec.into_bytes();
        let events: Vec<_> = decode(&bytes[..bytes.len() - 1]).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }
}
