// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Each root becomes a process (`pid` = root index) so its passes stack on
//! their own track.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use trellis_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
/// Pass summaries and effect counts carry no timestamp of their own and are
/// placed at the most recent timestamp seen before them.
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_ts = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::UpdateScheduled(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "UpdateScheduled",
                    "cat": "Scheduler",
                    "ts": last_ts,
                    "pid": e.root.index(),
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "seq": e.seq,
                        "priority": e.priority.name(),
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Pass",
                    "ts": last_ts,
                    "pid": e.root.index(),
                    "tid": 0,
                    "args": {
                        "pass": e.pass,
                        "priority": e.priority.name(),
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Pass",
                    "ts": last_ts,
                    "pid": e.root.index(),
                    "tid": 0,
                    "args": {
                        "pass": e.pass,
                    }
                }));
            }
            RecordedEvent::Yield(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "Yield",
                    "cat": "Scheduler",
                    "ts": last_ts,
                    "pid": e.root.index(),
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "pass": e.pass,
                        "priority": e.priority.name(),
                        "units": e.units,
                    }
                }));
            }
            RecordedEvent::Interrupt(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "Interrupt",
                    "cat": "Scheduler",
                    "ts": last_ts,
                    "pid": e.root.index(),
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "pass": e.pass,
                        "interrupted": e.interrupted.name(),
                        "by": e.by.name(),
                        "discarded_nodes": e.discarded_nodes,
                    }
                }));
            }
            RecordedEvent::Commit(e) => {
                last_ts = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "Commit",
                    "cat": "Pass",
                    "ts": last_ts,
                    "pid": e.root.index(),
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "pass": e.pass,
                        "priority": e.priority.name(),
                        "placements": e.placements,
                        "updates": e.updates,
                        "deletions": e.deletions,
                        "mounts": e.mounts,
                        "callbacks": e.callbacks,
                    }
                }));
            }
            RecordedEvent::PassSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "PassSummary",
                    "cat": "Summary",
                    "ts": last_ts,
                    "pid": s.root.index(),
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "pass": s.pass,
                        "priority": s.priority.name(),
                        "slices": s.slices,
                        "units": s.units,
                        "render_us": ticks_to_us(s.render_ticks, timebase),
                        "mutation_us": ticks_to_us(s.mutation_ticks, timebase),
                        "mount_us": ticks_to_us(s.mount_ticks, timebase),
                        "callback_us": ticks_to_us(s.callback_ticks, timebase),
                        "committed": s.committed,
                    }
                }));
            }
            RecordedEvent::EffectCounts { pass, counts } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Effects",
                    "cat": "Rich",
                    "ts": last_ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "pass": pass,
                        "placements": counts.placements,
                        "updates": counts.updates,
                        "deletions": counts.deletions,
                        "mounts": counts.mounts,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use trellis_core::priority::PriorityLevel;
    use trellis_core::reconciler::RootId;
    use trellis_core::time::HostTime;
    use trellis_core::trace::{
        PassSummary, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink, UpdateScheduledEvent,
    };

    #[test]
    fn export_produces_valid_json() {
        let root = RootId::from_index(2);
        let mut rec = RecorderSink::new();
        rec.on_update_scheduled(&UpdateScheduledEvent {
            root,
            seq: 1,
            priority: PriorityLevel::Task,
            timestamp: HostTime(1_000_000),
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            root,
            pass: 1,
            phase: PhaseKind::Render,
            priority: PriorityLevel::Task,
            timestamp: HostTime(1_000_000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            root,
            pass: 1,
            phase: PhaseKind::Render,
            timestamp: HostTime(1_000_500),
        });
        rec.on_pass_summary(&PassSummary {
            root,
            pass: 1,
            priority: PriorityLevel::Task,
            slices: 1,
            units: 3,
            render_ticks: 500,
            mutation_ticks: 0,
            mount_ticks: 0,
            callback_ticks: 0,
            committed: true,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "UpdateScheduled");
        assert_eq!(parsed[0]["pid"], 2);

        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["name"], "render");

        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["ts"], 1000.5);

        // The summary inherits the phase end's timestamp.
        assert_eq!(parsed[3]["name"], "PassSummary");
        assert_eq!(parsed[3]["ts"], 1000.5);
        assert_eq!(parsed[3]["args"]["committed"], true);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
