// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated inbox app that exercises the tracing and diagnostics pipeline.
//!
//! Drives a [`Reconciler`] over a [`MemoryHost`] whose clock advances with
//! every host call: a synchronous mount, a batch, a long deferred list render
//! that is preempted by a synchronous edit, and an unmount. Events go to both
//! a [`PrettyPrintSink`](trellis_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](trellis_debug::recorder::RecorderSink); the recording is
//! exported as Chrome trace JSON.

use std::cell::RefCell;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use trellis_core::time::{Duration, Timebase};
use trellis_core::{Element, Reconciler, ReconcilerConfig, RootId};
use trellis_debug::pretty::PrettyPrintSink;
use trellis_debug::recorder::RecorderSink;
use trellis_harness::{ContainerId, ManualClock, MemoryHost, Props, run_pending};

const ROW_COUNT: usize = 200;
const TIMEBASE: Timebase = Timebase::NANOS;
/// Simulated cost of one host call: 50µs.
const OP_COST: Duration = TIMEBASE.budget(50_000);
/// Budget of one deferred callback: 5ms.
const SLICE: Duration = TIMEBASE.budget(5_000_000);

type El = Element<MemoryHost>;

fn shell(title: &str, rows: impl IntoIterator<Item = El>) -> El {
    El::host("div", Props::new().with("id", "app")).with_children([
        El::host("h1", Props::new()).with_children([El::text(title)]),
        El::host("ul", Props::new()).with_children(rows),
    ])
}

fn rows(count: usize) -> impl Iterator<Item = El> {
    (0..count).map(|i| {
        let id = format!("row-{i}");
        El::host("li", Props::new().with("id", &id))
            .with_key(id.as_str())
            .with_children([El::text(&format!("message {i}"))])
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    let timebase = TIMEBASE;

    // -- host --------------------------------------------------------------
    let clock = ManualClock::new();
    let mut host = MemoryHost::with_clock(clock.clone(), OP_COST);
    let container = host.add_container();

    // -- sinks -------------------------------------------------------------
    let pretty = PrettyPrintSink::new(Box::new(std::io::stdout()), timebase);
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));

    let mut reconciler = Reconciler::new(host, ReconcilerConfig::interactive());
    reconciler.set_trace_sink((pretty, recorder.clone()));
    let root = reconciler.create_container(container)?;

    // 1. Synchronous mount, with a completion callback.
    reconciler.update_container(
        Some(shell("Inbox", [])),
        root,
        None,
        Some(Box::new(|r: &mut Reconciler<MemoryHost>| {
            println!("mounted: {} host calls", r.host().ops().len());
        })),
    )?;

    // 2. Two title changes in one batch commit once.
    reconciler.batched_updates(|r| {
        r.update_container(Some(shell("Inbox (1)", [])), root, None, None)?;
        r.update_container(Some(shell("Inbox (2)", [])), root, None, None)
    })??;

    // 3. A long list at deferred priority, two slices in.
    reconciler.deferred_updates(|r| {
        r.update_container(Some(shell("Inbox (2)", rows(ROW_COUNT))), root, None, None)
    })?;
    for _ in 0..2 {
        if reconciler.host_mut().take_deferred_request() {
            reconciler.perform_deferred_work(&clock.deadline(SLICE))?;
        }
    }

    // 4. The user edits the title: synchronous work preempts the list.
    reconciler.update_container(Some(shell("Search", [])), root, None, None)?;
    report(&reconciler, container, root, "after preemption");

    // 5. The list is rendered again from scratch and finishes in slices.
    reconciler.deferred_updates(|r| {
        r.update_container(Some(shell("Search", rows(ROW_COUNT))), root, None, None)
    })?;
    let slices = run_pending(&mut reconciler, 1_000, || clock.deadline(SLICE))?;
    println!("list committed after {slices} deferred callbacks");
    report(&reconciler, container, root, "after list");

    // 6. Unmount.
    reconciler.unmount_container(root, None)?;
    report(&reconciler, container, root, "after unmount");

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let mut writer = BufWriter::new(File::create(path)?);
    trellis_debug::chrome::export(recorder.borrow().as_bytes(), timebase, &mut writer)?;

    println!("Wrote {path} (simulated {:.1}ms)", clock.now().ticks() as f64 / 1e6);
    Ok(())
}

fn report(reconciler: &Reconciler<MemoryHost>, container: ContainerId, root: RootId, label: &str) {
    let host = reconciler.host();
    let rendered = host.render(container);
    println!(
        "{label}: {} rows on screen, {} live nodes, {} instances created, public root {:?}",
        rendered.matches("<li").count(),
        reconciler.live_nodes(),
        host.instance_count(),
        reconciler.get_public_root_instance(root),
    );
}
