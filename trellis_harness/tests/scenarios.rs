// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end reconciler behaviour against the in-memory host.

use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::context::ContextValue;
use trellis_core::deadline::Unbounded;
use trellis_core::time::Duration;
use trellis_core::tree::NodeRef;
use trellis_core::{
    Callback, Element, HostHandle, PriorityLevel, ReconcileError, Reconciler, ReconcilerConfig,
    RootId,
};
use trellis_debug::recorder::{RecordedEvent, RecorderSink, decode};
use trellis_harness::{
    Child, ContainerId, InstanceId, ManualClock, MemoryHost, MemoryHostError, Namespace, Op,
    OpKind, Parent, Props, StepDeadline, TextId, run_pending,
};

type El = Element<MemoryHost>;

fn el(ty: &'static str) -> El {
    Element::host(ty, Props::new())
}

fn el_with(ty: &'static str, name: &str, value: &str) -> El {
    Element::host(ty, Props::new().with(name, value))
}

fn setup_with(config: ReconcilerConfig) -> (Reconciler<MemoryHost>, ContainerId, RootId) {
    let mut host = MemoryHost::new();
    let container = host.add_container();
    let mut r = Reconciler::new(host, config);
    let root = r.create_container(container).unwrap();
    (r, container, root)
}

fn setup() -> (Reconciler<MemoryHost>, ContainerId, RootId) {
    setup_with(ReconcilerConfig::interactive())
}

fn render(r: &mut Reconciler<MemoryHost>, element: El, root: RootId) {
    r.update_container(Some(element), root, None, None).unwrap();
}

fn commits(r: &Reconciler<MemoryHost>) -> usize {
    r.host().count(OpKind::PrepareForCommit)
}

#[test]
fn mount_creates_bottom_up_and_attaches_once() {
    let (mut r, c, root) = setup();
    render(
        &mut r,
        el_with("div", "id", "app").with_children([el("span").with_children([El::text("hello")])]),
        root,
    );

    assert_eq!(
        r.host().ops(),
        [
            Op::CreateText {
                id: TextId(0),
                text: "hello".into(),
            },
            Op::CreateInstance {
                id: InstanceId(0),
                ty: "span",
            },
            Op::AppendInitial {
                parent: InstanceId(0),
                child: Child::Text(TextId(0)),
            },
            Op::Finalize {
                id: InstanceId(0),
                needs_mount: false,
            },
            Op::CreateInstance {
                id: InstanceId(1),
                ty: "div",
            },
            Op::AppendInitial {
                parent: InstanceId(1),
                child: Child::Instance(InstanceId(0)),
            },
            Op::Finalize {
                id: InstanceId(1),
                needs_mount: false,
            },
            Op::PrepareForCommit,
            Op::Append {
                parent: Parent::Container(c),
                child: Child::Instance(InstanceId(1)),
            },
            Op::ResetAfterCommit,
        ]
    );
    assert_eq!(r.host().render(c), r#"<div id="app"><span>hello</span></div>"#);
    assert_eq!(
        r.get_public_root_instance(root),
        Some(HostHandle::Instance(InstanceId(1)))
    );
}

#[test]
fn unmount_detaches_the_top_instance_only() {
    let (mut r, c, root) = setup();
    render(
        &mut r,
        el("ul").with_children([el("li"), el("li"), El::text("tail")]),
        root,
    );
    let top = InstanceId(2);
    let nodes_before = r.live_nodes();
    r.host_mut().take_ops();

    r.unmount_container(root, None).unwrap();

    assert_eq!(
        r.host().ops(),
        [
            Op::PrepareForCommit,
            Op::Remove {
                parent: Parent::Container(c),
                child: Child::Instance(top),
            },
            Op::ResetAfterCommit,
        ]
    );
    assert_eq!(r.host().count(OpKind::CreateInstance), 0);
    assert_eq!(r.host().render(c), "");
    assert_eq!(r.get_public_root_instance(root), None);
    assert!(r.live_nodes() < nodes_before, "deleted subtree was released");
}

#[test]
fn unmounting_an_empty_root_is_idempotent() {
    let (mut r, _, root) = setup();
    r.unmount_container(root, None).unwrap();
    r.unmount_container(root, None).unwrap();
    assert_eq!(
        r.host().ops(),
        [
            Op::PrepareForCommit,
            Op::ResetAfterCommit,
            Op::PrepareForCommit,
            Op::ResetAfterCommit,
        ]
    );
    assert_eq!(r.host().mutations().count(), 0);
}

#[test]
fn batched_replacement_commits_only_the_final_tree() {
    let (mut r, c, root) = setup();
    render(&mut r, el("div"), root);
    r.host_mut().take_ops();

    r.batched_updates(|r| {
        r.update_container(Some(el("span")), root, None, None)
            .unwrap();
        r.update_container(Some(el("p")), root, None, None).unwrap();
        assert!(r.host().ops().is_empty(), "nothing happens inside the batch");
    })
    .unwrap();

    assert_eq!(commits(&r), 1);
    assert!(
        !r.host()
            .ops()
            .iter()
            .any(|op| matches!(op, Op::CreateInstance { ty: "span", .. })),
        "intermediate tree never rendered"
    );
    let mutations: Vec<_> = r.host().mutations().cloned().collect();
    assert_eq!(
        mutations,
        [
            Op::Remove {
                parent: Parent::Container(c),
                child: Child::Instance(InstanceId(0)),
            },
            Op::Append {
                parent: Parent::Container(c),
                child: Child::Instance(InstanceId(1)),
            },
        ]
    );
    assert_eq!(r.host().render(c), "<p></p>");
}

#[test]
fn keyed_reorder_moves_without_recreating() {
    let (mut r, c, root) = setup();
    let list = |keys: [&str; 3]| {
        el("ul").with_children(keys.map(|k| el_with("li", "id", k).with_key(k)))
    };
    render(&mut r, list(["a", "b", "c"]), root);
    r.host_mut().take_ops();

    render(&mut r, list(["c", "a", "b"]), root);

    assert_eq!(r.host().count(OpKind::CreateInstance), 0);
    let ul = Parent::Instance(InstanceId(3));
    let mutations: Vec<_> = r.host().mutations().cloned().collect();
    assert_eq!(
        mutations,
        [
            Op::Append {
                parent: ul,
                child: Child::Instance(InstanceId(0)),
            },
            Op::Append {
                parent: ul,
                child: Child::Instance(InstanceId(1)),
            },
        ]
    );
    assert_eq!(
        r.host().render(c),
        r#"<ul><li id="c"></li><li id="a"></li><li id="b"></li></ul>"#
    );
}

#[test]
fn keyed_move_before_a_stable_sibling_uses_insert_before() {
    let (mut r, c, root) = setup();
    let list = |keys: [&str; 3]| {
        el("ol").with_children(keys.map(|k| el_with("li", "id", k).with_key(k)))
    };
    render(&mut r, list(["a", "b", "c"]), root);
    r.host_mut().take_ops();

    render(&mut r, list(["b", "a", "c"]), root);

    assert_eq!(r.host().count(OpKind::CreateInstance), 0);
    let mutations: Vec<_> = r.host().mutations().cloned().collect();
    assert_eq!(
        mutations,
        [Op::Insert {
            parent: Parent::Instance(InstanceId(3)),
            child: Child::Instance(InstanceId(0)),
            before: Child::Instance(InstanceId(2)),
        }]
    );
    assert_eq!(
        r.host().render(c),
        r#"<ol><li id="b"></li><li id="a"></li><li id="c"></li></ol>"#
    );
}

#[test]
fn insertion_in_the_middle_uses_insert_before() {
    let (mut r, c, root) = setup();
    render(
        &mut r,
        el("ul").with_children([el("li").with_key("a"), el("li").with_key("c")]),
        root,
    );
    r.host_mut().take_ops();

    render(
        &mut r,
        el("ul").with_children([
            el("li").with_key("a"),
            el_with("li", "new", "1").with_key("b"),
            el("li").with_key("c"),
        ]),
        root,
    );

    let mutations: Vec<_> = r.host().mutations().cloned().collect();
    assert_eq!(
        mutations,
        [Op::Insert {
            parent: Parent::Instance(InstanceId(2)),
            child: Child::Instance(InstanceId(3)),
            before: Child::Instance(InstanceId(1)),
        }]
    );
    assert_eq!(
        r.host().render(c),
        r#"<ul><li></li><li new="1"></li><li></li></ul>"#
    );
}

#[test]
fn committed_tree_carries_no_pending_effects() {
    fn assert_clean(node: NodeRef<'_, MemoryHost>) {
        assert!(
            node.effect().is_empty(),
            "{:?} still tagged {:?}",
            node.id(),
            node.effect()
        );
        let mut child = node.first_child();
        while let Some(c) = child {
            assert_clean(c);
            child = c.next_sibling();
        }
    }

    let (mut r, _, root) = setup();
    render(
        &mut r,
        el("div").with_children([el("a").with_key("x"), El::text("t"), el("b").with_key("y")]),
        root,
    );
    render(
        &mut r,
        el("div").with_children([el("b").with_key("y"), El::text("u"), el("i")]),
        root,
    );
    assert_clean(r.root_node(root).unwrap());
}

#[test]
fn find_host_instance_follows_the_committed_buffer() {
    let (mut r, _, root) = setup();
    let tree = |label: &str| {
        el("div").with_children([
            el_with("span", "label", label).with_key("s"),
            el("em").with_key("gone"),
        ])
    };
    render(&mut r, tree("1"), root);
    let span = InstanceId(0);
    let node = r.host().instance(span).unwrap().node;

    // Alternate buffers flip on every commit; the handle keeps resolving.
    for label in ["2", "3", "4"] {
        render(&mut r, tree(label), root);
        assert_eq!(r.find_host_instance(node), Some(HostHandle::Instance(span)));
    }

    let em_node = r.host().instance(InstanceId(1)).unwrap().node;
    render(
        &mut r,
        el("div").with_children([el("span").with_key("s")]),
        root,
    );
    assert_eq!(r.find_host_instance(em_node), None);
}

#[test]
fn sync_update_preempts_parked_deferred_work() {
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    let (mut r, c, root) = setup();
    r.set_trace_sink(recorder.clone());

    r.deferred_updates(|r| {
        r.update_container(
            Some(el("ul").with_children([el("li"), el("li"), el("li")])),
            root,
            None,
            None,
        )
    })
    .unwrap();
    assert_eq!(r.pending_priority(root), PriorityLevel::Low);
    assert!(r.host_mut().take_deferred_request(), "deferred callback requested");

    // Root and `ul` begin, then the first `li` completes.
    r.perform_deferred_work(&StepDeadline::new(3)).unwrap();
    assert_eq!(r.host().ops().len(), 2, "one li created and finalized");
    assert_eq!(commits(&r), 0);

    render(&mut r, el("p").with_children([El::text("now")]), root);
    assert_eq!(commits(&r), 1);
    assert_eq!(r.host().render(c), "<p>now</p>");
    assert_eq!(
        r.host().parent_of(Child::Instance(InstanceId(0))),
        None,
        "discarded work never attached"
    );

    // The superseded low update still drains, without changing anything.
    let fired = run_pending(&mut r, 10, || Unbounded).unwrap();
    assert_eq!(fired, 1);
    assert_eq!(commits(&r), 2);
    assert_eq!(r.host().render(c), "<p>now</p>");
    assert_eq!(r.pending_priority(root), PriorityLevel::NoWork);

    let recorded = recorder.borrow();
    let interrupt = decode(recorded.as_bytes()).find_map(|e| match e {
        RecordedEvent::Interrupt(i) => Some(i),
        _ => None,
    });
    let interrupt = interrupt.expect("parked work was interrupted");
    assert_eq!(interrupt.interrupted, PriorityLevel::Low);
    assert_eq!(interrupt.by, PriorityLevel::Synchronous);
    assert!(interrupt.discarded_nodes > 0, "work nodes released");
}

#[test]
fn deferred_work_spreads_over_clock_driven_slices() {
    let clock = ManualClock::new();
    let mut host = MemoryHost::with_clock(clock.clone(), Duration(10));
    let c = host.add_container();
    let config = ReconcilerConfig {
        yield_threshold: Duration(1),
        ..ReconcilerConfig::interactive()
    };
    let mut r = Reconciler::new(host, config);
    let root = r.create_container(c).unwrap();

    r.deferred_updates(|r| {
        r.update_container(
            Some(el("ul").with_children((0..20).map(|_| el("li")))),
            root,
            None,
            None,
        )
    })
    .unwrap();

    let fired = run_pending(&mut r, 100, || clock.deadline(Duration(50))).unwrap();
    assert!(fired > 1, "work was sliced, fired {fired}");
    assert!(fired < 100, "work finished");
    assert_eq!(commits(&r), 1);
    assert_eq!(r.host().render(c).matches("<li>").count(), 20);
}

#[test]
fn animation_work_waits_for_the_host() {
    let (mut r, c, root) = setup();
    r.perform_with_priority(PriorityLevel::Animation, |r| {
        r.update_container(Some(el("canvas")), root, None, None)
    })
    .unwrap();
    assert_eq!(r.host().render(c), "");
    assert!(r.host().has_pending_requests(), "animation callback requested");

    assert_eq!(run_pending(&mut r, 10, || Unbounded).unwrap(), 1);
    assert_eq!(r.host().render(c), "<canvas></canvas>");
}

#[test]
fn context_is_set_once_then_pending_until_commit() {
    let mut host = MemoryHost::new();
    let c = host.add_container();
    let mut r = Reconciler::new(host, ReconcilerConfig::interactive()).with_context_resolver(
        |parent: Option<NodeRef<'_, MemoryHost>>| {
            ContextValue::new(parent.map_or(u32::MAX, |n| n.id().index()))
        },
    );
    let root = r.create_container(c).unwrap();

    render(&mut r, el("div").with_children([el("span")]), root);
    assert_eq!(
        r.root_context(root).and_then(ContextValue::get::<u32>),
        Some(&u32::MAX)
    );
    assert!(r.root_pending_context(root).is_none(), "first context is set directly");

    let parent = r.host().instance(InstanceId(0)).unwrap().node;
    r.batched_updates(|r| {
        r.update_container(Some(el("div")), root, Some(parent), None)
            .unwrap();
        assert_eq!(
            r.root_pending_context(root).and_then(ContextValue::get::<u32>),
            Some(&parent.index())
        );
        assert_eq!(
            r.root_context(root).and_then(ContextValue::get::<u32>),
            Some(&u32::MAX),
            "current context unchanged before commit"
        );
    })
    .unwrap();

    assert_eq!(
        r.root_context(root).and_then(ContextValue::get::<u32>),
        Some(&parent.index())
    );
    assert!(r.root_pending_context(root).is_none(), "pending context promoted");
}

#[test]
fn mount_hook_runs_after_the_commit_ends() {
    let (mut r, _, root) = setup();
    render(
        &mut r,
        el("form").with_children([el_with("input", "autofocus", "")]),
        root,
    );
    let tail = &r.host().ops()[r.host().ops().len() - 3..];
    assert_eq!(
        tail,
        [
            Op::Append {
                parent: Parent::Container(ContainerId(0)),
                child: Child::Instance(InstanceId(1)),
            },
            Op::ResetAfterCommit,
            Op::Mount { id: InstanceId(0) },
        ]
    );
}

#[test]
fn callbacks_see_the_new_tree_and_may_schedule_more() {
    let (mut r, c, root) = setup();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let callback: Callback<MemoryHost> = Box::new(move |r: &mut Reconciler<MemoryHost>| {
        log.borrow_mut().push(r.host().render(c));
        r.update_container(Some(el("b")), root, None, None).unwrap();
    });

    r.update_container(Some(el("a")), root, None, Some(callback))
        .unwrap();

    assert_eq!(*seen.borrow(), ["<a></a>"]);
    assert_eq!(r.host().render(c), "<b></b>");
    assert_eq!(commits(&r), 2);
}

#[test]
fn host_errors_surface_and_keep_the_previous_tree() {
    let (mut r, c, root) = setup();
    render(&mut r, el_with("div", "v", "1"), root);

    r.host_mut().fail_next(OpKind::Update);
    let err = r
        .update_container(Some(el_with("div", "v", "2")), root, None, None)
        .unwrap_err();
    assert!(
        matches!(
            err,
            ReconcileError::Host(MemoryHostError::Injected(OpKind::Update))
        ),
        "got {err:?}"
    );
    assert_eq!(r.host().ops().last(), Some(&Op::ResetAfterCommit));
    assert_eq!(r.host().render(c), r#"<div v="1"></div>"#);
    let committed = r.root_node(root).unwrap().first_child().unwrap();
    assert_eq!(committed.props().and_then(|p| p.get("v")), Some("1"));

    render(&mut r, el_with("div", "v", "3"), root);
    assert_eq!(r.host().render(c), r#"<div v="3"></div>"#);
}

#[test]
fn render_errors_leave_nothing_behind() {
    let (mut r, c, root) = setup();
    let baseline = r.live_nodes();
    r.host_mut().fail_next(OpKind::CreateInstance);
    let err = r
        .update_container(Some(el("div").with_children([el("span")])), root, None, None)
        .unwrap_err();
    assert!(
        matches!(
            err,
            ReconcileError::Host(MemoryHostError::Injected(OpKind::CreateInstance))
        ),
        "got {err:?}"
    );
    assert_eq!(r.live_nodes(), baseline);
    assert_eq!(commits(&r), 0);
    assert_eq!(r.host().render(c), "");
}

#[test]
fn invalid_container_allocates_no_root() {
    let (mut r, _, _) = setup();
    let baseline = r.live_nodes();
    let err = r.create_container(ContainerId(99)).unwrap_err();
    assert!(
        matches!(
            err,
            ReconcileError::InvalidContainer(MemoryHostError::UnknownContainer(ContainerId(99)))
        ),
        "got {err:?}"
    );
    assert_eq!(r.live_nodes(), baseline);
}

#[test]
fn runaway_callbacks_trip_the_nested_update_limit() {
    fn again(root: RootId) -> Callback<MemoryHost> {
        Box::new(move |r: &mut Reconciler<MemoryHost>| {
            let _ = r.update_container(Some(el("x")), root, None, Some(again(root)));
        })
    }

    let (mut r, _, root) = setup_with(ReconcilerConfig {
        nested_update_limit: 3,
        ..ReconcilerConfig::interactive()
    });
    let err = r
        .update_container(Some(el("x")), root, None, Some(again(root)))
        .unwrap_err();
    assert!(
        matches!(err, ReconcileError::NestedUpdateLimit { limit: 3 }),
        "got {err:?}"
    );
    assert_eq!(commits(&r), 4);
}

#[test]
fn svg_namespace_flows_through_the_tree() {
    let (mut r, _, root) = setup();
    render(
        &mut r,
        el("div").with_children([el("svg").with_children([el("circle")])]),
        root,
    );
    let ns = |i| r.host().instance(InstanceId(i)).unwrap().namespace;
    // circle, svg, div in completion order.
    assert_eq!(ns(0), Namespace::Svg);
    assert_eq!(ns(1), Namespace::Svg);
    assert_eq!(ns(2), Namespace::Html);
}

#[test]
fn public_root_instance_descends_through_fragments() {
    let (mut r, _, root) = setup();
    render(
        &mut r,
        El::fragment([El::fragment([]), el("header"), el("main")]),
        root,
    );
    assert_eq!(
        r.get_public_root_instance(root),
        Some(HostHandle::Instance(InstanceId(0)))
    );
}
