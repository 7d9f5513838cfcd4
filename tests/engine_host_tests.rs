use std::cell::{Cell, RefCell};
use std::rc::Rc;

use graph_sync::api::{
    AlwaysChanged, Binding, ContentRef, EngineHost, EventHandlerMap, HostProps, Lifecycle,
    RuleBinding, RuleProps,
};
use graph_sync::callback;
use graph_sync::core::{Attributes, GraphPayload, RawEdge, RawNode, Size};
use graph_sync::engine::{
    Container, Engine, EngineEvent, EngineOptions, EventHandler, EventKind, HeadlessEngine,
    PointerEvent, Theme,
};
use graph_sync::{BindingError, EngineRejection};

fn graph() -> GraphPayload {
    GraphPayload::new(
        vec![RawNode::new(0).at(0.0, 0.0), RawNode::new(1).at(10.0, 0.0)],
        vec![RawEdge::new(0, 0, 1)],
    )
}

fn container() -> Container {
    Container::new("graph", Size::new(800.0, 600.0))
}

fn mounted(props: HostProps<HeadlessEngine>) -> (EngineHost<HeadlessEngine>, Rc<HeadlessEngine>) {
    let mut host = EngineHost::new(props);
    assert!(host.mount(Some(&container())).expect("mount"));
    let engine = host.engine().expect("engine");
    (host, engine)
}

#[test]
fn mount_waits_for_the_container_and_runs_once() {
    let mut host = EngineHost::<HeadlessEngine>::new(HostProps::new(graph()));
    assert!(!host.mount(None).expect("no container yet"));
    assert!(matches!(host.engine(), Err(BindingError::ContextUnavailable)));
    assert_eq!(host.lifecycle(), Lifecycle::Uninitialized);

    let container = container();
    assert!(host.mount(Some(&container)).expect("mount"));
    let engine = host.engine().expect("engine");
    assert!(!host.mount(Some(&container)).expect("second mount is a no-op"));
    assert!(Rc::ptr_eq(&engine, &host.engine().expect("same engine")));
    assert_eq!(engine.node_count(), 2);
    assert_eq!(engine.stats().resize_calls, 1);
    assert!(host.lifecycle().is_ready());
}

#[test]
fn ready_callback_receives_the_engine_after_publication() {
    let seen = Rc::new(Cell::new(0_usize));
    let seen_in_callback = Rc::clone(&seen);
    let props = HostProps::new(graph()).with_on_ready(callback!(move |engine: &Rc<HeadlessEngine>| {
        seen_in_callback.set(engine.node_count());
    }));
    let (_host, _engine) = mounted(props);
    assert_eq!(seen.get(), 2);
}

#[test]
fn construction_refusal_propagates() {
    let options = EngineOptions {
        min_zoom: Some(4.0),
        max_zoom: Some(1.0),
        ..EngineOptions::default()
    };
    let mut host = EngineHost::<HeadlessEngine>::new(HostProps::new(graph()).with_options(options));
    let err = host.mount(Some(&container())).expect_err("rejected");
    assert!(matches!(
        err,
        BindingError::EngineRejected(EngineRejection::Construction(_))
    ));
    assert!(!err.is_usage_error());
    assert!(host.engine().is_err());
}

#[test]
fn unchanged_props_skip_all_engine_calls() {
    let handler: EventHandler = callback!(|_: &EngineEvent| {});
    let props = HostProps::new(graph())
        .with_theme(Theme::default())
        .with_handlers(EventHandlerMap::new().with(EventKind::Click, handler));
    let (mut host, engine) = mounted(props.clone());
    let before = engine.stats();

    let update = host.update(props).expect("update");
    assert!(!update.rerendered);
    assert_eq!(engine.stats(), before);
}

#[test]
fn graph_options_and_theme_sync_independently() {
    let (mut host, engine) = mounted(HostProps::new(graph()));

    let mut next = host.props().clone();
    next.options = EngineOptions::default().with_extra("renderer", "svg");
    let update = host.update(next.clone()).expect("options");
    assert!(update.options_patched);
    assert!(!update.graph_replaced);
    assert_eq!(engine.stats().set_graph_calls, 0);
    assert_eq!(engine.options().extra.get("renderer"), Some(&serde_json::Value::from("svg")));

    // A structurally equal graph built from scratch is not a change.
    next.graph = graph();
    next.theme = Some(Theme {
        node_attributes: Attributes::new().with("color", "red"),
        ..Theme::default()
    });
    let update = host.update(next.clone()).expect("theme");
    assert!(update.theme_applied);
    assert!(!update.graph_replaced);
    assert_eq!(engine.stats().set_graph_calls, 0);

    next.graph.nodes.push(RawNode::new(2));
    let update = host.update(next).expect("graph");
    assert!(update.graph_replaced);
    assert_eq!(engine.stats().set_graph_calls, 1);
    assert_eq!(engine.node_count(), 3);
}

#[test]
fn rejected_options_keep_the_previous_snapshot() {
    let (mut host, engine) = mounted(HostProps::new(graph()));
    let mut next = host.props().clone();
    next.options.min_zoom = Some(-1.0);
    next.options.max_zoom = Some(2.0);
    assert!(matches!(
        host.update(next.clone()),
        Err(BindingError::EngineRejected(EngineRejection::InvalidOptions(_)))
    ));
    assert_eq!(engine.options(), EngineOptions::default());

    next.options = EngineOptions::default();
    let update = host.update(next).expect("back to defaults");
    assert!(!update.options_patched);
}

#[test]
fn refused_options_do_not_hold_back_theme_and_handlers() {
    let (mut host, engine) = mounted(HostProps::new(graph()));
    let dark = Theme {
        node_attributes: Attributes::new().with("color", "black"),
        ..Theme::default()
    };
    let on_click: EventHandler = callback!(|_: &EngineEvent| {});
    let mut next = host.props().clone().with_theme(dark.clone());
    next.handlers = EventHandlerMap::new().with(EventKind::Click, on_click);
    next.options.min_zoom = Some(-1.0);
    next.options.max_zoom = Some(2.0);

    assert!(host.update(next.clone()).is_err());
    assert_eq!(engine.theme(), Some(dark.clone()));
    assert_eq!(engine.listener_count(EventKind::Click), 1);

    // The same render again retries the refused options only.
    let theme_calls = engine.stats().set_theme_calls;
    assert!(host.update(next.clone()).is_err());
    assert_eq!(engine.stats().set_theme_calls, theme_calls);
    assert_eq!(engine.listener_count(EventKind::Click), 1);

    next.options = EngineOptions::default();
    let update = host.update(next).expect("valid options");
    assert!(update.rerendered);
    assert!(!update.options_patched);
    assert_eq!(host.props().theme, Some(dark));
}

#[test]
fn removing_the_theme_restores_the_default_look() {
    let dark = Theme {
        node_attributes: Attributes::new().with("color", "black"),
        ..Theme::default()
    };
    let (mut host, engine) = mounted(HostProps::new(graph()).with_theme(dark));
    let mut next = host.props().clone();
    next.theme = None;

    let update = host.update(next.clone()).expect("theme removed");
    assert!(update.theme_applied);
    assert_eq!(engine.theme(), Some(Theme::default()));

    let update = host.update(next).expect("unchanged");
    assert!(!update.rerendered);
}

#[test]
fn handlers_follow_prop_changes() {
    let clicks = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&clicks);
    let on_click: EventHandler = callback!(move |event: &EngineEvent| {
        if let Some(pointer) = event.pointer() {
            sink.borrow_mut().push(pointer.point);
        }
    });
    let on_zoom: EventHandler = callback!(|_: &EngineEvent| {});

    let props = HostProps::new(graph())
        .with_handlers(EventHandlerMap::new().with(EventKind::Click, on_click.clone()));
    let (mut host, engine) = mounted(props);
    engine.emit(EngineEvent::Click(PointerEvent::at(1.0, 2.0)));
    assert_eq!(clicks.borrow().len(), 1);

    let mut next = host.props().clone();
    next.handlers = EventHandlerMap::new()
        .with(EventKind::Click, on_click)
        .with(EventKind::Zoom, on_zoom);
    let update = host.update(next.clone()).expect("add zoom");
    assert_eq!(update.events.subscribed, 1);
    assert_eq!(update.events.unchanged, 1);
    assert_eq!(engine.listener_count(EventKind::Click), 1);

    next.handlers.remove(EventKind::Click);
    let update = host.update(next).expect("drop click");
    assert_eq!(update.events.unsubscribed, 1);
    engine.emit(EngineEvent::Click(PointerEvent::at(3.0, 4.0)));
    assert_eq!(clicks.borrow().len(), 1);
}

#[test]
fn teardown_unsubscribes_and_revokes_the_scope() {
    let handler: EventHandler = callback!(|_: &EngineEvent| {});
    let props = HostProps::new(graph()).with_handlers(
        EventHandlerMap::new()
            .with(EventKind::Click, handler.clone())
            .with(EventKind::MouseMove, handler),
    );
    let (mut host, engine) = mounted(props);
    let scope = host.scope();
    assert_eq!(engine.total_listener_count(), 2);

    host.teardown();
    host.teardown();
    assert_eq!(engine.total_listener_count(), 0);
    assert!(!scope.is_available());
    assert!(matches!(scope.engine(), Err(BindingError::ContextUnavailable)));
    assert!(matches!(
        host.mount(Some(&container())),
        Err(BindingError::HandleDestroyed { .. })
    ));
}

#[test]
fn bindings_outside_a_mounted_host_fail_loudly() {
    let host = EngineHost::<HeadlessEngine>::new(HostProps::new(graph()));
    let mut rule = RuleBinding::nodes(host.scope());
    let err = rule
        .apply(RuleProps::new(Attributes::new().with("color", "blue")))
        .expect_err("no engine yet");
    assert!(matches!(err, BindingError::ContextUnavailable));
    assert!(err.is_usage_error());
}

#[test]
fn container_resize_reaches_the_viewport() {
    let (host, engine) = mounted(HostProps::new(graph()));
    host.container()
        .expect("container")
        .set_size(Size::new(1024.0, 768.0));
    host.on_container_resize().expect("resize");
    assert_eq!(engine.viewport_size(), Size::new(1024.0, 768.0));
    assert_eq!(engine.stats().resize_calls, 2);
}

#[test]
fn children_comparison_is_pluggable() {
    let children: ContentRef = Rc::new(String::from("<legend/>"));
    let props = HostProps::new(graph()).with_children(Rc::clone(&children));
    let mut default_host = EngineHost::<HeadlessEngine>::new(props.clone());
    let same_markup: ContentRef = Rc::new(String::from("<legend/>"));
    let rerender = HostProps::new(graph()).with_children(same_markup);
    assert!(default_host.props_unchanged(&rerender));
    assert!(!default_host.update(rerender.clone()).expect("update").rerendered);

    let strict = EngineHost::<HeadlessEngine>::new(props).with_comparator(AlwaysChanged);
    assert!(!strict.props_unchanged(&rerender));
}
