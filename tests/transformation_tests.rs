use std::cell::RefCell;
use std::rc::Rc;

use graph_sync::api::{
    Binding, DrilldownBinding, EngineHost, HostProps, TransformationBinding, TransformationProps,
    live_patch,
};
use graph_sync::callback;
use graph_sync::core::{Element, ElementId, GraphPayload, RawEdge, RawNode, Size, Target};
use graph_sync::engine::{
    Container, Engine, GroupIdFn, HeadlessEngine, Selector, TransformationCallback,
    TransformationCallbacks, TransformationId, TransformationOptions,
};
use graph_sync::{BindingError, EngineRejection};
use proptest::prelude::*;

fn chain() -> GraphPayload {
    GraphPayload::new(
        vec![
            RawNode::new(0).at(0.0, 0.0),
            RawNode::new(1).at(10.0, 0.0),
            RawNode::new(2).at(20.0, 0.0),
        ],
        vec![RawEdge::new(0, 0, 1), RawEdge::new(1, 1, 2)],
    )
}

fn host() -> (EngineHost<HeadlessEngine>, Rc<HeadlessEngine>) {
    let mut host = EngineHost::new(HostProps::new(chain()));
    host.mount(Some(&Container::new("transformations", Size::new(400.0, 300.0))))
        .expect("mount");
    let engine = host.engine().expect("engine");
    (host, engine)
}

fn id_is(expected: i64) -> Selector {
    callback!(move |element: &Element<'_>| element.id.as_int() == Some(expected))
}

fn id_above(threshold: i64) -> Selector {
    callback!(move |element: &Element<'_>| element.id.as_int().is_some_and(|id| id > threshold))
}

fn edge_filter(criteria: Selector) -> TransformationProps {
    TransformationProps::new(TransformationOptions {
        criteria: Some(criteria),
        ..TransformationOptions::default()
    })
}

#[test]
fn node_grouping_replaces_members_with_their_group() {
    let (host, engine) = host();
    let group_id: GroupIdFn = callback!(|_: &Element<'_>| Some("grouped".to_owned()));
    let mut grouping = TransformationBinding::node_grouping(host.scope());
    grouping
        .apply(TransformationProps::new(TransformationOptions {
            selector: Some(id_above(0)),
            group_id_function: Some(group_id),
            ..TransformationOptions::default()
        }))
        .expect("apply");
    engine.advance_frame();

    assert_eq!(engine.node_count(), 2);
    assert_eq!(
        engine.visible_node_ids(),
        vec![ElementId::Int(0), ElementId::from("grouped")]
    );
    assert_eq!(engine.edge_count(), 1);
}

#[test]
fn edge_filter_criteria_update_settles_on_the_next_frame() {
    let (host, engine) = host();
    let mut filter = TransformationBinding::edge_filter(host.scope());
    filter.apply(edge_filter(id_is(0))).expect("apply");
    engine.advance_frame();
    assert_eq!(engine.visible_edge_ids(), vec![ElementId::Int(0)]);
    let handle = filter.handle();

    filter.apply(edge_filter(id_is(1))).expect("update");
    assert_eq!(filter.handle(), handle);
    assert_eq!(engine.stats().transformations_added, 1);
    assert_eq!(engine.stats().transformation_updates, 1);
    engine.advance_frame();
    assert_eq!(engine.visible_edge_ids(), vec![ElementId::Int(1)]);
}

#[test]
fn filter_without_criteria_is_refused_by_the_engine() {
    let (host, engine) = host();
    let mut filter = TransformationBinding::node_filter(host.scope());
    let err = filter
        .apply(TransformationProps::default())
        .expect_err("criteria are required");
    assert!(matches!(
        err,
        BindingError::EngineRejected(EngineRejection::InvalidTransformation(_))
    ));
    assert!(filter.handle().is_none());
    assert!(engine.transformation_ids().is_empty());
}

#[test]
fn unchanged_props_do_not_touch_the_engine() {
    let (host, engine) = host();
    let criteria = id_is(0);
    let mut filter = TransformationBinding::edge_filter(host.scope());
    filter.apply(edge_filter(criteria.clone())).expect("apply");
    let before = engine.stats();
    filter.apply(edge_filter(criteria.clone())).expect("same");
    filter.apply(edge_filter(criteria)).expect("same again");
    assert_eq!(engine.stats(), before);
}

#[test]
fn construction_only_options_are_not_patched() {
    let previous = TransformationOptions::default();
    let next = TransformationOptions {
        show_contents: true,
        extra: serde_json::json!({ "layout": "circle" }),
        ..TransformationOptions::default()
    };
    assert!(live_patch(&previous, &next).is_empty());

    let next = TransformationOptions {
        padding: Some(4.0),
        ..TransformationOptions::default()
    };
    let patch = live_patch(&previous, &next);
    assert_eq!(patch.padding, Some(Some(4.0)));
    assert!(patch.selector.is_none());
}

#[test]
fn index_changes_move_the_transformation() {
    let (host, engine) = host();
    let mut first = TransformationBinding::node_collapsing(host.scope());
    let mut second = TransformationBinding::edge_filter(host.scope());
    first
        .apply(TransformationProps::new(TransformationOptions {
            selector: Some(id_is(2)),
            ..TransformationOptions::default()
        }))
        .expect("first");
    let criteria = id_is(0);
    second.apply(edge_filter(criteria.clone())).expect("second");
    let (first_id, second_id) = (first.handle().expect("first"), second.handle().expect("second"));
    assert_eq!(engine.transformation_ids(), vec![first_id, second_id]);

    second
        .apply(edge_filter(criteria).with_index(0))
        .expect("move");
    assert_eq!(engine.transformation_ids(), vec![second_id, first_id]);
}

#[test]
fn lifecycle_callbacks_are_forwarded() {
    let (host, _engine) = host();
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let recorder = |label: &'static str| -> TransformationCallback {
        let log = Rc::clone(&log);
        callback!(move |_: TransformationId| log.borrow_mut().push(label))
    };
    let callbacks = TransformationCallbacks {
        on_enabled: Some(recorder("enabled")),
        on_disabled: Some(recorder("disabled")),
        on_destroyed: Some(recorder("destroyed")),
        ..TransformationCallbacks::default()
    };
    let criteria = id_is(0);
    let mut filter = TransformationBinding::edge_filter(host.scope());
    filter
        .apply(edge_filter(criteria.clone()).with_callbacks(callbacks.clone()))
        .expect("apply");
    filter
        .apply(edge_filter(criteria).with_callbacks(callbacks).disabled(true))
        .expect("disable");
    filter.teardown();
    assert_eq!(*log.borrow(), vec!["enabled", "disabled", "destroyed"]);
}

#[test]
fn drilldown_recreates_when_toggled() {
    let (host, engine) = host();
    let mut drilldown = DrilldownBinding::new(host.scope());
    assert!(matches!(
        drilldown.drill(&Target::node(1)),
        Err(BindingError::NotReady { .. })
    ));

    drilldown.apply(TransformationProps::default()).expect("apply");
    let first = drilldown.handle().expect("first");
    drilldown.drill(&Target::node(1)).expect("drill");
    assert_eq!(
        engine.transformation(first).expect("snapshot").drilled,
        vec![Target::node(1)]
    );

    drilldown
        .apply(TransformationProps::default().disabled(true))
        .expect("disable");
    let second = drilldown.handle().expect("second");
    assert_ne!(first, second);
    assert!(engine.transformation(first).is_none());
    let snapshot = engine.transformation(second).expect("snapshot");
    assert!(!snapshot.enabled);
    assert!(snapshot.drilled.is_empty());

    drilldown.teardown();
    assert!(engine.transformation_ids().is_empty());
    assert!(matches!(
        drilldown.drill(&Target::node(1)),
        Err(BindingError::HandleDestroyed { .. })
    ));
}

#[test]
fn failed_recreation_keeps_tracking_the_old_transformation() {
    let (host, engine) = host();
    let mut drilldown = DrilldownBinding::new(host.scope());
    drilldown.apply(TransformationProps::default()).expect("apply");
    let first = drilldown.handle().expect("first");
    engine
        .destroy_transformation(first)
        .expect("removed behind the binding's back");

    assert!(matches!(
        drilldown.apply(TransformationProps::default().disabled(true)),
        Err(BindingError::EngineRejected(EngineRejection::UnknownHandle(_)))
    ));
    assert_eq!(drilldown.handle(), Some(first));
    assert_eq!(engine.stats().transformations_added, 1);
}

#[test]
fn teardown_after_engine_drop_is_silent() {
    let (mut host, engine) = host();
    let mut filter = TransformationBinding::edge_filter(host.scope());
    filter.apply(edge_filter(id_is(0))).expect("apply");
    host.teardown();
    drop(engine);
    filter.teardown();
    assert!(filter.lifecycle().is_destroyed());
    assert!(matches!(
        filter.apply(edge_filter(id_is(1))),
        Err(BindingError::HandleDestroyed { .. })
    ));
}

fn grouping_above_zero() -> TransformationProps {
    let group_id: GroupIdFn = callback!(|_: &Element<'_>| Some("grouped".to_owned()));
    TransformationProps::new(TransformationOptions {
        selector: Some(id_above(0)),
        group_id_function: Some(group_id),
        ..TransformationOptions::default()
    })
}

proptest! {
    #[test]
    fn engine_is_only_toggled_on_state_changes(
        grouping in any::<bool>(),
        states in proptest::collection::vec(any::<bool>(), 1..16),
    ) {
        let (host, engine) = host();
        let untransformed = (engine.node_count(), engine.edge_count());
        // Grouping folds nodes 1 and 2; the filter keeps edge 0 only.
        let (mut binding, props, transformed) = if grouping {
            (TransformationBinding::node_grouping(host.scope()), grouping_above_zero(), (2, 1))
        } else {
            (TransformationBinding::edge_filter(host.scope()), edge_filter(id_is(0)), (3, 1))
        };
        let mut current = None;
        let mut expected_toggles = 0;
        for disabled in states {
            binding
                .apply(props.clone().disabled(disabled))
                .expect("apply");
            if current.is_some_and(|previous| previous != disabled) {
                expected_toggles += 1;
            }
            current = Some(disabled);
            prop_assert_eq!(binding.is_enabled(), Some(!disabled));
            let visible = (engine.node_count(), engine.edge_count());
            prop_assert_eq!(visible, if disabled { untransformed } else { transformed });
        }
        prop_assert_eq!(engine.stats().transformation_toggles, expected_toggles);
        prop_assert_eq!(engine.stats().transformations_added, 1);
    }
}
