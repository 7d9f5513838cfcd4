use std::rc::Rc;

use graph_sync::api::{AttributeOverrideBinding, Binding, EngineHost, HostProps, RuleBinding, RuleProps};
use graph_sync::callback;
use graph_sync::core::{Attributes, Element, GraphPayload, RawEdge, RawNode, Size};
use graph_sync::engine::{
    AttributeFn, AttributeSpec, Container, HeadlessEngine, OverrideKind, RuleTarget, Selector,
};
use graph_sync::BindingError;
use proptest::prelude::*;
use serde_json::json;

fn host() -> (EngineHost<HeadlessEngine>, Rc<HeadlessEngine>) {
    let graph = GraphPayload::new(
        vec![
            RawNode::new(0).with_data(json!({ "kind": "person" })),
            RawNode::new(1).with_data(json!({ "kind": "company" })),
        ],
        vec![RawEdge::new(0, 0, 1)],
    );
    let mut host = EngineHost::new(HostProps::new(graph));
    host.mount(Some(&Container::new("rules", Size::new(400.0, 300.0))))
        .expect("mount");
    let engine = host.engine().expect("engine");
    (host, engine)
}

fn is_company() -> Selector {
    callback!(|element: &Element<'_>| element.data_field("kind") == Some(&json!("company")))
}

fn color(value: &str) -> Attributes {
    Attributes::new().with("color", value)
}

#[test]
fn rule_attributes_reach_selected_elements() {
    let (host, engine) = host();
    let mut rule = RuleBinding::nodes(host.scope());
    rule.apply(RuleProps::new(color("red")).with_selector(is_company()))
        .expect("apply");

    let company = engine.node_attributes(&1.into()).expect("node 1");
    let person = engine.node_attributes(&0.into()).expect("node 0");
    assert_eq!(company.get("color"), Some(&json!("red")));
    assert_eq!(person.get("color"), None);
    assert_eq!(engine.rule_ids(), vec![rule.handle().expect("handle")]);
}

#[test]
fn computed_attributes_compare_by_reference() {
    let (host, engine) = host();
    let compute: AttributeFn = callback!(|element: &Element<'_>| {
        Attributes::new().with("label", element.id.to_string())
    });
    let mut rule = RuleBinding::edges(host.scope());
    rule.apply(RuleProps::new(compute.clone())).expect("apply");
    let first = rule.handle();
    rule.apply(RuleProps::new(compute)).expect("same function");
    assert_eq!(rule.handle(), first);
    assert_eq!(
        engine.edge_attributes(&0.into()).expect("edge").get("label"),
        Some(&json!("0"))
    );

    let other: AttributeFn = callback!(|_: &Element<'_>| Attributes::new());
    rule.apply(RuleProps::new(other)).expect("new function");
    assert_ne!(rule.handle(), first);
    assert_eq!(engine.stats().rules_added, 2);
    assert_eq!(engine.stats().rules_destroyed, 1);
}

#[test]
fn new_selector_recreates_the_rule() {
    let (host, engine) = host();
    let mut rule = RuleBinding::nodes(host.scope());
    rule.apply(RuleProps::new(color("red")).with_selector(is_company()))
        .expect("apply");
    let first = rule.handle().expect("first");

    // Same body, new allocation: a different selector.
    rule.apply(RuleProps::new(color("red")).with_selector(is_company()))
        .expect("reapply");
    let second = rule.handle().expect("second");
    assert_ne!(first, second);
    assert_eq!(engine.rule_ids(), vec![second]);
}

#[test]
fn teardown_removes_the_rule_once() {
    let (host, engine) = host();
    let mut rule = RuleBinding::nodes(host.scope());
    rule.apply(RuleProps::new(color("blue"))).expect("apply");
    rule.teardown();
    rule.teardown();
    drop(rule);
    assert!(engine.rule_ids().is_empty());
    assert_eq!(engine.stats().rules_destroyed, 1);
}

#[test]
fn destroyed_rule_refuses_updates() {
    let (host, _engine) = host();
    let mut rule = RuleBinding::nodes(host.scope());
    rule.apply(RuleProps::new(color("blue"))).expect("apply");
    rule.teardown();
    assert!(matches!(
        rule.apply(RuleProps::new(color("green"))),
        Err(BindingError::HandleDestroyed { binding: "rule" })
    ));
}

#[test]
fn overrides_are_set_and_cleared() {
    let (host, engine) = host();
    let mut hovered = AttributeOverrideBinding::hovered_nodes(host.scope());
    let mut selected = AttributeOverrideBinding::selected_edges(host.scope());

    hovered.apply(AttributeSpec::Static(color("yellow"))).expect("hovered");
    hovered.apply(AttributeSpec::Static(color("yellow"))).expect("unchanged");
    selected.apply(AttributeSpec::Static(color("black"))).expect("selected");
    assert_eq!(engine.stats().override_calls, 2);
    assert_eq!(
        engine.attribute_override(RuleTarget::Nodes, OverrideKind::Hovered),
        Some(AttributeSpec::Static(color("yellow")))
    );

    hovered.teardown();
    assert_eq!(engine.attribute_override(RuleTarget::Nodes, OverrideKind::Hovered), None);
    assert!(engine
        .attribute_override(RuleTarget::Edges, OverrideKind::Selected)
        .is_some());
}

proptest! {
    #[test]
    fn unchanged_props_keep_the_same_rule(colors in proptest::collection::vec(0_u8..3, 1..12)) {
        let (host, engine) = host();
        let selector = is_company();
        let mut rule = RuleBinding::nodes(host.scope());
        let mut previous: Option<u8> = None;
        let mut expected_adds = 0;
        for value in colors {
            let before = rule.handle();
            rule.apply(RuleProps::new(color(&value.to_string())).with_selector(selector.clone()))
                .expect("apply");
            if previous == Some(value) {
                prop_assert_eq!(rule.handle(), before);
            } else {
                expected_adds += 1;
            }
            previous = Some(value);
        }
        prop_assert_eq!(engine.stats().rules_added, expected_adds);
        prop_assert_eq!(engine.rule_ids().len(), 1);
    }
}
