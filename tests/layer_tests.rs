use std::rc::Rc;

use graph_sync::api::{
    Binding, CanvasLayerBinding, CanvasLayerProps, ContentRef, EngineHost, HostProps, LayerBinding,
    LayerProps, OverlayBinding, OverlayPosition, OverlayProps, PositionFn,
};
use graph_sync::callback;
use graph_sync::core::{ElementId, GraphPayload, Point, RawEdge, RawNode, Rect, Size};
use graph_sync::engine::{
    Anchor, CanvasContext, CanvasLayerOptions, Container, DrawCall, Engine, HeadlessEngine,
    LayerRef, PaintCallback,
};

fn graph(node_one_x: f64) -> GraphPayload {
    GraphPayload::new(
        vec![RawNode::new(0).at(0.0, 0.0), RawNode::new(1).at(node_one_x, 0.0)],
        vec![RawEdge::new(0, 0, 1)],
    )
}

fn host() -> (EngineHost<HeadlessEngine>, Rc<HeadlessEngine>) {
    let mut host = EngineHost::new(HostProps::new(graph(10.0)));
    host.mount(Some(&Container::new("layers", Size::new(400.0, 300.0))))
        .expect("mount");
    let engine = host.engine().expect("engine");
    (host, engine)
}

fn markup(text: &str) -> ContentRef {
    Rc::new(text.to_owned())
}

fn red_square() -> PaintCallback {
    callback!(|canvas: &mut dyn CanvasContext| {
        canvas.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), "red");
    })
}

#[test]
fn layer_content_is_written_only_when_markup_changes() {
    let (host, engine) = host();
    let mut layer = LayerBinding::new(host.scope());
    layer
        .apply(LayerProps::new().with_class_name("legend").with_content(markup("<p>a</p>")))
        .expect("apply");
    let id = layer.handle().expect("layer");
    let snapshot = engine.layer(id).expect("snapshot");
    assert_eq!(snapshot.class_name.as_deref(), Some("legend"));
    assert_eq!(snapshot.content, "<p>a</p>");
    assert_eq!(snapshot.content_writes, 1);
    assert!(snapshot.visible);

    // Fresh content instance, same markup.
    layer
        .apply(LayerProps::new().with_class_name("legend").with_content(markup("<p>a</p>")))
        .expect("same markup");
    assert_eq!(engine.layer(id).expect("snapshot").content_writes, 1);

    layer
        .apply(LayerProps::new().with_content(markup("<p>b</p>")))
        .expect("new markup");
    let snapshot = engine.layer(id).expect("snapshot");
    assert_eq!(snapshot.class_name, None);
    assert_eq!(snapshot.content, "<p>b</p>");
    assert_eq!(snapshot.content_writes, 2);
}

#[test]
fn layers_move_within_the_stack() {
    let (host, engine) = host();
    let mut bottom = LayerBinding::new(host.scope());
    let mut top = LayerBinding::new(host.scope());
    bottom.apply(LayerProps::new()).expect("bottom");
    top.apply(LayerProps::new()).expect("top");
    let (bottom_id, top_id) = (bottom.handle().expect("bottom"), top.handle().expect("top"));
    assert_eq!(
        engine.layer_order(),
        vec![LayerRef::Layer(bottom_id), LayerRef::Layer(top_id)]
    );

    top.apply(LayerProps::new().with_index(0)).expect("move");
    assert_eq!(
        engine.layer_order(),
        vec![LayerRef::Layer(top_id), LayerRef::Layer(bottom_id)]
    );

    top.teardown();
    assert_eq!(engine.layer_order(), vec![LayerRef::Layer(bottom_id)]);
    assert!(engine.layer(top_id).is_none());
}

#[test]
fn canvas_layer_paints_every_frame() {
    let (host, engine) = host();
    let mut canvas = CanvasLayerBinding::new(host.scope());
    canvas.apply(CanvasLayerProps::new(red_square())).expect("apply");
    let id = canvas.handle().expect("canvas");

    engine.advance_frame();
    assert_eq!(engine.stats().paints, 1);
    assert_eq!(
        engine.canvas_draws(id),
        vec![
            DrawCall::Clear,
            DrawCall::FillRect {
                rect: Rect::new(0.0, 0.0, 4.0, 4.0),
                color: "red".to_owned(),
            },
        ]
    );
}

#[test]
fn canvas_options_are_fixed_at_creation() {
    let (host, engine) = host();
    let mut canvas = CanvasLayerBinding::new(host.scope());
    let options = CanvasLayerOptions {
        is_static: false,
        no_clear: true,
    };
    canvas
        .apply(CanvasLayerProps::new(red_square()).with_options(options))
        .expect("apply");
    let id = canvas.handle().expect("canvas");
    canvas
        .apply(CanvasLayerProps::new(red_square()).with_options(CanvasLayerOptions::default()))
        .expect("new paint and options");

    assert_eq!(canvas.handle(), Some(id));
    assert_eq!(engine.canvas_options(id), Some(options));
    engine.advance_frame();
    assert_eq!(engine.canvas_draws(id).len(), 1);
}

#[test]
fn hidden_canvas_layer_is_not_painted() {
    let (host, engine) = host();
    let paint = red_square();
    let mut canvas = CanvasLayerBinding::new(host.scope());
    canvas
        .apply(CanvasLayerProps::new(paint.clone()).visible(false))
        .expect("apply");
    let id = canvas.handle().expect("canvas");
    assert_eq!(engine.is_layer_visible(LayerRef::Canvas(id)), Some(false));
    engine.advance_frame();
    assert_eq!(engine.stats().paints, 0);

    canvas.apply(CanvasLayerProps::new(paint)).expect("show");
    assert_eq!(engine.is_layer_visible(LayerRef::Canvas(id)), Some(true));
    engine.advance_frame();
    assert_eq!(engine.stats().paints, 1);

    canvas.teardown();
    assert_eq!(engine.is_layer_visible(LayerRef::Canvas(id)), None);
}

#[test]
fn overlay_fields_update_independently() {
    let (host, engine) = host();
    let mut overlay = OverlayBinding::new(host.scope());
    overlay
        .apply(OverlayProps::new(Point::new(0.0, 0.0)).with_content(markup("<i>x</i>")))
        .expect("apply");
    let id = overlay.handle().expect("overlay");
    assert_eq!(
        engine.overlay_bounds(id),
        Some(Rect::new(200.0, 150.0, 120.0, 40.0))
    );

    overlay
        .apply(
            OverlayProps::new(Point::new(0.0, 0.0))
                .with_content(markup("<i>x</i>"))
                .with_size(Size::new(50.0, 20.0))
                .with_anchor(Anchor::new(-0.5, -0.5)),
        )
        .expect("resize");
    let snapshot = engine.overlay(id).expect("snapshot");
    assert_eq!(snapshot.content_writes, 1);
    assert_eq!(snapshot.options.size, Some(Size::new(50.0, 20.0)));
    assert_eq!(
        engine.overlay_bounds(id),
        Some(Rect::new(175.0, 140.0, 50.0, 20.0))
    );
    assert_eq!(overlay.handle(), Some(id));
    assert_eq!(engine.overlay_count(), 1);
}

#[test]
fn computed_position_follows_the_engine() {
    let (mut host, engine) = host();
    let node_one: PositionFn<HeadlessEngine> =
        callback!(|engine: &HeadlessEngine| engine.node_position(&ElementId::Int(1)));
    let mut overlay = OverlayBinding::new(host.scope());
    overlay
        .apply(OverlayProps::new(OverlayPosition::Computed(node_one)))
        .expect("apply");
    let id = overlay.handle().expect("overlay");
    assert_eq!(
        engine.overlay(id).expect("snapshot").options.position,
        Point::new(10.0, 0.0)
    );

    let next = host.props().clone();
    host.update(HostProps { graph: graph(30.0), ..next }).expect("move node");
    overlay.refresh_position().expect("refresh");
    assert_eq!(
        engine.overlay(id).expect("snapshot").options.position,
        Point::new(30.0, 0.0)
    );
}

#[test]
fn unresolvable_position_parks_the_overlay_off_screen() {
    let (host, engine) = host();
    let missing: PositionFn<HeadlessEngine> =
        callback!(|engine: &HeadlessEngine| engine.node_position(&ElementId::Int(42)));
    let mut overlay = OverlayBinding::new(host.scope());
    overlay
        .apply(OverlayProps::new(OverlayPosition::Computed(missing)))
        .expect("apply");
    let id = overlay.handle().expect("overlay");
    assert_eq!(
        engine.overlay(id).expect("snapshot").options.position,
        Point::OFF_SCREEN
    );

    overlay.teardown();
    assert_eq!(engine.overlay_count(), 0);
    assert!(overlay.refresh_position().is_err());
}
