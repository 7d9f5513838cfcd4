use std::cell::Cell;
use std::rc::Rc;

use graph_sync::api::{
    Binding, ContentRef, DomEvent, EngineHost, HostProps, POPUP_CLOSE_BUTTON, PopupBinding,
    PopupProps,
};
use graph_sync::callback;
use graph_sync::core::{Callback, GraphPayload, Point, RawNode, Size};
use graph_sync::engine::{Container, HeadlessEngine, LayerRef};
use graph_sync::BindingError;

fn host() -> (EngineHost<HeadlessEngine>, Rc<HeadlessEngine>) {
    let mut host = EngineHost::new(HostProps::new(GraphPayload::new(vec![RawNode::new(0)], vec![])));
    host.mount(Some(&Container::new("popups", Size::new(400.0, 300.0))))
        .expect("mount");
    let engine = host.engine().expect("engine");
    (host, engine)
}

fn body(text: &str) -> ContentRef {
    Rc::new(format!("<p>{text}</p>"))
}

#[test]
fn content_is_written_once_per_distinct_markup() {
    let (host, engine) = host();
    let mut popup = PopupBinding::new(host.scope());
    popup
        .apply(PopupProps::new(Point::new(5.0, 5.0)).with_content(body("hello")))
        .expect("apply");
    let id = popup.handle().expect("popup");
    let snapshot = engine.overlay(id).expect("snapshot");
    assert_eq!(snapshot.content_writes, 1);
    assert_eq!(
        snapshot.options.content,
        format!("{POPUP_CLOSE_BUTTON}<p>hello</p>")
    );

    for _ in 0..3 {
        popup
            .apply(PopupProps::new(Point::new(5.0, 5.0)).with_content(body("hello")))
            .expect("rerender");
    }
    assert_eq!(engine.overlay(id).expect("snapshot").content_writes, 1);

    popup
        .apply(PopupProps::new(Point::new(5.0, 5.0)).with_content(body("bye")))
        .expect("new content");
    assert_eq!(engine.overlay(id).expect("snapshot").content_writes, 2);
}

#[test]
fn open_prop_drives_visibility() {
    let (host, engine) = host();
    let mut popup = PopupBinding::new(host.scope());
    popup
        .apply(PopupProps::new(Point::new(0.0, 0.0)).open(false))
        .expect("closed");
    let id = popup.handle().expect("popup");
    assert!(!popup.is_open());
    assert_eq!(engine.is_layer_visible(LayerRef::Overlay(id)), Some(false));

    popup.apply(PopupProps::new(Point::new(0.0, 0.0))).expect("open");
    assert!(popup.is_open());
    assert!(engine.overlay(id).expect("snapshot").options.visible);

    popup
        .apply(PopupProps::new(Point::new(0.0, 0.0)).open(false))
        .expect("close");
    assert!(!engine.overlay(id).expect("snapshot").options.visible);
    assert_eq!(engine.overlay_count(), 1);
}

#[test]
fn close_button_stops_propagation_and_notifies() {
    let (host, _engine) = host();
    let closes = Rc::new(Cell::new(0));
    let counter = Rc::clone(&closes);
    let on_close: Callback<dyn Fn()> = callback!(move || counter.set(counter.get() + 1));
    let mut popup = PopupBinding::new(host.scope());
    popup
        .apply(PopupProps::new(Point::new(0.0, 0.0)).with_on_close(on_close))
        .expect("apply");

    let mut event = DomEvent::at(Point::new(3.0, 4.0));
    popup.close_button_clicked(&mut event).expect("click");
    assert!(event.is_propagation_stopped());
    assert_eq!(closes.get(), 1);
    // Closing is left to the owner.
    assert!(popup.is_open());

    popup.teardown();
    let mut late = DomEvent::at(Point::new(3.0, 4.0));
    assert!(matches!(
        popup.close_button_clicked(&mut late),
        Err(BindingError::HandleDestroyed { .. })
    ));
    assert!(late.is_propagation_stopped());
    assert_eq!(closes.get(), 1);
}

#[test]
fn popup_without_close_button_renders_content_only() {
    let (host, engine) = host();
    let mut popup = PopupBinding::new(host.scope());
    popup
        .apply(
            PopupProps::new(Point::new(0.0, 0.0))
                .without_close_button()
                .with_class_name("info")
                .with_content(body("plain")),
        )
        .expect("apply");
    let snapshot = engine.overlay(popup.handle().expect("popup")).expect("snapshot");
    assert_eq!(snapshot.options.content, "<p>plain</p>");
    assert_eq!(snapshot.options.class_name.as_deref(), Some("info"));

    drop(popup);
    assert_eq!(engine.overlay_count(), 0);
}
