//! Event-driven tooltip overlay.
//!
//! The overlay is created hidden once the engine is reachable. Its target and
//! visibility change only in response to engine interaction events selected
//! by the declared [`TooltipTrigger`]; props decide what is shown and where.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::core::{Callback, ElementId, ElementKind, Point, Size, project_on_segment};
use crate::engine::{
    Anchor, Engine, EngineEvent, EventHandler, EventKind, LayerRef, ListenerId, OverlayId,
    OverlayOptions, OverlayUpdate, PointerEvent,
};
use crate::error::{BindingError, BindingResult};

use super::config_differ::ContentRef;
use super::engine_scope::EngineLink;
use super::{
    Binding, EngineScope, HandleSlot, Lifecycle, TooltipPlacement, TooltipTrigger, TriggerGesture,
};

/// Pixel distance between the target and the tooltip box.
pub const DEFAULT_TOOLTIP_OFFSET: f64 = 10.0;

/// What the tooltip is currently showing for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TooltipTarget {
    Node(ElementId),
    Edge(ElementId),
    /// Graph-space point of a background interaction.
    Background(Point),
}

pub type TooltipRenderFn = Callback<dyn Fn(&TooltipTarget) -> Option<String>>;

#[derive(Debug, Clone)]
pub enum TooltipContent {
    Static(ContentRef),
    /// Rendered for each target; `None` hides the tooltip.
    Render(TooltipRenderFn),
}

impl TooltipContent {
    fn markup_for(&self, target: &TooltipTarget) -> Option<String> {
        match self {
            Self::Static(content) => Some(content.render_markup().unwrap_or_default()),
            Self::Render(render) => render(target),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TooltipProps {
    pub trigger: TooltipTrigger,
    /// Fixed graph-space position; the event target's position is ignored
    /// when set.
    pub position: Option<Point>,
    pub placement: TooltipPlacement,
    pub content: TooltipContent,
    pub size: Option<Size>,
    pub class_name: Option<String>,
    /// Flip to the opposite placement when the box leaves the viewport.
    pub auto_adjust: bool,
    pub offset: f64,
}

impl TooltipProps {
    #[must_use]
    pub fn new(trigger: TooltipTrigger, content: TooltipContent) -> Self {
        Self {
            trigger,
            position: None,
            placement: TooltipPlacement::Top,
            content,
            size: None,
            class_name: None,
            auto_adjust: true,
            offset: DEFAULT_TOOLTIP_OFFSET,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn with_placement(mut self, placement: TooltipPlacement) -> Self {
        self.placement = placement;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    #[must_use]
    pub fn auto_adjust(mut self, auto_adjust: bool) -> Self {
        self.auto_adjust = auto_adjust;
        self
    }

    #[must_use]
    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }
}

/// Observable tooltip state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TooltipState {
    pub target: Option<TooltipTarget>,
    pub visible: bool,
    /// Graph-space point the tooltip is attached to, before the offset.
    pub anchor: Option<Point>,
    /// Placement in effect after overflow correction.
    pub placement: TooltipPlacement,
}

impl Default for TooltipState {
    fn default() -> Self {
        Self {
            target: None,
            visible: false,
            anchor: None,
            placement: TooltipPlacement::Top,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TooltipAction {
    Show(TooltipTarget),
    Hide,
    Ignore,
}

fn target_of<E: Engine>(engine: &E, pointer: &PointerEvent) -> TooltipTarget {
    match &pointer.target {
        Some(target) if target.kind == ElementKind::Node => TooltipTarget::Node(target.id.clone()),
        Some(target) => TooltipTarget::Edge(target.id.clone()),
        None => TooltipTarget::Background(engine.screen_to_graph(pointer.point)),
    }
}

/// Decides what an engine event means for a tooltip with `trigger`.
fn action_for<E: Engine>(engine: &E, trigger: TooltipTrigger, event: &EngineEvent) -> TooltipAction {
    let Some(pointer) = event.pointer() else {
        return TooltipAction::Ignore;
    };
    let subject_hit = trigger.subject().matches(pointer.target.as_ref());
    match (trigger.gesture(), event.kind()) {
        (TriggerGesture::Hover, EventKind::MouseOver) if subject_hit => {
            TooltipAction::Show(target_of(engine, pointer))
        }
        (TriggerGesture::Hover, EventKind::MouseOut) if subject_hit => TooltipAction::Hide,
        (TriggerGesture::Click | TriggerGesture::RightClick, EventKind::Click) => {
            if Some(pointer.button) != trigger.button() {
                // A click of the other button neither shows nor dismisses.
                TooltipAction::Ignore
            } else if subject_hit {
                TooltipAction::Show(target_of(engine, pointer))
            } else {
                TooltipAction::Hide
            }
        }
        (TriggerGesture::DoubleClick, EventKind::DoubleClick) if subject_hit => {
            TooltipAction::Show(target_of(engine, pointer))
        }
        (TriggerGesture::DoubleClick, EventKind::DoubleClick | EventKind::Click) if !subject_hit => {
            TooltipAction::Hide
        }
        _ => TooltipAction::Ignore,
    }
}

struct TooltipInner {
    props: TooltipProps,
    overlay: Option<OverlayId>,
    state: TooltipState,
    /// Last pointer position in graph space, used to place edge tooltips.
    pointer: Option<Point>,
    markup: String,
    position: Point,
    anchor: Anchor,
    size: Option<Size>,
    class_name: Option<String>,
    /// Anchor point and content the overflow pass last ran for.
    corrected_for: Option<(Point, String)>,
    active: bool,
}

impl TooltipInner {
    fn new(props: TooltipProps) -> Self {
        Self {
            state: TooltipState {
                placement: props.placement,
                ..TooltipState::default()
            },
            props,
            overlay: None,
            pointer: None,
            markup: String::new(),
            position: Point::OFF_SCREEN,
            anchor: Anchor::TOP_LEFT,
            size: None,
            class_name: None,
            corrected_for: None,
            active: true,
        }
    }

    fn handle<E: Engine>(&mut self, engine: &E, event: &EngineEvent) -> BindingResult<()> {
        if !self.active {
            return Ok(());
        }
        let action = action_for(engine, self.props.trigger, event);
        trace!(trigger = %self.props.trigger, kind = ?event.kind(), ?action, "tooltip event");
        match action {
            TooltipAction::Show(target) => {
                self.pointer = event.pointer().map(|pointer| engine.screen_to_graph(pointer.point));
                self.show(engine, target)
            }
            TooltipAction::Hide => self.hide(engine),
            TooltipAction::Ignore => Ok(()),
        }
    }

    /// Graph-space point the tooltip attaches to.
    fn anchor_point<E: Engine>(&self, engine: &E, target: &TooltipTarget) -> Option<Point> {
        if let Some(position) = self.props.position {
            return Some(position);
        }
        match target {
            TooltipTarget::Node(node) => engine.node_position(node).or(self.pointer),
            TooltipTarget::Edge(edge) => {
                let (source, target) = engine.edge_extremities(edge)?;
                Some(match self.pointer.or_else(|| engine.pointer_position()) {
                    Some(pointer) => project_on_segment(pointer, source, target),
                    None => source.midpoint(target),
                })
            }
            TooltipTarget::Background(point) => Some(*point),
        }
    }

    fn place<E: Engine>(
        &mut self,
        engine: &E,
        overlay: OverlayId,
        anchor: Point,
        placement: TooltipPlacement,
    ) -> BindingResult<()> {
        let position = placement.offset_position(
            anchor,
            self.props.offset,
            |point| engine.graph_to_screen(point),
            |point| engine.screen_to_graph(point),
        );
        if position != self.position {
            engine.update_overlay(overlay, OverlayUpdate::Position(position))?;
            self.position = position;
        }
        let overlay_anchor = placement.anchor();
        if overlay_anchor != self.anchor {
            engine.update_overlay(overlay, OverlayUpdate::Anchor(overlay_anchor))?;
            self.anchor = overlay_anchor;
        }
        self.state.placement = placement;
        Ok(())
    }

    fn show<E: Engine>(&mut self, engine: &E, target: TooltipTarget) -> BindingResult<()> {
        let Some(overlay) = self.overlay else {
            return Ok(());
        };
        let Some(markup) = self.props.content.markup_for(&target) else {
            return self.hide(engine);
        };
        let Some(anchor) = self.anchor_point(engine, &target) else {
            debug!(?target, "tooltip target has no position");
            return self.hide(engine);
        };

        if markup != self.markup {
            engine.update_overlay(overlay, OverlayUpdate::Content(markup.clone()))?;
            self.markup = markup;
        }
        // One corrective pass per anchor and content; afterwards the
        // corrected placement sticks.
        let key = (anchor, self.markup.clone());
        let corrected = self.corrected_for.as_ref() == Some(&key);
        let requested = self.props.placement;
        let placement = if corrected { self.state.placement } else { requested };
        self.place(engine, overlay, anchor, placement)?;
        if self.props.auto_adjust && !corrected {
            if let Some(bounds) = engine.overlay_bounds(overlay) {
                if requested.overflows(bounds, engine.viewport_size()) {
                    debug!(from = ?requested, to = ?requested.opposite(), "tooltip flipped to fit viewport");
                    self.place(engine, overlay, anchor, requested.opposite())?;
                }
            }
            self.corrected_for = Some(key);
        }

        if !self.state.visible {
            engine.set_layer_visible(LayerRef::Overlay(overlay), true)?;
        }
        self.state.target = Some(target);
        self.state.anchor = Some(anchor);
        self.state.visible = true;
        Ok(())
    }

    fn hide<E: Engine>(&mut self, engine: &E) -> BindingResult<()> {
        if let (Some(overlay), true) = (self.overlay, self.state.visible) {
            engine.set_layer_visible(LayerRef::Overlay(overlay), false)?;
        }
        self.state.visible = false;
        self.state.target = None;
        Ok(())
    }

    /// Pushes size and class changes, then re-shows the current target so
    /// content, position and placement follow the new props.
    fn refresh<E: Engine>(&mut self, engine: &E, layout_changed: bool) -> BindingResult<()> {
        let Some(overlay) = self.overlay else {
            return Ok(());
        };
        if self.props.size != self.size {
            engine.update_overlay(overlay, OverlayUpdate::Size(self.props.size))?;
            self.size = self.props.size;
        }
        if self.props.class_name != self.class_name {
            engine.update_overlay(overlay, OverlayUpdate::ClassName(self.props.class_name.clone()))?;
            self.class_name = self.props.class_name.clone();
        }
        match self.state.target.clone() {
            Some(target) if self.state.visible => {
                if layout_changed {
                    self.corrected_for = None;
                }
                self.show(engine, target)
            }
            _ => Ok(()),
        }
    }
}

/// Tooltip driven by engine interaction events.
///
/// Listeners are subscribed once, when the overlay is created, and only
/// replaced when the trigger itself changes.
pub struct TooltipBinding<E: Engine> {
    link: EngineLink<E>,
    slot: HandleSlot<OverlayId>,
    inner: Option<Rc<RefCell<TooltipInner>>>,
    listeners: SmallVec<[ListenerId; 2]>,
    subscribed: Option<TooltipTrigger>,
}

impl<E: Engine> TooltipBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>) -> Self {
        Self {
            link: EngineLink::new(scope),
            slot: HandleSlot::new(Self::NAME),
            inner: None,
            listeners: SmallVec::new(),
            subscribed: None,
        }
    }

    #[must_use]
    pub fn handle(&self) -> Option<OverlayId> {
        self.slot.get()
    }

    #[must_use]
    pub fn state(&self) -> TooltipState {
        self.inner
            .as_ref()
            .map(|inner| inner.borrow().state.clone())
            .unwrap_or_default()
    }

    /// Hides the tooltip and clears its target.
    pub fn hide(&mut self) -> BindingResult<()> {
        self.slot.require()?;
        let engine = self.link.resolve()?;
        match &self.inner {
            Some(inner) => inner.borrow_mut().hide(engine.as_ref()),
            None => Ok(()),
        }
    }

    fn subscribe(&mut self, engine: &E, trigger: TooltipTrigger, inner: &Rc<RefCell<TooltipInner>>) {
        for kind in trigger.event_kinds() {
            let listener = engine.on(*kind, tooltip_listener(Rc::downgrade(inner), self.link.weak()));
            self.listeners.push(listener);
        }
        self.subscribed = Some(trigger);
        debug!(%trigger, listeners = self.listeners.len(), "tooltip subscribed");
    }

    fn unsubscribe(&mut self, engine: &E) {
        for listener in self.listeners.drain(..) {
            engine.off(listener);
        }
        self.subscribed = None;
    }

    fn create(&mut self, engine: &E, props: TooltipProps) -> BindingResult<()> {
        let overlay = engine.add_overlay(OverlayOptions {
            position: Point::OFF_SCREEN,
            size: props.size,
            scaled: false,
            z_index: None,
            class_name: props.class_name.clone(),
            anchor: props.placement.anchor(),
            content: String::new(),
            visible: false,
        });
        if let Err(overlay) = self.slot.install(overlay) {
            engine.destroy_layer(LayerRef::Overlay(overlay))?;
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let trigger = props.trigger;
        let mut inner = TooltipInner::new(props);
        inner.overlay = Some(overlay);
        inner.anchor = inner.props.placement.anchor();
        inner.size = inner.props.size;
        inner.class_name = inner.props.class_name.clone();
        let inner = Rc::new(RefCell::new(inner));
        self.subscribe(engine, trigger, &inner);
        self.inner = Some(inner);
        debug!(%overlay, %trigger, "tooltip created");
        Ok(())
    }
}

fn tooltip_listener<E: Engine>(inner: Weak<RefCell<TooltipInner>>, engine: Weak<E>) -> EventHandler {
    crate::callback!(move |event: &EngineEvent| {
        let (Some(inner), Some(engine)) = (inner.upgrade(), engine.upgrade()) else {
            return;
        };
        let Ok(mut inner) = inner.try_borrow_mut() else {
            debug!(kind = ?event.kind(), "tooltip busy, event dropped");
            return;
        };
        if let Err(err) = inner.handle(engine.as_ref(), event) {
            warn!(error = %err, "tooltip failed to follow event");
        }
    })
}

impl<E: Engine> Binding for TooltipBinding<E> {
    type Props = TooltipProps;

    const NAME: &'static str = "tooltip";

    fn apply(&mut self, props: TooltipProps) -> BindingResult<()> {
        if self.slot.lifecycle().is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        let Some(inner) = self.inner.clone() else {
            return self.create(&engine, props);
        };

        if self.subscribed != Some(props.trigger) {
            self.unsubscribe(&engine);
            inner.borrow_mut().hide(engine.as_ref())?;
            self.subscribe(&engine, props.trigger, &inner);
        }
        let mut inner = inner.borrow_mut();
        let layout_changed = inner.props.placement != props.placement
            || inner.props.position != props.position
            || inner.props.offset != props.offset
            || inner.props.size != props.size;
        inner.props = props;
        inner.refresh(engine.as_ref(), layout_changed)
    }

    fn teardown(&mut self) {
        if let Some(inner) = &self.inner {
            if let Ok(mut inner) = inner.try_borrow_mut() {
                inner.active = false;
                inner.state = TooltipState::default();
            }
        }
        let engine = self.link.upgrade();
        if let Some(engine) = &engine {
            self.unsubscribe(engine);
        }
        self.listeners.clear();
        self.slot.teardown(|overlay| {
            let Some(engine) = engine else {
                return;
            };
            if let Err(err) = engine.destroy_layer(LayerRef::Overlay(overlay)) {
                warn!(error = %err, %overlay, "failed to destroy tooltip overlay");
            }
        });
    }

    fn lifecycle(&self) -> Lifecycle {
        self.slot.lifecycle()
    }
}

impl<E: Engine> Drop for TooltipBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::{TooltipAction, TooltipTarget, action_for};
    use crate::api::TooltipTrigger;
    use crate::core::{GraphPayload, Point, Size, Target};
    use crate::engine::{
        Container, Engine, EngineEvent, EngineOptions, HeadlessEngine, MouseButton, PointerEvent,
    };

    fn engine() -> HeadlessEngine {
        let container = Container::new("tooltip", Size::new(200.0, 200.0));
        HeadlessEngine::create(&container, &EngineOptions::default(), &GraphPayload::default())
            .expect("engine")
    }

    #[test]
    fn right_click_tooltip_ignores_left_clicks() {
        let engine = engine();
        let right = EngineEvent::Click(
            PointerEvent::at(5.0, 5.0)
                .on(Target::node(1))
                .with_button(MouseButton::Right),
        );
        let left = EngineEvent::Click(PointerEvent::at(5.0, 5.0));
        assert_eq!(
            action_for(&engine, TooltipTrigger::NodeRightClick, &right),
            TooltipAction::Show(TooltipTarget::Node(1.into()))
        );
        assert_eq!(
            action_for(&engine, TooltipTrigger::NodeRightClick, &left),
            TooltipAction::Ignore
        );
    }

    #[test]
    fn double_click_tooltip_survives_clicks_on_its_subject() {
        let engine = engine();
        let click_on_node = EngineEvent::Click(PointerEvent::at(1.0, 1.0).on(Target::node(2)));
        let click_on_edge = EngineEvent::Click(PointerEvent::at(1.0, 1.0).on(Target::edge(3)));
        assert_eq!(
            action_for(&engine, TooltipTrigger::NodeDoubleClick, &click_on_node),
            TooltipAction::Ignore
        );
        assert_eq!(
            action_for(&engine, TooltipTrigger::NodeDoubleClick, &click_on_edge),
            TooltipAction::Hide
        );
    }

    #[test]
    fn background_targets_carry_graph_points() {
        let engine = engine();
        let click = EngineEvent::Click(PointerEvent::at(100.0, 100.0));
        assert_eq!(
            action_for(&engine, TooltipTrigger::BackgroundClick, &click),
            TooltipAction::Show(TooltipTarget::Background(Point::new(0.0, 0.0)))
        );
    }
}
