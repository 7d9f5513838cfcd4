use std::fmt;

use tracing::{debug, warn};

use crate::core::{Callback, Point, Size};
use crate::engine::{Anchor, Engine, LayerRef, OverlayId, OverlayOptions, OverlayUpdate};
use crate::error::{BindingError, BindingResult};

use super::config_differ::ContentRef;
use super::engine_scope::EngineLink;
use super::layer_binding::markup_of;
use super::{Binding, EngineScope, HandleSlot, Lifecycle};

pub type PositionFn<E> = Callback<dyn Fn(&E) -> Option<Point>>;

/// Graph-space position of an overlay.
pub enum OverlayPosition<E: Engine> {
    Static(Point),
    /// Evaluated against the engine on every position refresh, never
    /// memoized. `None` parks the overlay at [`Point::OFF_SCREEN`].
    Computed(PositionFn<E>),
}

impl<E: Engine> OverlayPosition<E> {
    #[must_use]
    pub fn resolve(&self, engine: &E) -> Point {
        match self {
            Self::Static(point) => *point,
            Self::Computed(position) => position(engine).unwrap_or(Point::OFF_SCREEN),
        }
    }
}

impl<E: Engine> Clone for OverlayPosition<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(point) => Self::Static(*point),
            Self::Computed(position) => Self::Computed(position.clone()),
        }
    }
}

impl<E: Engine> fmt::Debug for OverlayPosition<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(point) => f.debug_tuple("Static").field(point).finish(),
            Self::Computed(position) => f.debug_tuple("Computed").field(position).finish(),
        }
    }
}

impl<E: Engine> From<Point> for OverlayPosition<E> {
    fn from(point: Point) -> Self {
        Self::Static(point)
    }
}

pub struct OverlayProps<E: Engine> {
    pub position: OverlayPosition<E>,
    pub size: Option<Size>,
    pub scaled: bool,
    pub z_index: Option<i32>,
    pub class_name: Option<String>,
    pub anchor: Anchor,
    pub content: Option<ContentRef>,
}

impl<E: Engine> OverlayProps<E> {
    #[must_use]
    pub fn new(position: impl Into<OverlayPosition<E>>) -> Self {
        Self {
            position: position.into(),
            size: None,
            scaled: false,
            z_index: None,
            class_name: None,
            anchor: Anchor::TOP_LEFT,
            content: None,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn scaled(mut self, scaled: bool) -> Self {
        self.scaled = scaled;
        self
    }

    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    #[must_use]
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: ContentRef) -> Self {
        self.content = Some(content);
        self
    }
}

impl<E: Engine> Clone for OverlayProps<E> {
    fn clone(&self) -> Self {
        Self {
            position: self.position.clone(),
            size: self.size,
            scaled: self.scaled,
            z_index: self.z_index,
            class_name: self.class_name.clone(),
            anchor: self.anchor,
            content: self.content.clone(),
        }
    }
}

impl<E: Engine> fmt::Debug for OverlayProps<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayProps")
            .field("position", &self.position)
            .field("size", &self.size)
            .field("scaled", &self.scaled)
            .field("z_index", &self.z_index)
            .field("class_name", &self.class_name)
            .field("anchor", &self.anchor)
            .field("content", &self.content)
            .finish()
    }
}

/// DOM node positioned by the engine at a graph-space point.
///
/// Position, size, scaling, z-order, class, anchor and content are each
/// updated in place when they change; the overlay is only created once.
pub struct OverlayBinding<E: Engine> {
    link: EngineLink<E>,
    slot: HandleSlot<OverlayId>,
    props: Option<OverlayProps<E>>,
    applied: Option<OverlayOptions>,
}

impl<E: Engine> OverlayBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>) -> Self {
        Self {
            link: EngineLink::new(scope),
            slot: HandleSlot::new(Self::NAME),
            props: None,
            applied: None,
        }
    }

    #[must_use]
    pub fn handle(&self) -> Option<OverlayId> {
        self.slot.get()
    }

    /// Re-evaluates the declared position against the engine's current
    /// state, moving the overlay when it changed.
    pub fn refresh_position(&mut self) -> BindingResult<()> {
        let overlay = self.slot.require()?;
        let engine = self.link.resolve()?;
        let (Some(props), Some(applied)) = (&self.props, &mut self.applied) else {
            return Ok(());
        };
        let position = props.position.resolve(&engine);
        if position != applied.position {
            engine.update_overlay(overlay, OverlayUpdate::Position(position))?;
            applied.position = position;
        }
        Ok(())
    }

    fn options_for(props: &OverlayProps<E>, engine: &E) -> OverlayOptions {
        OverlayOptions {
            position: props.position.resolve(engine),
            size: props.size,
            scaled: props.scaled,
            z_index: props.z_index,
            class_name: props.class_name.clone(),
            anchor: props.anchor,
            content: markup_of(props.content.as_ref()),
            visible: true,
        }
    }
}

/// In-place updates turning `applied` into `next`, one per changed field.
pub(crate) fn overlay_updates(applied: &OverlayOptions, next: &OverlayOptions) -> Vec<OverlayUpdate> {
    let mut updates = Vec::new();
    if next.position != applied.position {
        updates.push(OverlayUpdate::Position(next.position));
    }
    if next.size != applied.size {
        updates.push(OverlayUpdate::Size(next.size));
    }
    if next.scaled != applied.scaled {
        updates.push(OverlayUpdate::Scaled(next.scaled));
    }
    if next.z_index != applied.z_index {
        updates.push(OverlayUpdate::ZIndex(next.z_index));
    }
    if next.class_name != applied.class_name {
        updates.push(OverlayUpdate::ClassName(next.class_name.clone()));
    }
    if next.anchor != applied.anchor {
        updates.push(OverlayUpdate::Anchor(next.anchor));
    }
    if next.content != applied.content {
        updates.push(OverlayUpdate::Content(next.content.clone()));
    }
    updates
}

impl<E: Engine> Binding for OverlayBinding<E> {
    type Props = OverlayProps<E>;

    const NAME: &'static str = "overlay";

    fn apply(&mut self, props: OverlayProps<E>) -> BindingResult<()> {
        if self.slot.lifecycle().is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        let next = Self::options_for(&props, &engine);
        match (self.slot.get(), &self.applied) {
            (Some(overlay), Some(applied)) => {
                for update in overlay_updates(applied, &next) {
                    engine.update_overlay(overlay, update)?;
                }
            }
            _ => {
                let overlay = engine.add_overlay(next.clone());
                if let Err(overlay) = self.slot.install(overlay) {
                    engine.destroy_layer(LayerRef::Overlay(overlay))?;
                    return Err(BindingError::HandleDestroyed { binding: Self::NAME });
                }
                debug!(%overlay, position = ?next.position, "overlay created");
            }
        }
        self.applied = Some(next);
        self.props = Some(props);
        Ok(())
    }

    fn teardown(&mut self) {
        let link = &self.link;
        self.slot.teardown(|overlay| {
            let Some(engine) = link.upgrade() else {
                return;
            };
            if let Err(err) = engine.destroy_layer(LayerRef::Overlay(overlay)) {
                warn!(error = %err, %overlay, "failed to destroy overlay");
            }
        });
    }

    fn lifecycle(&self) -> Lifecycle {
        self.slot.lifecycle()
    }
}

impl<E: Engine> Drop for OverlayBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
