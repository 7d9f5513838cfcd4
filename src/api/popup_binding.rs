use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::{Callback, Point, Size};
use crate::engine::{Anchor, Engine, LayerRef, OverlayId, OverlayOptions};
use crate::error::{BindingError, BindingResult};

use super::config_differ::ContentRef;
use super::engine_scope::EngineLink;
use super::layer_binding::markup_of;
use super::overlay_binding::overlay_updates;
use super::{Binding, EngineScope, HandleSlot, Lifecycle};

pub const POPUP_CLOSE_BUTTON: &str = r#"<button class="graph-popup-close" aria-label="close">&times;</button>"#;

/// DOM-level click delivered to the popup's own elements.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DomEvent {
    pub point: Point,
    propagation_stopped: bool,
}

impl DomEvent {
    #[must_use]
    pub fn at(point: Point) -> Self {
        Self {
            point,
            propagation_stopped: false,
        }
    }

    /// Keeps the event away from the canvas and engine handlers below.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    #[must_use]
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

#[derive(Debug, Clone)]
pub struct PopupProps {
    pub position: Point,
    pub open: bool,
    pub size: Option<Size>,
    pub class_name: Option<String>,
    pub anchor: Anchor,
    pub close_button: bool,
    pub content: Option<ContentRef>,
    pub on_close: Option<Callback<dyn Fn()>>,
}

impl PopupProps {
    /// Open popup above `position`, with a close button.
    #[must_use]
    pub fn new(position: Point) -> Self {
        Self {
            position,
            open: true,
            size: None,
            class_name: None,
            anchor: Anchor::new(-0.5, -1.0),
            close_button: true,
            content: None,
            on_close: None,
        }
    }

    #[must_use]
    pub fn open(mut self, open: bool) -> Self {
        self.open = open;
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
    pub fn without_close_button(mut self) -> Self {
        self.close_button = false;
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: ContentRef) -> Self {
        self.content = Some(content);
        self
    }

    #[must_use]
    pub fn with_on_close(mut self, on_close: Callback<dyn Fn()>) -> Self {
        self.on_close = Some(on_close);
        self
    }

    fn markup(&self) -> String {
        let content = markup_of(self.content.as_ref());
        if self.close_button {
            format!("{POPUP_CLOSE_BUTTON}{content}")
        } else {
            content
        }
    }

    fn overlay_options(&self) -> OverlayOptions {
        OverlayOptions {
            position: self.position,
            size: self.size,
            scaled: false,
            z_index: None,
            class_name: self.class_name.clone(),
            anchor: self.anchor,
            content: self.markup(),
            visible: self.open,
        }
    }
}

/// Overlay with open/closed visibility and a close button.
///
/// Content is rendered to markup and compared with the markup last written,
/// so re-applying unchanged children does not touch the DOM.
pub struct PopupBinding<E: Engine> {
    link: EngineLink<E>,
    slot: HandleSlot<OverlayId>,
    applied: Option<OverlayOptions>,
    on_close: Option<Callback<dyn Fn()>>,
}

impl<E: Engine> PopupBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>) -> Self {
        Self {
            link: EngineLink::new(scope),
            slot: HandleSlot::new(Self::NAME),
            applied: None,
            on_close: None,
        }
    }

    #[must_use]
    pub fn handle(&self) -> Option<OverlayId> {
        self.slot.get()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.applied.as_ref().is_some_and(|applied| applied.visible)
    }

    /// Click on the close button: the event stops here and `on_close` runs.
    /// Closing is up to the caller, who re-applies with `open: false`.
    pub fn close_button_clicked(&self, event: &mut DomEvent) -> BindingResult<()> {
        event.stop_propagation();
        self.slot.require()?;
        trace!("popup close button clicked");
        if let Some(on_close) = &self.on_close {
            on_close();
        }
        Ok(())
    }
}

impl<E: Engine> Binding for PopupBinding<E> {
    type Props = PopupProps;

    const NAME: &'static str = "popup";

    fn apply(&mut self, props: PopupProps) -> BindingResult<()> {
        if self.slot.lifecycle().is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        let next = props.overlay_options();
        match (self.slot.get(), &self.applied) {
            (Some(overlay), Some(applied)) => {
                for update in overlay_updates(applied, &next) {
                    engine.update_overlay(overlay, update)?;
                }
                if next.visible != applied.visible {
                    engine.set_layer_visible(LayerRef::Overlay(overlay), next.visible)?;
                    debug!(%overlay, open = next.visible, "popup visibility changed");
                }
            }
            _ => {
                let overlay = engine.add_overlay(next.clone());
                if let Err(overlay) = self.slot.install(overlay) {
                    engine.destroy_layer(LayerRef::Overlay(overlay))?;
                    return Err(BindingError::HandleDestroyed { binding: Self::NAME });
                }
                debug!(%overlay, open = next.visible, "popup created");
            }
        }
        self.applied = Some(next);
        self.on_close = props.on_close;
        Ok(())
    }

    fn teardown(&mut self) {
        let link = &self.link;
        self.slot.teardown(|overlay| {
            let Some(engine) = link.upgrade() else {
                return;
            };
            if let Err(err) = engine.destroy_layer(LayerRef::Overlay(overlay)) {
                warn!(error = %err, %overlay, "failed to destroy popup");
            }
        });
        self.on_close = None;
    }

    fn lifecycle(&self) -> Lifecycle {
        self.slot.lifecycle()
    }
}

impl<E: Engine> Drop for PopupBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
