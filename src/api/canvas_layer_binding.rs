use tracing::{debug, warn};

use crate::engine::{CanvasLayerId, CanvasLayerOptions, Engine, LayerRef, PaintCallback};
use crate::error::{BindingError, BindingResult};

use super::engine_scope::EngineLink;
use super::{Binding, EngineScope, HandleSlot, Lifecycle};

#[derive(Debug, Clone)]
pub struct CanvasLayerProps {
    /// Invoked by the engine's render loop. Read once, at creation.
    pub paint: PaintCallback,
    /// Read once, at creation.
    pub options: CanvasLayerOptions,
    pub visible: bool,
    pub index: Option<usize>,
}

impl CanvasLayerProps {
    #[must_use]
    pub fn new(paint: PaintCallback) -> Self {
        Self {
            paint,
            options: CanvasLayerOptions::default(),
            visible: true,
            index: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CanvasLayerOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

/// Canvas layer painted by the engine.
///
/// Only `visible` and `index` are reactive. A new paint callback does not
/// re-register the layer, which would flicker.
pub struct CanvasLayerBinding<E: Engine> {
    link: EngineLink<E>,
    slot: HandleSlot<CanvasLayerId>,
    visible: bool,
    index: Option<usize>,
}

impl<E: Engine> CanvasLayerBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>) -> Self {
        Self {
            link: EngineLink::new(scope),
            slot: HandleSlot::new(Self::NAME),
            visible: true,
            index: None,
        }
    }

    #[must_use]
    pub fn handle(&self) -> Option<CanvasLayerId> {
        self.slot.get()
    }
}

impl<E: Engine> Binding for CanvasLayerBinding<E> {
    type Props = CanvasLayerProps;

    const NAME: &'static str = "canvas-layer";

    fn apply(&mut self, props: CanvasLayerProps) -> BindingResult<()> {
        if self.slot.lifecycle().is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        let Some(layer) = self.slot.get() else {
            let layer = engine.add_canvas_layer(props.paint, props.options, props.index);
            if !props.visible {
                engine.set_layer_visible(LayerRef::Canvas(layer), false)?;
            }
            if let Err(layer) = self.slot.install(layer) {
                engine.destroy_layer(LayerRef::Canvas(layer))?;
                return Err(BindingError::HandleDestroyed { binding: Self::NAME });
            }
            self.visible = props.visible;
            self.index = props.index;
            debug!(%layer, options = ?props.options, "canvas layer created");
            return Ok(());
        };

        if props.visible != self.visible {
            engine.set_layer_visible(LayerRef::Canvas(layer), props.visible)?;
            self.visible = props.visible;
        }
        if props.index != self.index {
            if let Some(index) = props.index {
                engine.move_layer(LayerRef::Canvas(layer), index)?;
            }
            self.index = props.index;
        }
        Ok(())
    }

    fn teardown(&mut self) {
        let link = &self.link;
        self.slot.teardown(|layer| {
            let Some(engine) = link.upgrade() else {
                return;
            };
            if let Err(err) = engine.destroy_layer(LayerRef::Canvas(layer)) {
                warn!(error = %err, %layer, "failed to destroy canvas layer");
            }
        });
    }

    fn lifecycle(&self) -> Lifecycle {
        self.slot.lifecycle()
    }
}

impl<E: Engine> Drop for CanvasLayerBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
