use tracing::{debug, warn};

use crate::engine::{Engine, LayerId, LayerRef};
use crate::error::{BindingError, BindingResult};

use super::config_differ::ContentRef;
use super::engine_scope::EngineLink;
use super::{Binding, EngineScope, HandleSlot, Lifecycle};

#[derive(Debug, Clone, Default)]
pub struct LayerProps {
    /// Position in the layer stack; `None` appends on top.
    pub index: Option<usize>,
    pub class_name: Option<String>,
    pub content: Option<ContentRef>,
}

impl LayerProps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    #[must_use]
    pub fn with_content(mut self, content: ContentRef) -> Self {
        self.content = Some(content);
        self
    }
}

/// Static markup of optional content. Live content renders to nothing.
pub(crate) fn markup_of(content: Option<&ContentRef>) -> String {
    content
        .and_then(|content| content.render_markup())
        .unwrap_or_default()
}

#[derive(Debug, Default)]
struct AppliedLayer {
    index: Option<usize>,
    class_name: Option<String>,
    markup: String,
}

/// Plain DOM layer the engine stacks with its own; children are projected
/// into it as markup.
pub struct LayerBinding<E: Engine> {
    link: EngineLink<E>,
    slot: HandleSlot<LayerId>,
    applied: AppliedLayer,
}

impl<E: Engine> LayerBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>) -> Self {
        Self {
            link: EngineLink::new(scope),
            slot: HandleSlot::new(Self::NAME),
            applied: AppliedLayer::default(),
        }
    }

    #[must_use]
    pub fn handle(&self) -> Option<LayerId> {
        self.slot.get()
    }

    fn create(&mut self, engine: &E, props: &LayerProps) -> BindingResult<LayerId> {
        let layer = engine.add_layer(props.index);
        if let Err(layer) = self.slot.install(layer) {
            engine.destroy_layer(LayerRef::Layer(layer))?;
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        self.applied.index = props.index;
        debug!(%layer, "layer created");
        Ok(layer)
    }
}

impl<E: Engine> Binding for LayerBinding<E> {
    type Props = LayerProps;

    const NAME: &'static str = "layer";

    fn apply(&mut self, props: LayerProps) -> BindingResult<()> {
        if self.slot.lifecycle().is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        let layer = match self.slot.get() {
            Some(layer) => layer,
            None => self.create(&engine, &props)?,
        };

        if props.class_name != self.applied.class_name {
            engine.set_layer_class(layer, props.class_name.as_deref())?;
            self.applied.class_name = props.class_name;
        }
        if props.index != self.applied.index {
            if let Some(index) = props.index {
                engine.move_layer(LayerRef::Layer(layer), index)?;
            }
            self.applied.index = props.index;
        }
        let markup = markup_of(props.content.as_ref());
        if markup != self.applied.markup {
            engine.set_layer_content(layer, &markup)?;
            self.applied.markup = markup;
        }
        Ok(())
    }

    fn teardown(&mut self) {
        let link = &self.link;
        self.slot.teardown(|layer| {
            let Some(engine) = link.upgrade() else {
                return;
            };
            if let Err(err) = engine.destroy_layer(LayerRef::Layer(layer)) {
                warn!(error = %err, %layer, "failed to destroy layer");
            }
        });
    }

    fn lifecycle(&self) -> Lifecycle {
        self.slot.lifecycle()
    }
}

impl<E: Engine> Drop for LayerBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
