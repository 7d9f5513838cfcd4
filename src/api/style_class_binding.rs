use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::engine::{ClassDefinition, ClassRequestId, Engine, StyleClassId};
use crate::error::{BindingError, BindingResult};

use super::engine_scope::EngineLink;
use super::{Binding, EngineScope, HandleSlot, Lifecycle};

/// Named style class.
///
/// Creation is asynchronous: the engine hands the class back one frame
/// later. Until then [`StyleClassBinding::class`] is `None`, and a class that
/// resolves after teardown is destroyed instead of adopted.
///
/// Several instances may use the same class name over time. Each one only
/// destroys the class its own creation request produced, never a class a
/// newer instance registered under that name.
pub struct StyleClassBinding<E: Engine> {
    name: String,
    link: EngineLink<E>,
    slot: HandleSlot<StyleClassId>,
    applied: Option<ClassDefinition>,
    request: Rc<Cell<Option<ClassRequestId>>>,
}

impl<E: Engine> StyleClassBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: EngineLink::new(scope),
            slot: HandleSlot::new(Self::NAME),
            applied: None,
            request: Rc::new(Cell::new(None)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The class, once the engine reported it usable.
    #[must_use]
    pub fn class(&self) -> Option<StyleClassId> {
        self.slot.get()
    }

    fn request(&self, engine: &E, definition: ClassDefinition) {
        let pending = self.slot.begin_pending();
        let engine_ref = self.link.weak();
        let own_request = Rc::clone(&self.request);
        let request = engine.create_class(
            &self.name,
            definition,
            Box::new(move |class: StyleClassId| {
                let stale = match pending.adopt(class) {
                    Ok(()) => return,
                    Err(stale) => stale,
                };
                let Some(engine) = engine_ref.upgrade() else {
                    return;
                };
                // Another instance may have registered the name since.
                if own_request.get().is_none()
                    || engine.class_origin(&stale.0) != own_request.get()
                {
                    debug!(class = %stale, "style class taken over by a newer instance");
                    return;
                }
                debug!(class = %stale, "destroying style class resolved after teardown");
                if let Err(err) = engine.destroy_class(&stale.0) {
                    warn!(error = %err, class = %stale, "failed to destroy stale style class");
                }
            }),
        );
        self.request.set(Some(request));
    }
}

impl<E: Engine> Binding for StyleClassBinding<E> {
    type Props = ClassDefinition;

    const NAME: &'static str = "style-class";

    fn apply(&mut self, definition: ClassDefinition) -> BindingResult<()> {
        if self.slot.lifecycle().is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        match &self.applied {
            None => {
                self.request(&engine, definition.clone());
                debug!(class = %self.name, "style class requested");
            }
            Some(applied) if *applied == definition => return Ok(()),
            // Works on a class that is still pending as well.
            Some(_) => {
                engine.update_class(&self.name, definition.clone())?;
                debug!(class = %self.name, "style class updated");
            }
        }
        self.applied = Some(definition);
        Ok(())
    }

    fn teardown(&mut self) {
        let link = &self.link;
        let own_request = self.request.get();
        self.slot.teardown(|class| {
            let Some(engine) = link.upgrade() else {
                return;
            };
            if own_request.is_none() || engine.class_origin(&class.0) != own_request {
                debug!(%class, "style class no longer ours, left in place");
                return;
            }
            if let Err(err) = engine.destroy_class(&class.0) {
                warn!(error = %err, %class, "failed to destroy style class");
            }
        });
    }

    fn lifecycle(&self) -> Lifecycle {
        self.slot.lifecycle()
    }
}

impl<E: Engine> Drop for StyleClassBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
