use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::engine::Engine;
use crate::error::{BindingError, BindingResult};

/// Explicit replacement for a UI context: the capability through which
/// bindings reach the engine owned by their `EngineHost`.
///
/// Clones share the same slot. Resolving it before the host mounted, or after
/// it was torn down, is a usage error.
pub struct EngineScope<E: Engine> {
    slot: Rc<RefCell<Option<Rc<E>>>>,
}

impl<E: Engine> EngineScope<E> {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(None)),
        }
    }

    /// Resolves the engine, failing loudly when none is published.
    pub fn engine(&self) -> BindingResult<Rc<E>> {
        self.slot
            .borrow()
            .as_ref()
            .map(Rc::clone)
            .ok_or(BindingError::ContextUnavailable)
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.slot.borrow().is_some()
    }

    pub(crate) fn publish(&self, engine: Rc<E>) {
        *self.slot.borrow_mut() = Some(engine);
    }

    pub(crate) fn revoke(&self) {
        self.slot.borrow_mut().take();
    }
}

impl<E: Engine> Clone for EngineScope<E> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<E: Engine> fmt::Debug for EngineScope<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineScope")
            .field("available", &self.is_available())
            .finish()
    }
}

/// A binding's non-owning link to the engine.
///
/// The first resolution goes through the scope; afterwards the binding keeps
/// talking to that same engine instance for as long as it lives. Teardown uses
/// [`EngineLink::upgrade`]: when the engine is already gone, so are the
/// handles it owned.
pub(crate) struct EngineLink<E: Engine> {
    scope: EngineScope<E>,
    engine: Option<Weak<E>>,
}

impl<E: Engine> EngineLink<E> {
    pub(crate) fn new(scope: EngineScope<E>) -> Self {
        Self {
            scope,
            engine: None,
        }
    }

    pub(crate) fn resolve(&mut self) -> BindingResult<Rc<E>> {
        if !self.scope.is_available() {
            return Err(BindingError::ContextUnavailable);
        }
        if let Some(engine) = &self.engine {
            return engine.upgrade().ok_or(BindingError::ContextUnavailable);
        }
        let engine = self.scope.engine()?;
        self.engine = Some(Rc::downgrade(&engine));
        Ok(engine)
    }

    pub(crate) fn upgrade(&self) -> Option<Rc<E>> {
        self.engine.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn weak(&self) -> Weak<E> {
        self.engine.clone().unwrap_or_default()
    }
}
