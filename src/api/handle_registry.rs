use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::error::{BindingError, BindingResult};

use super::Lifecycle;

struct SlotState<H> {
    handle: Option<H>,
    lifecycle: Lifecycle,
    /// Bumped on every teardown so late async results can tell they are stale.
    generation: u64,
}

/// Tracks the single engine-owned handle of one binding instance.
///
/// The slot is shared with async continuations through [`PendingAdoption`]
/// tokens; everything else goes through the owning binding.
pub struct HandleSlot<H> {
    binding: &'static str,
    state: Rc<RefCell<SlotState<H>>>,
}

impl<H: Clone> HandleSlot<H> {
    #[must_use]
    pub fn new(binding: &'static str) -> Self {
        Self {
            binding,
            state: Rc::new(RefCell::new(SlotState {
                handle: None,
                lifecycle: Lifecycle::Uninitialized,
                generation: 0,
            })),
        }
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.borrow().lifecycle
    }

    #[must_use]
    pub fn get(&self) -> Option<H> {
        self.state.borrow().handle.clone()
    }

    /// The live handle, or the usage error describing why there is none.
    pub fn require(&self) -> BindingResult<H> {
        let state = self.state.borrow();
        match (&state.handle, state.lifecycle) {
            (_, Lifecycle::Destroyed) => Err(BindingError::HandleDestroyed {
                binding: self.binding,
            }),
            (Some(handle), _) => Ok(handle.clone()),
            (None, _) => Err(BindingError::NotReady {
                binding: self.binding,
            }),
        }
    }

    /// Stores a freshly created handle and returns the one it replaces.
    ///
    /// Installing into a destroyed slot is refused: the handle comes back as
    /// `Err` for the caller to destroy.
    pub fn install(&self, handle: H) -> Result<Option<H>, H> {
        let mut state = self.state.borrow_mut();
        if state.lifecycle.is_destroyed() {
            return Err(handle);
        }
        state.lifecycle = Lifecycle::Ready;
        Ok(state.handle.replace(handle))
    }

    /// Removes the handle without ending the slot's life, for recreation.
    pub fn take(&self) -> Option<H> {
        self.state.borrow_mut().handle.take()
    }

    /// Token for an async creation that will resolve later.
    #[must_use]
    pub fn begin_pending(&self) -> PendingAdoption<H> {
        PendingAdoption {
            binding: self.binding,
            slot: Rc::downgrade(&self.state),
            generation: self.state.borrow().generation,
        }
    }

    /// Ends the slot's life, handing the current handle (if any) to `destroy`.
    /// Calling it again is a no-op.
    pub fn teardown(&self, destroy: impl FnOnce(H)) {
        let handle = {
            let mut state = self.state.borrow_mut();
            if state.lifecycle.is_destroyed() {
                return;
            }
            state.lifecycle = Lifecycle::Destroyed;
            state.generation += 1;
            state.handle.take()
        };
        if let Some(handle) = handle {
            destroy(handle);
        }
    }
}

impl<H> fmt::Debug for HandleSlot<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("HandleSlot")
            .field("binding", &self.binding)
            .field("lifecycle", &state.lifecycle)
            .field("has_handle", &state.handle.is_some())
            .finish()
    }
}

/// Liveness token captured when an async creation starts.
///
/// When the creation resolves, [`PendingAdoption::adopt`] stores the handle
/// only if the slot still belongs to the same live binding instance;
/// otherwise the handle is given back so the caller can destroy it.
pub struct PendingAdoption<H> {
    binding: &'static str,
    slot: Weak<RefCell<SlotState<H>>>,
    generation: u64,
}

impl<H> PendingAdoption<H> {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.slot.upgrade().is_some_and(|slot| {
            let state = slot.borrow();
            state.generation == self.generation && !state.lifecycle.is_destroyed()
        })
    }

    pub fn adopt(self, handle: H) -> Result<(), H> {
        let Some(slot) = self.slot.upgrade() else {
            debug!(binding = self.binding, "async handle resolved after its binding was dropped");
            return Err(handle);
        };
        let mut state = slot.borrow_mut();
        if state.generation != self.generation || state.lifecycle.is_destroyed() {
            debug!(binding = self.binding, "async handle resolved after teardown");
            return Err(handle);
        }
        state.handle = Some(handle);
        state.lifecycle = Lifecycle::Ready;
        Ok(())
    }
}

impl<H> fmt::Debug for PendingAdoption<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAdoption")
            .field("binding", &self.binding)
            .field("generation", &self.generation)
            .finish()
    }
}
