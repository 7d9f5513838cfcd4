use serde::{Deserialize, Serialize};

use crate::error::BindingResult;

/// Per-binding state machine.
///
/// `Uninitialized -> Ready -> Destroyed`; a destroyed binding never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Ready,
    Destroyed,
}

impl Lifecycle {
    #[must_use]
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }

    #[must_use]
    pub fn is_destroyed(self) -> bool {
        self == Self::Destroyed
    }
}

/// Component owning the lifecycle of one engine-side handle.
///
/// The hosting framework calls `apply` on creation and again whenever it
/// observes a configuration change, and `teardown` when the component goes
/// away. Dropping a binding tears it down as well.
pub trait Binding {
    type Props;

    /// Short name used in logs and usage errors.
    const NAME: &'static str;

    fn apply(&mut self, props: Self::Props) -> BindingResult<()>;

    /// Destroys the owned handle. Idempotent; failures are logged, never
    /// raised, since there is nobody left to handle them.
    fn teardown(&mut self);

    fn lifecycle(&self) -> Lifecycle;
}
