use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// Shared closure compared by reference.
///
/// Bindings decide whether to resubscribe or recreate engine-side handles by
/// comparing callbacks with `PartialEq`, which only holds for clones of the
/// same allocation. Two closures with identical bodies are different
/// callbacks.
pub struct Callback<F: ?Sized>(Rc<F>);

impl<F: ?Sized> Callback<F> {
    #[must_use]
    pub fn from_rc(inner: Rc<F>) -> Self {
        Self(inner)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }

    #[must_use]
    pub fn as_rc(&self) -> &Rc<F> {
        &self.0
    }
}

impl<F: ?Sized> Clone for Callback<F> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<F: ?Sized> PartialEq for Callback<F> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<F: ?Sized> Eq for Callback<F> {}

impl<F: ?Sized> Deref for Callback<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.0
    }
}

impl<F: ?Sized> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

/// Builds a `Callback` from a closure, coercing it to the target `dyn Fn`.
///
/// ```
/// use graph_sync::callback;
/// use graph_sync::core::Callback;
///
/// let cb: Callback<dyn Fn(u32) -> u32> = callback!(|x: u32| x + 1);
/// assert_eq!(cb(1), 2);
/// ```
#[macro_export]
macro_rules! callback {
    ($closure:expr) => {
        $crate::core::Callback::from_rc(::std::rc::Rc::new($closure))
    };
}
