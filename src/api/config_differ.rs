//! Equality policies deciding whether a binding must talk to the engine.
//!
//! Plain data (graph payloads, options, themes, attribute maps) compares by
//! deep content; callbacks compare by reference (see [`crate::core::Callback`]);
//! child content goes through a pluggable [`ContentComparator`].

use std::fmt;
use std::rc::Rc;

/// `true` when `next` differs from the last applied value, or nothing was
/// applied yet.
#[must_use]
pub fn content_changed<T: PartialEq>(previous: Option<&T>, next: &T) -> bool {
    previous != Some(next)
}

/// Last configuration successfully pushed to the engine for one concern.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot<T> {
    applied: Option<T>,
}

impl<T> Default for ConfigSnapshot<T> {
    fn default() -> Self {
        Self { applied: None }
    }
}

impl<T: PartialEq + Clone> ConfigSnapshot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot that already holds the value the engine was built with.
    #[must_use]
    pub fn applied(value: T) -> Self {
        Self {
            applied: Some(value),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.applied.as_ref()
    }

    #[must_use]
    pub fn differs(&self, next: &T) -> bool {
        content_changed(self.applied.as_ref(), next)
    }

    /// Runs `push` only when `next` differs, and records `next` once `push`
    /// succeeded. Returns whether anything was pushed.
    pub fn sync_with<E>(
        &mut self,
        next: &T,
        push: impl FnOnce(&T) -> Result<(), E>,
    ) -> Result<bool, E> {
        if !self.differs(next) {
            return Ok(false);
        }
        push(next)?;
        self.applied = Some(next.clone());
        Ok(true)
    }
}

/// Child content of a declarative component.
pub trait Content {
    /// Static markup of the content, or `None` when it cannot be rendered
    /// outside of its live tree (stateful or context-dependent children).
    fn render_markup(&self) -> Option<String>;
}

impl Content for String {
    fn render_markup(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl Content for &'static str {
    fn render_markup(&self) -> Option<String> {
        Some((*self).to_owned())
    }
}

pub type ContentRef = Rc<dyn Content>;

/// Decides whether two child contents are observably the same.
pub trait ContentComparator {
    fn same_content(&self, previous: &ContentRef, next: &ContentRef) -> bool;
}

/// Compares rendered markup, falling back to reference equality when either
/// side cannot be rendered statically.
///
/// This is an approximation: different live states that render identical
/// markup compare equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupComparator;

impl ContentComparator for MarkupComparator {
    fn same_content(&self, previous: &ContentRef, next: &ContentRef) -> bool {
        if Rc::ptr_eq(previous, next) {
            return true;
        }
        match (previous.render_markup(), next.render_markup()) {
            (Some(previous), Some(next)) => previous == next,
            _ => false,
        }
    }
}

/// Only the very same content instance compares equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceComparator;

impl ContentComparator for ReferenceComparator {
    fn same_content(&self, previous: &ContentRef, next: &ContentRef) -> bool {
        Rc::ptr_eq(previous, next)
    }
}

/// Treats content as changed on every comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysChanged;

impl ContentComparator for AlwaysChanged {
    fn same_content(&self, _previous: &ContentRef, _next: &ContentRef) -> bool {
        false
    }
}

/// Optional content equality through `comparator`.
#[must_use]
pub fn same_optional_content(
    comparator: &dyn ContentComparator,
    previous: Option<&ContentRef>,
    next: Option<&ContentRef>,
) -> bool {
    match (previous, next) {
        (None, None) => true,
        (Some(previous), Some(next)) => comparator.same_content(previous, next),
        _ => false,
    }
}

impl fmt::Debug for dyn Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render_markup() {
            Some(markup) => write!(f, "Content({markup:?})"),
            None => f.write_str("Content(<live>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{
        AlwaysChanged, ConfigSnapshot, Content, ContentComparator, ContentRef, MarkupComparator,
        ReferenceComparator,
    };

    struct Live;

    impl Content for Live {
        fn render_markup(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn snapshot_pushes_only_on_content_change() {
        let mut snapshot = ConfigSnapshot::<Vec<u32>>::new();
        let mut pushes = 0;
        let mut outcomes = Vec::new();
        for value in [vec![1], vec![1], vec![1, 2], vec![1, 2]] {
            let pushed = snapshot
                .sync_with(&value, |_| {
                    pushes += 1;
                    Ok::<(), ()>(())
                })
                .expect("push");
            outcomes.push(pushed);
        }
        assert_eq!(outcomes, vec![true, false, true, false]);
        assert_eq!(pushes, 2);
        assert_eq!(snapshot.get(), Some(&vec![1, 2]));
    }

    #[test]
    fn failed_push_keeps_previous_snapshot() {
        let mut snapshot = ConfigSnapshot::applied(1_u32);
        assert_eq!(snapshot.sync_with(&2, |_| Err("rejected")), Err("rejected"));
        assert_eq!(snapshot.get(), Some(&1));
    }

    #[test]
    fn markup_comparator_falls_back_to_reference() {
        let a: ContentRef = Rc::new(String::from("<b>x</b>"));
        let b: ContentRef = Rc::new(String::from("<b>x</b>"));
        let live: ContentRef = Rc::new(Live);
        let other_live: ContentRef = Rc::new(Live);

        assert!(MarkupComparator.same_content(&a, &b));
        assert!(MarkupComparator.same_content(&live, &Rc::clone(&live)));
        assert!(!MarkupComparator.same_content(&live, &other_live));
        assert!(!ReferenceComparator.same_content(&a, &b));
        assert!(!AlwaysChanged.same_content(&a, &a));
    }
}
