use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::engine::{Engine, EventHandler, EventKind, ListenerId};

/// Declared `on<Event>` callback props, keyed by the engine event they map to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventHandlerMap {
    handlers: IndexMap<EventKind, EventHandler>,
}

impl EventHandlerMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the map from `(prop name, handler)` pairs such as
    /// `("onClick", handler)`. Names outside the event table are ignored.
    pub fn from_props<'a>(props: impl IntoIterator<Item = (&'a str, EventHandler)>) -> Self {
        let mut map = Self::new();
        for (name, handler) in props {
            match EventKind::from_prop_name(name) {
                Some(kind) => {
                    map.handlers.insert(kind, handler);
                }
                None => debug!(prop = name, "ignoring prop that names no engine event"),
            }
        }
        map
    }

    #[must_use]
    pub fn with(mut self, kind: EventKind, handler: EventHandler) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    pub fn insert(&mut self, kind: EventKind, handler: EventHandler) -> Option<EventHandler> {
        self.handlers.insert(kind, handler)
    }

    pub fn remove(&mut self, kind: EventKind) -> Option<EventHandler> {
        self.handlers.shift_remove(&kind)
    }

    #[must_use]
    pub fn get(&self, kind: EventKind) -> Option<&EventHandler> {
        self.handlers.get(&kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventKind, &EventHandler)> {
        self.handlers.iter().map(|(kind, handler)| (*kind, handler))
    }
}

/// Subscribe/unsubscribe counts of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub subscribed: usize,
    pub unsubscribed: usize,
    pub unchanged: usize,
}

/// Keeps engine subscriptions in step with an [`EventHandlerMap`].
///
/// Reconciling `H1` into `H2` unsubscribes `H1 \ H2`, subscribes `H2 \ H1`
/// and leaves handlers present in both (by reference) untouched. A handler
/// is never subscribed twice.
#[derive(Debug, Default)]
pub struct EventBridge {
    subscribed: IndexMap<EventKind, (EventHandler, ListenerId)>,
}

impl EventBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconcile<E: Engine>(&mut self, engine: &E, next: &EventHandlerMap) -> ReconcileStats {
        let mut stats = ReconcileStats::default();

        let removed: Vec<EventKind> = self
            .subscribed
            .keys()
            .filter(|kind| next.get(**kind).is_none())
            .copied()
            .collect();
        for kind in removed {
            if let Some((_, listener)) = self.subscribed.shift_remove(&kind) {
                engine.off(listener);
                stats.unsubscribed += 1;
                trace!(?kind, "unsubscribed removed handler");
            }
        }

        for (kind, handler) in next.iter() {
            match self.subscribed.get(&kind) {
                Some((current, _)) if current == handler => {
                    stats.unchanged += 1;
                }
                Some((_, listener)) => {
                    engine.off(*listener);
                    stats.unsubscribed += 1;
                    let listener = engine.on(kind, handler.clone());
                    self.subscribed.insert(kind, (handler.clone(), listener));
                    stats.subscribed += 1;
                    trace!(?kind, "replaced handler");
                }
                None => {
                    let listener = engine.on(kind, handler.clone());
                    self.subscribed.insert(kind, (handler.clone(), listener));
                    stats.subscribed += 1;
                    trace!(?kind, "subscribed new handler");
                }
            }
        }
        stats
    }

    /// Unsubscribes everything. Returns the number of listeners removed.
    pub fn clear<E: Engine>(&mut self, engine: &E) -> usize {
        let count = self.subscribed.len();
        for (_, (_, listener)) in self.subscribed.drain(..) {
            engine.off(listener);
        }
        count
    }

    #[must_use]
    pub fn subscribed_kinds(&self) -> Vec<EventKind> {
        self.subscribed.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribed.is_empty()
    }
}
