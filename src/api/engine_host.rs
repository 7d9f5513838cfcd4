use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Callback, GraphPayload};
use crate::engine::{Container, Engine, EngineOptions, Theme};
use crate::error::{BindingError, BindingResult};

use super::config_differ::{
    ConfigSnapshot, ContentComparator, ContentRef, MarkupComparator, same_optional_content,
};
use super::{Binding, EngineScope, EventBridge, EventHandlerMap, Lifecycle, ReconcileStats};

pub type ReadyCallback<E> = Callback<dyn Fn(&Rc<E>)>;

/// Declarative configuration of an [`EngineHost`].
pub struct HostProps<E: Engine> {
    pub options: EngineOptions,
    pub graph: GraphPayload,
    pub theme: Option<Theme>,
    pub handlers: EventHandlerMap,
    pub children: Option<ContentRef>,
    pub on_ready: Option<ReadyCallback<E>>,
}

impl<E: Engine> HostProps<E> {
    #[must_use]
    pub fn new(graph: GraphPayload) -> Self {
        Self {
            options: EngineOptions::default(),
            graph,
            theme: None,
            handlers: EventHandlerMap::new(),
            children: None,
            on_ready: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    #[must_use]
    pub fn with_handlers(mut self, handlers: EventHandlerMap) -> Self {
        self.handlers = handlers;
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: ContentRef) -> Self {
        self.children = Some(children);
        self
    }

    #[must_use]
    pub fn with_on_ready(mut self, on_ready: ReadyCallback<E>) -> Self {
        self.on_ready = Some(on_ready);
        self
    }
}

impl<E: Engine> Clone for HostProps<E> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            graph: self.graph.clone(),
            theme: self.theme.clone(),
            handlers: self.handlers.clone(),
            children: self.children.clone(),
            on_ready: self.on_ready.clone(),
        }
    }
}

impl<E: Engine> fmt::Debug for HostProps<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostProps")
            .field("options", &self.options)
            .field("graph_nodes", &self.graph.nodes.len())
            .field("graph_edges", &self.graph.edges.len())
            .field("theme", &self.theme.is_some())
            .field("handlers", &self.handlers.len())
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

/// What one `update` pushed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostUpdate {
    /// `false` when the props were observably unchanged and nothing ran.
    pub rerendered: bool,
    pub graph_replaced: bool,
    pub options_patched: bool,
    pub theme_applied: bool,
    pub events: ReconcileStats,
}

/// Root binding: creates and owns the single engine bound to a container and
/// publishes it to descendant bindings through its [`EngineScope`].
pub struct EngineHost<E: Engine> {
    scope: EngineScope<E>,
    engine: Option<Rc<E>>,
    container: Option<Container>,
    props: HostProps<E>,
    lifecycle: Lifecycle,
    graph: ConfigSnapshot<GraphPayload>,
    options: ConfigSnapshot<EngineOptions>,
    theme: ConfigSnapshot<Theme>,
    events: EventBridge,
    comparator: Box<dyn ContentComparator>,
}

impl<E: Engine> EngineHost<E> {
    #[must_use]
    pub fn new(props: HostProps<E>) -> Self {
        Self {
            scope: EngineScope::new(),
            engine: None,
            container: None,
            props,
            lifecycle: Lifecycle::Uninitialized,
            graph: ConfigSnapshot::new(),
            options: ConfigSnapshot::new(),
            theme: ConfigSnapshot::new(),
            events: EventBridge::new(),
            comparator: Box::new(MarkupComparator),
        }
    }

    /// Replaces the comparator used for child content in [`Self::props_unchanged`].
    #[must_use]
    pub fn with_comparator(mut self, comparator: impl ContentComparator + 'static) -> Self {
        self.comparator = Box::new(comparator);
        self
    }

    /// Capability handed to descendant bindings.
    #[must_use]
    pub fn scope(&self) -> EngineScope<E> {
        self.scope.clone()
    }

    /// The engine, for imperative use by the integrator.
    pub fn engine(&self) -> BindingResult<Rc<E>> {
        self.scope.engine()
    }

    #[must_use]
    pub fn props(&self) -> &HostProps<E> {
        &self.props
    }

    /// Creates the engine in `container`.
    ///
    /// No-op (returns `Ok(false)`) while the container is not available yet,
    /// or when an engine already exists: construction happens exactly once
    /// per container lifetime. Engine refusals propagate unchanged.
    pub fn mount(&mut self, container: Option<&Container>) -> BindingResult<bool> {
        let Some(container) = container else {
            return Ok(false);
        };
        if self.engine.is_some() {
            return Ok(false);
        }
        if self.lifecycle.is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }

        let engine = Rc::new(E::create(container, &self.props.options, &self.props.graph)?);
        self.graph = ConfigSnapshot::applied(self.props.graph.clone());
        self.options = ConfigSnapshot::applied(self.props.options.clone());
        if let Some(theme) = &self.props.theme {
            engine.set_theme(theme);
            self.theme = ConfigSnapshot::applied(theme.clone());
        }
        self.events.reconcile(engine.as_ref(), &self.props.handlers);
        engine.resize();

        self.container = Some(container.clone());
        self.engine = Some(Rc::clone(&engine));
        self.scope.publish(Rc::clone(&engine));
        self.lifecycle = Lifecycle::Ready;
        debug!(container = container.id(), "engine created");

        if let Some(on_ready) = &self.props.on_ready {
            on_ready(&engine);
        }
        Ok(true)
    }

    /// Observable prop equality: data by deep content, handlers and the ready
    /// callback by reference, children through the configured comparator.
    #[must_use]
    pub fn props_unchanged(&self, next: &HostProps<E>) -> bool {
        let current = &self.props;
        current.graph == next.graph
            && current.options == next.options
            && current.theme == next.theme
            && current.handlers == next.handlers
            && current.on_ready == next.on_ready
            && same_optional_content(
                self.comparator.as_ref(),
                current.children.as_ref(),
                next.children.as_ref(),
            )
    }

    /// Applies a re-render. Skips everything when the props are observably
    /// unchanged; otherwise reconciles graph, options, theme and events
    /// independently.
    ///
    /// A refusal in one concern does not stop the others. The first refusal
    /// is returned and the previous props are kept, so the next render with
    /// the same props retries what failed.
    pub fn update(&mut self, next: HostProps<E>) -> BindingResult<HostUpdate> {
        if self.props_unchanged(&next) {
            return Ok(HostUpdate::default());
        }
        let Some(engine) = self.engine.clone() else {
            self.props = next;
            return Ok(HostUpdate {
                rerendered: true,
                ..HostUpdate::default()
            });
        };

        let mut first_error = None;
        let mut update = self.reconcile(engine.as_ref(), &next, &mut first_error);
        update.events = self.events.reconcile(engine.as_ref(), &next.handlers);
        if let Some(err) = first_error {
            debug!(error = %err, "host render partially refused");
            return Err(err);
        }
        self.props = next;
        Ok(update)
    }

    /// Pushes graph, options and theme, each only when its content changed.
    /// Refusals are recorded in `first_error` without skipping later concerns.
    fn reconcile(
        &mut self,
        engine: &E,
        next: &HostProps<E>,
        first_error: &mut Option<BindingError>,
    ) -> HostUpdate {
        let mut settle = |result: Result<bool, BindingError>| {
            result.unwrap_or_else(|err| {
                if first_error.is_none() {
                    *first_error = Some(err);
                }
                false
            })
        };
        let graph_replaced = settle(
            self.graph
                .sync_with(&next.graph, |graph| engine.set_graph(graph))
                .map_err(BindingError::from),
        );
        let options_patched = settle(
            self.options
                .sync_with(&next.options, |options| engine.set_options(options))
                .map_err(BindingError::from),
        );
        let theme_applied = match &next.theme {
            Some(theme) => settle(self.theme.sync_with(theme, |theme| {
                engine.set_theme(theme);
                Ok(())
            })),
            // A removed theme falls back to the engine's default look.
            None if self.theme.get().is_some() => {
                engine.set_theme(&Theme::default());
                self.theme = ConfigSnapshot::new();
                true
            }
            None => false,
        };
        if graph_replaced || options_patched || theme_applied {
            debug!(graph_replaced, options_patched, theme_applied, "host reconciled");
        }
        HostUpdate {
            rerendered: true,
            graph_replaced,
            options_patched,
            theme_applied,
            events: ReconcileStats::default(),
        }
    }

    /// Container size changed; the engine re-reads it into its viewport.
    pub fn on_container_resize(&self) -> BindingResult<()> {
        let engine = self.engine()?;
        engine.resize();
        Ok(())
    }

    #[must_use]
    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    #[must_use]
    pub fn subscribed_events(&self) -> usize {
        self.events.len()
    }
}

impl<E: Engine> Binding for EngineHost<E> {
    type Props = HostProps<E>;

    const NAME: &'static str = "engine-host";

    fn apply(&mut self, props: HostProps<E>) -> BindingResult<()> {
        self.update(props).map(|_| ())
    }

    fn teardown(&mut self) {
        if self.lifecycle.is_destroyed() {
            return;
        }
        self.lifecycle = Lifecycle::Destroyed;
        if let Some(engine) = self.engine.take() {
            let removed = self.events.clear(engine.as_ref());
            debug!(listeners = removed, "engine host torn down");
        }
        self.scope.revoke();
        self.container = None;
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

impl<E: Engine> Drop for EngineHost<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<E: Engine> fmt::Debug for EngineHost<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHost")
            .field("lifecycle", &self.lifecycle)
            .field("container", &self.container.as_ref().map(Container::id))
            .field("subscribed_events", &self.events.len())
            .finish_non_exhaustive()
    }
}
