use tracing::{debug, warn};

use crate::core::Target;
use crate::engine::{
    Engine, TransformationCallbacks, TransformationId, TransformationKind, TransformationOptions,
    TransformationPatch, TransformationSpec,
};
use crate::error::{BindingError, BindingResult};

use super::engine_scope::EngineLink;
use super::{Binding, EngineScope, HandleSlot, Lifecycle};

/// Declarative configuration of a transformation.
///
/// `disabled` defaults to `false`, so a declared transformation is enabled
/// unless told otherwise. `callbacks` are only read when the transformation
/// is registered.
#[derive(Debug, Clone, Default)]
pub struct TransformationProps {
    pub options: TransformationOptions,
    pub disabled: bool,
    /// Transition length in milliseconds for enable/disable.
    pub duration: Option<f64>,
    pub index: Option<usize>,
    pub callbacks: TransformationCallbacks,
}

impl TransformationProps {
    #[must_use]
    pub fn new(options: TransformationOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn with_callbacks(mut self, callbacks: TransformationCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }
}

/// Patch covering the options the engine can change without recreating the
/// transformation. Everything else needs a remount.
#[must_use]
pub fn live_patch(
    previous: &TransformationOptions,
    next: &TransformationOptions,
) -> TransformationPatch {
    fn changed<T: PartialEq + Clone>(previous: &T, next: &T) -> Option<T> {
        (previous != next).then(|| next.clone())
    }

    TransformationPatch {
        selector: changed(&previous.selector, &next.selector),
        criteria: changed(&previous.criteria, &next.criteria),
        group_id_function: changed(&previous.group_id_function, &next.group_id_function),
        node_generator: changed(&previous.node_generator, &next.node_generator),
        edge_generator: changed(&previous.edge_generator, &next.edge_generator),
        neighbor_id_function: changed(
            &previous.neighbor_id_function,
            &next.neighbor_id_function,
        ),
        separate_edges_by_direction: changed(
            &previous.separate_edges_by_direction,
            &next.separate_edges_by_direction,
        ),
        depth: changed(&previous.depth, &next.depth),
        padding: changed(&previous.padding, &next.padding),
        easing: changed(&previous.easing, &next.easing),
    }
}

fn construction_only_changed(previous: &TransformationOptions, next: &TransformationOptions) -> bool {
    previous.show_contents != next.show_contents || previous.extra != next.extra
}

/// One engine transformation: grouping, filtering, collapsing, merging or
/// neighbor generation.
///
/// Toggling `disabled` enables or disables the live transformation; the
/// engine is only called when the desired state differs from its actual one.
pub struct TransformationBinding<E: Engine> {
    kind: TransformationKind,
    link: EngineLink<E>,
    slot: HandleSlot<TransformationId>,
    applied: Option<TransformationProps>,
}

impl<E: Engine> TransformationBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>, kind: TransformationKind) -> Self {
        Self {
            kind,
            link: EngineLink::new(scope),
            slot: HandleSlot::new(Self::NAME),
            applied: None,
        }
    }

    #[must_use]
    pub fn node_grouping(scope: EngineScope<E>) -> Self {
        Self::new(scope, TransformationKind::NodeGrouping)
    }

    #[must_use]
    pub fn edge_grouping(scope: EngineScope<E>) -> Self {
        Self::new(scope, TransformationKind::EdgeGrouping)
    }

    #[must_use]
    pub fn node_filter(scope: EngineScope<E>) -> Self {
        Self::new(scope, TransformationKind::NodeFilter)
    }

    #[must_use]
    pub fn edge_filter(scope: EngineScope<E>) -> Self {
        Self::new(scope, TransformationKind::EdgeFilter)
    }

    #[must_use]
    pub fn node_collapsing(scope: EngineScope<E>) -> Self {
        Self::new(scope, TransformationKind::NodeCollapsing)
    }

    #[must_use]
    pub fn node_merging(scope: EngineScope<E>) -> Self {
        Self::new(scope, TransformationKind::NodeMerging)
    }

    #[must_use]
    pub fn neighbor_generation(scope: EngineScope<E>) -> Self {
        Self::new(scope, TransformationKind::NeighborGeneration)
    }

    #[must_use]
    pub fn neighbor_merging(scope: EngineScope<E>) -> Self {
        Self::new(scope, TransformationKind::NeighborMerging)
    }

    #[must_use]
    pub fn kind(&self) -> TransformationKind {
        self.kind
    }

    #[must_use]
    pub fn handle(&self) -> Option<TransformationId> {
        self.slot.get()
    }

    /// Actual engine state, which may lag behind `disabled` while a toggle
    /// is animating or after an external call.
    #[must_use]
    pub fn is_enabled(&self) -> Option<bool> {
        let transformation = self.slot.get()?;
        self.link.upgrade()?.is_transformation_enabled(transformation)
    }

    fn register(&self, engine: &E, props: &TransformationProps) -> BindingResult<TransformationId> {
        let transformation = engine.add_transformation(TransformationSpec {
            kind: self.kind,
            options: props.options.clone(),
            enabled: !props.disabled,
            duration: props.duration,
            index: props.index,
            callbacks: props.callbacks.clone(),
        })?;
        debug!(
            kind = self.kind.name(),
            %transformation,
            enabled = !props.disabled,
            "transformation registered"
        );
        Ok(transformation)
    }

    fn create(&mut self, engine: &E, props: TransformationProps) -> BindingResult<()> {
        let transformation = self.register(engine, &props)?;
        if let Err(transformation) = self.slot.install(transformation) {
            engine.destroy_transformation(transformation)?;
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        self.applied = Some(props);
        Ok(())
    }

    /// Destroys the live transformation and registers a fresh one.
    fn recreate(&mut self, engine: &E, props: TransformationProps) -> BindingResult<()> {
        // The slot keeps tracking the old transformation until the engine
        // actually let go of it.
        if let Some(previous) = self.slot.get() {
            engine.destroy_transformation(previous)?;
            self.slot.take();
            debug!(kind = self.kind.name(), %previous, "transformation destroyed for recreation");
        }
        self.applied = None;
        self.create(engine, props)
    }

    fn update(
        &mut self,
        engine: &E,
        transformation: TransformationId,
        props: TransformationProps,
    ) -> BindingResult<()> {
        let Some(applied) = self.applied.as_mut() else {
            return Ok(());
        };

        let patch = live_patch(&applied.options, &props.options);
        if !patch.is_empty() {
            engine.update_transformation(transformation, patch)?;
            debug!(kind = self.kind.name(), %transformation, "transformation options patched");
        }
        if construction_only_changed(&applied.options, &props.options) {
            debug!(
                kind = self.kind.name(),
                %transformation,
                "ignoring construction-only option change; remount to apply it"
            );
        }
        applied.options = props.options;

        if props.index != applied.index {
            if let Some(index) = props.index {
                engine.set_transformation_index(transformation, index)?;
            }
            applied.index = props.index;
        }

        let desired = !props.disabled;
        if engine.is_transformation_enabled(transformation) != Some(desired) {
            engine.set_transformation_enabled(transformation, desired, props.duration)?;
            debug!(kind = self.kind.name(), %transformation, enabled = desired, "transformation toggled");
        }
        applied.disabled = props.disabled;
        applied.duration = props.duration;
        Ok(())
    }
}

impl<E: Engine> Binding for TransformationBinding<E> {
    type Props = TransformationProps;

    const NAME: &'static str = "transformation";

    fn apply(&mut self, props: TransformationProps) -> BindingResult<()> {
        if self.slot.lifecycle().is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        match self.slot.get() {
            None => self.create(&engine, props),
            Some(transformation) => self.update(&engine, transformation, props),
        }
    }

    fn teardown(&mut self) {
        let link = &self.link;
        let kind = self.kind;
        self.slot.teardown(|transformation| {
            let Some(engine) = link.upgrade() else {
                return;
            };
            match engine.destroy_transformation(transformation) {
                Ok(()) => debug!(kind = kind.name(), %transformation, "transformation destroyed"),
                Err(err) => warn!(error = %err, %transformation, "failed to destroy transformation"),
            }
        });
    }

    fn lifecycle(&self) -> Lifecycle {
        self.slot.lifecycle()
    }
}

impl<E: Engine> Drop for TransformationBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Drilldown transformation with an imperative [`DrilldownBinding::drill`].
///
/// Drill state belongs to one transformation instance, so flipping
/// `disabled` recreates the transformation instead of toggling it. Other
/// option changes are patched in place like any transformation.
pub struct DrilldownBinding<E: Engine> {
    inner: TransformationBinding<E>,
}

impl<E: Engine> DrilldownBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>) -> Self {
        Self {
            inner: TransformationBinding::new(scope, TransformationKind::Drilldown),
        }
    }

    #[must_use]
    pub fn handle(&self) -> Option<TransformationId> {
        self.inner.handle()
    }

    #[must_use]
    pub fn is_enabled(&self) -> Option<bool> {
        self.inner.is_enabled()
    }

    /// Drills into `target`. Fails with a usage error before the
    /// transformation exists or after teardown.
    pub fn drill(&mut self, target: &Target) -> BindingResult<()> {
        let transformation = self.inner.slot.require()?;
        let engine = self.inner.link.resolve()?;
        engine.drill(transformation, target)?;
        debug!(%transformation, ?target, "drilled");
        Ok(())
    }
}

impl<E: Engine> Binding for DrilldownBinding<E> {
    type Props = TransformationProps;

    const NAME: &'static str = "drilldown";

    fn apply(&mut self, props: TransformationProps) -> BindingResult<()> {
        let inner = &mut self.inner;
        if inner.slot.lifecycle().is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = inner.link.resolve()?;
        let toggled = inner
            .applied
            .as_ref()
            .is_some_and(|applied| applied.disabled != props.disabled);
        match inner.slot.get() {
            None => inner.create(&engine, props),
            Some(_) if toggled => inner.recreate(&engine, props),
            Some(transformation) => inner.update(&engine, transformation, props),
        }
    }

    fn teardown(&mut self) {
        self.inner.teardown();
    }

    fn lifecycle(&self) -> Lifecycle {
        self.inner.lifecycle()
    }
}
