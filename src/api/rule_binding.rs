use tracing::{debug, warn};

use crate::engine::{AttributeSpec, Engine, OverrideKind, RuleId, RuleSpec, RuleTarget, Selector};
use crate::error::{BindingError, BindingResult};

use super::engine_scope::EngineLink;
use super::{Binding, EngineScope, HandleSlot, Lifecycle};

#[derive(Debug, Clone)]
pub struct RuleProps {
    pub selector: Option<Selector>,
    pub attributes: AttributeSpec,
}

impl RuleProps {
    #[must_use]
    pub fn new(attributes: impl Into<AttributeSpec>) -> Self {
        Self {
            selector: None,
            attributes: attributes.into(),
        }
    }

    #[must_use]
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Selector and attributes define the rule; the engine cannot change
    /// either in place.
    fn same_identity(&self, other: &Self) -> bool {
        self.selector == other.selector && self.attributes == other.attributes
    }
}

/// Selector-scoped attribute rule for nodes or edges.
pub struct RuleBinding<E: Engine> {
    target: RuleTarget,
    link: EngineLink<E>,
    slot: HandleSlot<RuleId>,
    applied: Option<RuleProps>,
}

impl<E: Engine> RuleBinding<E> {
    #[must_use]
    pub fn nodes(scope: EngineScope<E>) -> Self {
        Self::new(scope, RuleTarget::Nodes)
    }

    #[must_use]
    pub fn edges(scope: EngineScope<E>) -> Self {
        Self::new(scope, RuleTarget::Edges)
    }

    #[must_use]
    pub fn new(scope: EngineScope<E>, target: RuleTarget) -> Self {
        Self {
            target,
            link: EngineLink::new(scope),
            slot: HandleSlot::new(Self::NAME),
            applied: None,
        }
    }

    /// The rule currently registered, if any.
    #[must_use]
    pub fn handle(&self) -> Option<RuleId> {
        self.slot.get()
    }

    fn register(&self, engine: &E, props: &RuleProps) -> RuleId {
        engine.add_rule(RuleSpec {
            target: self.target,
            selector: props.selector.clone(),
            attributes: props.attributes.clone(),
        })
    }

    /// Hands a fresh rule to the slot; a slot torn down meanwhile refuses it
    /// and the rule is destroyed again.
    fn install(&self, engine: &E, rule: RuleId) -> BindingResult<()> {
        if let Err(rule) = self.slot.install(rule) {
            engine.destroy_rule(rule)?;
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        Ok(())
    }
}

impl<E: Engine> Binding for RuleBinding<E> {
    type Props = RuleProps;

    const NAME: &'static str = "rule";

    fn apply(&mut self, props: RuleProps) -> BindingResult<()> {
        if self.slot.lifecycle().is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        match (self.slot.get(), &self.applied) {
            (Some(_), Some(applied)) if applied.same_identity(&props) => return Ok(()),
            (Some(previous), _) => {
                engine.destroy_rule(previous)?;
                self.slot.take();
                let rule = self.register(&engine, &props);
                debug!(rule_target = ?self.target, %previous, %rule, "rule recreated");
                self.install(&engine, rule)?;
            }
            (None, _) => {
                let rule = self.register(&engine, &props);
                debug!(rule_target = ?self.target, %rule, "rule registered");
                self.install(&engine, rule)?;
            }
        }
        self.applied = Some(props);
        Ok(())
    }

    fn teardown(&mut self) {
        let link = &self.link;
        self.slot.teardown(|rule| {
            let Some(engine) = link.upgrade() else {
                return;
            };
            if let Err(err) = engine.destroy_rule(rule) {
                warn!(error = %err, %rule, "failed to destroy rule");
            }
        });
    }

    fn lifecycle(&self) -> Lifecycle {
        self.slot.lifecycle()
    }
}

impl<E: Engine> Drop for RuleBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Engine-global hovered or selected attribute override, held for the
/// binding's lifetime.
///
/// The engine keeps a single override per target and kind: when several
/// bindings declare one, the last applied wins.
pub struct AttributeOverrideBinding<E: Engine> {
    target: RuleTarget,
    kind: OverrideKind,
    link: EngineLink<E>,
    lifecycle: Lifecycle,
    applied: Option<AttributeSpec>,
}

impl<E: Engine> AttributeOverrideBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>, target: RuleTarget, kind: OverrideKind) -> Self {
        Self {
            target,
            kind,
            link: EngineLink::new(scope),
            lifecycle: Lifecycle::Uninitialized,
            applied: None,
        }
    }

    #[must_use]
    pub fn hovered_nodes(scope: EngineScope<E>) -> Self {
        Self::new(scope, RuleTarget::Nodes, OverrideKind::Hovered)
    }

    #[must_use]
    pub fn selected_nodes(scope: EngineScope<E>) -> Self {
        Self::new(scope, RuleTarget::Nodes, OverrideKind::Selected)
    }

    #[must_use]
    pub fn hovered_edges(scope: EngineScope<E>) -> Self {
        Self::new(scope, RuleTarget::Edges, OverrideKind::Hovered)
    }

    #[must_use]
    pub fn selected_edges(scope: EngineScope<E>) -> Self {
        Self::new(scope, RuleTarget::Edges, OverrideKind::Selected)
    }
}

impl<E: Engine> Binding for AttributeOverrideBinding<E> {
    type Props = AttributeSpec;

    const NAME: &'static str = "attribute-override";

    fn apply(&mut self, attributes: AttributeSpec) -> BindingResult<()> {
        if self.lifecycle.is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        if self.applied.as_ref() == Some(&attributes) {
            return Ok(());
        }
        engine.set_attribute_override(self.target, self.kind, Some(attributes.clone()));
        self.applied = Some(attributes);
        self.lifecycle = Lifecycle::Ready;
        Ok(())
    }

    fn teardown(&mut self) {
        if self.lifecycle.is_destroyed() {
            return;
        }
        self.lifecycle = Lifecycle::Destroyed;
        if self.applied.take().is_some() {
            if let Some(engine) = self.link.upgrade() {
                engine.set_attribute_override(self.target, self.kind, None);
            }
        }
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

impl<E: Engine> Drop for AttributeOverrideBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::RuleBinding;
    use crate::api::{Binding, EngineHost, HostProps};
    use crate::core::{Attributes, GraphPayload, Size};
    use crate::engine::{AttributeSpec, Container, Engine, HeadlessEngine, RuleSpec, RuleTarget};
    use crate::error::BindingError;

    #[test]
    fn rule_refused_by_a_torn_down_slot_is_destroyed() {
        let mut host: EngineHost<HeadlessEngine> =
            EngineHost::new(HostProps::new(GraphPayload::default()));
        host.mount(Some(&Container::new("rules", Size::new(100.0, 100.0))))
            .expect("mount");
        let engine = host.engine().expect("engine");
        let mut rule = RuleBinding::nodes(host.scope());
        rule.teardown();

        let late = engine.add_rule(RuleSpec {
            target: RuleTarget::Nodes,
            selector: None,
            attributes: AttributeSpec::Static(Attributes::new()),
        });
        assert!(matches!(
            rule.install(engine.as_ref(), late),
            Err(BindingError::HandleDestroyed { .. })
        ));
        assert!(engine.rule_ids().is_empty());
        assert_eq!(rule.handle(), None);
    }
}
