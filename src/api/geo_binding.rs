use tracing::{debug, warn};

use crate::engine::{Engine, GeoModeOptions};
use crate::error::{BindingError, BindingResult};

use super::engine_scope::EngineLink;
use super::{Binding, EngineScope, Lifecycle};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeoModeProps {
    pub enabled: bool,
    pub options: GeoModeOptions,
}

impl GeoModeProps {
    #[must_use]
    pub fn enabled(options: GeoModeOptions) -> Self {
        Self {
            enabled: true,
            options,
        }
    }
}

/// Geographical mode, switched by the `enabled` prop.
///
/// New options while enabled re-enable geo mode with them. Teardown disables
/// geo mode if this binding turned it on.
pub struct GeoModeBinding<E: Engine> {
    link: EngineLink<E>,
    lifecycle: Lifecycle,
    applied: Option<GeoModeProps>,
}

impl<E: Engine> GeoModeBinding<E> {
    #[must_use]
    pub fn new(scope: EngineScope<E>) -> Self {
        Self {
            link: EngineLink::new(scope),
            lifecycle: Lifecycle::Uninitialized,
            applied: None,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.link
            .upgrade()
            .is_some_and(|engine| engine.is_geo_mode_enabled())
    }
}

impl<E: Engine> Binding for GeoModeBinding<E> {
    type Props = GeoModeProps;

    const NAME: &'static str = "geo-mode";

    fn apply(&mut self, props: GeoModeProps) -> BindingResult<()> {
        if self.lifecycle.is_destroyed() {
            return Err(BindingError::HandleDestroyed { binding: Self::NAME });
        }
        let engine = self.link.resolve()?;
        if self.applied.as_ref() == Some(&props) {
            return Ok(());
        }
        let options_changed = self
            .applied
            .as_ref()
            .is_some_and(|applied| applied.options != props.options);
        match (props.enabled, engine.is_geo_mode_enabled()) {
            (true, false) => {
                engine.enable_geo_mode(&props.options)?;
                debug!("geo mode enabled");
            }
            (true, true) if options_changed => {
                engine.disable_geo_mode()?;
                engine.enable_geo_mode(&props.options)?;
                debug!("geo mode re-enabled with new options");
            }
            (false, true) => {
                engine.disable_geo_mode()?;
                debug!("geo mode disabled");
            }
            _ => {}
        }
        self.applied = Some(props);
        self.lifecycle = Lifecycle::Ready;
        Ok(())
    }

    fn teardown(&mut self) {
        if self.lifecycle.is_destroyed() {
            return;
        }
        self.lifecycle = Lifecycle::Destroyed;
        let was_enabled = self.applied.take().is_some_and(|applied| applied.enabled);
        if !was_enabled {
            return;
        }
        let Some(engine) = self.link.upgrade() else {
            return;
        };
        if engine.is_geo_mode_enabled() {
            if let Err(err) = engine.disable_geo_mode() {
                warn!(error = %err, "failed to disable geo mode");
            }
        }
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }
}

impl<E: Engine> Drop for GeoModeBinding<E> {
    fn drop(&mut self) {
        self.teardown();
    }
}
