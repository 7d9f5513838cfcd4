//! Declarative bindings over an [`Engine`](crate::engine::Engine).
//!
//! [`EngineHost`] owns the engine and publishes it through an
//! [`EngineScope`]; every other binding resolves the engine from that scope
//! and owns exactly one engine-side handle for its lifetime.

pub mod canvas_layer_binding;
pub mod config_differ;
pub mod engine_host;
pub mod engine_scope;
pub mod event_bridge;
pub mod geo_binding;
pub mod handle_registry;
pub mod layer_binding;
pub mod lifecycle;
pub mod mouse_position_binding;
pub mod overlay_binding;
pub mod popup_binding;
pub mod rule_binding;
pub mod style_class_binding;
pub mod tooltip_binding;
pub mod tooltip_placement;
pub mod tooltip_trigger;
pub mod transformation_binding;

pub use canvas_layer_binding::{CanvasLayerBinding, CanvasLayerProps};
pub use config_differ::{
    AlwaysChanged, ConfigSnapshot, Content, ContentComparator, ContentRef, MarkupComparator,
    ReferenceComparator, content_changed,
};
pub use engine_host::{EngineHost, HostProps, HostUpdate, ReadyCallback};
pub use engine_scope::EngineScope;
pub use event_bridge::{EventBridge, EventHandlerMap, ReconcileStats};
pub use geo_binding::{GeoModeBinding, GeoModeProps};
pub use handle_registry::{HandleSlot, PendingAdoption};
pub use layer_binding::{LayerBinding, LayerProps};
pub use lifecycle::{Binding, Lifecycle};
pub use mouse_position_binding::{MousePositionBinding, MousePositionProps, PointerCallback};
pub use overlay_binding::{OverlayBinding, OverlayPosition, OverlayProps, PositionFn};
pub use popup_binding::{DomEvent, POPUP_CLOSE_BUTTON, PopupBinding, PopupProps};
pub use rule_binding::{AttributeOverrideBinding, RuleBinding, RuleProps};
pub use style_class_binding::StyleClassBinding;
pub use tooltip_binding::{
    DEFAULT_TOOLTIP_OFFSET, TooltipBinding, TooltipContent, TooltipProps, TooltipRenderFn,
    TooltipState, TooltipTarget,
};
pub use tooltip_placement::TooltipPlacement;
pub use tooltip_trigger::{TooltipTrigger, TriggerGesture, TriggerSubject};
pub use transformation_binding::{
    DrilldownBinding, TransformationBinding, TransformationProps, live_patch,
};
