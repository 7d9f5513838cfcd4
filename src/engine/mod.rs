//! The contract bindings rely on.
//!
//! The engine (graph model, layouts, renderer) is an external collaborator.
//! Anything implementing [`Engine`] can be driven by the bindings in
//! [`crate::api`]; [`HeadlessEngine`] is an in-memory implementation for
//! tests and headless hosts.

mod events;
mod handles;
mod headless;
mod layers;
mod options;
mod style;
mod transformation;

pub use events::{EVENT_PROP_NAMES, EngineEvent, EventHandler, EventKind, MouseButton, PointerEvent};
pub use handles::{
    CanvasLayerId, ClassRequestId, FrameRequestId, LayerId, LayerRef, ListenerId, OverlayId, RuleId,
    StyleClassId, TransformationId,
};
pub use headless::{
    DrawCall, HeadlessEngine, HeadlessStats, LayerSnapshot, OverlaySnapshot, RecordingCanvas,
    TransformationSnapshot,
};
pub use layers::{
    Anchor, CanvasContext, CanvasLayerOptions, OverlayOptions, OverlayUpdate, PaintCallback,
};
pub use options::{
    Container, ENGINE_OPTIONS_JSON_SCHEMA_V1, EngineOptions, EngineOptionsJsonContractV1,
    GeoModeOptions, Theme,
};
pub use style::{
    AttributeFn, AttributeSpec, ClassDefinition, ClassReady, OverrideKind, RuleSpec, RuleTarget,
    Selector,
};
pub use transformation::{
    Easing, GeneratorFn, GroupIdFn, NeighborIdFn, TransformationCallback,
    TransformationCallbacks, TransformationKind, TransformationOptions, TransformationPatch,
    TransformationSpec,
};

use crate::core::{ElementId, GraphPayload, Point, Rect, Size, Target};
use crate::error::EngineResult;

/// Callback run by the engine on its next frame boundary.
pub type FrameCallback = Box<dyn FnOnce()>;

/// Retained-mode graph-visualization engine.
///
/// Methods take `&self`: the engine is a single-threaded, internally mutable
/// runtime shared as `Rc<E>` between the host and every binding. Listeners
/// and frame callbacks may call back into the engine, so implementations
/// must not hold internal borrows while invoking them.
pub trait Engine: 'static {
    fn create(
        container: &Container,
        options: &EngineOptions,
        graph: &GraphPayload,
    ) -> EngineResult<Self>
    where
        Self: Sized;

    // Data.
    fn set_graph(&self, graph: &GraphPayload) -> EngineResult<()>;
    fn set_options(&self, options: &EngineOptions) -> EngineResult<()>;
    fn set_theme(&self, theme: &Theme);

    // Events.
    fn on(&self, kind: EventKind, handler: EventHandler) -> ListenerId;
    /// Like `on`, but the listener is dropped after its first delivery.
    fn once(&self, kind: EventKind, handler: EventHandler) -> ListenerId;
    fn off(&self, listener: ListenerId);

    // Frames.
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId;
    fn cancel_frame(&self, request: FrameRequestId);

    // Styling.
    fn add_rule(&self, rule: RuleSpec) -> RuleId;
    fn destroy_rule(&self, rule: RuleId) -> EngineResult<()>;
    /// Sets (`Some`) or clears (`None`) a global hovered/selected override.
    fn set_attribute_override(
        &self,
        target: RuleTarget,
        kind: OverrideKind,
        attributes: Option<AttributeSpec>,
    );
    /// Creates a named class; it becomes usable on the next frame, when
    /// `ready` runs.
    fn create_class(
        &self,
        name: &str,
        definition: ClassDefinition,
        ready: ClassReady,
    ) -> ClassRequestId;
    /// Replaces the full definition of a class, including a pending one.
    fn update_class(&self, name: &str, definition: ClassDefinition) -> EngineResult<()>;
    fn has_class(&self, name: &str) -> bool;
    /// Request whose creation backs the class currently registered under
    /// `name`.
    fn class_origin(&self, name: &str) -> Option<ClassRequestId>;
    fn destroy_class(&self, name: &str) -> EngineResult<()>;

    // Transformations.
    fn add_transformation(&self, spec: TransformationSpec) -> EngineResult<TransformationId>;
    fn set_transformation_enabled(
        &self,
        transformation: TransformationId,
        enabled: bool,
        duration: Option<f64>,
    ) -> EngineResult<()>;
    fn is_transformation_enabled(&self, transformation: TransformationId) -> Option<bool>;
    /// Queues an option change; it settles on the next frame.
    fn update_transformation(
        &self,
        transformation: TransformationId,
        patch: TransformationPatch,
    ) -> EngineResult<()>;
    fn set_transformation_index(
        &self,
        transformation: TransformationId,
        index: usize,
    ) -> EngineResult<()>;
    fn destroy_transformation(&self, transformation: TransformationId) -> EngineResult<()>;
    fn drill(&self, transformation: TransformationId, target: &Target) -> EngineResult<()>;
    /// Runs `callback` once every pending transformation update settled.
    fn after_transformations_update(&self, callback: FrameCallback);

    // Layers.
    fn add_layer(&self, index: Option<usize>) -> LayerId;
    fn set_layer_class(&self, layer: LayerId, class_name: Option<&str>) -> EngineResult<()>;
    fn set_layer_content(&self, layer: LayerId, markup: &str) -> EngineResult<()>;
    fn add_canvas_layer(
        &self,
        paint: PaintCallback,
        options: CanvasLayerOptions,
        index: Option<usize>,
    ) -> CanvasLayerId;
    fn add_overlay(&self, options: OverlayOptions) -> OverlayId;
    fn update_overlay(&self, overlay: OverlayId, update: OverlayUpdate) -> EngineResult<()>;
    /// Measured screen-space box of an overlay's rendered content.
    fn overlay_bounds(&self, overlay: OverlayId) -> Option<Rect>;
    fn set_layer_visible(&self, layer: LayerRef, visible: bool) -> EngineResult<()>;
    fn move_layer(&self, layer: LayerRef, index: usize) -> EngineResult<()>;
    fn destroy_layer(&self, layer: LayerRef) -> EngineResult<()>;

    // View.
    fn zoom(&self) -> f64;
    fn graph_to_screen(&self, point: Point) -> Point;
    fn screen_to_graph(&self, point: Point) -> Point;
    fn viewport_size(&self) -> Size;
    fn content_bounds(&self) -> Option<Rect>;
    /// Re-reads the container size into the viewport.
    fn resize(&self);
    fn node_position(&self, node: &ElementId) -> Option<Point>;
    fn edge_extremities(&self, edge: &ElementId) -> Option<(Point, Point)>;
    /// Last known pointer position in graph space.
    fn pointer_position(&self) -> Option<Point>;

    // Geo mode.
    fn enable_geo_mode(&self, options: &GeoModeOptions) -> EngineResult<()>;
    fn disable_geo_mode(&self) -> EngineResult<()>;
    fn is_geo_mode_enabled(&self) -> bool;
}
