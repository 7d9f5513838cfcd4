use std::cell::RefCell;
use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::core::{
    Attributes, Element, ElementId, ElementKind, GraphPayload, Point, Rect, Size, Target,
};
use crate::error::{EngineRejection, EngineResult};

use super::{
    AttributeSpec, CanvasContext, CanvasLayerId, CanvasLayerOptions, ClassDefinition, ClassReady,
    ClassRequestId,
    Container, Engine, EngineEvent, EngineOptions, EventHandler, EventKind, FrameCallback,
    FrameRequestId, GeoModeOptions, LayerId, LayerRef, ListenerId, OverlayId, OverlayOptions,
    OverlayUpdate, OverrideKind, PaintCallback, RuleId, RuleSpec, RuleTarget, StyleClassId,
    Theme, TransformationCallbacks, TransformationId, TransformationKind, TransformationOptions,
    TransformationPatch, TransformationSpec,
};

const DEFAULT_OVERLAY_SIZE: Size = Size::new(120.0, 40.0);
const DEFAULT_GROUP_KEY: &str = "group";

/// Call counters exposed for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeadlessStats {
    pub set_graph_calls: usize,
    pub set_options_calls: usize,
    pub set_theme_calls: usize,
    pub resize_calls: usize,
    pub subscribe_calls: usize,
    pub unsubscribe_calls: usize,
    pub rules_added: usize,
    pub rules_destroyed: usize,
    pub override_calls: usize,
    pub classes_created: usize,
    pub class_updates: usize,
    pub classes_destroyed: usize,
    pub transformations_added: usize,
    pub transformations_destroyed: usize,
    pub transformation_toggles: usize,
    pub transformation_updates: usize,
    pub frames: usize,
    pub paints: usize,
}

/// One recorded canvas operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear,
    FillRect { rect: Rect, color: String },
    StrokeLine { from: Point, to: Point, color: String, width: f64 },
    FillText { text: String, at: Point, color: String },
}

/// Canvas context that records draw calls instead of rasterizing them.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub calls: Vec<DrawCall>,
}

impl CanvasContext for RecordingCanvas {
    fn clear(&mut self) {
        self.calls.push(DrawCall::Clear);
    }

    fn fill_rect(&mut self, rect: Rect, color: &str) {
        self.calls.push(DrawCall::FillRect {
            rect,
            color: color.to_owned(),
        });
    }

    fn stroke_line(&mut self, from: Point, to: Point, color: &str, width: f64) {
        self.calls.push(DrawCall::StrokeLine {
            from,
            to,
            color: color.to_owned(),
            width,
        });
    }

    fn fill_text(&mut self, text: &str, at: Point, color: &str) {
        self.calls.push(DrawCall::FillText {
            text: text.to_owned(),
            at,
            color: color.to_owned(),
        });
    }
}

/// Read-only copy of a DOM or canvas layer's state.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSnapshot {
    pub class_name: Option<String>,
    pub content: String,
    pub content_writes: usize,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySnapshot {
    pub options: OverlayOptions,
    pub content_writes: usize,
}

#[derive(Debug, Clone)]
pub struct TransformationSnapshot {
    pub kind: TransformationKind,
    pub enabled: bool,
    pub options: TransformationOptions,
    pub last_duration: Option<f64>,
    pub drilled: Vec<Target>,
}

#[derive(Debug, Clone)]
struct VisibleNode {
    id: ElementId,
    data: Value,
    attributes: Attributes,
    is_virtual: bool,
    position: Point,
}

#[derive(Debug, Clone)]
struct VisibleEdge {
    id: ElementId,
    source: ElementId,
    target: ElementId,
    data: Value,
    is_virtual: bool,
}

#[derive(Debug, Clone, Default)]
struct VisibleGraph {
    nodes: Vec<VisibleNode>,
    edges: Vec<VisibleEdge>,
}

impl VisibleNode {
    fn element(&self) -> Element<'_> {
        Element {
            kind: ElementKind::Node,
            id: &self.id,
            data: &self.data,
            is_virtual: self.is_virtual,
        }
    }
}

impl VisibleEdge {
    fn element(&self) -> Element<'_> {
        Element {
            kind: ElementKind::Edge,
            id: &self.id,
            data: &self.data,
            is_virtual: self.is_virtual,
        }
    }
}

struct ListenerEntry {
    kind: EventKind,
    handler: EventHandler,
    once: bool,
}

struct PendingClass {
    request: ClassRequestId,
    name: String,
    definition: ClassDefinition,
    ready: ClassReady,
}

struct TransformationEntry {
    kind: TransformationKind,
    options: TransformationOptions,
    callbacks: TransformationCallbacks,
    enabled: bool,
    last_duration: Option<f64>,
    drilled: Vec<Target>,
}

struct DomLayerEntry {
    class_name: Option<String>,
    content: String,
    content_writes: usize,
}

struct CanvasEntry {
    paint: PaintCallback,
    options: CanvasLayerOptions,
    draws: Vec<DrawCall>,
}

struct OverlayEntry {
    options: OverlayOptions,
    content_writes: usize,
}

struct State {
    options: EngineOptions,
    theme: Option<Theme>,
    graph: GraphPayload,
    viewport: Size,
    zoom: f64,
    center: Point,
    pointer: Option<Point>,
    geo_mode: bool,
    next_id: u64,
    listeners: IndexMap<ListenerId, ListenerEntry>,
    frames: IndexMap<FrameRequestId, FrameCallback>,
    rules: IndexMap<RuleId, RuleSpec>,
    overrides: HashMap<(RuleTarget, OverrideKind), AttributeSpec>,
    classes: IndexMap<String, ClassDefinition>,
    pending_classes: Vec<PendingClass>,
    class_origins: HashMap<String, ClassRequestId>,
    transformations: IndexMap<TransformationId, TransformationEntry>,
    pending_patches: Vec<(TransformationId, TransformationPatch)>,
    after_update: Vec<FrameCallback>,
    layer_order: Vec<LayerRef>,
    layer_visibility: HashMap<LayerRef, bool>,
    dom_layers: HashMap<LayerId, DomLayerEntry>,
    canvas_layers: HashMap<CanvasLayerId, CanvasEntry>,
    overlays: HashMap<OverlayId, OverlayEntry>,
    default_overlay_size: Size,
    stats: HeadlessStats,
}

impl State {
    fn new(viewport: Size, options: EngineOptions, graph: GraphPayload) -> Self {
        Self {
            options,
            theme: None,
            graph,
            viewport,
            zoom: 1.0,
            center: Point::new(0.0, 0.0),
            pointer: None,
            geo_mode: false,
            next_id: 0,
            listeners: IndexMap::new(),
            frames: IndexMap::new(),
            rules: IndexMap::new(),
            overrides: HashMap::new(),
            classes: IndexMap::new(),
            pending_classes: Vec::new(),
            class_origins: HashMap::new(),
            transformations: IndexMap::new(),
            pending_patches: Vec::new(),
            after_update: Vec::new(),
            layer_order: Vec::new(),
            layer_visibility: HashMap::new(),
            dom_layers: HashMap::new(),
            canvas_layers: HashMap::new(),
            overlays: HashMap::new(),
            default_overlay_size: DEFAULT_OVERLAY_SIZE,
            stats: HeadlessStats::default(),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_layer(&mut self, layer: LayerRef, index: Option<usize>) {
        let index = index.map_or(self.layer_order.len(), |i| i.min(self.layer_order.len()));
        self.layer_order.insert(index, layer);
        self.layer_visibility.insert(layer, true);
    }

    fn has_layer(&self, layer: LayerRef) -> bool {
        self.layer_visibility.contains_key(&layer)
    }

    fn graph_to_screen(&self, point: Point) -> Point {
        let zoom = self.effective_zoom();
        Point::new(
            (point.x - self.center.x) * zoom + self.viewport.width / 2.0,
            (point.y - self.center.y) * zoom + self.viewport.height / 2.0,
        )
    }

    fn screen_to_graph(&self, point: Point) -> Point {
        let zoom = self.effective_zoom();
        Point::new(
            (point.x - self.viewport.width / 2.0) / zoom + self.center.x,
            (point.y - self.viewport.height / 2.0) / zoom + self.center.y,
        )
    }

    fn effective_zoom(&self) -> f64 {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom
        } else {
            1.0
        }
    }

    fn visible_graph(&self) -> VisibleGraph {
        let mut graph = VisibleGraph {
            nodes: self
                .graph
                .nodes
                .iter()
                .map(|node| VisibleNode {
                    id: node.id.clone(),
                    data: node.data.clone(),
                    attributes: node.attributes.clone(),
                    is_virtual: false,
                    position: position_of(&node.attributes),
                })
                .collect(),
            edges: self
                .graph
                .edges
                .iter()
                .map(|edge| VisibleEdge {
                    id: edge.id.clone(),
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    data: edge.data.clone(),
                    is_virtual: false,
                })
                .collect(),
        };
        for entry in self.transformations.values().filter(|entry| entry.enabled) {
            graph = apply_transformation(entry.kind, &entry.options, graph);
        }
        graph
    }

    fn node_attributes(&self, node: &VisibleNode) -> Attributes {
        let mut attributes = self
            .theme
            .as_ref()
            .map(|theme| theme.node_attributes.clone())
            .unwrap_or_default();
        attributes.merge(&node.attributes);
        let element = node.element();
        for rule in self.rules.values() {
            if rule.target != RuleTarget::Nodes {
                continue;
            }
            if rule.selector.as_ref().is_none_or(|selector| selector(&element)) {
                attributes.merge(&rule.attributes.evaluate(&element));
            }
        }
        attributes
    }

    fn edge_attributes(&self, edge: &VisibleEdge) -> Attributes {
        let mut attributes = self
            .theme
            .as_ref()
            .map(|theme| theme.edge_attributes.clone())
            .unwrap_or_default();
        let element = edge.element();
        for rule in self.rules.values() {
            if rule.target != RuleTarget::Edges {
                continue;
            }
            if rule.selector.as_ref().is_none_or(|selector| selector(&element)) {
                attributes.merge(&rule.attributes.evaluate(&element));
            }
        }
        attributes
    }
}

fn position_of(attributes: &Attributes) -> Point {
    let coordinate = |key: &str| attributes.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    Point::new(coordinate("x"), coordinate("y"))
}

fn edge_key(source: &ElementId, target: &ElementId, directed: bool) -> (ElementId, ElementId) {
    if directed || source <= target {
        (source.clone(), target.clone())
    } else {
        (target.clone(), source.clone())
    }
}

fn drop_dangling_edges(graph: &mut VisibleGraph) {
    let ids: Vec<ElementId> = graph.nodes.iter().map(|node| node.id.clone()).collect();
    graph
        .edges
        .retain(|edge| ids.contains(&edge.source) && ids.contains(&edge.target));
}

fn apply_transformation(
    kind: TransformationKind,
    options: &TransformationOptions,
    mut graph: VisibleGraph,
) -> VisibleGraph {
    match kind {
        TransformationKind::NodeFilter => {
            if let Some(criteria) = &options.criteria {
                graph.nodes.retain(|node| criteria(&node.element()));
                drop_dangling_edges(&mut graph);
            }
            graph
        }
        TransformationKind::EdgeFilter => {
            if let Some(criteria) = &options.criteria {
                graph.edges.retain(|edge| criteria(&edge.element()));
            }
            graph
        }
        TransformationKind::NodeCollapsing => {
            if let Some(selector) = &options.selector {
                graph.nodes.retain(|node| !selector(&node.element()));
                drop_dangling_edges(&mut graph);
            }
            graph
        }
        TransformationKind::NodeGrouping => group_nodes(options, graph),
        TransformationKind::EdgeGrouping => group_edges(options, graph),
        TransformationKind::NodeMerging
        | TransformationKind::NeighborGeneration
        | TransformationKind::NeighborMerging
        | TransformationKind::Drilldown => graph,
    }
}

fn group_nodes(options: &TransformationOptions, graph: VisibleGraph) -> VisibleGraph {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    let mut remap: HashMap<ElementId, ElementId> = HashMap::new();
    for (index, node) in graph.nodes.iter().enumerate() {
        let element = node.element();
        if !options.selector.as_ref().is_none_or(|selector| selector(&element)) {
            continue;
        }
        let key = match &options.group_id_function {
            Some(group_id) => group_id(&element),
            None => Some(DEFAULT_GROUP_KEY.to_owned()),
        };
        if let Some(key) = key {
            remap.insert(node.id.clone(), ElementId::Str(key.clone()));
            groups.entry(key).or_default().push(index);
        }
    }

    let mut nodes: Vec<VisibleNode> = graph
        .nodes
        .iter()
        .filter(|node| options.show_contents || !remap.contains_key(&node.id))
        .cloned()
        .collect();
    for (key, members) in &groups {
        let member_ids: Vec<ElementId> = members.iter().map(|i| graph.nodes[*i].id.clone()).collect();
        let count = members.len() as f64;
        let (sum_x, sum_y) = members.iter().fold((0.0, 0.0), |(x, y), i| {
            let position = graph.nodes[*i].position;
            (x + position.x, y + position.y)
        });
        nodes.push(VisibleNode {
            id: ElementId::Str(key.clone()),
            data: options
                .node_generator
                .as_ref()
                .map_or(Value::Null, |generate| generate(key, &member_ids)),
            attributes: Attributes::default(),
            is_virtual: true,
            position: Point::new(sum_x / count, sum_y / count),
        });
    }

    if options.show_contents {
        return VisibleGraph {
            nodes,
            edges: graph.edges,
        };
    }

    let mut edges = Vec::new();
    let mut merged: IndexMap<(ElementId, ElementId), Vec<ElementId>> = IndexMap::new();
    for edge in graph.edges {
        let source = remap.get(&edge.source).cloned();
        let target = remap.get(&edge.target).cloned();
        if source.is_none() && target.is_none() {
            edges.push(edge);
            continue;
        }
        let source = source.unwrap_or(edge.source);
        let target = target.unwrap_or(edge.target);
        if source == target {
            continue;
        }
        merged
            .entry(edge_key(&source, &target, options.separate_edges_by_direction))
            .or_default()
            .push(edge.id);
    }
    for ((source, target), members) in merged {
        let key = format!("{source}->{target}");
        edges.push(VisibleEdge {
            id: ElementId::Str(key.clone()),
            data: options
                .edge_generator
                .as_ref()
                .map_or(Value::Null, |generate| generate(&key, &members)),
            source,
            target,
            is_virtual: true,
        });
    }
    VisibleGraph { nodes, edges }
}

fn group_edges(options: &TransformationOptions, graph: VisibleGraph) -> VisibleGraph {
    let mut groups: IndexMap<(ElementId, ElementId, String), Vec<usize>> = IndexMap::new();
    let mut untouched = Vec::new();
    for (index, edge) in graph.edges.iter().enumerate() {
        let element = edge.element();
        if !options.selector.as_ref().is_none_or(|selector| selector(&element)) {
            untouched.push(edge.clone());
            continue;
        }
        let key = match &options.group_id_function {
            Some(group_id) => group_id(&element),
            None => Some(DEFAULT_GROUP_KEY.to_owned()),
        };
        let Some(key) = key else {
            untouched.push(edge.clone());
            continue;
        };
        let (source, target) =
            edge_key(&edge.source, &edge.target, options.separate_edges_by_direction);
        groups.entry((source, target, key)).or_default().push(index);
    }

    let mut edges = untouched;
    for ((source, target, key), members) in groups {
        if members.len() == 1 {
            edges.push(graph.edges[members[0]].clone());
            continue;
        }
        let member_ids: Vec<ElementId> = members.iter().map(|i| graph.edges[*i].id.clone()).collect();
        let id = format!("{key}:{source}->{target}");
        edges.push(VisibleEdge {
            data: options
                .edge_generator
                .as_ref()
                .map_or(Value::Null, |generate| generate(&id, &member_ids)),
            id: ElementId::Str(id),
            source,
            target,
            is_virtual: true,
        });
    }
    VisibleGraph {
        nodes: graph.nodes,
        edges,
    }
}

fn validate_options(options: &EngineOptions) -> Result<(), String> {
    if let (Some(min), Some(max)) = (options.min_zoom, options.max_zoom) {
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(format!("zoom bounds must satisfy 0 < min <= max, got {min}..{max}"));
        }
    }
    Ok(())
}

fn validate_transformation(spec: &TransformationSpec) -> EngineResult<()> {
    if spec.kind.requires_criteria() && spec.options.criteria.is_none() {
        return Err(EngineRejection::InvalidTransformation(format!(
            "{} requires criteria",
            spec.kind.name()
        )));
    }
    if let Some(duration) = spec.duration {
        if !duration.is_finite() || duration < 0.0 {
            return Err(EngineRejection::InvalidTransformation(format!(
                "duration must be finite and >= 0, got {duration}"
            )));
        }
    }
    if spec.kind == TransformationKind::Drilldown && spec.options.depth == Some(0) {
        return Err(EngineRejection::InvalidTransformation(
            "drilldown depth must be >= 1".to_owned(),
        ));
    }
    Ok(())
}

/// In-memory engine used by tests and headless hosts.
///
/// It keeps the raw graph, evaluates grouping/filtering/collapsing
/// transformations over it, records layers and overlays, and runs frame
/// callbacks when the host calls [`HeadlessEngine::advance_frame`]. Every
/// contract call is counted in [`HeadlessStats`].
pub struct HeadlessEngine {
    container: Container,
    state: RefCell<State>,
}

impl std::fmt::Debug for HeadlessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessEngine")
            .field("container", &self.container.id())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl HeadlessEngine {
    #[must_use]
    pub fn stats(&self) -> HeadlessStats {
        self.state.borrow().stats
    }

    /// Delivers `event` to every listener subscribed to its kind.
    pub fn emit(&self, event: EngineEvent) {
        let kind = event.kind();
        let deliveries: Vec<(ListenerId, EventHandler, bool)> = {
            let mut state = self.state.borrow_mut();
            if let (EventKind::MouseMove, Some(pointer)) = (kind, event.pointer()) {
                let position = state.screen_to_graph(pointer.point);
                state.pointer = Some(position);
            }
            let deliveries: Vec<(ListenerId, EventHandler, bool)> = state
                .listeners
                .iter()
                .filter(|(_, entry)| entry.kind == kind)
                .map(|(id, entry)| (*id, entry.handler.clone(), entry.once))
                .collect();
            for (id, _, once) in &deliveries {
                if *once {
                    state.listeners.shift_remove(id);
                }
            }
            deliveries
        };
        trace!(?kind, listeners = deliveries.len(), "headless engine emit");
        for (id, handler, once) in deliveries {
            // A listener removed by an earlier one in this dispatch must not fire.
            if !once && !self.state.borrow().listeners.contains_key(&id) {
                continue;
            }
            handler(&event);
        }
    }

    /// Runs one frame: settles transformation updates and pending classes,
    /// paints canvas layers, then runs frame callbacks. Returns the number of
    /// callbacks run.
    pub fn advance_frame(&self) -> usize {
        let (updated, readies, frames, after_update) = {
            let mut state = self.state.borrow_mut();
            state.stats.frames += 1;

            let mut updated = Vec::new();
            for (id, patch) in std::mem::take(&mut state.pending_patches) {
                if let Some(entry) = state.transformations.get_mut(&id) {
                    patch.apply_to(&mut entry.options);
                    if let Some(on_updated) = &entry.callbacks.on_updated {
                        updated.push((on_updated.clone(), id));
                    }
                }
            }

            let mut readies = Vec::new();
            for pending in std::mem::take(&mut state.pending_classes) {
                state.classes.insert(pending.name.clone(), pending.definition);
                state.class_origins.insert(pending.name.clone(), pending.request);
                readies.push((pending.ready, StyleClassId(pending.name)));
            }

            let frames: Vec<FrameCallback> =
                std::mem::take(&mut state.frames).into_values().collect();
            let after_update = std::mem::take(&mut state.after_update);
            (updated, readies, frames, after_update)
        };

        self.paint_canvas_layers();

        let count = updated.len() + readies.len() + frames.len() + after_update.len();
        for (on_updated, id) in updated {
            on_updated(id);
        }
        for (ready, class) in readies {
            ready(class);
        }
        for frame in frames {
            frame();
        }
        for callback in after_update {
            callback();
        }
        count
    }

    fn paint_canvas_layers(&self) {
        let targets: Vec<(CanvasLayerId, PaintCallback, CanvasLayerOptions)> = {
            let state = self.state.borrow();
            state
                .layer_order
                .iter()
                .filter_map(|layer| match layer {
                    LayerRef::Canvas(id) if state.layer_visibility.get(layer) == Some(&true) => {
                        state
                            .canvas_layers
                            .get(id)
                            .map(|entry| (*id, entry.paint.clone(), entry.options))
                    }
                    _ => None,
                })
                .collect()
        };
        for (id, paint, options) in targets {
            let mut canvas = RecordingCanvas::default();
            if !options.no_clear {
                canvas.clear();
            }
            paint(&mut canvas);
            let mut state = self.state.borrow_mut();
            state.stats.paints += 1;
            if let Some(entry) = state.canvas_layers.get_mut(&id) {
                entry.draws = canvas.calls;
            }
        }
    }

    pub fn set_zoom(&self, zoom: f64) {
        self.state.borrow_mut().zoom = zoom;
        self.emit(EngineEvent::Zoom { zoom });
    }

    pub fn set_center(&self, center: Point) {
        self.state.borrow_mut().center = center;
    }

    /// Overrides the measured size of overlays declared without a size.
    pub fn set_default_overlay_size(&self, size: Size) {
        self.state.borrow_mut().default_overlay_size = size;
    }

    pub fn set_pointer_position(&self, position: Option<Point>) {
        self.state.borrow_mut().pointer = position;
    }

    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    #[must_use]
    pub fn graph(&self) -> GraphPayload {
        self.state.borrow().graph.clone()
    }

    #[must_use]
    pub fn options(&self) -> EngineOptions {
        self.state.borrow().options.clone()
    }

    #[must_use]
    pub fn theme(&self) -> Option<Theme> {
        self.state.borrow().theme.clone()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.state.borrow().visible_graph().nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.state.borrow().visible_graph().edges.len()
    }

    #[must_use]
    pub fn visible_node_ids(&self) -> Vec<ElementId> {
        let graph = self.state.borrow().visible_graph();
        graph.nodes.into_iter().map(|node| node.id).collect()
    }

    #[must_use]
    pub fn visible_edge_ids(&self) -> Vec<ElementId> {
        let graph = self.state.borrow().visible_graph();
        graph.edges.into_iter().map(|edge| edge.id).collect()
    }

    /// Data of a visible node, generated data for virtual ones included.
    #[must_use]
    pub fn node_data(&self, node: &ElementId) -> Option<Value> {
        let graph = self.state.borrow().visible_graph();
        graph
            .nodes
            .into_iter()
            .find(|candidate| &candidate.id == node)
            .map(|candidate| candidate.data)
    }

    /// Attributes of a visible node after theme and rules were applied.
    #[must_use]
    pub fn node_attributes(&self, node: &ElementId) -> Option<Attributes> {
        let state = self.state.borrow();
        let graph = state.visible_graph();
        graph
            .nodes
            .iter()
            .find(|candidate| &candidate.id == node)
            .map(|candidate| state.node_attributes(candidate))
    }

    #[must_use]
    pub fn edge_attributes(&self, edge: &ElementId) -> Option<Attributes> {
        let state = self.state.borrow();
        let graph = state.visible_graph();
        graph
            .edges
            .iter()
            .find(|candidate| &candidate.id == edge)
            .map(|candidate| state.edge_attributes(candidate))
    }

    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.state
            .borrow()
            .listeners
            .values()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    #[must_use]
    pub fn total_listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    #[must_use]
    pub fn pending_frame_count(&self) -> usize {
        self.state.borrow().frames.len()
    }

    #[must_use]
    pub fn rule_ids(&self) -> Vec<RuleId> {
        self.state.borrow().rules.keys().copied().collect()
    }

    #[must_use]
    pub fn attribute_override(&self, target: RuleTarget, kind: OverrideKind) -> Option<AttributeSpec> {
        self.state.borrow().overrides.get(&(target, kind)).cloned()
    }

    #[must_use]
    pub fn class_definition(&self, name: &str) -> Option<ClassDefinition> {
        self.state.borrow().classes.get(name).cloned()
    }

    #[must_use]
    pub fn class_count(&self) -> usize {
        self.state.borrow().classes.len()
    }

    #[must_use]
    pub fn transformation_ids(&self) -> Vec<TransformationId> {
        self.state.borrow().transformations.keys().copied().collect()
    }

    #[must_use]
    pub fn transformation(&self, id: TransformationId) -> Option<TransformationSnapshot> {
        self.state
            .borrow()
            .transformations
            .get(&id)
            .map(|entry| TransformationSnapshot {
                kind: entry.kind,
                enabled: entry.enabled,
                options: entry.options.clone(),
                last_duration: entry.last_duration,
                drilled: entry.drilled.clone(),
            })
    }

    #[must_use]
    pub fn layer_order(&self) -> Vec<LayerRef> {
        self.state.borrow().layer_order.clone()
    }

    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<LayerSnapshot> {
        let state = self.state.borrow();
        state.dom_layers.get(&id).map(|entry| LayerSnapshot {
            class_name: entry.class_name.clone(),
            content: entry.content.clone(),
            content_writes: entry.content_writes,
            visible: state.layer_visibility.get(&LayerRef::Layer(id)) == Some(&true),
        })
    }

    #[must_use]
    pub fn is_layer_visible(&self, layer: LayerRef) -> Option<bool> {
        self.state.borrow().layer_visibility.get(&layer).copied()
    }

    #[must_use]
    pub fn canvas_options(&self, id: CanvasLayerId) -> Option<CanvasLayerOptions> {
        self.state.borrow().canvas_layers.get(&id).map(|entry| entry.options)
    }

    #[must_use]
    pub fn canvas_draws(&self, id: CanvasLayerId) -> Vec<DrawCall> {
        self.state
            .borrow()
            .canvas_layers
            .get(&id)
            .map(|entry| entry.draws.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn overlay(&self, id: OverlayId) -> Option<OverlaySnapshot> {
        let state = self.state.borrow();
        state.overlays.get(&id).map(|entry| {
            let mut options = entry.options.clone();
            options.visible = state.layer_visibility.get(&LayerRef::Overlay(id)) == Some(&true);
            OverlaySnapshot {
                options,
                content_writes: entry.content_writes,
            }
        })
    }

    #[must_use]
    pub fn overlay_count(&self) -> usize {
        self.state.borrow().overlays.len()
    }

    fn with_transformation<T>(
        &self,
        id: TransformationId,
        f: impl FnOnce(&mut TransformationEntry) -> T,
    ) -> EngineResult<T> {
        let mut state = self.state.borrow_mut();
        state
            .transformations
            .get_mut(&id)
            .map(f)
            .ok_or_else(|| EngineRejection::UnknownHandle(id.to_string()))
    }
}

impl Engine for HeadlessEngine {
    fn create(
        container: &Container,
        options: &EngineOptions,
        graph: &GraphPayload,
    ) -> EngineResult<Self> {
        validate_options(options).map_err(EngineRejection::Construction)?;
        Ok(Self {
            container: container.clone(),
            state: RefCell::new(State::new(container.size(), options.clone(), graph.clone())),
        })
    }

    fn set_graph(&self, graph: &GraphPayload) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.graph = graph.clone();
        state.stats.set_graph_calls += 1;
        Ok(())
    }

    fn set_options(&self, options: &EngineOptions) -> EngineResult<()> {
        validate_options(options).map_err(EngineRejection::InvalidOptions)?;
        let mut state = self.state.borrow_mut();
        state.options = options.clone();
        state.stats.set_options_calls += 1;
        Ok(())
    }

    fn set_theme(&self, theme: &Theme) {
        let mut state = self.state.borrow_mut();
        state.theme = Some(theme.clone());
        state.stats.set_theme_calls += 1;
    }

    fn on(&self, kind: EventKind, handler: EventHandler) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = ListenerId(state.next_id());
        state.listeners.insert(
            id,
            ListenerEntry {
                kind,
                handler,
                once: false,
            },
        );
        state.stats.subscribe_calls += 1;
        id
    }

    fn once(&self, kind: EventKind, handler: EventHandler) -> ListenerId {
        let mut state = self.state.borrow_mut();
        let id = ListenerId(state.next_id());
        state.listeners.insert(
            id,
            ListenerEntry {
                kind,
                handler,
                once: true,
            },
        );
        state.stats.subscribe_calls += 1;
        id
    }

    fn off(&self, listener: ListenerId) {
        let mut state = self.state.borrow_mut();
        if state.listeners.shift_remove(&listener).is_some() {
            state.stats.unsubscribe_calls += 1;
        }
    }

    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        let mut state = self.state.borrow_mut();
        let id = FrameRequestId(state.next_id());
        state.frames.insert(id, callback);
        id
    }

    fn cancel_frame(&self, request: FrameRequestId) {
        self.state.borrow_mut().frames.shift_remove(&request);
    }

    fn add_rule(&self, rule: RuleSpec) -> RuleId {
        let mut state = self.state.borrow_mut();
        let id = RuleId(state.next_id());
        state.rules.insert(id, rule);
        state.stats.rules_added += 1;
        id
    }

    fn destroy_rule(&self, rule: RuleId) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state
            .rules
            .shift_remove(&rule)
            .ok_or_else(|| EngineRejection::UnknownHandle(rule.to_string()))?;
        state.stats.rules_destroyed += 1;
        Ok(())
    }

    fn set_attribute_override(
        &self,
        target: RuleTarget,
        kind: OverrideKind,
        attributes: Option<AttributeSpec>,
    ) {
        let mut state = self.state.borrow_mut();
        state.stats.override_calls += 1;
        match attributes {
            Some(attributes) => {
                state.overrides.insert((target, kind), attributes);
            }
            None => {
                state.overrides.remove(&(target, kind));
            }
        }
    }

    fn create_class(
        &self,
        name: &str,
        definition: ClassDefinition,
        ready: ClassReady,
    ) -> ClassRequestId {
        let mut state = self.state.borrow_mut();
        state.stats.classes_created += 1;
        let request = ClassRequestId(state.next_id());
        state.pending_classes.push(PendingClass {
            request,
            name: name.to_owned(),
            definition,
            ready,
        });
        request
    }

    fn update_class(&self, name: &str, definition: ClassDefinition) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state.stats.class_updates += 1;
        if let Some(existing) = state.classes.get_mut(name) {
            *existing = definition;
            return Ok(());
        }
        if let Some(pending) = state
            .pending_classes
            .iter_mut()
            .rev()
            .find(|pending| pending.name == name)
        {
            pending.definition = definition;
            return Ok(());
        }
        Err(EngineRejection::UnknownHandle(format!("class:{name}")))
    }

    fn has_class(&self, name: &str) -> bool {
        self.state.borrow().classes.contains_key(name)
    }

    fn class_origin(&self, name: &str) -> Option<ClassRequestId> {
        self.state.borrow().class_origins.get(name).copied()
    }

    fn destroy_class(&self, name: &str) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        state
            .classes
            .shift_remove(name)
            .ok_or_else(|| EngineRejection::UnknownHandle(format!("class:{name}")))?;
        state.class_origins.remove(name);
        state.stats.classes_destroyed += 1;
        Ok(())
    }

    fn add_transformation(&self, spec: TransformationSpec) -> EngineResult<TransformationId> {
        validate_transformation(&spec)?;
        let (id, on_enabled, on_set_index) = {
            let mut state = self.state.borrow_mut();
            let id = TransformationId(state.next_id());
            let on_enabled = spec.enabled.then(|| spec.callbacks.on_enabled.clone()).flatten();
            let on_set_index = spec.callbacks.on_set_index.clone();
            state.transformations.insert(
                id,
                TransformationEntry {
                    kind: spec.kind,
                    options: spec.options,
                    callbacks: spec.callbacks,
                    enabled: spec.enabled,
                    last_duration: spec.duration,
                    drilled: Vec::new(),
                },
            );
            let placed = spec.index.map(|index| {
                let last = state.transformations.len() - 1;
                let index = index.min(last);
                state.transformations.move_index(last, index);
                index
            });
            state.stats.transformations_added += 1;
            (id, on_enabled, placed.zip(on_set_index))
        };
        if let Some(on_enabled) = on_enabled {
            on_enabled(id);
        }
        if let Some((index, on_set_index)) = on_set_index {
            on_set_index(id, index);
        }
        Ok(id)
    }

    fn set_transformation_enabled(
        &self,
        transformation: TransformationId,
        enabled: bool,
        duration: Option<f64>,
    ) -> EngineResult<()> {
        let callback = self.with_transformation(transformation, |entry| {
            entry.last_duration = duration;
            if entry.enabled == enabled {
                return None;
            }
            entry.enabled = enabled;
            if enabled {
                entry.callbacks.on_enabled.clone()
            } else {
                entry.callbacks.on_disabled.clone()
            }
        })?;
        self.state.borrow_mut().stats.transformation_toggles += 1;
        if let Some(callback) = callback {
            callback(transformation);
        }
        Ok(())
    }

    fn is_transformation_enabled(&self, transformation: TransformationId) -> Option<bool> {
        self.state
            .borrow()
            .transformations
            .get(&transformation)
            .map(|entry| entry.enabled)
    }

    fn update_transformation(
        &self,
        transformation: TransformationId,
        patch: TransformationPatch,
    ) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.transformations.contains_key(&transformation) {
            return Err(EngineRejection::UnknownHandle(transformation.to_string()));
        }
        if let Some(kind) = state.transformations.get(&transformation).map(|entry| entry.kind) {
            if kind.requires_criteria() && matches!(patch.criteria, Some(None)) {
                return Err(EngineRejection::InvalidTransformation(format!(
                    "{} requires criteria",
                    kind.name()
                )));
            }
        }
        state.pending_patches.push((transformation, patch));
        state.stats.transformation_updates += 1;
        Ok(())
    }

    fn set_transformation_index(
        &self,
        transformation: TransformationId,
        index: usize,
    ) -> EngineResult<()> {
        let callback = {
            let mut state = self.state.borrow_mut();
            let from = state
                .transformations
                .get_index_of(&transformation)
                .ok_or_else(|| EngineRejection::UnknownHandle(transformation.to_string()))?;
            let index = index.min(state.transformations.len() - 1);
            state.transformations.move_index(from, index);
            state
                .transformations
                .get(&transformation)
                .and_then(|entry| entry.callbacks.on_set_index.clone())
                .map(|callback| (callback, index))
        };
        if let Some((callback, index)) = callback {
            callback(transformation, index);
        }
        Ok(())
    }

    fn destroy_transformation(&self, transformation: TransformationId) -> EngineResult<()> {
        let callback = {
            let mut state = self.state.borrow_mut();
            let entry = state
                .transformations
                .shift_remove(&transformation)
                .ok_or_else(|| EngineRejection::UnknownHandle(transformation.to_string()))?;
            state.pending_patches.retain(|(id, _)| *id != transformation);
            state.stats.transformations_destroyed += 1;
            entry.callbacks.on_destroyed
        };
        if let Some(callback) = callback {
            callback(transformation);
        }
        Ok(())
    }

    fn drill(&self, transformation: TransformationId, target: &Target) -> EngineResult<()> {
        self.with_transformation(transformation, |entry| {
            if entry.kind != TransformationKind::Drilldown {
                return Err(EngineRejection::InvalidTransformation(format!(
                    "{} cannot drill",
                    entry.kind.name()
                )));
            }
            entry.drilled.push(target.clone());
            Ok(())
        })?
    }

    fn after_transformations_update(&self, callback: FrameCallback) {
        self.state.borrow_mut().after_update.push(callback);
    }

    fn add_layer(&self, index: Option<usize>) -> LayerId {
        let mut state = self.state.borrow_mut();
        let id = LayerId(state.next_id());
        state.dom_layers.insert(
            id,
            DomLayerEntry {
                class_name: None,
                content: String::new(),
                content_writes: 0,
            },
        );
        state.insert_layer(LayerRef::Layer(id), index);
        id
    }

    fn set_layer_class(&self, layer: LayerId, class_name: Option<&str>) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .dom_layers
            .get_mut(&layer)
            .ok_or_else(|| EngineRejection::UnknownHandle(layer.to_string()))?;
        entry.class_name = class_name.map(str::to_owned);
        Ok(())
    }

    fn set_layer_content(&self, layer: LayerId, markup: &str) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .dom_layers
            .get_mut(&layer)
            .ok_or_else(|| EngineRejection::UnknownHandle(layer.to_string()))?;
        entry.content = markup.to_owned();
        entry.content_writes += 1;
        Ok(())
    }

    fn add_canvas_layer(
        &self,
        paint: PaintCallback,
        options: CanvasLayerOptions,
        index: Option<usize>,
    ) -> CanvasLayerId {
        let mut state = self.state.borrow_mut();
        let id = CanvasLayerId(state.next_id());
        state.canvas_layers.insert(
            id,
            CanvasEntry {
                paint,
                options,
                draws: Vec::new(),
            },
        );
        state.insert_layer(LayerRef::Canvas(id), index);
        id
    }

    fn add_overlay(&self, options: OverlayOptions) -> OverlayId {
        let mut state = self.state.borrow_mut();
        let id = OverlayId(state.next_id());
        let visible = options.visible;
        let content_writes = usize::from(!options.content.is_empty());
        state.overlays.insert(
            id,
            OverlayEntry {
                options,
                content_writes,
            },
        );
        state.insert_layer(LayerRef::Overlay(id), None);
        state.layer_visibility.insert(LayerRef::Overlay(id), visible);
        id
    }

    fn update_overlay(&self, overlay: OverlayId, update: OverlayUpdate) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .overlays
            .get_mut(&overlay)
            .ok_or_else(|| EngineRejection::UnknownHandle(overlay.to_string()))?;
        match update {
            OverlayUpdate::Position(position) => entry.options.position = position,
            OverlayUpdate::Size(size) => entry.options.size = size,
            OverlayUpdate::Scaled(scaled) => entry.options.scaled = scaled,
            OverlayUpdate::ZIndex(z_index) => entry.options.z_index = z_index,
            OverlayUpdate::ClassName(class_name) => entry.options.class_name = class_name,
            OverlayUpdate::Anchor(anchor) => entry.options.anchor = anchor,
            OverlayUpdate::Content(content) => {
                entry.options.content = content;
                entry.content_writes += 1;
            }
        }
        Ok(())
    }

    fn overlay_bounds(&self, overlay: OverlayId) -> Option<Rect> {
        let state = self.state.borrow();
        let entry = state.overlays.get(&overlay)?;
        let mut size = entry.options.size.unwrap_or(state.default_overlay_size);
        if entry.options.scaled {
            size = Size::new(size.width * state.effective_zoom(), size.height * state.effective_zoom());
        }
        let screen = state.graph_to_screen(entry.options.position);
        Some(Rect::new(
            screen.x + entry.options.anchor.x * size.width,
            screen.y + entry.options.anchor.y * size.height,
            size.width,
            size.height,
        ))
    }

    fn set_layer_visible(&self, layer: LayerRef, visible: bool) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .layer_visibility
            .get_mut(&layer)
            .ok_or_else(|| EngineRejection::UnknownHandle(layer.to_string()))?;
        *entry = visible;
        Ok(())
    }

    fn move_layer(&self, layer: LayerRef, index: usize) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        let from = state
            .layer_order
            .iter()
            .position(|candidate| *candidate == layer)
            .ok_or_else(|| EngineRejection::UnknownHandle(layer.to_string()))?;
        let layer = state.layer_order.remove(from);
        let index = index.min(state.layer_order.len());
        state.layer_order.insert(index, layer);
        Ok(())
    }

    fn destroy_layer(&self, layer: LayerRef) -> EngineResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.has_layer(layer) {
            return Err(EngineRejection::UnknownHandle(layer.to_string()));
        }
        state.layer_visibility.remove(&layer);
        state.layer_order.retain(|candidate| *candidate != layer);
        match layer {
            LayerRef::Layer(id) => {
                state.dom_layers.remove(&id);
            }
            LayerRef::Canvas(id) => {
                state.canvas_layers.remove(&id);
            }
            LayerRef::Overlay(id) => {
                state.overlays.remove(&id);
            }
        }
        Ok(())
    }

    fn zoom(&self) -> f64 {
        self.state.borrow().effective_zoom()
    }

    fn graph_to_screen(&self, point: Point) -> Point {
        self.state.borrow().graph_to_screen(point)
    }

    fn screen_to_graph(&self, point: Point) -> Point {
        self.state.borrow().screen_to_graph(point)
    }

    fn viewport_size(&self) -> Size {
        self.state.borrow().viewport
    }

    fn content_bounds(&self) -> Option<Rect> {
        let graph = self.state.borrow().visible_graph();
        Rect::enclosing(graph.nodes.iter().map(|node| node.position))
    }

    fn resize(&self) {
        let size = self.container.size();
        {
            let mut state = self.state.borrow_mut();
            state.viewport = size;
            state.stats.resize_calls += 1;
        }
        self.emit(EngineEvent::Resize(size));
    }

    fn node_position(&self, node: &ElementId) -> Option<Point> {
        let graph = self.state.borrow().visible_graph();
        graph
            .nodes
            .iter()
            .find(|candidate| &candidate.id == node)
            .map(|candidate| candidate.position)
    }

    fn edge_extremities(&self, edge: &ElementId) -> Option<(Point, Point)> {
        let graph = self.state.borrow().visible_graph();
        let edge = graph.edges.iter().find(|candidate| &candidate.id == edge)?;
        let position = |id: &ElementId| {
            graph
                .nodes
                .iter()
                .find(|node| &node.id == id)
                .map(|node| node.position)
        };
        Some((position(&edge.source)?, position(&edge.target)?))
    }

    fn pointer_position(&self) -> Option<Point> {
        self.state.borrow().pointer
    }

    fn enable_geo_mode(&self, _options: &GeoModeOptions) -> EngineResult<()> {
        let changed = {
            let mut state = self.state.borrow_mut();
            !std::mem::replace(&mut state.geo_mode, true)
        };
        if changed {
            self.emit(EngineEvent::GeoEnabled);
        }
        Ok(())
    }

    fn disable_geo_mode(&self) -> EngineResult<()> {
        let changed = std::mem::replace(&mut self.state.borrow_mut().geo_mode, false);
        if changed {
            self.emit(EngineEvent::GeoDisabled);
        }
        Ok(())
    }

    fn is_geo_mode_enabled(&self) -> bool {
        self.state.borrow().geo_mode
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::HeadlessEngine;
    use crate::core::{GraphPayload, Point, RawEdge, RawNode, Size};
    use crate::engine::{Container, Engine, EngineEvent, EngineOptions, EventKind, PointerEvent};

    fn engine() -> HeadlessEngine {
        let container = Container::new("graph", Size::new(800.0, 600.0));
        let graph = GraphPayload::new(
            vec![RawNode::new(0).at(0.0, 0.0), RawNode::new(1).at(10.0, 0.0)],
            vec![RawEdge::new(0, 0, 1)],
        );
        HeadlessEngine::create(&container, &EngineOptions::default(), &graph).expect("engine")
    }

    #[test]
    fn screen_and_graph_coordinates_round_trip() {
        let engine = engine();
        engine.set_zoom(2.0);
        engine.set_center(Point::new(5.0, -3.0));
        let screen = engine.graph_to_screen(Point::new(12.0, 7.0));
        assert_eq!(screen, Point::new(414.0, 320.0));
        assert_eq!(engine.screen_to_graph(screen), Point::new(12.0, 7.0));
    }

    #[test]
    fn listener_removed_during_dispatch_does_not_fire() {
        let engine = Rc::new(engine());
        let fired = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(None));

        let engine_for_first = Rc::clone(&engine);
        let second_for_first = Rc::clone(&second);
        engine.on(
            EventKind::Click,
            crate::callback!(move |_event: &EngineEvent| {
                if let Some(id) = second_for_first.get() {
                    engine_for_first.off(id);
                }
            }),
        );
        let fired_in_second = Rc::clone(&fired);
        let id = engine.on(
            EventKind::Click,
            crate::callback!(move |_event: &EngineEvent| fired_in_second.set(fired_in_second.get() + 1)),
        );
        second.set(Some(id));

        engine.emit(EngineEvent::Click(PointerEvent::at(1.0, 1.0)));
        assert_eq!(fired.get(), 0);
        assert_eq!(engine.listener_count(EventKind::Click), 1);
    }

    #[test]
    fn once_listener_fires_a_single_time() {
        let engine = engine();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        engine.once(
            EventKind::Idle,
            crate::callback!(move |_event: &EngineEvent| counter.set(counter.get() + 1)),
        );
        engine.emit(EngineEvent::Idle);
        engine.emit(EngineEvent::Idle);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn frame_requests_can_be_cancelled() {
        let engine = engine();
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let request = engine.request_frame(Box::new(move || flag.set(true)));
        engine.cancel_frame(request);
        assert_eq!(engine.advance_frame(), 0);
        assert!(!fired.get());
    }
}
