use serde::{Deserialize, Serialize};

use crate::core::{Callback, ElementId, Point, Size, Target};

/// Engine events bindings can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Click,
    DoubleClick,
    MouseMove,
    MouseOver,
    MouseOut,
    MouseButtonDown,
    MouseButtonUp,
    Zoom,
    Idle,
    Resize,
    NodesSelected,
    NodesUnselected,
    EdgesSelected,
    EdgesUnselected,
    AddNodes,
    RemoveNodes,
    AddEdges,
    RemoveEdges,
    LayoutEnd,
    GeoEnabled,
    GeoDisabled,
}

/// Declarative callback prop name for every event, built once.
///
/// Hosts declare handlers as `on<Name>` props; this table is the only place
/// where the two namings meet.
pub const EVENT_PROP_NAMES: [(EventKind, &str); 21] = [
    (EventKind::Click, "onClick"),
    (EventKind::DoubleClick, "onDoubleclick"),
    (EventKind::MouseMove, "onMousemove"),
    (EventKind::MouseOver, "onMouseover"),
    (EventKind::MouseOut, "onMouseout"),
    (EventKind::MouseButtonDown, "onMousedown"),
    (EventKind::MouseButtonUp, "onMouseup"),
    (EventKind::Zoom, "onZoom"),
    (EventKind::Idle, "onIdle"),
    (EventKind::Resize, "onResize"),
    (EventKind::NodesSelected, "onNodesSelected"),
    (EventKind::NodesUnselected, "onNodesUnselected"),
    (EventKind::EdgesSelected, "onEdgesSelected"),
    (EventKind::EdgesUnselected, "onEdgesUnselected"),
    (EventKind::AddNodes, "onAddNodes"),
    (EventKind::RemoveNodes, "onRemoveNodes"),
    (EventKind::AddEdges, "onAddEdges"),
    (EventKind::RemoveEdges, "onRemoveEdges"),
    (EventKind::LayoutEnd, "onLayoutEnd"),
    (EventKind::GeoEnabled, "onGeoEnabled"),
    (EventKind::GeoDisabled, "onGeoDisabled"),
];

impl EventKind {
    #[must_use]
    pub fn prop_name(self) -> &'static str {
        EVENT_PROP_NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or("", |(_, name)| *name)
    }

    #[must_use]
    pub fn from_prop_name(name: &str) -> Option<Self> {
        EVENT_PROP_NAMES
            .iter()
            .find(|(_, prop)| *prop == name)
            .map(|(kind, _)| *kind)
    }

    pub fn all() -> impl Iterator<Item = Self> {
        EVENT_PROP_NAMES.iter().map(|(kind, _)| *kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
    Middle,
}

/// Pointer interaction payload; `point` is in screen space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub point: Point,
    #[serde(default)]
    pub button: MouseButton,
    #[serde(default)]
    pub target: Option<Target>,
}

impl PointerEvent {
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            point: Point::new(x, y),
            button: MouseButton::Left,
            target: None,
        }
    }

    #[must_use]
    pub fn on(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    Click(PointerEvent),
    DoubleClick(PointerEvent),
    MouseMove(PointerEvent),
    MouseOver(PointerEvent),
    MouseOut(PointerEvent),
    MouseButtonDown(PointerEvent),
    MouseButtonUp(PointerEvent),
    Zoom { zoom: f64 },
    Idle,
    Resize(Size),
    NodesSelected(Vec<ElementId>),
    NodesUnselected(Vec<ElementId>),
    EdgesSelected(Vec<ElementId>),
    EdgesUnselected(Vec<ElementId>),
    AddNodes(Vec<ElementId>),
    RemoveNodes(Vec<ElementId>),
    AddEdges(Vec<ElementId>),
    RemoveEdges(Vec<ElementId>),
    LayoutEnd,
    GeoEnabled,
    GeoDisabled,
}

impl EngineEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Click(_) => EventKind::Click,
            Self::DoubleClick(_) => EventKind::DoubleClick,
            Self::MouseMove(_) => EventKind::MouseMove,
            Self::MouseOver(_) => EventKind::MouseOver,
            Self::MouseOut(_) => EventKind::MouseOut,
            Self::MouseButtonDown(_) => EventKind::MouseButtonDown,
            Self::MouseButtonUp(_) => EventKind::MouseButtonUp,
            Self::Zoom { .. } => EventKind::Zoom,
            Self::Idle => EventKind::Idle,
            Self::Resize(_) => EventKind::Resize,
            Self::NodesSelected(_) => EventKind::NodesSelected,
            Self::NodesUnselected(_) => EventKind::NodesUnselected,
            Self::EdgesSelected(_) => EventKind::EdgesSelected,
            Self::EdgesUnselected(_) => EventKind::EdgesUnselected,
            Self::AddNodes(_) => EventKind::AddNodes,
            Self::RemoveNodes(_) => EventKind::RemoveNodes,
            Self::AddEdges(_) => EventKind::AddEdges,
            Self::RemoveEdges(_) => EventKind::RemoveEdges,
            Self::LayoutEnd => EventKind::LayoutEnd,
            Self::GeoEnabled => EventKind::GeoEnabled,
            Self::GeoDisabled => EventKind::GeoDisabled,
        }
    }

    #[must_use]
    pub fn pointer(&self) -> Option<&PointerEvent> {
        match self {
            Self::Click(pointer)
            | Self::DoubleClick(pointer)
            | Self::MouseMove(pointer)
            | Self::MouseOver(pointer)
            | Self::MouseOut(pointer)
            | Self::MouseButtonDown(pointer)
            | Self::MouseButtonUp(pointer) => Some(pointer),
            _ => None,
        }
    }
}

pub type EventHandler = Callback<dyn Fn(&EngineEvent)>;

#[cfg(test)]
mod tests {
    use super::{EVENT_PROP_NAMES, EventKind};

    #[test]
    fn prop_table_is_a_bijection() {
        for (kind, name) in EVENT_PROP_NAMES {
            assert!(name.starts_with("on"));
            assert_eq!(kind.prop_name(), name);
            assert_eq!(EventKind::from_prop_name(name), Some(kind));
        }
        let mut names: Vec<&str> = EVENT_PROP_NAMES.iter().map(|(_, name)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EVENT_PROP_NAMES.len());
        assert_eq!(EventKind::from_prop_name("onUnknown"), None);
    }
}
