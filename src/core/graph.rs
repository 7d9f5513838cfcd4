use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a node or an edge; engines accept both numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementId {
    Int(i64),
    Str(String),
}

impl ElementId {
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Str(_) => None,
        }
    }
}

impl From<i64> for ElementId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ElementId {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Edge,
}

/// Element an interaction resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub kind: ElementKind,
    pub id: ElementId,
}

impl Target {
    #[must_use]
    pub fn node(id: impl Into<ElementId>) -> Self {
        Self {
            kind: ElementKind::Node,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn edge(id: impl Into<ElementId>) -> Self {
        Self {
            kind: ElementKind::Edge,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn is_node(&self) -> bool {
        self.kind == ElementKind::Node
    }

    #[must_use]
    pub fn is_edge(&self) -> bool {
        self.kind == ElementKind::Edge
    }
}

/// Visual attribute map handed to the engine (color, radius, text, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(pub Map<String, Value>);

impl Attributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlays `other` on top of `self`, key by key.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub id: ElementId,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub attributes: Attributes,
}

impl RawNode {
    #[must_use]
    pub fn new(id: impl Into<ElementId>) -> Self {
        Self {
            id: id.into(),
            data: Value::Null,
            attributes: Attributes::default(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.attributes = self.attributes.with("x", x).with("y", y);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    pub id: ElementId,
    pub source: ElementId,
    pub target: ElementId,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub attributes: Attributes,
}

impl RawEdge {
    #[must_use]
    pub fn new(
        id: impl Into<ElementId>,
        source: impl Into<ElementId>,
        target: impl Into<ElementId>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            data: Value::Null,
            attributes: Attributes::default(),
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Graph data pushed to the engine by the host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphPayload {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

impl GraphPayload {
    #[must_use]
    pub fn new(nodes: Vec<RawNode>, edges: Vec<RawEdge>) -> Self {
        Self { nodes, edges }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Read-only view of one engine element, handed to selectors, attribute
/// functions and transformation callbacks.
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    pub kind: ElementKind,
    pub id: &'a ElementId,
    pub data: &'a Value,
    /// Set for elements created by a transformation (groups, merged nodes).
    pub is_virtual: bool,
}

impl Element<'_> {
    #[must_use]
    pub fn target(&self) -> Target {
        Target {
            kind: self.kind,
            id: self.id.clone(),
        }
    }

    #[must_use]
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}
