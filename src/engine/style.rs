use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Attributes, Callback, Element};

/// Predicate over engine elements; compared by reference.
pub type Selector = Callback<dyn Fn(&Element<'_>) -> bool>;

pub type AttributeFn = Callback<dyn Fn(&Element<'_>) -> Attributes>;

/// Attributes a rule assigns: either plain data, compared by content, or a
/// function of the element, compared by reference.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeSpec {
    Static(Attributes),
    Computed(AttributeFn),
}

impl AttributeSpec {
    #[must_use]
    pub fn evaluate(&self, element: &Element<'_>) -> Attributes {
        match self {
            Self::Static(attributes) => attributes.clone(),
            Self::Computed(compute) => compute(element),
        }
    }
}

impl From<Attributes> for AttributeSpec {
    fn from(attributes: Attributes) -> Self {
        Self::Static(attributes)
    }
}

impl From<AttributeFn> for AttributeSpec {
    fn from(compute: AttributeFn) -> Self {
        Self::Computed(compute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleTarget {
    Nodes,
    Edges,
}

/// Global attribute overrides the engine applies on top of every rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverrideKind {
    Hovered,
    Selected,
}

#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub target: RuleTarget,
    pub selector: Option<Selector>,
    pub attributes: AttributeSpec,
}

/// Definition of a named, reusable style class.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassDefinition {
    pub node_attributes: Option<AttributeSpec>,
    pub edge_attributes: Option<AttributeSpec>,
    /// Data paths the node attributes depend on; the engine re-evaluates the
    /// class when they change.
    pub node_dependencies: Option<Value>,
    pub edge_dependencies: Option<Value>,
}

/// Continuation run once a class created with `Engine::create_class` is
/// usable, one frame after the request.
pub type ClassReady = Box<dyn FnOnce(crate::engine::StyleClassId)>;
