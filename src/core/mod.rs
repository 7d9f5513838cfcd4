//! Plain data shared by the engine contract and the bindings.

mod callback;
mod geometry;
mod graph;

pub use callback::Callback;
pub use geometry::{Point, Rect, Size, project_on_segment};
pub use graph::{
    Attributes, Element, ElementId, ElementKind, GraphPayload, RawEdge, RawNode, Target,
};
