use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Callback, Element, ElementId};

use super::{Selector, TransformationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformationKind {
    NodeGrouping,
    EdgeGrouping,
    NodeFilter,
    EdgeFilter,
    NodeCollapsing,
    NodeMerging,
    NeighborGeneration,
    NeighborMerging,
    Drilldown,
}

impl TransformationKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NodeGrouping => "node-grouping",
            Self::EdgeGrouping => "edge-grouping",
            Self::NodeFilter => "node-filter",
            Self::EdgeFilter => "edge-filter",
            Self::NodeCollapsing => "node-collapsing",
            Self::NodeMerging => "node-merging",
            Self::NeighborGeneration => "neighbor-generation",
            Self::NeighborMerging => "neighbor-merging",
            Self::Drilldown => "drilldown",
        }
    }

    /// Filters cannot run without criteria; every other kind has engine defaults.
    #[must_use]
    pub fn requires_criteria(self) -> bool {
        matches!(self, Self::NodeFilter | Self::EdgeFilter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Easing {
    #[default]
    Linear,
    QuadraticIn,
    QuadraticOut,
    QuadraticInOut,
    CubicInOut,
}

/// Group key for an element; `None` leaves the element ungrouped.
pub type GroupIdFn = Callback<dyn Fn(&Element<'_>) -> Option<String>>;

/// Data of a generated element, from its group key and member ids.
pub type GeneratorFn = Callback<dyn Fn(&str, &[ElementId]) -> Value>;

pub type NeighborIdFn = Callback<dyn Fn(&Element<'_>) -> Vec<String>>;

/// Parameters of a transformation. Which of them apply depends on the kind.
#[derive(Debug, Clone, Default)]
pub struct TransformationOptions {
    pub selector: Option<Selector>,
    pub criteria: Option<Selector>,
    pub group_id_function: Option<GroupIdFn>,
    pub node_generator: Option<GeneratorFn>,
    pub edge_generator: Option<GeneratorFn>,
    pub neighbor_id_function: Option<NeighborIdFn>,
    pub separate_edges_by_direction: bool,
    pub depth: Option<u32>,
    pub padding: Option<f64>,
    pub easing: Option<Easing>,
    /// Nest grouped nodes inside their group instead of hiding them.
    pub show_contents: bool,
    /// Kind-specific static parameters, only read at construction.
    pub extra: Value,
}

/// In-place option change. `Some` fields replace the current value.
#[derive(Debug, Clone, Default)]
pub struct TransformationPatch {
    pub selector: Option<Option<Selector>>,
    pub criteria: Option<Option<Selector>>,
    pub group_id_function: Option<Option<GroupIdFn>>,
    pub node_generator: Option<Option<GeneratorFn>>,
    pub edge_generator: Option<Option<GeneratorFn>>,
    pub neighbor_id_function: Option<Option<NeighborIdFn>>,
    pub separate_edges_by_direction: Option<bool>,
    pub depth: Option<Option<u32>>,
    pub padding: Option<Option<f64>>,
    pub easing: Option<Option<Easing>>,
}

impl TransformationPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selector.is_none()
            && self.criteria.is_none()
            && self.group_id_function.is_none()
            && self.node_generator.is_none()
            && self.edge_generator.is_none()
            && self.neighbor_id_function.is_none()
            && self.separate_edges_by_direction.is_none()
            && self.depth.is_none()
            && self.padding.is_none()
            && self.easing.is_none()
    }

    pub fn apply_to(self, options: &mut TransformationOptions) {
        if let Some(selector) = self.selector {
            options.selector = selector;
        }
        if let Some(criteria) = self.criteria {
            options.criteria = criteria;
        }
        if let Some(group_id_function) = self.group_id_function {
            options.group_id_function = group_id_function;
        }
        if let Some(node_generator) = self.node_generator {
            options.node_generator = node_generator;
        }
        if let Some(edge_generator) = self.edge_generator {
            options.edge_generator = edge_generator;
        }
        if let Some(neighbor_id_function) = self.neighbor_id_function {
            options.neighbor_id_function = neighbor_id_function;
        }
        if let Some(separate) = self.separate_edges_by_direction {
            options.separate_edges_by_direction = separate;
        }
        if let Some(depth) = self.depth {
            options.depth = depth;
        }
        if let Some(padding) = self.padding {
            options.padding = padding;
        }
        if let Some(easing) = self.easing {
            options.easing = easing;
        }
    }
}

pub type TransformationCallback = Callback<dyn Fn(TransformationId)>;

/// Lifecycle callbacks forwarded to the engine at construction time.
#[derive(Debug, Clone, Default)]
pub struct TransformationCallbacks {
    pub on_enabled: Option<TransformationCallback>,
    pub on_disabled: Option<TransformationCallback>,
    pub on_destroyed: Option<TransformationCallback>,
    pub on_updated: Option<TransformationCallback>,
    pub on_set_index: Option<Callback<dyn Fn(TransformationId, usize)>>,
}

#[derive(Debug, Clone)]
pub struct TransformationSpec {
    pub kind: TransformationKind,
    pub options: TransformationOptions,
    pub enabled: bool,
    /// Animated transition length in milliseconds; `None` or zero is immediate.
    pub duration: Option<f64>,
    pub index: Option<usize>,
    pub callbacks: TransformationCallbacks,
}
