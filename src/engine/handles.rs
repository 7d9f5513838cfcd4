use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! handle_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

handle_id!(
    /// Selector-scoped attribute rule.
    RuleId,
    "rule"
);
handle_id!(TransformationId, "transformation");
handle_id!(LayerId, "layer");
handle_id!(CanvasLayerId, "canvas-layer");
handle_id!(OverlayId, "overlay");
handle_id!(
    /// Event subscription returned by `Engine::on`/`Engine::once`.
    ListenerId,
    "listener"
);
handle_id!(FrameRequestId, "frame-request");
handle_id!(
    /// One `Engine::create_class` call. Tells apart successive classes
    /// registered under the same name.
    ClassRequestId,
    "class-request"
);

/// Named style class. The engine tracks classes by name, so the handle is the
/// name itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StyleClassId(pub String);

impl fmt::Display for StyleClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class:{}", self.0)
    }
}

/// Any layer-like handle; show/hide/move/destroy apply uniformly to all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerRef {
    Layer(LayerId),
    Canvas(CanvasLayerId),
    Overlay(OverlayId),
}

impl From<LayerId> for LayerRef {
    fn from(id: LayerId) -> Self {
        Self::Layer(id)
    }
}

impl From<CanvasLayerId> for LayerRef {
    fn from(id: CanvasLayerId) -> Self {
        Self::Canvas(id)
    }
}

impl From<OverlayId> for LayerRef {
    fn from(id: OverlayId) -> Self {
        Self::Overlay(id)
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layer(id) => id.fmt(f),
            Self::Canvas(id) => id.fmt(f),
            Self::Overlay(id) => id.fmt(f),
        }
    }
}
