use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{ElementKind, Target};
use crate::engine::{EventKind, MouseButton};
use crate::error::BindingError;

/// What a tooltip is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSubject {
    Background,
    Node,
    Edge,
}

impl TriggerSubject {
    /// `true` when an event on `target` (`None` for the background) concerns
    /// this subject.
    #[must_use]
    pub fn matches(self, target: Option<&Target>) -> bool {
        match (self, target) {
            (Self::Background, None) => true,
            (Self::Node, Some(target)) => target.kind == ElementKind::Node,
            (Self::Edge, Some(target)) => target.kind == ElementKind::Edge,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TriggerGesture {
    Click,
    DoubleClick,
    RightClick,
    Hover,
}

/// The interaction that shows a tooltip, named after its event prop
/// (`"nodeClick"`, `"edgeHover"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TooltipTrigger {
    BackgroundClick,
    BackgroundDoubleClick,
    BackgroundRightClick,
    NodeClick,
    NodeDoubleClick,
    NodeRightClick,
    NodeHover,
    EdgeClick,
    EdgeDoubleClick,
    EdgeRightClick,
    EdgeHover,
}

impl TooltipTrigger {
    pub const ALL: [Self; 11] = [
        Self::BackgroundClick,
        Self::BackgroundDoubleClick,
        Self::BackgroundRightClick,
        Self::NodeClick,
        Self::NodeDoubleClick,
        Self::NodeRightClick,
        Self::NodeHover,
        Self::EdgeClick,
        Self::EdgeDoubleClick,
        Self::EdgeRightClick,
        Self::EdgeHover,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::BackgroundClick => "backgroundClick",
            Self::BackgroundDoubleClick => "backgroundDoubleClick",
            Self::BackgroundRightClick => "backgroundRightClick",
            Self::NodeClick => "nodeClick",
            Self::NodeDoubleClick => "nodeDoubleClick",
            Self::NodeRightClick => "nodeRightClick",
            Self::NodeHover => "nodeHover",
            Self::EdgeClick => "edgeClick",
            Self::EdgeDoubleClick => "edgeDoubleClick",
            Self::EdgeRightClick => "edgeRightClick",
            Self::EdgeHover => "edgeHover",
        }
    }

    #[must_use]
    pub fn subject(self) -> TriggerSubject {
        match self {
            Self::BackgroundClick | Self::BackgroundDoubleClick | Self::BackgroundRightClick => {
                TriggerSubject::Background
            }
            Self::NodeClick | Self::NodeDoubleClick | Self::NodeRightClick | Self::NodeHover => {
                TriggerSubject::Node
            }
            Self::EdgeClick | Self::EdgeDoubleClick | Self::EdgeRightClick | Self::EdgeHover => {
                TriggerSubject::Edge
            }
        }
    }

    #[must_use]
    pub fn gesture(self) -> TriggerGesture {
        match self {
            Self::BackgroundClick | Self::NodeClick | Self::EdgeClick => TriggerGesture::Click,
            Self::BackgroundDoubleClick | Self::NodeDoubleClick | Self::EdgeDoubleClick => {
                TriggerGesture::DoubleClick
            }
            Self::BackgroundRightClick | Self::NodeRightClick | Self::EdgeRightClick => {
                TriggerGesture::RightClick
            }
            Self::NodeHover | Self::EdgeHover => TriggerGesture::Hover,
        }
    }

    /// Engine events a tooltip with this trigger listens to.
    #[must_use]
    pub fn event_kinds(self) -> &'static [EventKind] {
        match self.gesture() {
            TriggerGesture::Hover => &[EventKind::MouseOver, EventKind::MouseOut],
            TriggerGesture::Click | TriggerGesture::RightClick => &[EventKind::Click],
            TriggerGesture::DoubleClick => &[EventKind::DoubleClick, EventKind::Click],
        }
    }

    /// Mouse button of click-family triggers.
    #[must_use]
    pub fn button(self) -> Option<MouseButton> {
        match self.gesture() {
            TriggerGesture::Click | TriggerGesture::DoubleClick => Some(MouseButton::Left),
            TriggerGesture::RightClick => Some(MouseButton::Right),
            TriggerGesture::Hover => None,
        }
    }
}

impl fmt::Display for TooltipTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TooltipTrigger {
    type Err = BindingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|trigger| trigger.name() == name)
            .ok_or_else(|| BindingError::InvalidConfig(format!("unknown tooltip event `{name}`")))
    }
}
