use serde::{Deserialize, Serialize};

use crate::core::{Callback, Point, Rect, Size};

/// Fraction of the overlay size used to translate it relative to its
/// position: `(-0.5, -1.0)` puts the position at the bottom-center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

impl Anchor {
    pub const TOP_LEFT: Self = Self { x: 0.0, y: 0.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Creation-time flags of a canvas layer; not updatable in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CanvasLayerOptions {
    /// Draw once in graph space and let the engine transform the bitmap.
    #[serde(default)]
    pub is_static: bool,
    /// Skip clearing the canvas between paints.
    #[serde(default)]
    pub no_clear: bool,
}

/// Drawing surface handed to canvas paint callbacks.
pub trait CanvasContext {
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: Rect, color: &str);
    fn stroke_line(&mut self, from: Point, to: Point, color: &str, width: f64);
    fn fill_text(&mut self, text: &str, at: Point, color: &str);
}

pub type PaintCallback = Callback<dyn Fn(&mut dyn CanvasContext)>;

/// Creation parameters of a positioned overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayOptions {
    pub position: Point,
    #[serde(default)]
    pub size: Option<Size>,
    /// Size in graph units (scales with zoom) instead of screen pixels.
    #[serde(default)]
    pub scaled: bool,
    #[serde(default)]
    pub z_index: Option<i32>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub anchor: Anchor,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl OverlayOptions {
    #[must_use]
    pub fn at(position: Point) -> Self {
        Self {
            position,
            size: None,
            scaled: false,
            z_index: None,
            class_name: None,
            anchor: Anchor::TOP_LEFT,
            content: String::new(),
            visible: true,
        }
    }
}

/// In-place overlay change.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayUpdate {
    Position(Point),
    Size(Option<Size>),
    Scaled(bool),
    ZIndex(Option<i32>),
    ClassName(Option<String>),
    Anchor(Anchor),
    Content(String),
}
