use serde::{Deserialize, Serialize};

use crate::core::{Point, Rect, Size};
use crate::engine::Anchor;

/// Side of the target a tooltip is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TooltipPlacement {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

impl TooltipPlacement {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Center => Self::Center,
        }
    }

    /// Overlay anchor putting the box on this side of its position.
    #[must_use]
    pub fn anchor(self) -> Anchor {
        match self {
            Self::Top => Anchor::new(-0.5, -1.0),
            Self::Bottom => Anchor::new(-0.5, 0.0),
            Self::Left => Anchor::new(-1.0, -0.5),
            Self::Right => Anchor::new(0.0, -0.5),
            Self::Center => Anchor::new(-0.5, -0.5),
        }
    }

    /// Screen-space displacement of `distance` pixels towards this side.
    #[must_use]
    pub fn screen_offset(self, distance: f64) -> (f64, f64) {
        match self {
            Self::Top => (0.0, -distance),
            Self::Bottom => (0.0, distance),
            Self::Left => (-distance, 0.0),
            Self::Right => (distance, 0.0),
            Self::Center => (0.0, 0.0),
        }
    }

    /// `true` when `bounds` leave the viewport on this placement's side.
    #[must_use]
    pub fn overflows(self, bounds: Rect, viewport: Size) -> bool {
        match self {
            Self::Top => bounds.y < 0.0,
            Self::Bottom => bounds.bottom() > viewport.height,
            Self::Left => bounds.x < 0.0,
            Self::Right => bounds.right() > viewport.width,
            Self::Center => false,
        }
    }

    /// Applies the offset in screen space so it stays constant in pixels
    /// whatever the zoom.
    #[must_use]
    pub fn offset_position(
        self,
        anchor: Point,
        distance: f64,
        to_screen: impl Fn(Point) -> Point,
        to_graph: impl Fn(Point) -> Point,
    ) -> Point {
        let (dx, dy) = self.screen_offset(distance);
        to_graph(to_screen(anchor).offset(dx, dy))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::TooltipPlacement;
    use crate::core::{Point, Rect, Size};

    #[test]
    fn opposite_is_an_involution() {
        for placement in [
            TooltipPlacement::Top,
            TooltipPlacement::Bottom,
            TooltipPlacement::Left,
            TooltipPlacement::Right,
            TooltipPlacement::Center,
        ] {
            assert_eq!(placement.opposite().opposite(), placement);
        }
    }

    #[test]
    fn offset_is_constant_in_screen_pixels() {
        for zoom in [0.5, 1.0, 4.0] {
            let to_screen = |p: Point| Point::new(p.x * zoom, p.y * zoom);
            let to_graph = |p: Point| Point::new(p.x / zoom, p.y / zoom);
            let anchor = Point::new(10.0, 10.0);
            let moved = TooltipPlacement::Top.offset_position(anchor, 8.0, to_screen, to_graph);
            assert_relative_eq!(to_screen(anchor).y - to_screen(moved).y, 8.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn overflow_only_checks_the_placement_side() {
        let viewport = Size::new(100.0, 100.0);
        let above = Rect::new(10.0, -5.0, 20.0, 10.0);
        assert!(TooltipPlacement::Top.overflows(above, viewport));
        assert!(!TooltipPlacement::Bottom.overflows(above, viewport));
        assert!(!TooltipPlacement::Center.overflows(above, viewport));
    }
}
