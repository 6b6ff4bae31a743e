//! Pure canvas geometry: viewport↔canvas mapping, grid snapping, drag-delta
//! tracking and anchored resizing.
//!
//! Everything here is stateless f32 math over component rectangles. The
//! presentation layer owns pointer capture and calls these helpers on every
//! move event; the store only sees the resulting positions and sizes.

use serde::{Deserialize, Serialize};

/// Minimum component width, enforced after snapping.
pub const MIN_WIDTH: f32 = 50.0;
/// Minimum component height, enforced after snapping.
pub const MIN_HEIGHT: f32 = 30.0;

/// A point in canvas or viewport units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned component rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }
}

// ─── Coordinate mapping ──────────────────────────────────────────────────

/// Map a pointer position in viewport units onto the canvas:
/// `(pointer - origin) / scale`, clamped to ≥ 0 on both axes.
pub fn to_canvas_point(pointer: Point, canvas_origin: Point, scale: f32) -> Point {
    Point {
        x: ((pointer.x - canvas_origin.x) / scale).max(0.0),
        y: ((pointer.y - canvas_origin.y) / scale).max(0.0),
    }
}

/// Quantize `value` to the nearest multiple of `grid_size` when snapping is
/// enabled; pass the value through otherwise.
pub fn snap(value: f32, grid_size: f32, enabled: bool) -> f32 {
    if enabled && grid_size > 0.0 {
        (value / grid_size).round() * grid_size
    } else {
        value
    }
}

// ─── Dragging ────────────────────────────────────────────────────────────

/// The pointer→component offset captured once at drag start.
///
/// Every subsequent pointer move computes the new position as
/// `pointer - delta`, so the component doesn't jump to put its corner under
/// the cursor when the drag begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragDelta {
    dx: f32,
    dy: f32,
}

impl DragDelta {
    /// Capture the offset between the pointer and the component origin.
    pub fn capture(pointer: Point, component_origin: Point) -> Self {
        Self {
            dx: pointer.x - component_origin.x,
            dy: pointer.y - component_origin.y,
        }
    }

    /// New component position for the current pointer, snapped and clamped
    /// to the canvas (≥ 0 on both axes).
    pub fn position(&self, pointer: Point, grid_size: f32, snap_enabled: bool) -> Point {
        Point {
            x: snap(pointer.x - self.dx, grid_size, snap_enabled).max(0.0),
            y: snap(pointer.y - self.dy, grid_size, snap_enabled).max(0.0),
        }
    }
}

// ─── Resizing ────────────────────────────────────────────────────────────

/// Which edge(s) of the component the resize handle grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeDirection {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeDirection {
    pub fn has_top(&self) -> bool {
        matches!(self, Self::Top | Self::TopLeft | Self::TopRight)
    }

    pub fn has_bottom(&self) -> bool {
        matches!(self, Self::Bottom | Self::BottomLeft | Self::BottomRight)
    }

    pub fn has_left(&self) -> bool {
        matches!(self, Self::Left | Self::TopLeft | Self::BottomLeft)
    }

    pub fn has_right(&self) -> bool {
        matches!(self, Self::Right | Self::TopRight | Self::BottomRight)
    }
}

/// Resize `start` by `pointer_delta` from the edge(s) in `direction`.
///
/// Growing from `left` or `top` keeps the opposite edge anchor-fixed: the
/// new size is snapped first, then the position is recomputed as
/// `start_pos + (start_size - new_size)` so the unmoved edge stays
/// pixel-identical. Minimum clamps are applied after snapping.
pub fn resize(
    direction: ResizeDirection,
    start: Rect,
    pointer_delta: Point,
    grid_size: f32,
    snap_enabled: bool,
) -> Rect {
    let mut out = start;

    if direction.has_right() {
        out.width = snap(start.width + pointer_delta.x, grid_size, snap_enabled).max(MIN_WIDTH);
    }
    if direction.has_left() {
        let new_width = snap(start.width - pointer_delta.x, grid_size, snap_enabled).max(MIN_WIDTH);
        out.width = new_width;
        out.x = start.x + (start.width - new_width);
    }
    if direction.has_bottom() {
        out.height = snap(start.height + pointer_delta.y, grid_size, snap_enabled).max(MIN_HEIGHT);
    }
    if direction.has_top() {
        let new_height =
            snap(start.height - pointer_delta.y, grid_size, snap_enabled).max(MIN_HEIGHT);
        out.height = new_height;
        out.y = start.y + (start.height - new_height);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn snap_rounds_to_grid() {
        assert_eq!(snap(53.0, 20.0, true), 60.0);
        assert_eq!(snap(49.0, 20.0, true), 40.0);
        assert_eq!(snap(53.0, 20.0, false), 53.0);
    }

    #[test]
    fn snap_ignores_degenerate_grid() {
        assert_eq!(snap(53.0, 0.0, true), 53.0);
    }

    #[test]
    fn canvas_point_scales_and_clamps() {
        let p = to_canvas_point(Point::new(250.0, 130.0), Point::new(50.0, 30.0), 2.0);
        assert_eq!(p, Point::new(100.0, 50.0));

        // Pointer left of the canvas origin clamps to the canvas edge
        let p = to_canvas_point(Point::new(10.0, 100.0), Point::new(50.0, 30.0), 1.0);
        assert_eq!(p, Point::new(0.0, 70.0));
    }

    #[test]
    fn drag_keeps_grab_offset() {
        // Grab a component at (100, 100) with the pointer at (130, 110)
        let delta = DragDelta::capture(Point::new(130.0, 110.0), Point::new(100.0, 100.0));

        // Moving the pointer 1px must not jump the component to the cursor
        let pos = delta.position(Point::new(131.0, 110.0), 20.0, false);
        assert_eq!(pos, Point::new(101.0, 100.0));

        // With snapping the position lands on the grid
        let pos = delta.position(Point::new(143.0, 121.0), 20.0, true);
        assert_eq!(pos, Point::new(120.0, 120.0));
    }

    #[test]
    fn drag_clamps_to_canvas() {
        let delta = DragDelta::capture(Point::new(5.0, 5.0), Point::new(0.0, 0.0));
        let pos = delta.position(Point::new(0.0, 0.0), 10.0, false);
        assert_eq!(pos, Point::new(0.0, 0.0));
    }

    #[test]
    fn resize_right_grows_width_only() {
        let start = Rect::new(100.0, 100.0, 200.0, 100.0);
        let out = resize(
            ResizeDirection::Right,
            start,
            Point::new(23.0, 0.0),
            10.0,
            true,
        );
        assert_eq!(out, Rect::new(100.0, 100.0, 220.0, 100.0));
    }

    #[test]
    fn resize_top_left_anchors_bottom_right() {
        let start = Rect::new(100.0, 100.0, 200.0, 100.0);
        let out = resize(
            ResizeDirection::TopLeft,
            start,
            Point::new(10.0, 10.0),
            10.0,
            true,
        );
        assert_eq!(out.width, 190.0);
        assert_eq!(out.x, 110.0);
        assert_eq!(out.height, 90.0);
        assert_eq!(out.y, 110.0);
        // The bottom-right corner must not move
        assert_eq!(out.x + out.width, 300.0);
        assert_eq!(out.y + out.height, 200.0);
    }

    #[test]
    fn resize_clamps_to_minimums_after_snapping() {
        let start = Rect::new(0.0, 0.0, 60.0, 40.0);
        // Dragging the right edge far left would shrink below the minimum
        let out = resize(
            ResizeDirection::Right,
            start,
            Point::new(-55.0, 0.0),
            20.0,
            true,
        );
        assert_eq!(out.width, MIN_WIDTH);

        let out = resize(
            ResizeDirection::Bottom,
            start,
            Point::new(0.0, -35.0),
            20.0,
            true,
        );
        assert_eq!(out.height, MIN_HEIGHT);
    }

    #[test]
    fn resize_left_clamp_keeps_right_edge() {
        // Shrinking from the left below the minimum: width clamps and the
        // x shift uses the clamped width, so the right edge stays put.
        let start = Rect::new(100.0, 0.0, 60.0, 40.0);
        let out = resize(
            ResizeDirection::Left,
            start,
            Point::new(55.0, 0.0),
            0.0,
            false,
        );
        assert_eq!(out.width, MIN_WIDTH);
        assert_eq!(out.x, 110.0);
        assert_eq!(out.x + out.width, start.x + start.width);
    }
}
