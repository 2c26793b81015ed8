//! Renderer contract consumed by on-screen controls.
//!
//! padlink never draws. A host-provided [`Renderer`] creates, updates and
//! removes visual primitives, maps screen coordinates into world space, and
//! lists the surfaces pointers can land on.
//!
//! Optional behavior is declared up front through [`RendererCapabilities`]
//! and read once when a virtual device is built:
//! - `multi_surface`: the renderer draws on several surfaces. Pointer routing
//!   then uses each [`Surface`]'s screen bounds and resolution instead of
//!   [`Renderer::screen_to_world`], and every control belongs to one surface.
//! - `pointer_hint`: the renderer wants [`Renderer::set_pointer_active`]
//!   calls (e.g. to suspend camera orbiting while a control is held).

use serde::{Deserialize, Serialize};
use std::fmt;

/// 2D point in world (surface) space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Vector from `origin` to `self`.
    pub fn offset_from(self, origin: Point) -> (f32, f32) {
        (self.x - origin.x, self.y - origin.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        let (dx, dy) = self.offset_from(other);
        dx.hypot(dy)
    }
}

/// Screen-space rectangle (inclusive edges).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub String);

impl SurfaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SurfaceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A drawing/event target.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub id: SurfaceId,
    /// Position on screen.
    pub bounds: Rect,
    /// Drawing resolution; equal to the bounds size when unscaled.
    pub width: f32,
    pub height: f32,
}

impl Surface {
    pub fn new(id: impl Into<SurfaceId>, bounds: Rect) -> Self {
        Self {
            id: id.into(),
            width: bounds.width(),
            height: bounds.height(),
            bounds,
        }
    }

    pub fn with_resolution(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        self.bounds.contains(x, y)
    }

    /// Converts a screen point into this surface's drawing space, without a
    /// bounds check.
    pub fn to_local(&self, x: f32, y: f32) -> Point {
        let scale_x = if self.bounds.width() > 0.0 {
            self.width / self.bounds.width()
        } else {
            1.0
        };
        let scale_y = if self.bounds.height() > 0.0 {
            self.height / self.bounds.height()
        } else {
            1.0
        };
        Point::new(
            (x - self.bounds.left) * scale_x,
            (y - self.bounds.top) * scale_y,
        )
    }
}

/// Result of [`Renderer::screen_to_world`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorldPoint {
    pub point: Point,
    /// Surface under the screen point, if the renderer knows.
    pub surface: Option<SurfaceId>,
}

/// Optional renderer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RendererCapabilities {
    pub multi_surface: bool,
    pub pointer_hint: bool,
}

/// Opaque handle to a renderer-owned visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    Button,
    StickBase,
    StickKnob,
}

/// Full attribute set for a new visual.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualAttributes {
    pub position: Point,
    pub radius: f32,
    /// Ring visuals (stick base) have an inner radius.
    pub inner_radius: Option<f32>,
    /// `0xRRGGBB`.
    pub color: u32,
    pub opacity: f32,
    pub label: Option<String>,
    pub label_color: Option<String>,
    /// Target surface for multi-surface renderers.
    pub surface: Option<SurfaceId>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisualPatch {
    pub position: Option<Point>,
    pub radius: Option<f32>,
    pub inner_radius: Option<f32>,
    pub color: Option<u32>,
    pub scale: Option<f32>,
}

/// Visual backend used by on-screen controls.
pub trait Renderer {
    fn capabilities(&self) -> RendererCapabilities;

    fn create_visual(&mut self, kind: VisualKind, attributes: &VisualAttributes) -> VisualHandle;

    fn update_visual(&mut self, handle: VisualHandle, patch: &VisualPatch);

    fn remove_visual(&mut self, handle: VisualHandle);

    /// Maps a screen point into world space.
    fn screen_to_world(&self, x: f32, y: f32) -> WorldPoint;

    /// Every addressable surface.
    fn surfaces(&self) -> Vec<Surface>;

    /// The primary surface.
    fn surface(&self) -> Option<Surface> {
        self.surfaces().into_iter().next()
    }

    /// Hint that a control is (or is no longer) held. Only called when
    /// `capabilities().pointer_hint` is set.
    fn set_pointer_active(&mut self, _active: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_maps_screen_to_scaled_local() {
        let s = Surface::new("hud", Rect::new(100.0, 50.0, 300.0, 150.0)).with_resolution(400.0, 200.0);
        assert!(s.contains(100.0, 150.0));
        assert!(!s.contains(99.0, 60.0));
        assert_eq!(s.to_local(200.0, 100.0), Point::new(200.0, 100.0));
        assert_eq!(s.to_local(100.0, 50.0), Point::new(0.0, 0.0));
    }

    #[test]
    fn point_distance() {
        assert_eq!(Point::new(3.0, 4.0).distance(Point::default()), 5.0);
        assert_eq!(Point::new(1.0, 1.0).offset_from(Point::new(2.0, -1.0)), (-1.0, 2.0));
    }
}
