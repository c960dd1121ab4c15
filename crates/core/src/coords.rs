//! Coordinate transforms between the interactive surface and page space
//!
//! The interactive surface uses on-screen pixels: origin top-left, y grows
//! downward, scaled by the current zoom. Page content space is the PDF
//! frame: origin bottom-left, y grows upward, in points, independent of
//! zoom. Both transforms are pure and defined for all finite inputs.

/// A point on the interactive surface (pixels at the current zoom)
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A point in page content space (points, origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentPoint {
    pub x: f32,
    pub y: f32,
}

impl ContentPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Map a surface point to page content space
///
/// Removes the zoom factor first, then flips the y axis against the page
/// height at native scale.
pub fn to_content_space(screen: ScreenPoint, zoom_percent: f32, page_height: f32) -> ContentPoint {
    let scale = zoom_percent / 100.0;
    let x = screen.x / scale;
    let y = page_height - screen.y / scale;
    ContentPoint::new(x, y)
}

/// Inverse of [`to_content_space`]
pub fn to_screen_space(content: ContentPoint, zoom_percent: f32, page_height: f32) -> ScreenPoint {
    let scale = zoom_percent / 100.0;
    let x = content.x * scale;
    let y = (page_height - content.y) * scale;
    ScreenPoint::new(x, y)
}

/// Convert a center anchor to the box's top-left corner, still in surface
/// orientation (y-down)
///
/// Box-like shapes store their anchor as the center point; drawing wants
/// the corner. Line and text anchors pass through untouched.
pub fn center_to_top_left(center: ScreenPoint, width: f32, height: f32) -> ScreenPoint {
    ScreenPoint::new(center.x - width / 2.0, center.y - height / 2.0)
}
