//! Markup annotation data model
//!
//! Annotations are the only mutable editing state: the source document is
//! treated as an opaque page sequence that annotations are drawn on top of.
//! Anchors are stored in interactive-surface coordinates (origin top-left,
//! y-down) at the zoom level that was active when the annotation was placed.

use crate::coords::ScreenPoint;

/// Unique identifier for an annotation
///
/// Generated using UUID v4; uniqueness is the only invariant callers may
/// rely on.
pub type AnnotationId = uuid::Uuid;

/// RGB color with components normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    /// Create a color from 8-bit channel values
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };
    pub const RED: Color = Color { r: 1.0, g: 0.0, b: 0.0 };
}

/// Logical font family for text annotations
///
/// Resolved to a concrete font program at export time; the editor never
/// needs the font bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FontFamily {
    /// Built-in default (Helvetica at export time)
    Default,
    Gothic,
    Mincho,
    Brush,
}

impl FontFamily {
    /// The asset name used to fetch this family from the font source
    pub fn asset_name(&self) -> &'static str {
        match self {
            FontFamily::Default => "default",
            FontFamily::Gothic => "gothic",
            FontFamily::Mincho => "mincho",
            FontFamily::Brush => "brush",
        }
    }
}

impl Default for FontFamily {
    fn default() -> Self {
        FontFamily::Default
    }
}

/// Shape-specific payload of an annotation
///
/// A closed enum rather than one struct with optional fields, so a check
/// mark cannot carry text content and a line cannot carry a font.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum AnnotationShape {
    /// Text placed at the anchor; content may contain newlines and is
    /// drawn as-is (no automatic wrapping)
    Text {
        content: String,
        font: FontFamily,
        size: f32,
    },

    /// A check mark scaled to `size`
    Check { size: f32 },

    /// Unfilled rectangle outline; anchor is the center
    Rectangle { width: f32, height: f32 },

    /// Solid white borderless box used for redaction; anchor is the center
    FilledBox { width: f32, height: f32 },

    /// Unfilled ellipse inscribed in the bounding box; anchor is the center
    Circle { width: f32, height: f32 },

    /// Straight segment from the anchor to `anchor + (dx, dy)`
    Line { dx: f32, dy: f32 },
}

impl AnnotationShape {
    /// Whether the anchor denotes the shape's center (box-like shapes)
    /// rather than its start or draw position
    pub fn is_center_anchored(&self) -> bool {
        matches!(
            self,
            AnnotationShape::Rectangle { .. }
                | AnnotationShape::FilledBox { .. }
                | AnnotationShape::Circle { .. }
        )
    }

    /// Extent of the shape as (width, height) in surface units
    ///
    /// Text extent is a rough estimate based on glyph size; precise metrics
    /// only matter at export time.
    pub fn extent(&self) -> (f32, f32) {
        match self {
            AnnotationShape::Text { content, size, .. } => {
                let longest = content.lines().map(str::len).max().unwrap_or(0);
                let lines = content.lines().count().max(1);
                (longest as f32 * size * 0.5, lines as f32 * size)
            }
            AnnotationShape::Check { size } => (*size, *size),
            AnnotationShape::Rectangle { width, height }
            | AnnotationShape::FilledBox { width, height }
            | AnnotationShape::Circle { width, height } => (*width, *height),
            AnnotationShape::Line { dx, dy } => (dx.abs(), dy.abs()),
        }
    }

    fn all_finite(&self) -> bool {
        let (w, h) = match self {
            AnnotationShape::Text { size, .. } | AnnotationShape::Check { size } => (*size, *size),
            AnnotationShape::Rectangle { width, height }
            | AnnotationShape::FilledBox { width, height }
            | AnnotationShape::Circle { width, height } => (*width, *height),
            AnnotationShape::Line { dx, dy } => (*dx, *dy),
        };
        w.is_finite() && h.is_finite()
    }
}

/// One placed markup object
///
/// The shape variant is fixed at creation. The anchor is recorded together
/// with the zoom percentage in force at creation time so export can
/// normalize it back to page-native units.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    id: AnnotationId,
    /// 1-based page index into the open document
    page: u32,
    /// Interactive-surface position at creation-time zoom
    anchor: ScreenPoint,
    /// Zoom percentage in force when the annotation was placed
    zoom_percent: f32,
    color: Color,
    shape: AnnotationShape,
}

impl Annotation {
    /// Create an annotation with a fresh id
    ///
    /// Returns `None` when the anchor or shape carries a non-finite value;
    /// the store never holds NaN/infinite geometry.
    pub fn new(
        page: u32,
        anchor: ScreenPoint,
        zoom_percent: f32,
        color: Color,
        shape: AnnotationShape,
    ) -> Option<Self> {
        if !anchor.x.is_finite() || !anchor.y.is_finite() || !zoom_percent.is_finite() {
            return None;
        }
        if !shape.all_finite() {
            return None;
        }
        Some(Self {
            id: AnnotationId::new_v4(),
            page,
            anchor,
            zoom_percent,
            color,
            shape,
        })
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn anchor(&self) -> ScreenPoint {
        self.anchor
    }

    pub fn zoom_percent(&self) -> f32 {
        self.zoom_percent
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn shape(&self) -> &AnnotationShape {
        &self.shape
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Replace the scalar or (width, height) size without changing the
    /// shape variant
    pub fn set_size(&mut self, width: f32, height: f32) {
        if !width.is_finite() || !height.is_finite() {
            return;
        }
        match &mut self.shape {
            AnnotationShape::Text { size, .. } | AnnotationShape::Check { size } => *size = width,
            AnnotationShape::Rectangle { width: w, height: h }
            | AnnotationShape::FilledBox { width: w, height: h }
            | AnnotationShape::Circle { width: w, height: h } => {
                *w = width;
                *h = height;
            }
            AnnotationShape::Line { dx, dy } => {
                *dx = width;
                *dy = height;
            }
        }
    }

    /// Replace the text content; no-op for non-text shapes
    pub fn set_content(&mut self, content: String) {
        if let AnnotationShape::Text { content: c, .. } = &mut self.shape {
            *c = content;
        }
    }

    /// Replace the font family; no-op for non-text shapes
    pub fn set_font(&mut self, font: FontFamily) {
        if let AnnotationShape::Text { font: f, .. } = &mut self.shape {
            *f = font;
        }
    }

    /// Axis-aligned bounding box in base-scale surface coordinates
    /// (100% zoom): (min_x, min_y, max_x, max_y)
    ///
    /// Anchor and extents are recorded at creation zoom, so both are
    /// normalized here; boxes of annotations placed at different zoom
    /// levels are directly comparable.
    pub fn bounding_box(&self) -> (f32, f32, f32, f32) {
        let scale = self.zoom_percent / 100.0;
        let (ax, ay) = (self.anchor.x / scale, self.anchor.y / scale);
        let (w, h) = self.shape.extent();
        let (w, h) = (w / scale, h / scale);
        match &self.shape {
            s if s.is_center_anchored() => {
                (ax - w / 2.0, ay - h / 2.0, ax + w / 2.0, ay + h / 2.0)
            }
            AnnotationShape::Line { dx, dy } => {
                let x2 = ax + dx / scale;
                let y2 = ay + dy / scale;
                (ax.min(x2), ay.min(y2), ax.max(x2), ay.max(y2))
            }
            _ => (ax, ay, ax + w, ay + h),
        }
    }

    /// Check whether a click falls on this annotation, within `tolerance`
    /// base-scale units (used for click selection)
    ///
    /// `point` arrives at `point_zoom` percent; it and the stored anchor
    /// are each normalized to base scale before comparing, so selection
    /// keeps working after the view zoom changes.
    pub fn hit_test(&self, point: ScreenPoint, point_zoom: f32, tolerance: f32) -> bool {
        let scale = point_zoom / 100.0;
        let (px, py) = (point.x / scale, point.y / scale);
        let (min_x, min_y, max_x, max_y) = self.bounding_box();
        px >= min_x - tolerance
            && px <= max_x + tolerance
            && py >= min_y - tolerance
            && py <= max_y + tolerance
    }
}
