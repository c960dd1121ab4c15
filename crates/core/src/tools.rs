//! Markup tool selection state machine
//!
//! Exactly one tool can be armed at a time. Selecting a tool from any
//! state arms it; selecting the already-armed tool disarms back to idle.
//! The armed tool stays armed after placing an annotation so repeated
//! clicks place repeatedly.

use crate::annotation::{AnnotationShape, Color, FontFamily};

/// The markup tools a pointer click can place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Text,
    Check,
    Rectangle,
    FilledBox,
    Circle,
    Line,
}

/// Default properties applied to newly placed annotations
///
/// Edited through the property panel; a change here only affects future
/// placements, never existing annotations.
#[derive(Debug, Clone)]
pub struct ToolDefaults {
    pub color: Color,
    /// Glyph size for text and check placements
    pub glyph_size: f32,
    /// (width, height) for box shapes and the line displacement
    pub shape_size: (f32, f32),
    pub font: FontFamily,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            glyph_size: 14.0,
            shape_size: (60.0, 30.0),
            font: FontFamily::Default,
        }
    }
}

impl ToolDefaults {
    /// Materialize the shape payload a tool places, using these defaults
    pub fn shape_for(&self, tool: Tool, text: Option<String>) -> AnnotationShape {
        let (width, height) = self.shape_size;
        match tool {
            Tool::Text => AnnotationShape::Text {
                content: text.unwrap_or_default(),
                font: self.font,
                size: self.glyph_size,
            },
            Tool::Check => AnnotationShape::Check { size: self.glyph_size },
            Tool::Rectangle => AnnotationShape::Rectangle { width, height },
            Tool::FilledBox => AnnotationShape::FilledBox { width, height },
            Tool::Circle => AnnotationShape::Circle { width, height },
            Tool::Line => AnnotationShape::Line { dx: width, dy: height },
        }
    }
}

/// Idle/armed tool state with toggle semantics
#[derive(Debug, Default)]
pub struct ToolController {
    armed: Option<Tool>,
}

impl ToolController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a tool, or disarm when the same tool is selected again
    pub fn arm(&mut self, tool: Tool) {
        if self.armed == Some(tool) {
            self.armed = None;
        } else {
            self.armed = Some(tool);
        }
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    pub fn armed(&self) -> Option<Tool> {
        self.armed
    }

    pub fn is_idle(&self) -> bool {
        self.armed.is_none()
    }
}
