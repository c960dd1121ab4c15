//! Annotation Engine Core
//!
//! Data model and editing state for the document annotation engine:
//! annotations, the ordered store, bounded undo history, tool state and
//! the editing session. Pure state: no PDF parsing or rendering lives
//! here; export and persistence build on top of this crate.

pub mod annotation;
pub mod coords;
pub mod history;
pub mod session;
pub mod store;
pub mod tools;

pub use annotation::{Annotation, AnnotationId, AnnotationShape, Color, FontFamily};
pub use coords::{center_to_top_left, to_content_space, to_screen_space, ContentPoint, ScreenPoint};
pub use history::{HistoryManager, MAX_HISTORY_DEPTH};
pub use session::{
    EditorSession, OpenDocument, PageGeometry, PointerOutcome, SessionError,
};
pub use store::{AnnotationEdit, AnnotationStore};
pub use tools::{Tool, ToolController, ToolDefaults};
