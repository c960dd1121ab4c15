//! Editing session: one open document plus all live markup state
//!
//! The session owns the annotation store, the undo history, the tool
//! state and the selection for exactly one open document. Opening another
//! document replaces the session state wholesale; nothing is carried
//! over. The source bytes are read-only here; export works from a copy.
//!
//! Every mutating intent operation pushes exactly one history snapshot
//! before it changes the store, so each user-visible edit is individually
//! undoable. Operations that end up changing nothing (no tool armed, page
//! out of range, unknown id) leave both the store and the history stack
//! untouched.

use crate::annotation::{Annotation, AnnotationId};
use crate::coords::ScreenPoint;
use crate::history::HistoryManager;
use crate::store::{AnnotationEdit, AnnotationStore};
use crate::tools::{Tool, ToolController, ToolDefaults};

/// Hit-test slack for click selection, in base-scale surface units
const HIT_TOLERANCE: f32 = 4.0;

/// Page size at native scale, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

/// An opened source document: opaque bytes plus page geometry
///
/// The byte blob is never interpreted by the core; page count and sizes
/// are probed by the export crate when the file is opened.
#[derive(Debug, Clone)]
pub struct OpenDocument {
    title: String,
    bytes: Vec<u8>,
    pages: Vec<PageGeometry>,
}

impl OpenDocument {
    pub fn new(title: impl Into<String>, bytes: Vec<u8>, pages: Vec<PageGeometry>) -> Self {
        Self {
            title: title.into(),
            bytes,
            pages,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Geometry of a 1-based page index
    pub fn page_geometry(&self, page: u32) -> Option<PageGeometry> {
        if page == 0 {
            return None;
        }
        self.pages.get(page as usize - 1).copied()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("an export is already in flight")]
    ExportInFlight,
}

/// What a primary pointer click did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOutcome {
    /// A tool was armed and a new annotation was placed
    Placed(AnnotationId),
    /// Idle click hit an existing annotation and selected it
    Selected(AnnotationId),
    /// Idle click on empty canvas cleared the selection
    SelectionCleared,
    /// Nothing changed (e.g. placement failed validation)
    Ignored,
}

pub struct EditorSession {
    document: OpenDocument,
    store: AnnotationStore,
    history: HistoryManager,
    tools: ToolController,
    defaults: ToolDefaults,
    selection: Option<AnnotationId>,
    current_page: u32,
    zoom_percent: f32,
    export_in_flight: bool,
}

impl EditorSession {
    pub fn new(document: OpenDocument) -> Self {
        Self {
            document,
            store: AnnotationStore::new(),
            history: HistoryManager::new(),
            tools: ToolController::new(),
            defaults: ToolDefaults::default(),
            selection: None,
            current_page: 1,
            zoom_percent: 100.0,
            export_in_flight: false,
        }
    }

    /// Replace the whole session when a different file is opened
    pub fn open(&mut self, document: OpenDocument) {
        *self = Self::new(document);
    }

    pub fn document(&self) -> &OpenDocument {
        &self.document
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    pub fn selection(&self) -> Option<AnnotationId> {
        self.selection
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn zoom_percent(&self) -> f32 {
        self.zoom_percent
    }

    pub fn defaults(&self) -> &ToolDefaults {
        &self.defaults
    }

    pub fn defaults_mut(&mut self) -> &mut ToolDefaults {
        &mut self.defaults
    }

    pub fn set_zoom(&mut self, zoom_percent: f32) {
        if zoom_percent.is_finite() {
            self.zoom_percent = zoom_percent.clamp(20.0, 200.0);
        }
    }

    pub fn go_to_page(&mut self, page: u32) -> Result<(), SessionError> {
        let page_count = self.document.page_count();
        if page == 0 || page > page_count {
            return Err(SessionError::PageOutOfRange { page, page_count });
        }
        self.current_page = page;
        Ok(())
    }

    /// Arm or toggle a markup tool
    pub fn arm_tool(&mut self, tool: Tool) {
        self.tools.arm(tool);
    }

    pub fn armed_tool(&self) -> Option<Tool> {
        self.tools.armed()
    }

    /// Handle a primary pointer click on the current page
    ///
    /// Armed: place a new annotation at the click point and stay armed.
    /// Idle: select the topmost annotation under the click, or clear the
    /// selection on a miss.
    pub fn handle_pointer(&mut self, point: ScreenPoint) -> PointerOutcome {
        self.handle_pointer_with_text(point, None)
    }

    /// Same as [`handle_pointer`](Self::handle_pointer), but supplies the
    /// text content for a text-tool placement
    pub fn handle_pointer_with_text(
        &mut self,
        point: ScreenPoint,
        text: Option<String>,
    ) -> PointerOutcome {
        match self.tools.armed() {
            Some(tool) => match self.place(tool, self.current_page, point, text) {
                Some(id) => PointerOutcome::Placed(id),
                None => PointerOutcome::Ignored,
            },
            None => match self
                .store
                .hit_test(self.current_page, point, self.zoom_percent, HIT_TOLERANCE)
            {
                Some(id) => {
                    self.selection = Some(id);
                    PointerOutcome::Selected(id)
                }
                None => {
                    self.selection = None;
                    PointerOutcome::SelectionCleared
                }
            },
        }
    }

    /// Create an annotation with the armed tool's defaults
    ///
    /// Validates before snapshotting: a rejected placement leaves both the
    /// store and the history stack unchanged.
    fn place(
        &mut self,
        tool: Tool,
        page: u32,
        point: ScreenPoint,
        text: Option<String>,
    ) -> Option<AnnotationId> {
        if page == 0 || page > self.document.page_count() {
            log::debug!(
                "ignoring placement on page {page} of a {}-page document",
                self.document.page_count()
            );
            return None;
        }
        let shape = self.defaults.shape_for(tool, text);
        let annotation = Annotation::new(page, point, self.zoom_percent, self.defaults.color, shape)?;

        self.history.push(self.store.clone());
        Some(self.store.insert(annotation))
    }

    /// Topmost annotation under a surface point on the current page
    ///
    /// Used by the secondary pointer action to ask for delete confirmation.
    pub fn annotation_at(&self, point: ScreenPoint) -> Option<AnnotationId> {
        self.store
            .hit_test(self.current_page, point, self.zoom_percent, HIT_TOLERANCE)
    }

    /// Delete an annotation permanently (undo restores it via history)
    ///
    /// Works regardless of tool state. Unknown ids change nothing.
    pub fn delete_annotation(&mut self, id: AnnotationId) -> bool {
        if self.store.get(id).is_none() {
            return false;
        }
        self.history.push(self.store.clone());
        self.store.remove(id);
        if self.selection == Some(id) {
            self.selection = None;
        }
        true
    }

    /// Apply a property edit to the selected annotation
    ///
    /// One call is one undo unit; the property panel batches keystrokes
    /// into a single committed edit before calling this.
    pub fn apply_property_edit(&mut self, edit: AnnotationEdit) -> bool {
        let Some(id) = self.selection else {
            return false;
        };
        if self.store.get(id).is_none() {
            self.selection = None;
            return false;
        }
        self.history.push(self.store.clone());
        self.store.update_properties(id, &edit)
    }

    /// Restore the most recent snapshot
    ///
    /// Returns false when there is nothing to undo. A selection pointing
    /// at an annotation that no longer exists after the restore is
    /// cleared.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.store = snapshot;
        if let Some(id) = self.selection {
            if self.store.get(id).is_none() {
                self.selection = None;
            }
        }
        true
    }

    /// Mark an export as in flight; a second call before
    /// [`finish_export`](Self::finish_export) fails
    pub fn try_begin_export(&mut self) -> Result<(), SessionError> {
        if self.export_in_flight {
            return Err(SessionError::ExportInFlight);
        }
        self.export_in_flight = true;
        Ok(())
    }

    pub fn finish_export(&mut self) {
        self.export_in_flight = false;
    }
}
