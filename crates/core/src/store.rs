//! Ordered annotation collection for the whole document
//!
//! The store is a flat vector in creation order. Order is the render
//! order: a later annotation occludes an earlier one on the same page, so
//! the store never reorders entries and page listing preserves insertion
//! order. Snapshots for undo are plain deep clones of this struct.

use crate::annotation::{Annotation, AnnotationId, Color, FontFamily};
use crate::coords::ScreenPoint;

/// Partial property update applied to an existing annotation
///
/// Fields left as `None` are untouched. Content and font edits silently
/// skip shapes that do not carry them.
#[derive(Debug, Clone, Default)]
pub struct AnnotationEdit {
    pub color: Option<Color>,
    /// New size; for text/check shapes only the first component is used
    pub size: Option<(f32, f32)>,
    pub content: Option<String>,
    pub font: Option<FontFamily>,
}

/// Flat, creation-ordered collection of all annotations in a session
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation; it becomes the topmost on its page
    pub fn insert(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id();
        self.annotations.push(annotation);
        id
    }

    /// Remove an annotation permanently
    ///
    /// Returns the removed annotation, or `None` when the id is unknown.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id() == id)?;
        Some(self.annotations.remove(index))
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    /// Apply a partial property edit in place
    ///
    /// Returns false (and changes nothing) when the id is unknown.
    pub fn update_properties(&mut self, id: AnnotationId, edit: &AnnotationEdit) -> bool {
        let Some(annotation) = self.annotations.iter_mut().find(|a| a.id() == id) else {
            return false;
        };
        if let Some(color) = edit.color {
            annotation.set_color(color);
        }
        if let Some((w, h)) = edit.size {
            annotation.set_size(w, h);
        }
        if let Some(content) = &edit.content {
            annotation.set_content(content.clone());
        }
        if let Some(font) = edit.font {
            annotation.set_font(font);
        }
        true
    }

    /// All annotations on a page, in creation order (bottom to top)
    pub fn list_for_page(&self, page: u32) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.page() == page)
    }

    /// All annotations in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    /// Topmost annotation on `page` hit by `point`, if any
    ///
    /// `point` arrives at the view's current `zoom_percent`; every
    /// annotation compares in base-scale coordinates regardless of the
    /// zoom it was placed at. Later-created annotations win, matching
    /// their render order.
    pub fn hit_test(
        &self,
        page: u32,
        point: ScreenPoint,
        zoom_percent: f32,
        tolerance: f32,
    ) -> Option<AnnotationId> {
        self.annotations
            .iter()
            .rev()
            .find(|a| a.page() == page && a.hit_test(point, zoom_percent, tolerance))
            .map(|a| a.id())
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationShape;

    fn check_at(page: u32, x: f32, y: f32) -> Annotation {
        Annotation::new(
            page,
            ScreenPoint::new(x, y),
            100.0,
            Color::BLACK,
            AnnotationShape::Check { size: 12.0 },
        )
        .unwrap()
    }

    #[test]
    fn test_page_listing_preserves_creation_order() {
        let mut store = AnnotationStore::new();
        let first = store.insert(check_at(2, 0.0, 0.0));
        store.insert(check_at(1, 5.0, 5.0));
        let third = store.insert(check_at(2, 10.0, 10.0));

        let page2: Vec<_> = store.list_for_page(2).map(|a| a.id()).collect();
        assert_eq!(page2, vec![first, third]);
    }

    #[test]
    fn test_remove_is_permanent() {
        let mut store = AnnotationStore::new();
        let id = store.insert(check_at(1, 0.0, 0.0));
        assert!(store.remove(id).is_some());
        assert!(store.remove(id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut store = AnnotationStore::new();
        store.insert(check_at(1, 0.0, 0.0));
        let before = store.clone();

        let edit = AnnotationEdit {
            color: Some(Color::RED),
            ..Default::default()
        };
        assert!(!store.update_properties(AnnotationId::new_v4(), &edit));
        assert_eq!(store, before);
    }

    #[test]
    fn test_update_applies_partial_edit() {
        let mut store = AnnotationStore::new();
        let id = store.insert(
            Annotation::new(
                1,
                ScreenPoint::new(0.0, 0.0),
                100.0,
                Color::BLACK,
                AnnotationShape::Text {
                    content: "draft".to_string(),
                    font: FontFamily::Default,
                    size: 14.0,
                },
            )
            .unwrap(),
        );

        let edit = AnnotationEdit {
            content: Some("final".to_string()),
            font: Some(FontFamily::Mincho),
            ..Default::default()
        };
        assert!(store.update_properties(id, &edit));

        match store.get(id).unwrap().shape() {
            AnnotationShape::Text { content, font, size } => {
                assert_eq!(content, "final");
                assert_eq!(*font, FontFamily::Mincho);
                assert_eq!(*size, 14.0);
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let mut store = AnnotationStore::new();
        store.insert(check_at(1, 50.0, 50.0));
        let top = store.insert(check_at(1, 50.0, 50.0));

        assert_eq!(
            store.hit_test(1, ScreenPoint::new(51.0, 51.0), 100.0, 4.0),
            Some(top)
        );
        assert_eq!(store.hit_test(1, ScreenPoint::new(500.0, 500.0), 100.0, 4.0), None);
        assert_eq!(store.hit_test(2, ScreenPoint::new(51.0, 51.0), 100.0, 4.0), None);
    }

    #[test]
    fn test_hit_test_normalizes_click_zoom() {
        let mut store = AnnotationStore::new();
        // Placed at 100% zoom; its base-scale box is (50,50)..(62,62)
        let id = store.insert(check_at(1, 50.0, 50.0));

        // The same spot clicked at 200% zoom arrives doubled
        assert_eq!(
            store.hit_test(1, ScreenPoint::new(104.0, 104.0), 200.0, 4.0),
            Some(id)
        );
        // Raw placement coordinates at 200% zoom normalize to a miss
        assert_eq!(store.hit_test(1, ScreenPoint::new(51.0, 51.0), 200.0, 4.0), None);
    }
}
