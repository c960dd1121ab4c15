//! Source document probing
//!
//! Opens the opaque byte blob once to learn what the editor needs up
//! front: how many pages there are and how big each one is. The bytes
//! themselves stay untouched until export.

use crate::error::ExportError;
use lopdf::{Document, Object};
use pdfmark_core::PageGeometry;

/// US Letter, used when a page carries no media box at all
const DEFAULT_PAGE: PageGeometry = PageGeometry {
    width: 612.0,
    height: 792.0,
};

/// A parsed source document plus its probed page geometry
pub struct SourceDocument {
    document: Document,
    pages: Vec<PageGeometry>,
}

impl SourceDocument {
    /// Parse the source bytes; corrupt input fails the whole operation
    pub fn open(bytes: &[u8]) -> Result<Self, ExportError> {
        let document = Document::load_mem(bytes).map_err(ExportError::CannotOpen)?;
        let page_ids: Vec<_> = document.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(ExportError::NoPages);
        }
        let pages = page_ids
            .iter()
            .map(|&id| media_box(&document, id).unwrap_or(DEFAULT_PAGE))
            .collect();
        Ok(Self { document, pages })
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

    pub fn geometries(&self) -> &[PageGeometry] {
        &self.pages
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

/// Resolve a page's media box, walking up the page tree for inherited
/// attributes
fn media_box(document: &Document, page_id: lopdf::ObjectId) -> Option<PageGeometry> {
    let mut current = page_id;
    // Page trees are shallow; the bound guards against a parent cycle in
    // a malformed file.
    for _ in 0..32 {
        let dict = document.get_dictionary(current).ok()?;
        if let Ok(raw) = dict.get(b"MediaBox") {
            let rect = resolve(document, raw)?.as_array().ok()?.clone();
            if rect.len() == 4 {
                let nums: Vec<f32> = rect.iter().filter_map(number).collect();
                if nums.len() == 4 {
                    return Some(PageGeometry {
                        width: (nums[2] - nums[0]).abs(),
                        height: (nums[3] - nums[1]).abs(),
                    });
                }
            }
            return None;
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => document.get_object(*id).ok(),
        other => Some(other),
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::build_test_pdf;

    #[test]
    fn test_open_probes_pages() {
        let bytes = build_test_pdf(&[(595.0, 842.0), (612.0, 792.0)]);
        let source = SourceDocument::open(&bytes).unwrap();
        assert_eq!(source.page_count(), 2);

        let first = source.page_geometry(1).unwrap();
        assert!((first.width - 595.0).abs() < 0.01);
        assert!((first.height - 842.0).abs() < 0.01);

        assert!(source.page_geometry(0).is_none());
        assert!(source.page_geometry(3).is_none());
    }

    #[test]
    fn test_corrupt_bytes_cannot_open() {
        let result = SourceDocument::open(b"not a pdf at all");
        assert!(matches!(result, Err(ExportError::CannotOpen(_))));
    }
}
