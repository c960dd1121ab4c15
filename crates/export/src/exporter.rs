//! Export pipeline
//!
//! Takes the source bytes and the full annotation store and produces the
//! flattened output document: open, stamp every annotation onto its page
//! in creation order, optionally encrypt, serialize. The whole run either
//! yields complete bytes or fails; no partial output ever escapes.

use lopdf::Document;
use pdfmark_core::{AnnotationShape, AnnotationStore, FontFamily};
use rand::Rng;
use std::collections::HashMap;

use crate::encrypt;
use crate::error::ExportError;
use crate::fonts::{register_font, FontCatalog, RegisteredFont};
use crate::jitter::JitterConfig;
use crate::source::SourceDocument;
use crate::stamp::{annotation_operations, append_content, ensure_font_resource};

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Apply natural-handwriting perturbation to every stamped annotation
    pub handwriting: bool,
    /// Password-protect the output; owner and user secrets are identical
    pub password: Option<String>,
    /// Treat an encryption failure as fatal instead of falling back to
    /// unencrypted output
    pub require_encryption: bool,
}

pub struct DocumentExporter {
    catalog: FontCatalog,
}

impl DocumentExporter {
    pub fn new(catalog: FontCatalog) -> Self {
        Self { catalog }
    }

    /// Export with an OS-seeded random source
    pub fn export(
        &mut self,
        source_bytes: &[u8],
        store: &AnnotationStore,
        options: &ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        self.export_with_rng(source_bytes, store, options, &mut rand::thread_rng())
    }

    /// Export with an injected random source
    ///
    /// With `handwriting` off the source is never consumed, so repeated
    /// exports of the same store are byte-identical.
    pub fn export_with_rng(
        &mut self,
        source_bytes: &[u8],
        store: &AnnotationStore,
        options: &ExportOptions,
        rng: &mut impl Rng,
    ) -> Result<Vec<u8>, ExportError> {
        let source = SourceDocument::open(source_bytes)?;
        let page_count = source.page_count();
        let geometries = source.geometries().to_vec();
        let mut document = source.into_document();

        let fonts = self.register_fonts(&mut document, store);
        let jitter = if options.handwriting {
            JitterConfig::handwriting()
        } else {
            JitterConfig::disabled()
        };

        let pages = document.get_pages();
        for (&page_number, &page_id) in &pages {
            let Some(geometry) = geometries.get(page_number as usize - 1) else {
                continue;
            };
            let mut ops = Vec::new();
            let mut used_fonts: Vec<&RegisteredFont> = Vec::new();

            for annotation in store.list_for_page(page_number) {
                let font = match annotation.shape() {
                    AnnotationShape::Text { font, .. } => fonts.get(font),
                    _ => None,
                };
                let rotates = matches!(annotation.shape(), AnnotationShape::Text { .. });
                let sample = jitter.sample(rng, rotates);
                ops.extend(annotation_operations(
                    annotation,
                    geometry.height,
                    sample,
                    font.map(|f| f.resource_name.as_str()),
                ));
                if let Some(font) = font {
                    if !used_fonts.iter().any(|f| f.resource_name == font.resource_name) {
                        used_fonts.push(font);
                    }
                }
            }
            if ops.is_empty() {
                continue;
            }
            for font in used_fonts {
                ensure_font_resource(&mut document, page_id, &font.resource_name, font.object_id)
                    .map_err(ExportError::Serialize)?;
            }
            append_content(&mut document, page_id, ops).map_err(ExportError::Serialize)?;
        }

        for annotation in store.iter() {
            if annotation.page() > page_count {
                log::debug!(
                    "annotation {} targets page {} beyond the {}-page document; skipped",
                    annotation.id(),
                    annotation.page(),
                    page_count
                );
            }
        }

        if let Some(password) = &options.password {
            let mut encrypted = document.clone();
            match encrypt::encrypt_document(&mut encrypted, password) {
                Ok(()) => return serialize(encrypted),
                Err(err) if options.require_encryption => {
                    return Err(ExportError::Encryption(err.to_string()));
                }
                Err(err) => {
                    log::warn!("encryption failed ({err}); producing unencrypted output");
                }
            }
        }
        serialize(document)
    }

    /// Register one font object per family the store's text annotations
    /// use, in first-appearance order
    fn register_fonts(
        &mut self,
        document: &mut Document,
        store: &AnnotationStore,
    ) -> HashMap<FontFamily, RegisteredFont> {
        let mut families: Vec<FontFamily> = Vec::new();
        for annotation in store.iter() {
            if let AnnotationShape::Text { font, .. } = annotation.shape() {
                if !families.contains(font) {
                    families.push(*font);
                }
            }
        }
        families
            .into_iter()
            .enumerate()
            .map(|(index, family)| {
                (
                    family,
                    register_font(document, &mut self.catalog, family, index),
                )
            })
            .collect()
    }
}

fn serialize(mut document: Document) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    document.save_to(&mut bytes).map_err(ExportError::Write)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::build_test_pdf;
    use pdfmark_core::{Annotation, Color, ScreenPoint};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn store_with_marks() -> AnnotationStore {
        let mut store = AnnotationStore::new();
        store.insert(
            Annotation::new(
                1,
                ScreenPoint::new(100.0, 200.0),
                100.0,
                Color::BLACK,
                AnnotationShape::Text {
                    content: "approved".to_string(),
                    font: FontFamily::Default,
                    size: 14.0,
                },
            )
            .unwrap(),
        );
        store.insert(
            Annotation::new(
                2,
                ScreenPoint::new(50.0, 50.0),
                100.0,
                Color::RED,
                AnnotationShape::Rectangle {
                    width: 40.0,
                    height: 20.0,
                },
            )
            .unwrap(),
        );
        store
    }

    #[test]
    fn test_export_without_jitter_is_deterministic() {
        let source = build_test_pdf(&[(595.0, 842.0), (595.0, 842.0)]);
        let store = store_with_marks();
        let options = ExportOptions::default();

        let mut exporter = DocumentExporter::new(FontCatalog::builtin_only());
        let first = exporter
            .export_with_rng(&source, &store, &options, &mut StdRng::seed_from_u64(1))
            .unwrap();
        let second = exporter
            .export_with_rng(&source, &store, &options, &mut StdRng::seed_from_u64(99))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_jitter_changes_output_but_parses() {
        let source = build_test_pdf(&[(595.0, 842.0), (595.0, 842.0)]);
        let store = store_with_marks();

        let mut exporter = DocumentExporter::new(FontCatalog::builtin_only());
        let plain = exporter
            .export_with_rng(
                &source,
                &store,
                &ExportOptions::default(),
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();
        let jittered = exporter
            .export_with_rng(
                &source,
                &store,
                &ExportOptions {
                    handwriting: true,
                    ..Default::default()
                },
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();
        assert_ne!(plain, jittered);
        assert!(Document::load_mem(&jittered).is_ok());
    }

    #[test]
    fn test_corrupt_source_fails_whole_export() {
        let mut exporter = DocumentExporter::new(FontCatalog::builtin_only());
        let result = exporter.export(b"garbage", &store_with_marks(), &ExportOptions::default());
        assert!(matches!(result, Err(ExportError::CannotOpen(_))));
    }

    #[test]
    fn test_password_produces_encrypted_document() {
        let source = build_test_pdf(&[(595.0, 842.0)]);
        let mut exporter = DocumentExporter::new(FontCatalog::builtin_only());
        let bytes = exporter
            .export_with_rng(
                &source,
                &store_with_marks(),
                &ExportOptions {
                    password: Some("secret".to_string()),
                    ..Default::default()
                },
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();
        // The encrypt dictionary is present in the raw output
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Encrypt"));
        assert!(text.contains("/Standard"));
    }

    #[test]
    fn test_empty_password_falls_back_unencrypted() {
        let source = build_test_pdf(&[(595.0, 842.0)]);
        let mut exporter = DocumentExporter::new(FontCatalog::builtin_only());
        let options = ExportOptions {
            password: Some(String::new()),
            ..Default::default()
        };
        let bytes = exporter
            .export_with_rng(&source, &store_with_marks(), &options, &mut StdRng::seed_from_u64(1))
            .unwrap();
        assert!(!String::from_utf8_lossy(&bytes).contains("/Encrypt"));

        // Strict mode surfaces the failure instead
        let strict = ExportOptions {
            require_encryption: true,
            ..options
        };
        let result = exporter.export_with_rng(
            &source,
            &store_with_marks(),
            &strict,
            &mut StdRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(ExportError::Encryption(_))));
    }
}
