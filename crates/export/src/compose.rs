//! Bulk document composition
//!
//! Builds a brand-new multi-page document from long-form text and
//! illustrations, as opposed to stamping annotations onto an existing
//! one. Text is wrapped word by word against the content-area width and
//! a vertical cursor advances down the page; whenever the next line or
//! image would cross the bottom margin a fresh page is synthesized.
//! Nothing is ever clipped: lines move to the next page whole, and
//! images are never split across a page break.

use image::GenericImageView;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::error::ExportError;
use crate::fonts::builtin_measure;
use crate::stamp::to_win_ansi;

#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub font_size: f32,
    /// Line advance as a multiple of the font size
    pub leading: f32,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        // A4 with one-inch margins
        Self {
            page_width: 595.0,
            page_height: 842.0,
            margin: 72.0,
            font_size: 12.0,
            leading: 1.4,
        }
    }
}

/// One flow element of the composed document
pub enum Block {
    Paragraph(String),
    /// PNG bytes drawn at `display_width` content units, aspect preserved
    Illustration { png: Vec<u8>, display_width: f32 },
}

/// Greedy word wrap against a fixed width, measured in the built-in font
///
/// Explicit newlines always break; a single word wider than the limit
/// gets a line of its own rather than being split.
pub fn wrap_lines(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if builtin_measure(&candidate, size) <= max_width || current.is_empty() {
                current = candidate;
            } else {
                lines.push(current);
                current = word.to_string();
            }
        }
        lines.push(current);
    }
    lines
}

/// Compose `blocks` into finished document bytes
pub fn compose(blocks: &[Block], options: &ComposeOptions) -> Result<Vec<u8>, ExportError> {
    let mut composer = Composer::new(options.clone());
    for block in blocks {
        match block {
            Block::Paragraph(text) => composer.paragraph(text),
            Block::Illustration { png, display_width } => {
                composer.illustration(png, *display_width)?
            }
        }
    }
    composer.finish()
}

struct Composer {
    options: ComposeOptions,
    document: Document,
    font_id: ObjectId,
    page_ids: Vec<ObjectId>,
    pages_id: ObjectId,
    ops: Vec<Operation>,
    xobjects: Vec<(String, ObjectId)>,
    /// Distance consumed below the top margin on the current page
    cursor: f32,
    image_counter: usize,
}

impl Composer {
    fn new(options: ComposeOptions) -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        Self {
            options,
            document,
            font_id,
            page_ids: Vec::new(),
            pages_id,
            ops: Vec::new(),
            xobjects: Vec::new(),
            cursor: 0.0,
            image_counter: 0,
        }
    }

    fn usable_height(&self) -> f32 {
        self.options.page_height - 2.0 * self.options.margin
    }

    fn content_width(&self) -> f32 {
        self.options.page_width - 2.0 * self.options.margin
    }

    fn line_height(&self) -> f32 {
        self.options.font_size * self.options.leading
    }

    /// Close the current page; the cursor restarts at the top
    fn break_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        let xobjects = std::mem::take(&mut self.xobjects);
        self.cursor = 0.0;

        let content_id = self.document.add_object(Stream::new(
            dictionary! {},
            // Operator encoding cannot fail for the operators we emit
            Content { operations: ops }.encode().unwrap_or_default(),
        ));

        let mut resources = dictionary! {
            "Font" => dictionary! { "F1" => self.font_id },
        };
        if !xobjects.is_empty() {
            let mut xobject_dict = Dictionary::new();
            for (name, id) in xobjects {
                xobject_dict.set(name, id);
            }
            resources.set("XObject", xobject_dict);
        }

        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                0.into(),
                0.into(),
                self.options.page_width.into(),
                self.options.page_height.into(),
            ],
            "Resources" => resources,
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);
    }

    fn paragraph(&mut self, text: &str) {
        let size = self.options.font_size;
        let lines = wrap_lines(text, self.content_width(), size);
        for line in lines {
            if self.cursor + self.line_height() > self.usable_height() {
                self.break_page();
            }
            let baseline =
                self.options.page_height - self.options.margin - self.cursor - size * 0.8;
            self.ops.push(Operation::new("BT", vec![]));
            self.ops.push(Operation::new(
                "Tf",
                vec![Object::Name(b"F1".to_vec()), size.into()],
            ));
            self.ops.push(Operation::new(
                "Td",
                vec![self.options.margin.into(), baseline.into()],
            ));
            self.ops.push(Operation::new(
                "Tj",
                vec![Object::String(to_win_ansi(&line), StringFormat::Literal)],
            ));
            self.ops.push(Operation::new("ET", vec![]));
            self.cursor += self.line_height();
        }
        // Paragraph gap
        self.cursor += self.line_height() * 0.5;
    }

    fn illustration(&mut self, png: &[u8], display_width: f32) -> Result<(), ExportError> {
        let decoded = image::load_from_memory(png)?;
        let (px_w, px_h) = decoded.dimensions();
        let rgb = decoded.to_rgb8();

        let mut width = display_width.min(self.content_width());
        let mut height = width * px_h as f32 / px_w as f32;
        // Taller than a whole page: scale to fit rather than clip
        if height > self.usable_height() {
            let factor = self.usable_height() / height;
            height *= factor;
            width *= factor;
        }
        if self.cursor + height > self.usable_height() {
            self.break_page();
        }

        let xobject_id = self.document.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => px_w as i64,
                "Height" => px_h as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        ));
        self.image_counter += 1;
        let name = format!("Im{}", self.image_counter);
        self.xobjects.push((name.clone(), xobject_id));

        let x = self.options.margin;
        let y = self.options.page_height - self.options.margin - self.cursor - height;
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![
                width.into(),
                0.into(),
                0.into(),
                height.into(),
                x.into(),
                y.into(),
            ],
        ));
        self.ops
            .push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        self.ops.push(Operation::new("Q", vec![]));
        self.cursor += height + self.line_height() * 0.5;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, ExportError> {
        if !self.ops.is_empty() || self.page_ids.is_empty() {
            self.break_page();
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| id.into()).collect();
        let count = kids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }
            .into(),
        );
        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);
        self.document.compress();

        let mut bytes = Vec::new();
        self.document
            .save_to(&mut bytes)
            .map_err(ExportError::Write)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog again and again and again";
        let lines = wrap_lines(text, 120.0, 12.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(builtin_measure(line, 12.0) <= 120.0, "line too wide: {line}");
        }
        // No words lost
        let rejoined = lines.join(" ");
        assert_eq!(rejoined.split_whitespace().count(), text.split_whitespace().count());
    }

    #[test]
    fn test_wrap_keeps_explicit_newlines() {
        let lines = wrap_lines("one\ntwo", 500.0, 12.0);
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_oversized_word_gets_own_line() {
        let lines = wrap_lines("a Pneumonoultramicroscopicsilicovolcanoconiosis b", 60.0, 12.0);
        assert!(lines.iter().any(|l| l.starts_with("Pneumono")));
    }

    #[test]
    fn test_long_text_paginates() {
        let paragraph = "lorem ipsum dolor sit amet ".repeat(400);
        let bytes = compose(&[Block::Paragraph(paragraph)], &ComposeOptions::default()).unwrap();

        let document = Document::load_mem(&bytes).unwrap();
        assert!(document.get_pages().len() > 1);
    }

    #[test]
    fn test_empty_input_still_yields_one_page() {
        let bytes = compose(&[], &ComposeOptions::default()).unwrap();
        let document = Document::load_mem(&bytes).unwrap();
        assert_eq!(document.get_pages().len(), 1);
    }
}
