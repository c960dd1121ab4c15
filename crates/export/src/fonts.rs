//! Font resolution for export
//!
//! Logical font families are resolved against a [`FontSource`] that hands
//! back raw font programs by asset name. Loads are memoized for the life
//! of the catalog; a failed load is remembered too, logged once, and the
//! family silently degrades to the built-in Helvetica. Font trouble is
//! never fatal to an export.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use pdfmark_core::FontFamily;
use ttf_parser::Face;

/// Supplies embeddable font programs by logical asset name
pub trait FontSource {
    fn load(&self, asset_name: &str) -> io::Result<Vec<u8>>;
}

/// A source with no assets: every family degrades to the built-in font
pub struct NoEmbeddedFonts;

impl FontSource for NoEmbeddedFonts {
    fn load(&self, asset_name: &str) -> io::Result<Vec<u8>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no font asset {asset_name:?}"),
        ))
    }
}

/// Loads `<root>/<asset_name>.ttf`
pub struct DirectoryFontSource {
    root: PathBuf,
}

impl DirectoryFontSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FontSource for DirectoryFontSource {
    fn load(&self, asset_name: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(format!("{asset_name}.ttf")))
    }
}

/// Memoizing resolver from [`FontFamily`] to font program bytes
///
/// Successful loads are assumed immutable; there is no invalidation.
pub struct FontCatalog {
    source: Box<dyn FontSource>,
    cache: HashMap<&'static str, Option<Arc<Vec<u8>>>>,
}

impl FontCatalog {
    pub fn new(source: Box<dyn FontSource>) -> Self {
        Self {
            source,
            cache: HashMap::new(),
        }
    }

    /// A catalog that always resolves to the built-in font
    pub fn builtin_only() -> Self {
        Self::new(Box::new(NoEmbeddedFonts))
    }

    /// Fetch every known family once, ahead of any drawing
    ///
    /// Failures are memoized like any other lookup, so drawing later
    /// never blocks on a fetch.
    pub fn preload(&mut self) {
        for family in [FontFamily::Gothic, FontFamily::Mincho, FontFamily::Brush] {
            let _ = self.font_data(family);
        }
    }

    /// Font program for a family, or `None` when it degrades to built-in
    ///
    /// The default family never loads an asset. Bytes that fail to parse
    /// as a font are treated the same as a failed fetch.
    pub fn font_data(&mut self, family: FontFamily) -> Option<Arc<Vec<u8>>> {
        if family == FontFamily::Default {
            return None;
        }
        let name = family.asset_name();
        if let Some(cached) = self.cache.get(name) {
            return cached.clone();
        }
        let loaded = match self.source.load(name) {
            Ok(bytes) => {
                if Face::parse(&bytes, 0).is_ok() {
                    Some(Arc::new(bytes))
                } else {
                    log::warn!("font asset {name:?} is not a parsable font; using built-in");
                    None
                }
            }
            Err(err) => {
                log::warn!("font asset {name:?} unavailable ({err}); using built-in");
                None
            }
        };
        self.cache.insert(name, loaded.clone());
        loaded
    }

    /// Advance width of `text` at `size`, in content units
    pub fn measure(&mut self, family: FontFamily, text: &str, size: f32) -> f32 {
        match self.font_data(family) {
            Some(data) => match Face::parse(&data, 0) {
                Ok(face) => {
                    let upem = face.units_per_em() as f32;
                    let total: f32 = text
                        .chars()
                        .map(|c| {
                            face.glyph_index(c)
                                .and_then(|gid| face.glyph_hor_advance(gid))
                                .unwrap_or(0) as f32
                        })
                        .sum();
                    total * size / upem
                }
                Err(_) => builtin_measure(text, size),
            },
            None => builtin_measure(text, size),
        }
    }
}

/// Width of `text` in the built-in Helvetica, in content units
pub fn builtin_measure(text: &str, size: f32) -> f32 {
    let total: f32 = text.chars().map(|c| helvetica_advance(c) as f32).sum();
    total * size / 1000.0
}

/// Standard Helvetica advance widths in 1/1000 em
fn helvetica_advance(c: char) -> u16 {
    match c {
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | '[' | '\\' | ']' => 278,
        '"' => 355,
        '\'' => 191,
        '(' | ')' | '-' | '`' | 'r' => 333,
        '*' => 389,
        '+' | '<' | '=' | '>' | '~' | '^' => 584,
        '%' => 889,
        '&' | 'A' | 'B' | 'E' | 'V' | 'X' | 'Y' => 667,
        '@' => 1015,
        'C' | 'D' | 'H' | 'K' | 'N' | 'R' | 'U' => 722,
        'F' | 'T' | 'Z' => 611,
        'G' | 'O' | 'Q' => 778,
        'I' => 278,
        'J' | 'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' => 500,
        'L' | '_' => 556,
        'M' | 'm' => 833,
        'W' => 944,
        'f' | 't' => 278,
        'i' | 'j' | 'l' => 222,
        'w' => 722,
        '{' | '}' => 334,
        '|' => 260,
        _ => 556,
    }
}

/// A font registered into the output document, addressable from page
/// content by resource name
pub struct RegisteredFont {
    pub object_id: ObjectId,
    pub resource_name: String,
    pub family: FontFamily,
}

/// Register the font object for a family into `document`
///
/// Embeds the family's TrueType program when the catalog can supply one;
/// otherwise emits a built-in Helvetica reference. `index` only feeds the
/// per-document resource name.
pub fn register_font(
    document: &mut Document,
    catalog: &mut FontCatalog,
    family: FontFamily,
    index: usize,
) -> RegisteredFont {
    let resource_name = format!("AF{}", index + 1);
    let object_id = match catalog.font_data(family) {
        Some(data) => embed_truetype(document, family, &data)
            .unwrap_or_else(|| builtin_font_object(document)),
        None => builtin_font_object(document),
    };
    RegisteredFont {
        object_id,
        resource_name,
        family,
    }
}

fn builtin_font_object(document: &mut Document) -> ObjectId {
    document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Build a simple /TrueType font with descriptor and embedded program
fn embed_truetype(document: &mut Document, family: FontFamily, data: &[u8]) -> Option<ObjectId> {
    let face = Face::parse(data, 0).ok()?;
    let upem = face.units_per_em() as f32;
    let scale = 1000.0 / upem;
    let bbox = face.global_bounding_box();
    let ascent = face.ascender() as f32 * scale;
    let descent = face.descender() as f32 * scale;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 * scale)
        .unwrap_or(ascent);

    // WinAnsi is close enough to latin-1 for width purposes
    let widths: Vec<Object> = (32u8..=255)
        .map(|byte| {
            let advance = face
                .glyph_index(byte as char)
                .and_then(|gid| face.glyph_hor_advance(gid))
                .unwrap_or(0) as f32;
            Object::Integer((advance * scale).round() as i64)
        })
        .collect();

    let font_file_id = document.add_object(Stream::new(
        dictionary! { "Length1" => data.len() as i64 },
        data.to_vec(),
    ));

    let base_name = format!("Mark-{}", family.asset_name());
    let descriptor_id = document.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => base_name.as_str(),
        "Flags" => 32,
        "FontBBox" => vec![
            Object::Integer((bbox.x_min as f32 * scale) as i64),
            Object::Integer((bbox.y_min as f32 * scale) as i64),
            Object::Integer((bbox.x_max as f32 * scale) as i64),
            Object::Integer((bbox.y_max as f32 * scale) as i64),
        ],
        "ItalicAngle" => 0,
        "Ascent" => Object::Integer(ascent as i64),
        "Descent" => Object::Integer(descent as i64),
        "CapHeight" => Object::Integer(cap_height as i64),
        "StemV" => 80,
        "FontFile2" => font_file_id,
    });

    Some(document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "TrueType",
        "BaseFont" => base_name.as_str(),
        "FirstChar" => 32,
        "LastChar" => 255,
        "Widths" => widths,
        "FontDescriptor" => descriptor_id,
        "Encoding" => "WinAnsiEncoding",
    }))
}
