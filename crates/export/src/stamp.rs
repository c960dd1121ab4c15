//! Annotation rasterization into page content streams
//!
//! Each annotation becomes a short run of content-stream operators drawn
//! in the page's native coordinate frame. Runs for one page are
//! concatenated in creation order and appended to the page's existing
//! content as one extra stream, so later annotations occlude earlier ones
//! and the original page content stays untouched underneath.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use pdfmark_core::{
    center_to_top_left, to_content_space, Annotation, AnnotationShape, Color,
};

use crate::jitter::JitterSample;

/// Bezier circle approximation constant
const KAPPA: f32 = 0.552_284_8;

/// Line advance between text rows, as a multiple of the glyph size
const TEXT_LEADING: f32 = 1.2;

/// Content-stream operators for one annotation
///
/// `font_resource` names the page font resource to use for text; shapes
/// ignore it. The returned run is already wrapped in q/Q so it cannot
/// leak graphics state.
pub fn annotation_operations(
    annotation: &Annotation,
    page_height: f32,
    jitter: JitterSample,
    font_resource: Option<&str>,
) -> Vec<Operation> {
    let zoom = annotation.zoom_percent();
    // Extents are recorded in surface units at creation zoom; divide by
    // the creation scale so they land in the anchor's content frame
    let scale = zoom / 100.0;
    let color = annotation.color();

    let mut ops = vec![Operation::new("q", vec![])];
    match annotation.shape() {
        AnnotationShape::Text {
            content,
            size,
            ..
        } => {
            let size = size / scale;
            let anchor = to_content_space(annotation.anchor(), zoom, page_height);
            let x = anchor.x + jitter.dx;
            // First baseline sits one cap height below the anchor
            let y = anchor.y + jitter.dy - size * 0.8;
            let font = font_resource.unwrap_or("AF1");

            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new(
                "Tf",
                vec![Object::Name(font.as_bytes().to_vec()), size.into()],
            ));
            push_fill_color(&mut ops, color);

            let theta = jitter.rotation_deg.to_radians();
            let (sin, cos) = theta.sin_cos();
            ops.push(Operation::new(
                "Tm",
                vec![
                    cos.into(),
                    sin.into(),
                    (-sin).into(),
                    cos.into(),
                    x.into(),
                    y.into(),
                ],
            ));

            for (i, line) in content.split('\n').enumerate() {
                if i > 0 {
                    // Td moves in text space, so wrapped lines rotate with
                    // the block
                    ops.push(Operation::new(
                        "Td",
                        vec![0.into(), (-size * TEXT_LEADING).into()],
                    ));
                }
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(to_win_ansi(line), StringFormat::Literal)],
                ));
            }
            ops.push(Operation::new("ET", vec![]));
        }

        AnnotationShape::Check { size } => {
            let size = size / scale;
            let anchor = to_content_space(annotation.anchor(), zoom, page_height);
            let x = anchor.x + jitter.dx;
            let y = anchor.y + jitter.dy - size;
            push_stroke_color(&mut ops, color);
            ops.push(Operation::new("w", vec![(size * 0.12).into()]));
            ops.push(Operation::new("J", vec![1.into()]));
            ops.push(Operation::new("j", vec![1.into()]));
            ops.push(Operation::new("m", vec![x.into(), (y + size * 0.4).into()]));
            ops.push(Operation::new(
                "l",
                vec![(x + size * 0.35).into(), y.into()],
            ));
            ops.push(Operation::new(
                "l",
                vec![(x + size).into(), (y + size * 0.85).into()],
            ));
            ops.push(Operation::new("S", vec![]));
        }

        AnnotationShape::Rectangle { width, height } => {
            let (x, y, w, h) = box_frame(annotation, *width, *height, page_height, jitter);
            push_stroke_color(&mut ops, color);
            ops.push(Operation::new("w", vec![outline_width(w, h).into()]));
            ops.push(Operation::new(
                "re",
                vec![x.into(), y.into(), w.into(), h.into()],
            ));
            ops.push(Operation::new("S", vec![]));
        }

        AnnotationShape::FilledBox { width, height } => {
            // White-out: always solid white, no border, whatever the
            // annotation color says
            let (x, y, w, h) = box_frame(annotation, *width, *height, page_height, jitter);
            ops.push(Operation::new(
                "rg",
                vec![1.0f32.into(), 1.0f32.into(), 1.0f32.into()],
            ));
            ops.push(Operation::new(
                "re",
                vec![x.into(), y.into(), w.into(), h.into()],
            ));
            ops.push(Operation::new("f", vec![]));
        }

        AnnotationShape::Circle { width, height } => {
            let center = to_content_space(annotation.anchor(), zoom, page_height);
            let cx = center.x + jitter.dx;
            let cy = center.y + jitter.dy;
            let rx = width / scale / 2.0;
            let ry = height / scale / 2.0;
            let kx = rx * KAPPA;
            let ky = ry * KAPPA;

            push_stroke_color(&mut ops, color);
            ops.push(Operation::new(
                "w",
                vec![outline_width(rx * 2.0, ry * 2.0).into()],
            ));
            ops.push(Operation::new("m", vec![(cx + rx).into(), cy.into()]));
            for (c1, c2, end) in [
                ((cx + rx, cy + ky), (cx + kx, cy + ry), (cx, cy + ry)),
                ((cx - kx, cy + ry), (cx - rx, cy + ky), (cx - rx, cy)),
                ((cx - rx, cy - ky), (cx - kx, cy - ry), (cx, cy - ry)),
                ((cx + kx, cy - ry), (cx + rx, cy - ky), (cx + rx, cy)),
            ] {
                ops.push(Operation::new(
                    "c",
                    vec![
                        c1.0.into(),
                        c1.1.into(),
                        c2.0.into(),
                        c2.1.into(),
                        end.0.into(),
                        end.1.into(),
                    ],
                ));
            }
            ops.push(Operation::new("S", vec![]));
        }

        AnnotationShape::Line { dx, dy } => {
            let start = to_content_space(annotation.anchor(), zoom, page_height);
            let x = start.x + jitter.dx;
            let y = start.y + jitter.dy;
            push_stroke_color(&mut ops, color);
            ops.push(Operation::new("w", vec![1.5f32.into()]));
            ops.push(Operation::new("m", vec![x.into(), y.into()]));
            // Displacement is recorded in surface orientation; y flips
            ops.push(Operation::new(
                "l",
                vec![(x + dx / scale).into(), (y - dy / scale).into()],
            ));
            ops.push(Operation::new("S", vec![]));
        }
    }
    ops.push(Operation::new("Q", vec![]));
    ops
}

/// Lower-left corner and extents of a center-anchored box, in content
/// space
fn box_frame(
    annotation: &Annotation,
    width: f32,
    height: f32,
    page_height: f32,
    jitter: JitterSample,
) -> (f32, f32, f32, f32) {
    debug_assert!(annotation.shape().is_center_anchored());
    let zoom = annotation.zoom_percent();
    let scale = zoom / 100.0;
    let top_left = center_to_top_left(annotation.anchor(), width, height);
    let content = to_content_space(top_left, zoom, page_height);
    let (w, h) = (width / scale, height / scale);
    (content.x + jitter.dx, content.y - h + jitter.dy, w, h)
}

fn outline_width(width: f32, height: f32) -> f32 {
    (width.min(height) * 0.05).clamp(0.75, 3.0)
}

fn push_fill_color(ops: &mut Vec<Operation>, color: Color) {
    ops.push(Operation::new(
        "rg",
        vec![color.r.into(), color.g.into(), color.b.into()],
    ));
}

fn push_stroke_color(ops: &mut Vec<Operation>, color: Color) {
    ops.push(Operation::new(
        "RG",
        vec![color.r.into(), color.g.into(), color.b.into()],
    ));
}

/// Lossy WinAnsi transcoding; anything outside latin-1 becomes '?'
pub fn to_win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| if c as u32 <= 255 { c as u8 } else { b'?' })
        .collect()
}

/// Append operators to a page as one extra content stream
///
/// Wraps whatever /Contents form the page already uses (single stream or
/// array) into an array with the new stream last, so the stamp draws on
/// top.
pub fn append_content(
    document: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), lopdf::Error> {
    let encoded = Content { operations }.encode()?;
    let stream_id = document.add_object(Stream::new(dictionary! {}, encoded));

    let page = document.get_object_mut(page_id)?.as_dict_mut()?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Array(existing)) => {
            let mut array = existing.clone();
            array.push(stream_id.into());
            array
        }
        Ok(other) => vec![other.clone(), stream_id.into()],
        Err(_) => vec![stream_id.into()],
    };
    page.set("Contents", contents);
    Ok(())
}

/// Make `font_id` addressable as `name` from a page's content
///
/// Handles every /Resources layout lopdf can hand back: missing,
/// inherited from the page tree, inline, or indirect, with the /Font
/// entry itself possibly indirect.
pub fn ensure_font_resource(
    document: &mut Document,
    page_id: ObjectId,
    name: &str,
    font_id: ObjectId,
) -> Result<(), lopdf::Error> {
    let resources_ref = match document.get_dictionary(page_id)?.get(b"Resources") {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(_) => None,
        Err(_) => {
            // Materialize inherited resources on the page so the edit
            // cannot leak to sibling pages
            let inherited = inherited_resources(document, page_id).unwrap_or_default();
            let page = document.get_object_mut(page_id)?.as_dict_mut()?;
            page.set("Resources", inherited);
            None
        }
    };

    let font_ref = {
        let resources = match resources_ref {
            Some(id) => document.get_dictionary(id)?,
            None => document
                .get_dictionary(page_id)?
                .get(b"Resources")?
                .as_dict()?,
        };
        match resources.get(b"Font") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    if let Some(fid) = font_ref {
        let fonts = document.get_object_mut(fid)?.as_dict_mut()?;
        fonts.set(name, font_id);
        return Ok(());
    }

    let resources = match resources_ref {
        Some(id) => document.get_object_mut(id)?.as_dict_mut()?,
        None => document
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .get_mut(b"Resources")?
            .as_dict_mut()?,
    };
    match resources.get_mut(b"Font") {
        Ok(Object::Dictionary(fonts)) => fonts.set(name, font_id),
        _ => resources.set("Font", dictionary! { name => font_id }),
    }
    Ok(())
}

/// Nearest /Resources walking up the page tree, deep-copied
fn inherited_resources(document: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut current = page_id;
    for _ in 0..32 {
        let dict = document.get_dictionary(current).ok()?;
        if let Ok(resources) = dict.get(b"Resources") {
            let resolved = match resources {
                Object::Reference(id) => document.get_dictionary(*id).ok()?,
                Object::Dictionary(d) => d,
                _ => return None,
            };
            return Some(resolved.clone());
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}
