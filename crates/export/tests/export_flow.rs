//! End-to-end flow: edit in a session, flatten through the exporter,
//! inspect the produced document.

use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, Stream};
use pdfmark_core::{
    EditorSession, OpenDocument, PageGeometry, PointerOutcome, ScreenPoint, Tool,
};
use pdfmark_export::encrypt::{
    compute_encryption_key, compute_user_value, encrypt_document, PERMISSIONS,
};
use pdfmark_export::{DocumentExporter, ExportOptions, FontCatalog};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn build_pdf(sizes: &[(f32, f32)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for &(width, height) in sizes {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => count }.into(),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn session_for(bytes: &[u8], sizes: &[(f32, f32)]) -> EditorSession {
    let pages = sizes
        .iter()
        .map(|&(width, height)| PageGeometry { width, height })
        .collect();
    EditorSession::new(OpenDocument::new("flow.pdf", bytes.to_vec(), pages))
}

fn page_content_bytes(bytes: &[u8], page: u32) -> Vec<u8> {
    let document = Document::load_mem(bytes).unwrap();
    let page_id = document.get_pages()[&page];
    document.get_page_content(page_id).unwrap()
}

fn page_operations(bytes: &[u8], page: u32) -> Vec<lopdf::content::Operation> {
    Content::decode(&page_content_bytes(bytes, page))
        .unwrap()
        .operations
}

fn operand_f32(op: &lopdf::content::Operation, index: usize) -> f32 {
    match &op.operands[index] {
        Object::Real(r) => *r,
        Object::Integer(i) => *i as f32,
        other => panic!("unexpected operand {other:?}"),
    }
}

#[test]
fn placed_text_lands_at_flipped_content_point() {
    init_logging();
    // Three pages of 595x800; click page 2 at (100, 200) at 100% zoom
    let sizes = [(595.0, 800.0); 3];
    let bytes = build_pdf(&sizes);
    let mut session = session_for(&bytes, &sizes);

    session.go_to_page(2).unwrap();
    session.arm_tool(Tool::Text);
    let outcome =
        session.handle_pointer_with_text(ScreenPoint::new(100.0, 200.0), Some("approved".into()));
    assert!(matches!(outcome, PointerOutcome::Placed(_)));

    let mut exporter = DocumentExporter::new(FontCatalog::builtin_only());
    let exported = exporter
        .export_with_rng(
            &bytes,
            session.store(),
            &ExportOptions::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();

    let ops = page_operations(&exported, 2);
    let tm = ops.iter().find(|op| op.operator == "Tm").unwrap();
    // Identity rotation, anchored at x=100, baseline one cap height
    // below content y=600
    assert_eq!(operand_f32(tm, 0), 1.0);
    assert_eq!(operand_f32(tm, 1), 0.0);
    assert!((operand_f32(tm, 4) - 100.0).abs() < 1e-2);
    assert!((operand_f32(tm, 5) - (600.0 - 14.0 * 0.8)).abs() < 1e-2);

    let tj = ops.iter().find(|op| op.operator == "Tj").unwrap();
    assert_eq!(
        tj.operands[0],
        Object::String(b"approved".to_vec(), lopdf::StringFormat::Literal)
    );

    // Pages 1 and 3 keep their original (empty) content
    assert!(page_content_bytes(&exported, 1).is_empty());
    assert!(page_content_bytes(&exported, 3).is_empty());
}

#[test]
fn creation_order_survives_into_content_order() {
    init_logging();
    let sizes = [(595.0, 800.0)];
    let bytes = build_pdf(&sizes);
    let mut session = session_for(&bytes, &sizes);

    session.arm_tool(Tool::FilledBox);
    session.handle_pointer(ScreenPoint::new(100.0, 100.0));
    session.arm_tool(Tool::Rectangle);
    session.handle_pointer(ScreenPoint::new(100.0, 100.0));

    let mut exporter = DocumentExporter::new(FontCatalog::builtin_only());
    let exported = exporter
        .export_with_rng(
            &bytes,
            session.store(),
            &ExportOptions::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();

    // The white-out fill comes first, the later outline strokes on top
    let ops = page_operations(&exported, 1);
    let fill = ops.iter().position(|op| op.operator == "f").unwrap();
    let stroke = ops.iter().position(|op| op.operator == "S").unwrap();
    assert!(fill < stroke);
}

#[test]
fn jittered_positions_stay_within_bounds() {
    init_logging();
    let sizes = [(595.0, 800.0)];
    let bytes = build_pdf(&sizes);
    let mut session = session_for(&bytes, &sizes);

    session.arm_tool(Tool::Line);
    session.handle_pointer(ScreenPoint::new(200.0, 300.0));

    let mut exporter = DocumentExporter::new(FontCatalog::builtin_only());
    let plain = exporter
        .export_with_rng(
            &bytes,
            session.store(),
            &ExportOptions::default(),
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();
    let jittered = exporter
        .export_with_rng(
            &bytes,
            session.store(),
            &ExportOptions {
                handwriting: true,
                ..Default::default()
            },
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();

    let m_plain = page_operations(&plain, 1)
        .into_iter()
        .find(|op| op.operator == "m")
        .unwrap();
    let m_jittered = page_operations(&jittered, 1)
        .into_iter()
        .find(|op| op.operator == "m")
        .unwrap();

    for i in 0..2 {
        let delta = (operand_f32(&m_plain, i) - operand_f32(&m_jittered, i)).abs();
        assert!(delta <= 2.0, "offset {delta} exceeds the jitter bound");
    }
}

#[test]
fn password_export_validates_only_the_right_password() {
    init_logging();
    let sizes = [(595.0, 800.0)];
    let bytes = build_pdf(&sizes);
    let mut session = session_for(&bytes, &sizes);
    session.arm_tool(Tool::Check);
    session.handle_pointer(ScreenPoint::new(50.0, 50.0));

    let mut exporter = DocumentExporter::new(FontCatalog::builtin_only());
    let plain = exporter
        .export_with_rng(
            &bytes,
            session.store(),
            &ExportOptions::default(),
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();
    let protected = exporter
        .export_with_rng(
            &bytes,
            session.store(),
            &ExportOptions {
                password: Some("secret".to_string()),
                ..Default::default()
            },
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap();

    // The protected output carries the standard handler dictionary
    let raw = String::from_utf8_lossy(&protected);
    assert!(raw.contains("/Encrypt"));
    assert!(raw.contains("/Standard"));

    // Install the same protection on the in-memory document and check the
    // stored /U against the documented key-derivation for both passwords
    let mut document = Document::load_mem(&plain).unwrap();
    encrypt_document(&mut document, "secret").unwrap();

    let encrypt_id = document
        .trailer
        .get(b"Encrypt")
        .unwrap()
        .as_reference()
        .unwrap();
    let encrypt = document.get_dictionary(encrypt_id).unwrap();
    assert_eq!(encrypt.get(b"P").unwrap().as_i64().unwrap(), PERMISSIONS as i64);

    let owner = encrypt.get(b"O").unwrap().as_str().unwrap().to_vec();
    let stored_user = encrypt.get(b"U").unwrap().as_str().unwrap().to_vec();
    let file_id = document.trailer.get(b"ID").unwrap().as_array().unwrap()[0]
        .as_str()
        .unwrap()
        .to_vec();

    let good_key = compute_encryption_key(b"secret", &owner, PERMISSIONS, &file_id);
    assert_eq!(compute_user_value(&good_key, &file_id)[..16], stored_user[..16]);

    let bad_key = compute_encryption_key(b"wrong", &owner, PERMISSIONS, &file_id);
    assert_ne!(compute_user_value(&bad_key, &file_id)[..16], stored_user[..16]);
}
