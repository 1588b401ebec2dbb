//! Integration tests for signing with an embedded TrueType script font.
//!
//! The fixture is DejaVu Serif Italic (see `fixtures/DejaVu-LICENSE.txt`).

mod common;

use common::*;
use flate2::read::ZlibDecoder;
use lopdf::{Dictionary, Document, Object};
use pdf_countersign::signatures::Pkcs7Binder;
use pdf_countersign::writer::{EmbeddedFont, StampFont};
use pdf_countersign::{
    AppearanceRenderer, EngineConfig, PlacementRequest, SignatureEngine, SignatureVerifier,
    SigningOptions,
};
use std::io::Read;

const FONT_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/DejaVuSerif-Italic.ttf");

fn font_bytes() -> Vec<u8> {
    std::fs::read(FONT_PATH).unwrap()
}

fn script_config() -> EngineConfig {
    EngineConfig::default().with_script_font(FONT_PATH)
}

fn sign_with_script_font(pdf: &[u8]) -> Vec<u8> {
    let session = open_session(&rsa_p12());
    let binder = Pkcs7Binder::new(session.certificate());
    SignatureEngine::new(script_config())
        .sign_with_binder(
            pdf,
            &session,
            &[PlacementRequest::signature(0, 0.5, 0.1)],
            &SigningOptions::new(),
            &binder,
            signing_time(),
        )
        .unwrap()
        .bytes
}

/// Resolve `key` in `dict`, following a reference if there is one.
fn resolve<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> &'a Object {
    match dict.get(key).unwrap() {
        Object::Reference(id) => doc.get_object(*id).unwrap(),
        other => other,
    }
}

/// Font dictionary behind `/F1` of the first widget appearance.
fn name_font_dict(doc: &Document) -> &Dictionary {
    let form_id = doc
        .objects
        .values()
        .filter_map(|obj| obj.as_dict().ok())
        .find_map(|dict| dict.get(b"AP").ok()?.as_dict().ok()?.get(b"N").ok()?.as_reference().ok())
        .expect("signed document has a widget appearance");
    let form = match doc.get_object(form_id).unwrap() {
        Object::Stream(stream) => &stream.dict,
        other => panic!("appearance is not a stream: {:?}", other),
    };
    let resources = resolve(doc, form, b"Resources").as_dict().unwrap();
    let fonts = resolve(doc, resources, b"Font").as_dict().unwrap();
    resolve(doc, fonts, b"F1").as_dict().unwrap()
}

/// Expected `/Widths` entry for `ch`: its advance in 1/1000 em.
fn expected_width(ch: char) -> i64 {
    let data = font_bytes();
    let face = ttf_parser::Face::parse(&data, 0).unwrap();
    let advance = face.glyph_hor_advance(face.glyph_index(ch).unwrap()).unwrap();
    (advance as f32 * 1000.0 / face.units_per_em() as f32).round() as i64
}

mod embedded_font_tests {
    use super::*;

    #[test]
    fn test_font_from_file() {
        let font = EmbeddedFont::from_file(FONT_PATH).unwrap();
        assert_eq!(font.name, "DejaVuSerif-Italic");
        assert_eq!(font.byte_width(b'A') as i64, expected_width('A'));
        assert_eq!(font.byte_width(b' ') as i64, expected_width(' '));
        // control codes have no width
        assert_eq!(font.byte_width(b'\n'), 0);
    }

    #[test]
    fn test_renderer_uses_configured_font() {
        let renderer = AppearanceRenderer::new(&script_config()).unwrap();
        match renderer.name_font() {
            StampFont::Embedded(font) => assert_eq!(font.name, "DejaVuSerif-Italic"),
            other => panic!("expected an embedded font, got {:?}", other),
        }
    }
}

mod signed_output_tests {
    use super::*;

    #[test]
    fn test_signature_embeds_truetype_font() {
        let signed = sign_with_script_font(&sample_pdf(1));
        let doc = Document::load_mem(&signed).unwrap();
        let font = name_font_dict(&doc);

        assert_eq!(font.get(b"Subtype").unwrap().as_name().unwrap(), b"TrueType");
        assert_eq!(font.get(b"BaseFont").unwrap().as_name().unwrap(), b"DejaVuSerif-Italic");
        assert_eq!(font.get(b"Encoding").unwrap().as_name().unwrap(), b"WinAnsiEncoding");
        assert_eq!(font.get(b"FirstChar").unwrap().as_i64().unwrap(), 32);
        assert_eq!(font.get(b"LastChar").unwrap().as_i64().unwrap(), 255);

        let widths = resolve(&doc, font, b"Widths").as_array().unwrap();
        assert_eq!(widths.len(), 224);
        let width_of = |code: u8| widths[(code - 32) as usize].as_i64().unwrap();
        assert_eq!(width_of(b'A'), expected_width('A'));
        assert_eq!(width_of(b'm'), expected_width('m'));
        // 0x9A is š in WinAnsi
        assert_eq!(width_of(0x9A), expected_width('š'));
        // 0x81 is unassigned in WinAnsi
        assert_eq!(width_of(0x81), 0);

        let descriptor = resolve(&doc, font, b"FontDescriptor").as_dict().unwrap();
        assert_eq!(descriptor.get(b"Type").unwrap().as_name().unwrap(), b"FontDescriptor");
        let flags = descriptor.get(b"Flags").unwrap().as_i64().unwrap();
        // Nonsymbolic and Italic, not FixedPitch
        assert_eq!(flags, 32 | 64);
        assert!(descriptor.get(b"ItalicAngle").unwrap().as_float().unwrap() < 0.0);

        let file_id = descriptor.get(b"FontFile2").unwrap().as_reference().unwrap();
        let file = match doc.get_object(file_id).unwrap() {
            Object::Stream(stream) => stream,
            other => panic!("FontFile2 is not a stream: {:?}", other),
        };
        let original = font_bytes();
        assert_eq!(file.dict.get(b"Length1").unwrap().as_i64().unwrap(), original.len() as i64);
        let mut program = Vec::new();
        ZlibDecoder::new(file.content.as_slice())
            .read_to_end(&mut program)
            .unwrap();
        assert_eq!(program, original);
    }

    #[test]
    fn test_signature_with_script_font_verifies() {
        let signed = sign_with_script_font(&sample_pdf(2));
        let results = SignatureVerifier::new().verify_document(&signed).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].status.is_valid(), "{:?}", results[0].messages);
    }
}
