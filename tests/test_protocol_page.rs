//! Integration tests for the signature protocol page.

mod common;

use common::*;
use flate2::read::ZlibDecoder;
use lopdf::{Document, Object};
use pdf_countersign::signatures::Pkcs7Binder;
use pdf_countersign::{
    initials_everywhere, CertificateStore, Corner, EngineConfig, PlacementRequest,
    ProtocolPageBuilder, SignatureEngine, SignatureVerifier, SigningOptions,
};
use std::io::Read;

/// Decoded content stream and media box of the 0-based page `index`.
fn page_content(pdf: &[u8], index: usize) -> (String, Vec<f32>) {
    let doc = Document::load_mem(pdf).unwrap();
    let page_id = doc.get_pages()[&(index as u32 + 1)];
    let page = doc.get_dictionary(page_id).unwrap();

    let media_box = page
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_float().unwrap())
        .collect();

    let contents_id = page.get(b"Contents").unwrap().as_reference().unwrap();
    let stream = match doc.get_object(contents_id).unwrap() {
        Object::Stream(stream) => stream,
        other => panic!("page contents is not a stream: {:?}", other),
    };
    let data = if stream.dict.has(b"Filter") {
        let mut out = Vec::new();
        ZlibDecoder::new(stream.content.as_slice())
            .read_to_end(&mut out)
            .unwrap();
        out
    } else {
        stream.content.clone()
    };
    (String::from_utf8_lossy(&data).to_string(), media_box)
}

fn last_page_content(pdf: &[u8]) -> (String, Vec<f32>) {
    page_content(pdf, page_count(pdf) - 1)
}

/// Baselines of every positioned text run.
fn baselines(content: &str) -> Vec<f32> {
    content
        .lines()
        .filter(|l| l.ends_with(" Tm"))
        .filter_map(|l| l.split_whitespace().nth(5)?.parse().ok())
        .collect()
}

fn sign_with_protocol(pdf: &[u8], requests: &[PlacementRequest]) -> pdf_countersign::SignedDocument {
    let session = open_session(&rsa_p12());
    let binder = Pkcs7Binder::new(session.certificate());
    SignatureEngine::new(EngineConfig::default())
        .sign_with_binder(
            pdf,
            &session,
            requests,
            &SigningOptions::new().with_protocol_page(true),
            &binder,
            signing_time(),
        )
        .unwrap()
}

mod appended_page_tests {
    use super::*;

    #[test]
    fn test_protocol_page_is_last_and_signed() {
        let pdf = sample_pdf(2);
        let requests = vec![
            PlacementRequest::signature(1, 0.6, 0.1),
            PlacementRequest::initials(0, 0.9, 0.0),
        ];
        let signed = sign_with_protocol(&pdf, &requests);

        assert_eq!(signed.protocol_pages, vec![2]);
        assert_eq!(page_count(&signed.bytes), 3);

        let results = SignatureVerifier::new().verify_document(&signed.bytes).unwrap();
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.status.is_valid(), "{:?}", result.messages);
            // the protocol revision sits before every /Contents hole
            let range = result.byte_range().unwrap();
            assert!(range[1] as usize > pdf.len());
        }
    }

    #[test]
    fn test_protocol_page_content() {
        let pdf = sample_pdf(3);
        let requests = vec![
            PlacementRequest::signature(2, 0.6, 0.1),
            PlacementRequest::initials(0, 0.9, 0.0),
            PlacementRequest::initials(1, 0.9, 0.0),
        ];
        let signed = sign_with_protocol(&pdf, &requests);
        let (text, media_box) = last_page_content(&signed.bytes);

        assert_eq!(media_box, vec![0.0, 0.0, 595.0, 842.0]);
        assert!(text.contains("(Digital Signature Protocol) Tj"));
        assert!(text.contains("(Number of pages: 3) Tj"));
        assert!(text.contains("(Signing date: 2024-05-01 10:30:05) Tj"));
        assert!(text.contains("(Owner: Sarka Novakova) Tj"));
        assert!(text.contains("(Organization: Keboola Test) Tj"));
        assert!(text.contains("(Serial number: A1B2C) Tj"));
        assert!(text.contains("(1. Digital signature - page 3 - 2024-05-01 10:30:05) Tj"));
        assert!(text.contains("(2. Initials - page 1 - 2024-05-01 10:30:05) Tj"));
        assert!(text.contains("(Initials - pages: 1, 2) Tj"));
        assert!(text.contains("(Created by eSignature | github.com/keboola/esignature) Tj"));
    }

    #[test]
    fn test_no_protocol_page_by_default() {
        let pdf = sample_pdf(1);
        let signed = SignatureEngine::new(EngineConfig::default())
            .sign(
                &pdf,
                &rsa_p12(),
                PASSWORD,
                &[PlacementRequest::signature(0, 0.1, 0.1)],
                &SigningOptions::default(),
            )
            .unwrap();
        assert!(signed.protocol_pages.is_empty());
        assert_eq!(page_count(&signed.bytes), 1);
    }

    #[test]
    fn test_protocol_with_lock() {
        let pdf = sample_pdf(1);
        let options = SigningOptions::new().with_protocol_page(true).with_lock(true);
        let signed = SignatureEngine::new(EngineConfig::default())
            .sign(&pdf, &rsa_p12(), PASSWORD, &[PlacementRequest::signature(0, 0.1, 0.1)], &options)
            .unwrap();

        assert_eq!(page_count(&signed.bytes), 2);
        let verifier = SignatureVerifier::new();
        let results = verifier.verify_document(&signed.bytes).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status.is_valid()));
        assert!(verifier.is_locked(&signed.bytes).unwrap());
    }

    #[test]
    fn test_long_batch_continues_on_new_pages() {
        let pdf = sample_pdf(30);
        let mut requests = vec![PlacementRequest::signature(29, 0.6, 0.1)];
        requests.extend(initials_everywhere(30, Corner::BottomRight));
        let signed = sign_with_protocol(&pdf, &requests);

        assert!(signed.protocol_pages.len() >= 2, "{:?}", signed.protocol_pages);
        assert_eq!(signed.protocol_pages[0], 30);
        assert_eq!(page_count(&signed.bytes), 30 + signed.protocol_pages.len());

        let mut text = String::new();
        for &index in &signed.protocol_pages {
            let (content, _) = page_content(&signed.bytes, index);
            let ys = baselines(&content);
            // one footer per page, everything else between the footer band and the top margin
            assert_eq!(ys.iter().filter(|&&y| y == 85.0).count(), 1, "page {}", index);
            for y in ys.into_iter().filter(|&y| y != 85.0) {
                assert!((120.0..=792.0).contains(&y), "page {} line at {}", index, y);
            }
            assert!(content.contains("(Created by eSignature | github.com/keboola/esignature) Tj"));
            text.push_str(&content);
        }

        for i in 1..=requests.len() {
            assert_eq!(text.matches(&format!("({}. ", i)).count(), 1, "mark {}", i);
        }
        assert!(text.contains("(31. Initials - page 30 - 2024-05-01 10:30:05) Tj"));
        assert!(text.contains("(Initials - pages: 1-30) Tj"));
        assert!(text.contains("(Digital Signature Protocol - page 2) Tj"));

        let results = SignatureVerifier::new().verify_document(&signed.bytes).unwrap();
        assert_eq!(results.len(), 31);
        assert!(results.iter().all(|r| r.status.is_valid()));
    }
}

mod builder_tests {
    use super::*;

    #[test]
    fn test_builder_uses_certificate_metadata() {
        let cert = CertificateStore::default().load(&ec_p12("Jan Novák"), PASSWORD).unwrap();
        let pages = ProtocolPageBuilder::new("example.org").build(cert.metadata(), &[], 5, signing_time());
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        let text = String::from_utf8_lossy(&page.content).to_string();

        assert!(text.contains("(Number of pages: 5) Tj"));
        assert!(text.contains("(Owner: Jan Novak) Tj"));
        assert!(text.contains("(Issuer: Jan Novak) Tj"));
        assert!(text.contains("(Created by eSignature | example.org) Tj"));
        assert!(!text.contains("Initials - pages"));
        assert!(page.fonts.contains_key("F1"));
    }
}
