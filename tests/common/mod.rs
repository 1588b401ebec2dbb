//! Shared fixtures: self-signed identities, PKCS#12 containers and small PDFs.

#![allow(dead_code)]

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509NameBuilder, X509};
use pdf_countersign::signatures::{Pkcs7Binder, SignatureBinder};
use pdf_countersign::{CertificateStore, Error, ExpiryPolicy, Result, SigningSession};
use std::cell::Cell;

pub const PASSWORD: &str = "correct horse";
pub const SIGNER_CN: &str = "Šárka Nováková";

const DAY: i64 = 24 * 60 * 60;

pub fn rsa_key() -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap()
}

pub fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap()
}

/// Self-signed certificate valid from `from_days` to `until_days` relative to now.
pub fn self_signed(key: &PKey<Private>, cn: &str, from_days: i64, until_days: i64) -> X509 {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, cn).unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, "Keboola Test").unwrap();
    name.append_entry_by_nid(Nid::COUNTRYNAME, "CZ").unwrap();
    let name = name.build();

    let now = Utc::now().timestamp();
    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(0x0A1B2C).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(key).unwrap();
    builder
        .set_not_before(&Asn1Time::from_unix(now + from_days * DAY).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix(now + until_days * DAY).unwrap())
        .unwrap();
    builder.sign(key, MessageDigest::sha256()).unwrap();
    builder.build()
}

pub fn pkcs12(key: &PKey<Private>, cert: &X509, password: &str) -> Vec<u8> {
    Pkcs12::builder()
        .name("signer")
        .pkey(key)
        .cert(cert)
        .build2(password)
        .unwrap()
        .to_der()
        .unwrap()
}

/// RSA container for [`SIGNER_CN`], valid for a year.
pub fn rsa_p12() -> Vec<u8> {
    let key = rsa_key();
    let cert = self_signed(&key, SIGNER_CN, -1, 365);
    pkcs12(&key, &cert, PASSWORD)
}

/// EC P-256 container for `cn`.
pub fn ec_p12(cn: &str) -> Vec<u8> {
    let key = ec_key();
    let cert = self_signed(&key, cn, -1, 365);
    pkcs12(&key, &cert, PASSWORD)
}

/// RSA container whose certificate expired ten days ago.
pub fn expired_p12() -> Vec<u8> {
    let key = rsa_key();
    let cert = self_signed(&key, SIGNER_CN, -30, -10);
    pkcs12(&key, &cert, PASSWORD)
}

pub fn open_session(p12: &[u8]) -> SigningSession {
    CertificateStore::new(ExpiryPolicy::Ignore)
        .open_session(p12, PASSWORD, None)
        .unwrap()
}

pub fn signing_time() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2024, 5, 1, 10, 30, 5)
        .unwrap()
}

/// A PDF with `pages` A4 pages, each with a line of text.
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for i in 0..pages {
        let text = format!("BT /F1 24 Tf 72 720 Td (Page {}) Tj ET", i + 1);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), text.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).unwrap().get_pages().len()
}

/// Delegates to [`Pkcs7Binder`] but fails on the `fail_on`-th call (1-based).
pub struct FailingBinder<'a> {
    inner: Pkcs7Binder<'a>,
    fail_on: usize,
    calls: Cell<usize>,
}

impl<'a> FailingBinder<'a> {
    pub fn new(session: &'a SigningSession, fail_on: usize) -> Self {
        Self {
            inner: Pkcs7Binder::new(session.certificate()),
            fail_on,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl SignatureBinder for FailingBinder<'_> {
    fn bind(&self, signed_bytes: &[u8]) -> Result<Vec<u8>> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call == self.fail_on {
            return Err(Error::CryptoBindFailure("injected failure".to_string()));
        }
        self.inner.bind(signed_bytes)
    }

    fn estimated_size(&self) -> usize {
        self.inner.estimated_size()
    }
}
