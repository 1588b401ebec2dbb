//! PDF signature verification.
//!
//! Every signed field is checked on its own: the ByteRange must be well
//! formed, and the PKCS#7 container must verify over exactly the bytes the
//! ByteRange selects. Trust in the signing certificate is not evaluated.

use super::byterange::ByteRangeCalculator;
use super::types::{SignatureInfo, VerificationResult, VerificationStatus};
use crate::document::{decode_text_string, DocumentView};
use crate::error::Result;
use indexmap::IndexMap;
use lopdf::{Dictionary, Object, ObjectId};
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509;
use sha2::{Digest, Sha256};
use x509_parser::prelude::*;

/// Verifier for PDF digital signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Create a new signature verifier.
    pub fn new() -> Self {
        Self
    }

    /// Verify every signature in a document.
    ///
    /// Results are ordered by where their signed range ends, which is the
    /// order the signatures were applied in.
    pub fn verify_document(&self, pdf_data: &[u8]) -> Result<Vec<VerificationResult>> {
        let view = DocumentView::parse(pdf_data)?;

        // a field reachable twice is verified once
        let mut signed: IndexMap<ObjectId, (String, &Dictionary)> = IndexMap::new();
        for (field, sig) in view.signed_fields() {
            signed.entry(field.id).or_insert((field.name, sig));
        }

        let mut results: Vec<VerificationResult> = signed
            .into_values()
            .map(|(name, sig)| self.verify_signature(&view, pdf_data, name, sig))
            .collect();
        results.sort_by_key(|r| r.byte_range().map(|br| br[2] + br[3]).unwrap_or(i64::MAX));

        log::info!(
            "Verified {} signatures ({} valid)",
            results.len(),
            results.iter().filter(|r| r.status.is_valid()).count()
        );
        Ok(results)
    }

    /// Whether the document carries a signature forbidding further changes.
    pub fn is_locked(&self, pdf_data: &[u8]) -> Result<bool> {
        Ok(DocumentView::parse(pdf_data)?.is_locked())
    }

    /// Extract signature information from a signature dictionary.
    pub fn extract_signature_info(&self, view: &DocumentView, sig: &Dictionary) -> SignatureInfo {
        let text = |key: &[u8]| {
            view.dict_entry(sig, key)
                .and_then(|v| v.as_str().ok())
                .map(decode_text_string)
        };
        SignatureInfo {
            signer_name: text(b"Name"),
            signing_time: text(b"M"),
            reason: text(b"Reason"),
            location: text(b"Location"),
            sub_filter: view
                .dict_entry(sig, b"SubFilter")
                .and_then(|v| v.as_name().ok())
                .map(|n| String::from_utf8_lossy(n).to_string()),
            byte_range: match view.dict_entry(sig, b"ByteRange") {
                Some(Object::Array(items)) => items
                    .iter()
                    .filter_map(|obj| view.resolve(obj).as_i64().ok())
                    .collect(),
                _ => Vec::new(),
            },
            forbids_changes: view.reference_forbids_changes(sig),
        }
    }

    fn verify_signature(
        &self,
        view: &DocumentView,
        pdf_data: &[u8],
        field_name: String,
        sig: &Dictionary,
    ) -> VerificationResult {
        let info = self.extract_signature_info(view, sig);
        let mut result = VerificationResult::new(field_name, info);

        let Some(byte_range) = result.byte_range() else {
            result.fail("Invalid ByteRange: expected 4 elements");
            return result;
        };
        if let Err(e) = ByteRangeCalculator::validate_byte_range(&byte_range, pdf_data.len()) {
            result.fail(format!("ByteRange validation failed: {}", e));
            return result;
        }
        result.covers_whole_document = byte_range[2] + byte_range[3] == pdf_data.len() as i64;

        let signed_bytes = match ByteRangeCalculator::extract_signed_bytes(pdf_data, &byte_range) {
            Ok(bytes) => bytes,
            Err(e) => {
                result.fail(e.to_string());
                return result;
            },
        };
        let digest = Sha256::digest(&signed_bytes);
        result.digest_hex = Some(digest.iter().map(|b| format!("{:02X}", b)).collect());

        let contents = match view.dict_entry(sig, b"Contents").and_then(|c| c.as_str().ok()) {
            Some(bytes) => bytes,
            None => {
                result.fail("Signature has no /Contents");
                return result;
            },
        };

        match verify_pkcs7(strip_padding(contents), &signed_bytes) {
            Ok(signer_cn) => {
                result.status = VerificationStatus::Valid;
                result.signer_cn = signer_cn;
            },
            Err(message) => result.fail(format!("Signature verification failed: {}", message)),
        }
        if !result.covers_whole_document {
            result
                .messages
                .push("Document was extended after this signature".to_string());
        }
        result
    }
}

/// Check a detached PKCS#7 container and return the signer's common name.
fn verify_pkcs7(der: &[u8], signed_bytes: &[u8]) -> std::result::Result<Option<String>, String> {
    let pkcs7 = Pkcs7::from_der(der).map_err(|e| e.to_string())?;
    let no_extra: Stack<X509> = Stack::new().map_err(|e| e.to_string())?;
    let store = X509StoreBuilder::new().map_err(|e| e.to_string())?.build();
    let flags = Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY;
    pkcs7
        .verify(&no_extra, &store, Some(signed_bytes), None, flags)
        .map_err(|e| e.to_string())?;

    let signers = pkcs7
        .signers(&no_extra, Pkcs7Flags::empty())
        .map_err(|e| e.to_string())?;
    let cn = signers
        .iter()
        .next()
        .and_then(|cert| cert.to_der().ok())
        .and_then(|der| common_name(&der));
    Ok(cn)
}

fn common_name(der: &[u8]) -> Option<String> {
    let (_, cert) = parse_x509_certificate(der).ok()?;
    let cn = cert
        .subject()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_string);
    cn
}

/// Cut the zero padding after the outer DER SEQUENCE.
fn strip_padding(contents: &[u8]) -> &[u8] {
    der_length(contents)
        .filter(|len| *len <= contents.len())
        .map(|len| &contents[..len])
        .unwrap_or(contents)
}

fn der_length(data: &[u8]) -> Option<usize> {
    if data.first() != Some(&0x30) {
        return None;
    }
    let first = *data.get(1)? as usize;
    if first < 0x80 {
        return Some(2 + first);
    }
    let count = first & 0x7F;
    if count == 0 || count > 4 {
        return None;
    }
    let bytes = data.get(2..2 + count)?;
    let len = bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
    Some(2 + count + len)
}
