//! PDF digital signatures.
//!
//! This module creates and verifies approval signatures that are appended to
//! a document as incremental updates, according to ISO 32000-1:2008
//! Section 12.8.
//!
//! ## Features
//!
//! - **ByteRange calculation**: fixed-width placeholders patched in place
//! - **Field signing**: [`PdfSigner`] writes the field, widget and signature
//!   dictionary of one signature as a single revision
//! - **Binding**: the [`SignatureBinder`] seam turns signed bytes into a
//!   signature container; [`Pkcs7Binder`] is the OpenSSL implementation
//! - **Verification**: [`SignatureVerifier`] checks every signature of a file
//!
//! Only `adbe.pkcs7.detached` signatures are produced.

mod binder;
mod byterange;
mod flags;
mod signer;
mod types;
mod verifier;

pub use binder::{Pkcs7Binder, SignatureBinder};
pub use byterange::{ByteRangeCalculator, BYTE_RANGE_PLACEHOLDER, MIN_SIGNATURE_SIZE};
pub use flags::{AnnotationFlags, SigFlags};
pub(crate) use signer::{extend_array, push_to_array};
pub use signer::{format_pdf_date, AppliedField, PdfSigner, SignatureFieldSpec};
pub use types::{SignatureInfo, VerificationResult, VerificationStatus, FILTER, SUB_FILTER};
pub use verifier::SignatureVerifier;
