// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # PDF Countersign
//!
//! Applies one or more visible digital signatures and initials to a PDF with
//! a PKCS#12 certificate. Each mark is written as its own incremental update,
//! so earlier signatures stay valid when later ones are added.
//!
//! ## Features
//!
//! - **Certificates**: PKCS#12 loading, validity checks and signer name extraction
//! - **Stamps**: signature and initials appearances with the signer name and time
//! - **Placement**: page-independent fractional positions and corner anchoring
//! - **Protocol page**: an optional summary listing every applied mark, continued on
//!   further pages for long batches
//! - **Locking**: an optional final seal that forbids further changes
//! - **Verification**: per-signature digest and coverage checks
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_countersign::{EngineConfig, PlacementRequest, SignatureEngine, SigningOptions};
//!
//! let engine = SignatureEngine::new(EngineConfig::default());
//! let requests = vec![
//!     PlacementRequest::signature(0, 0.6, 0.1),
//!     PlacementRequest::initials(1, 0.9, 0.02),
//! ];
//! let options = SigningOptions::default().with_protocol_page(true);
//! let signed = engine.sign(&pdf, &p12, "secret", &requests, &options)?;
//! std::fs::write("signed.pdf", &signed.bytes)?;
//! ```
//!
//! ## Revision layout
//!
//! ```text
//! original | protocol pages | mark 1 | mark 2 | ... | lock seal
//! ```
//!
//! The protocol pages and the lock seal are only present when requested.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core types
pub mod config;
pub mod geometry;

// Certificates
pub mod certificate;

// Text helpers
pub mod text;

// Reading and writing
pub mod document;
pub mod writer;

// Marks
pub mod appearance;
pub mod placement;
pub mod protocol;

// Signing
pub mod engine;
pub mod locker;
pub mod signatures;

// Re-exports
pub use appearance::{AppearanceRenderer, AppearanceStamp};
pub use certificate::{Certificate, CertificateMetadata, CertificateStore, SigningSession};
pub use config::{EngineConfig, ExpiryPolicy, SigningOptions, StampSize};
pub use engine::{AppliedMark, EngineState, LockStatus, SignatureEngine, SignedDocument};
pub use error::{Error, Result};
pub use locker::{DocumentLocker, LockReport};
pub use placement::{initials_everywhere, Corner, MarkKind, NormalizedPosition, PlacementRequest};
pub use protocol::ProtocolPageBuilder;
pub use signatures::{SignatureVerifier, VerificationResult, VerificationStatus};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_countersign");
    }
}
