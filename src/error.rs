//! Error types for the signing engine.
//!
//! This module defines every error that can occur while loading a certificate,
//! rendering an appearance, applying signatures or locking a document.

/// Result type alias for signing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during a signing run.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)] // "Invalid" prefix is intentional for clarity
pub enum Error {
    /// The certificate container could not be parsed or is incomplete
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The certificate container could not be decrypted with the given password
    #[error("Wrong certificate password")]
    WrongPassword,

    /// The certificate is outside its validity window
    #[error("Certificate is not valid at signing time (valid from {not_before} until {not_after})")]
    ExpiredCertificate {
        /// Start of the validity window
        not_before: String,
        /// End of the validity window
        not_after: String,
    },

    /// Neither the certificate nor the caller supplied a usable signer name
    #[error("No signer name could be resolved")]
    EmptySignerName,

    /// An appearance stamp could not be produced
    #[error("Failed to render appearance: {0}")]
    RenderFailure(String),

    /// A placement request references a page that does not exist
    #[error("Page {page} is out of bounds (document has {page_count} pages)")]
    PlacementOutOfBounds {
        /// Requested page index (0-based)
        page: usize,
        /// Number of pages in the document
        page_count: usize,
    },

    /// The cryptographic primitive rejected the signing operation
    #[error("Failed to bind signature: {0}")]
    CryptoBindFailure(String),

    /// The document could not be locked
    #[error("Failed to lock document: {0}")]
    LockFailure(String),

    /// The document carries a lock that forbids further signatures
    #[error("Document is locked against further changes")]
    DocumentLocked,

    /// A batch request was malformed
    #[error("Invalid signing request: {0}")]
    InvalidRequest(String),

    /// Invalid PDF structure
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Font error
    #[error("Font error: {0}")]
    Font(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::InvalidPdf(err.to_string())
    }
}
