//! Document locking.
//!
//! Locking appends one more signed revision holding an invisible seal: a
//! zero-size signature widget whose field carries a `/Lock` dictionary and
//! whose signature carries a FieldMDP transform, both with `/P 1`. Viewers
//! treat the document as locked and refuse further changes; any later
//! revision shows up as a modification of the sealed content.
//!
//! A DocMDP certification is not used since it is only allowed on the first
//! signature of a document.

use crate::certificate::SigningSession;
use crate::config::EngineConfig;
use crate::document::RevisionChain;
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::signatures::{AnnotationFlags, PdfSigner, SignatureBinder, SignatureFieldSpec};
use crate::writer::FontRegistry;
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashSet;

/// Outcome of a successful lock.
#[derive(Debug, Clone, PartialEq)]
pub struct LockReport {
    /// Name of the seal field
    pub field_name: String,
    /// ByteRange of the seal signature
    pub byte_range: [i64; 4],
}

/// Appends the seal revision.
#[derive(Debug, Clone)]
pub struct DocumentLocker {
    signer: PdfSigner,
    field_name: String,
}

impl DocumentLocker {
    /// Create a locker from engine settings.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            signer: PdfSigner::from_config(config),
            field_name: config.seal_field_name.clone(),
        }
    }

    /// Seal the document, signing now.
    pub fn lock(
        &self,
        chain: &mut RevisionChain,
        session: &SigningSession,
        binder: &dyn SignatureBinder,
    ) -> Result<LockReport> {
        self.lock_at(chain, session, binder, Utc::now().fixed_offset())
    }

    /// Seal the document with an explicit signing time.
    ///
    /// Every failure is reported as [`Error::LockFailure`]; the chain is only
    /// extended on success.
    pub fn lock_at(
        &self,
        chain: &mut RevisionChain,
        session: &SigningSession,
        binder: &dyn SignatureBinder,
        signing_time: DateTime<FixedOffset>,
    ) -> Result<LockReport> {
        let view = chain.view().map_err(as_lock_failure)?;
        if view.is_locked() {
            return Err(Error::LockFailure("document is already locked".to_string()));
        }
        let page = view.page_id(0).map_err(as_lock_failure)?;
        let field_name = unique_name(&self.field_name, &view.field_names());
        drop(view);

        let spec = SignatureFieldSpec {
            field_name: field_name.clone(),
            page,
            rect: Rect::new(0.0, 0.0, 0.0, 0.0),
            appearance: None,
            flags: AnnotationFlags::SEAL,
            signer_name: session.signer_name().to_string(),
            signing_time,
            lock_document: true,
        };
        let applied = self
            .signer
            .sign_field(chain, &spec, &mut FontRegistry::new(), binder)
            .map_err(as_lock_failure)?;

        log::info!("Document sealed with field {}", field_name);
        Ok(LockReport {
            field_name,
            byte_range: applied.byte_range,
        })
    }
}

fn as_lock_failure(err: Error) -> Error {
    match err {
        Error::LockFailure(_) => err,
        other => Error::LockFailure(other.to_string()),
    }
}

/// `base`, or `base_2`, `base_3`, ... when taken.
fn unique_name(base: &str, existing: &HashSet<String>) -> String {
    if !existing.contains(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}
