//! Batch signing.
//!
//! [`SignatureEngine`] drives one signing run:
//!
//! ```text
//! Unsigned -> ProtocolAppended -> Signing(1) .. Signing(N) -> Locked -> Final
//!             (if requested)                                 (if requested)
//! ```
//!
//! Everything that can be checked up front (requests, document, pages,
//! signer name, stamps) is checked before the first revision is built. Each
//! mark then becomes one signed incremental revision, in the caller's order.
//! Revisions accumulate in a private [`RevisionChain`]; on error the chain is
//! dropped and the caller only sees the error.

use crate::appearance::{font_resources, AppearanceRenderer, AppearanceStamp};
use crate::certificate::{CertificateStore, SigningSession};
use crate::config::{EngineConfig, SigningOptions};
use crate::document::{Revision, RevisionChain};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::locker::DocumentLocker;
use crate::placement::{resolve_rect, MarkKind, PlacementRequest};
use crate::protocol::{PageContent, ProtocolPageBuilder};
use crate::signatures::{
    extend_array, AnnotationFlags, PdfSigner, Pkcs7Binder, SignatureBinder, SignatureFieldSpec,
};
use crate::writer::{flate_encode, FontRegistry, RevisionWriter};
use chrono::{DateTime, FixedOffset, Utc};
use lopdf::{dictionary, Object, ObjectId, Stream};
use std::collections::HashSet;

/// Where a signing run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing appended yet
    Unsigned,
    /// The protocol pages revision was appended
    ProtocolAppended,
    /// Mark `i` (1-based) is being bound
    Signing(usize),
    /// The seal revision was appended
    Locked,
    /// The run is complete
    Final,
}

/// A mark that was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedMark {
    /// Signature field name
    pub field_name: String,
    /// Mark kind
    pub kind: MarkKind,
    /// 0-based page index
    pub page: usize,
    /// Widget rectangle in user space
    pub rect: Rect,
    /// Time shown on the stamp and written as `/M`
    pub timestamp: DateTime<FixedOffset>,
}

/// Outcome of the optional lock step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    /// Locking was not requested
    NotRequested,
    /// The seal revision was appended
    Locked,
    /// Locking failed; the document is signed but not locked
    Failed(String),
}

/// Result of a successful signing run.
#[derive(Debug, Clone)]
pub struct SignedDocument {
    /// Complete output file
    pub bytes: Vec<u8>,
    /// Applied marks, in request order
    pub marks: Vec<AppliedMark>,
    /// Lock outcome
    pub lock: LockStatus,
    /// 0-based indices of the protocol pages, empty when none were added
    pub protocol_pages: Vec<usize>,
}

/// A mark prepared for binding.
struct PlannedMark {
    mark: AppliedMark,
    page_id: ObjectId,
    stamp: AppearanceStamp,
}

/// Applies signatures, initials, the protocol page and the lock seal.
#[derive(Debug, Clone, Default)]
pub struct SignatureEngine {
    config: EngineConfig,
    store: CertificateStore,
}

impl SignatureEngine {
    /// Create an engine.
    pub fn new(config: EngineConfig) -> Self {
        let store = CertificateStore::new(config.expiry_policy);
        Self { config, store }
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The store used to open certificates.
    pub fn certificate_store(&self) -> &CertificateStore {
        &self.store
    }

    /// Sign `pdf` with a PKCS#12 container.
    pub fn sign(
        &self,
        pdf: &[u8],
        certificate: &[u8],
        password: &str,
        requests: &[PlacementRequest],
        options: &SigningOptions,
    ) -> Result<SignedDocument> {
        let session =
            self.store
                .open_session(certificate, password, self.config.fallback_name.as_deref())?;
        let signed = self.sign_with_session(pdf, &session, requests, options);
        session.close();
        signed
    }

    /// Sign `pdf` with an already opened session.
    pub fn sign_with_session(
        &self,
        pdf: &[u8],
        session: &SigningSession,
        requests: &[PlacementRequest],
        options: &SigningOptions,
    ) -> Result<SignedDocument> {
        let binder = Pkcs7Binder::new(session.certificate());
        self.sign_with_binder(
            pdf,
            session,
            requests,
            options,
            &binder,
            Utc::now().fixed_offset(),
        )
    }

    /// Sign `pdf` with an explicit binder and signing time.
    pub fn sign_with_binder(
        &self,
        pdf: &[u8],
        session: &SigningSession,
        requests: &[PlacementRequest],
        options: &SigningOptions,
        binder: &dyn SignatureBinder,
        signing_time: DateTime<FixedOffset>,
    ) -> Result<SignedDocument> {
        if requests.is_empty() {
            return Err(Error::InvalidRequest("no placement requests".to_string()));
        }
        log::info!(
            "Signing batch of {} marks ({} bytes input)",
            requests.len(),
            pdf.len()
        );

        let mut chain = RevisionChain::new(pdf);
        let (plan, page_count) = self.plan(&chain, session, requests, signing_time)?;
        let mut state = EngineState::Unsigned;
        let mut fonts = FontRegistry::new();

        let mut protocol_pages = Vec::new();
        if options.include_protocol_page {
            let marks: Vec<AppliedMark> = plan.iter().map(|p| p.mark.clone()).collect();
            let pages = ProtocolPageBuilder::new(&self.config.attribution).build(
                session.certificate().metadata(),
                &marks,
                page_count,
                signing_time,
            );
            append_pages(&mut chain, &pages, &mut fonts)?;
            protocol_pages = (page_count..page_count + pages.len()).collect();
            transition(&mut state, EngineState::ProtocolAppended);
        }

        let signer = PdfSigner::from_config(&self.config);
        for (i, planned) in plan.iter().enumerate() {
            transition(&mut state, EngineState::Signing(i + 1));
            let spec = SignatureFieldSpec {
                field_name: planned.mark.field_name.clone(),
                page: planned.page_id,
                rect: planned.mark.rect,
                appearance: Some(&planned.stamp),
                flags: AnnotationFlags::VISIBLE_SIGNATURE,
                signer_name: session.signer_name().to_string(),
                signing_time,
                lock_document: false,
            };
            signer.sign_field(&mut chain, &spec, &mut fonts, binder)?;
        }

        let lock = if options.lock_after_signing {
            match DocumentLocker::new(&self.config).lock_at(&mut chain, session, binder, signing_time) {
                Ok(_) => {
                    transition(&mut state, EngineState::Locked);
                    LockStatus::Locked
                },
                Err(e) => {
                    log::warn!("Document left unlocked: {}", e);
                    LockStatus::Failed(e.to_string())
                },
            }
        } else {
            LockStatus::NotRequested
        };
        transition(&mut state, EngineState::Final);

        let bytes = chain.serialize();
        log::info!(
            "Signed {} marks in {} revisions ({} bytes output)",
            plan.len(),
            chain.revision_count(),
            bytes.len()
        );
        Ok(SignedDocument {
            bytes,
            marks: plan.into_iter().map(|p| p.mark).collect(),
            lock,
            protocol_pages,
        })
    }

    /// Check preconditions and render every stamp.
    fn plan(
        &self,
        chain: &RevisionChain,
        session: &SigningSession,
        requests: &[PlacementRequest],
        signing_time: DateTime<FixedOffset>,
    ) -> Result<(Vec<PlannedMark>, usize)> {
        let view = chain.view()?;
        if view.is_encrypted() {
            return Err(Error::Unsupported("encrypted documents cannot be signed".to_string()));
        }
        if view.is_locked() {
            return Err(Error::DocumentLocked);
        }
        let page_count = view.page_count();
        let page_ids = requests
            .iter()
            .map(|r| view.page_id(r.page))
            .collect::<Result<Vec<_>>>()?;

        let signer_name = session.signer_name();
        if signer_name.trim().is_empty() {
            return Err(Error::EmptySignerName);
        }
        let renderer = AppearanceRenderer::new(&self.config)?;
        let mut names = FieldNames::new(&self.config.field_prefix, view.field_names());

        let mut plan = Vec::with_capacity(requests.len());
        for (request, page_id) in requests.iter().zip(page_ids) {
            let page_box = view.page_box(page_id)?;
            let rect = resolve_rect(request, &page_box, &self.config)?;
            let stamp = renderer.render(&request.kind, signer_name, signing_time, rect)?;
            plan.push(PlannedMark {
                mark: AppliedMark {
                    field_name: names.next_name(),
                    kind: request.kind.clone(),
                    page: request.page,
                    rect,
                    timestamp: signing_time,
                },
                page_id,
                stamp,
            });
        }
        Ok((plan, page_count))
    }
}

fn transition(state: &mut EngineState, next: EngineState) {
    log::debug!("Engine state {:?} -> {:?}", state, next);
    *state = next;
}

/// Generates `prefix1`, `prefix2`, ... skipping names already in use.
struct FieldNames {
    prefix: String,
    taken: HashSet<String>,
    counter: usize,
}

impl FieldNames {
    fn new(prefix: &str, taken: HashSet<String>) -> Self {
        Self {
            prefix: prefix.to_string(),
            taken,
            counter: 0,
        }
    }

    fn next_name(&mut self) -> String {
        loop {
            self.counter += 1;
            let candidate = format!("{}{}", self.prefix, self.counter);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Append `pages` after the last page, together in one revision.
fn append_pages(
    chain: &mut RevisionChain,
    pages: &[PageContent],
    fonts: &mut FontRegistry,
) -> Result<Vec<ObjectId>> {
    let view = chain.view()?;
    let trailer = view.trailer_info()?;
    let mut writer = RevisionWriter::new(trailer.prev_size.saturating_sub(1));
    let pages_root = view.pages_root_id()?;

    let mut page_ids = Vec::with_capacity(pages.len());
    for content in pages {
        let resources = font_resources(&content.fonts, fonts, &mut writer)?;
        let stream = Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            flate_encode(&content.content)?,
        );
        let contents_id = writer.add_object(stream);
        page_ids.push(writer.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_root,
            "MediaBox" => content.media_box.to_pdf_array(),
            "Rotate" => 0,
            "Resources" => resources,
            "Contents" => contents_id,
        }));
    }

    let mut root = view.dict(pages_root)?.clone();
    let kids = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    extend_array(&view, &mut writer, &mut root, b"Kids", kids)?;
    let count = root
        .get(b"Count")
        .and_then(Object::as_i64)
        .unwrap_or(view.page_count() as i64);
    root.set("Count", count + page_ids.len() as i64);
    writer.set_object(pages_root, &Object::Dictionary(root));

    let previous = chain.serialize();
    let assembled = writer.finish(&previous, &trailer);
    chain.append_revision(Revision::new(assembled.bytes));
    log::debug!("Appended {} pages after the last page", page_ids.len());
    Ok(page_ids)
}
