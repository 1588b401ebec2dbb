//! PDF signing implementation.
//!
//! [`PdfSigner::sign_field`] adds one signature field to a document as a
//! single incremental revision:
//!
//! 1. the signature dictionary is written with a fixed-width `/ByteRange`
//!    and a zero-filled `/Contents` placeholder;
//! 2. the field (merged with its widget) is registered in the page's
//!    `/Annots` and in `/AcroForm /Fields`;
//! 3. the revision is assembled, `/ByteRange` is patched in place;
//! 4. the covered bytes are handed to a [`SignatureBinder`] and the result is
//!    written over the placeholder.
//!
//! No byte outside the `/Contents` gap changes after step 3, so the digest the
//! binder computes matches what a verifier recomputes.

use super::binder::SignatureBinder;
use super::byterange::{ByteRangeCalculator, BYTE_RANGE_PLACEHOLDER};
use super::flags::{AnnotationFlags, SigFlags};
use super::types::{FILTER, SUB_FILTER};
use crate::appearance::AppearanceStamp;
use crate::config::EngineConfig;
use crate::document::{AcroFormRef, DocumentView, Revision, RevisionChain};
use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::text::pdf_text_string;
use crate::writer::object_serializer::hex_string;
use crate::writer::{FontRegistry, ObjectSerializer, RevisionWriter};
use chrono::{DateTime, FixedOffset};
use lopdf::{dictionary, Dictionary, Object, ObjectId, StringFormat};

/// Everything needed to create one signature field.
#[derive(Debug, Clone)]
pub struct SignatureFieldSpec<'a> {
    /// Partial field name (`/T`), unique in the document
    pub field_name: String,
    /// Page the widget is placed on
    pub page: ObjectId,
    /// Widget rectangle in user space
    pub rect: Rect,
    /// Visible appearance; `None` for invisible widgets
    pub appearance: Option<&'a AppearanceStamp>,
    /// Widget annotation flags
    pub flags: AnnotationFlags,
    /// Name written as `/Name`
    pub signer_name: String,
    /// Signing time written as `/M`
    pub signing_time: DateTime<FixedOffset>,
    /// Lock the whole document with this signature
    pub lock_document: bool,
}

/// Outcome of [`PdfSigner::sign_field`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedField {
    /// Field name
    pub field_name: String,
    /// Object id of the merged field/widget dictionary
    pub field_id: ObjectId,
    /// Object id of the signature dictionary
    pub signature_id: ObjectId,
    /// Final `/ByteRange`
    pub byte_range: [i64; 4],
    /// Length of the appended revision
    pub revision_len: usize,
}

/// PDF signer that creates digital signatures.
#[derive(Debug, Clone)]
pub struct PdfSigner {
    reason: String,
    location: Option<String>,
    contents_reserve: usize,
}

impl PdfSigner {
    /// Create a signer writing the given reason and location.
    pub fn new(reason: impl Into<String>, location: Option<String>) -> Self {
        Self {
            reason: reason.into(),
            location,
            contents_reserve: 0,
        }
    }

    /// Create a signer from engine settings.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            reason: config.reason.clone(),
            location: config.location.clone(),
            contents_reserve: config.contents_reserve,
        }
    }

    /// Serialize the signature dictionary with both placeholders.
    pub fn build_signature_dictionary(
        &self,
        spec: &SignatureFieldSpec<'_>,
        calc: &ByteRangeCalculator,
    ) -> Vec<u8> {
        let serializer = ObjectSerializer::compact();
        let mut out = format!(
            "<< /Type /Sig /Filter /{} /SubFilter /{} /ByteRange {} /Contents {}",
            FILTER,
            SUB_FILTER,
            BYTE_RANGE_PLACEHOLDER,
            calc.generate_placeholder()
        )
        .into_bytes();

        let mut entries: Vec<(&str, Object)> = vec![
            ("M", literal(format_pdf_date(spec.signing_time).as_bytes())),
            ("Name", text_string(&spec.signer_name)),
        ];
        if !self.reason.is_empty() {
            entries.push(("Reason", text_string(&self.reason)));
        }
        if let Some(location) = &self.location {
            entries.push(("Location", text_string(location)));
        }
        if spec.lock_document {
            entries.push(("Reference", Object::Array(vec![field_mdp_reference()])));
        }

        for (key, value) in entries {
            out.extend_from_slice(format!(" /{} ", key).as_bytes());
            out.extend_from_slice(&serializer.serialize(&value));
        }
        out.extend_from_slice(b" >>");
        out
    }

    /// Append one signed revision holding a new signature field.
    ///
    /// On error the chain is left untouched.
    pub fn sign_field(
        &self,
        chain: &mut RevisionChain,
        spec: &SignatureFieldSpec<'_>,
        fonts: &mut FontRegistry,
        binder: &dyn SignatureBinder,
    ) -> Result<AppliedField> {
        let view = chain.view()?;
        let trailer = view.trailer_info()?;
        let mut writer = RevisionWriter::new(trailer.prev_size.saturating_sub(1));

        let signature_id = writer.allocate();
        let field_id = writer.allocate();
        let calc = ByteRangeCalculator::new(binder.estimated_size() + self.contents_reserve);
        writer.set_raw(signature_id, self.build_signature_dictionary(spec, &calc));

        let mut field = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Sig",
            "T" => text_string(&spec.field_name),
            "V" => signature_id,
            "F" => spec.flags.bits() as i64,
            "P" => spec.page,
            "Rect" => spec.rect.to_pdf_array(),
        };
        if let Some(stamp) = spec.appearance {
            let form = stamp.write_form_xobject(fonts, &mut writer)?;
            field.set("AP", dictionary! { "N" => form });
        }
        if spec.lock_document {
            field.set(
                "Lock",
                dictionary! {
                    "Type" => "SigFieldLock",
                    "Action" => "All",
                    "P" => 1,
                },
            );
        }
        writer.set_object(field_id, &Object::Dictionary(field));

        register_widget(&view, &mut writer, spec.page, field_id)?;
        register_field(&view, &mut writer, field_id)?;

        let mut full = chain.serialize();
        let base = full.len();
        let assembled = writer.finish(&full, &trailer);
        let sig_offset = base
            + assembled
                .offsets
                .get(&signature_id)
                .copied()
                .ok_or_else(|| Error::InvalidPdf("signature dictionary was not written".to_string()))?;
        full.extend_from_slice(&assembled.bytes);

        let byte_range_offset = ByteRangeCalculator::find_byte_range_offset(&full, sig_offset)
            .ok_or_else(|| Error::InvalidPdf("ByteRange placeholder not found".to_string()))?;
        let contents_offset = ByteRangeCalculator::find_contents_offset(&full, sig_offset)
            .ok_or_else(|| Error::InvalidPdf("Contents placeholder not found".to_string()))?;
        let byte_range = calc.calculate_byte_range(full.len(), contents_offset);
        ByteRangeCalculator::patch_byte_range(&mut full, byte_range_offset, &byte_range)?;

        let signed_bytes = ByteRangeCalculator::extract_signed_bytes(&full, &byte_range)?;
        let der = binder.bind(&signed_bytes)?;
        let hex = hex_string(&der);
        calc.insert_signature(&mut full, contents_offset, &hex[1..hex.len() - 1])?;

        let revision = full.split_off(base);
        let revision_len = revision.len();
        chain.append_revision(Revision::new(revision));

        log::debug!(
            "Signed field {} with ByteRange {}",
            spec.field_name,
            ByteRangeCalculator::format_byte_range(&byte_range)
        );

        Ok(AppliedField {
            field_name: spec.field_name.clone(),
            field_id,
            signature_id,
            byte_range,
            revision_len,
        })
    }
}

/// Add `item` to the array under `key`, rewriting whichever object holds it.
///
/// Returns true when `container` itself was changed.
pub(crate) fn push_to_array(
    view: &DocumentView,
    writer: &mut RevisionWriter,
    container: &mut Dictionary,
    key: &[u8],
    item: Object,
) -> Result<bool> {
    extend_array(view, writer, container, key, vec![item])
}

/// Append `items` to the array under `key` in a single rewrite.
pub(crate) fn extend_array(
    view: &DocumentView,
    writer: &mut RevisionWriter,
    container: &mut Dictionary,
    key: &[u8],
    items: Vec<Object>,
) -> Result<bool> {
    match container.get(key) {
        Ok(Object::Reference(array_id)) => {
            let array_id = *array_id;
            let mut existing = view
                .document()
                .get_object(array_id)
                .and_then(Object::as_array)
                .cloned()
                .unwrap_or_default();
            existing.extend(items);
            writer.set_object(array_id, &Object::Array(existing));
            Ok(false)
        },
        Ok(Object::Array(existing)) => {
            let mut existing = existing.clone();
            existing.extend(items);
            container.set(key.to_vec(), Object::Array(existing));
            Ok(true)
        },
        _ => {
            container.set(key.to_vec(), Object::Array(items));
            Ok(true)
        },
    }
}

fn register_widget(
    view: &DocumentView,
    writer: &mut RevisionWriter,
    page_id: ObjectId,
    widget: ObjectId,
) -> Result<()> {
    let mut page = view.dict(page_id)?.clone();
    if push_to_array(view, writer, &mut page, b"Annots", Object::Reference(widget))? {
        writer.set_object(page_id, &Object::Dictionary(page));
    }
    Ok(())
}

fn register_field(view: &DocumentView, writer: &mut RevisionWriter, field: ObjectId) -> Result<()> {
    let sig_flags = Object::Integer(SigFlags::all().bits() as i64);
    match view.acroform()? {
        AcroFormRef::Indirect(form_id) => {
            let mut form = view.dict(form_id)?.clone();
            push_to_array(view, writer, &mut form, b"Fields", Object::Reference(field))?;
            form.set("SigFlags", sig_flags);
            writer.set_object(form_id, &Object::Dictionary(form));
        },
        AcroFormRef::Inline => {
            let catalog_id = view.catalog_id()?;
            let mut catalog = view.catalog()?.clone();
            let mut form = catalog.get(b"AcroForm").and_then(Object::as_dict)?.clone();
            push_to_array(view, writer, &mut form, b"Fields", Object::Reference(field))?;
            form.set("SigFlags", sig_flags);
            catalog.set("AcroForm", form);
            writer.set_object(catalog_id, &Object::Dictionary(catalog));
        },
        AcroFormRef::Absent => {
            let catalog_id = view.catalog_id()?;
            let form_id = writer.add_object(dictionary! {
                "Fields" => vec![Object::Reference(field)],
                "SigFlags" => sig_flags,
            });
            let mut catalog = view.catalog()?.clone();
            catalog.set("AcroForm", form_id);
            writer.set_object(catalog_id, &Object::Dictionary(catalog));
        },
    }
    Ok(())
}

/// `/Reference` entry forbidding any change after this signature.
fn field_mdp_reference() -> Object {
    Object::Dictionary(dictionary! {
        "Type" => "SigRef",
        "TransformMethod" => "FieldMDP",
        "TransformParams" => dictionary! {
            "Type" => "TransformParams",
            "Action" => "All",
            "P" => 1,
            "V" => Object::Name(b"1.2".to_vec()),
        },
    })
}

fn literal(bytes: &[u8]) -> Object {
    Object::String(bytes.to_vec(), StringFormat::Literal)
}

fn text_string(text: &str) -> Object {
    literal(&pdf_text_string(text))
}

/// Format a time as a PDF date string, `D:YYYYMMDDHHmmSS+HH'mm'`.
pub fn format_pdf_date(time: DateTime<FixedOffset>) -> String {
    let offset = time.offset().local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let minutes = offset.abs() / 60;
    format!(
        "{}{}{:02}'{:02}'",
        time.format("D:%Y%m%d%H%M%S"),
        sign,
        minutes / 60,
        minutes % 60
    )
}
