//! Parsed snapshot of a document.

use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::writer::TrailerInfo;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;

/// US Letter, used when a page inherits no `/MediaBox` at all.
const DEFAULT_MEDIA_BOX: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
};

/// Guard against cyclic `/Parent` or `/Kids` links.
const MAX_TREE_DEPTH: usize = 64;

/// Where the interactive form dictionary lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcroFormRef {
    /// `/AcroForm` is an indirect object
    Indirect(ObjectId),
    /// `/AcroForm` is a dictionary inside the catalog
    Inline,
    /// The catalog has no form
    Absent,
}

/// A terminal form field.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Object id of the field dictionary
    pub id: ObjectId,
    /// Fully qualified field name
    pub name: String,
    /// Field type, inherited from ancestors when absent
    pub field_type: Option<Vec<u8>>,
}

/// Read-only view of a parsed document.
#[derive(Debug)]
pub struct DocumentView {
    doc: Document,
    len: usize,
}

impl DocumentView {
    /// Parse a complete PDF file.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes)?;
        Ok(Self {
            doc,
            len: bytes.len(),
        })
    }

    /// The underlying object graph.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Length of the parsed file in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the parsed file was empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the document uses the standard security handler.
    pub fn is_encrypted(&self) -> bool {
        self.doc.is_encrypted()
    }

    /// Highest object number in use.
    pub fn max_id(&self) -> u32 {
        self.doc.max_id
    }

    /// Trailer entries the next revision must carry over.
    pub fn trailer_info(&self) -> Result<TrailerInfo> {
        let size = self
            .doc
            .trailer
            .get(b"Size")
            .and_then(Object::as_i64)
            .unwrap_or(0)
            .max(0) as u32;
        TrailerInfo::from_trailer(
            &self.doc.trailer,
            self.doc.xref_start,
            size.max(self.doc.max_id + 1),
        )
        .ok_or_else(|| Error::InvalidPdf("trailer has no /Root".to_string()))
    }

    /// Follow a reference, or return the object itself.
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match self.doc.dereference(obj) {
            Ok((_, target)) => target,
            Err(_) => obj,
        }
    }

    /// Dictionary stored under `id`.
    pub fn dict(&self, id: ObjectId) -> Result<&Dictionary> {
        Ok(self.doc.get_dictionary(id)?)
    }

    /// Look up `key` in `dict`, following a reference.
    pub fn dict_entry<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        dict.get(key).ok().map(|obj| self.resolve(obj))
    }

    /// Object id of the catalog.
    pub fn catalog_id(&self) -> Result<ObjectId> {
        Ok(self.doc.trailer.get(b"Root").and_then(Object::as_reference)?)
    }

    /// The catalog dictionary.
    pub fn catalog(&self) -> Result<&Dictionary> {
        Ok(self.doc.catalog()?)
    }

    /// Object id of the root page tree node.
    pub fn pages_root_id(&self) -> Result<ObjectId> {
        Ok(self.catalog()?.get(b"Pages").and_then(Object::as_reference)?)
    }

    /// Page object ids in document order.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.page_iter().collect()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.doc.page_iter().count()
    }

    /// Object id of the page at 0-based `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        let pages = self.page_ids();
        pages
            .get(index)
            .copied()
            .ok_or(Error::PlacementOutOfBounds {
                page: index,
                page_count: pages.len(),
            })
    }

    /// Look up a page attribute, walking `/Parent` for inheritable keys.
    fn inherited<'a>(&'a self, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        let mut node = page;
        for _ in 0..MAX_TREE_DEPTH {
            if let Some(value) = self.dict_entry(node, key) {
                return Some(value);
            }
            let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
            node = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn box_entry(&self, page: &Dictionary, key: &[u8]) -> Option<Rect> {
        let value = self.inherited(page, key)?;
        let items: Vec<Object> = value
            .as_array()
            .ok()?
            .iter()
            .map(|item| self.resolve(item).clone())
            .collect();
        Rect::from_pdf_array(&items)
    }

    /// Visible area of a page in unrotated user space.
    ///
    /// This is the crop box clipped to the media box, or the media box alone.
    pub fn page_box(&self, page: ObjectId) -> Result<Rect> {
        let dict = self.dict(page)?;
        let media = self.box_entry(dict, b"MediaBox").unwrap_or_else(|| {
            log::warn!("Page {:?} has no MediaBox, assuming US Letter", page);
            DEFAULT_MEDIA_BOX
        });
        let visible = match self.box_entry(dict, b"CropBox") {
            Some(crop) => crop.intersection(&media).unwrap_or(media),
            None => media,
        };
        Ok(visible)
    }

    /// Location of the interactive form dictionary.
    pub fn acroform(&self) -> Result<AcroFormRef> {
        let catalog = self.catalog()?;
        Ok(match catalog.get(b"AcroForm") {
            Ok(Object::Reference(id)) => AcroFormRef::Indirect(*id),
            Ok(Object::Dictionary(_)) => AcroFormRef::Inline,
            _ => AcroFormRef::Absent,
        })
    }

    /// The interactive form dictionary, wherever it lives.
    pub fn acroform_dict(&self) -> Option<&Dictionary> {
        let catalog = self.catalog().ok()?;
        self.dict_entry(catalog, b"AcroForm")?.as_dict().ok()
    }

    /// Every terminal field reachable from `/AcroForm /Fields`.
    pub fn fields(&self) -> Vec<FieldInfo> {
        let mut out = Vec::new();
        let Some(form) = self.acroform_dict() else {
            return out;
        };
        let Some(Object::Array(roots)) = self.dict_entry(form, b"Fields") else {
            return out;
        };
        let mut seen = HashSet::new();
        for root in roots {
            if let Ok(id) = root.as_reference() {
                self.collect_fields(id, None, None, 0, &mut seen, &mut out);
            }
        }
        out
    }

    fn collect_fields(
        &self,
        id: ObjectId,
        parent_name: Option<&str>,
        parent_type: Option<&[u8]>,
        depth: usize,
        seen: &mut HashSet<ObjectId>,
        out: &mut Vec<FieldInfo>,
    ) {
        if depth > MAX_TREE_DEPTH || !seen.insert(id) {
            return;
        }
        let Ok(dict) = self.doc.get_dictionary(id) else {
            return;
        };

        let partial = self
            .dict_entry(dict, b"T")
            .and_then(|t| t.as_str().ok())
            .map(decode_text_string);
        let name = match (parent_name, partial) {
            (Some(parent), Some(own)) => format!("{}.{}", parent, own),
            (Some(parent), None) => parent.to_string(),
            (None, Some(own)) => own,
            (None, None) => String::new(),
        };
        let field_type = self
            .dict_entry(dict, b"FT")
            .and_then(|ft| ft.as_name().ok())
            .or(parent_type);

        // Kids that carry /T are child fields; kids without it are widgets
        let child_fields: Vec<ObjectId> = match self.dict_entry(dict, b"Kids") {
            Some(Object::Array(kids)) => kids
                .iter()
                .filter_map(|k| k.as_reference().ok())
                .filter(|kid| {
                    self.doc
                        .get_dictionary(*kid)
                        .map(|d| d.has(b"T"))
                        .unwrap_or(false)
                })
                .collect(),
            _ => Vec::new(),
        };

        if child_fields.is_empty() {
            out.push(FieldInfo {
                id,
                name,
                field_type: field_type.map(|t| t.to_vec()),
            });
        } else {
            for kid in child_fields {
                self.collect_fields(kid, Some(&name), field_type, depth + 1, seen, out);
            }
        }
    }

    /// Fully qualified names of every existing field.
    pub fn field_names(&self) -> HashSet<String> {
        self.fields().into_iter().map(|f| f.name).collect()
    }

    /// Signature fields that hold a value.
    pub fn signed_fields(&self) -> Vec<(FieldInfo, &Dictionary)> {
        self.fields()
            .into_iter()
            .filter(|f| f.field_type.as_deref() == Some(b"Sig".as_slice()))
            .filter_map(|f| {
                let field = self.doc.get_dictionary(f.id).ok()?;
                let value = self.dict_entry(field, b"V")?.as_dict().ok()?;
                Some((f, value))
            })
            .collect()
    }

    /// Whether the document forbids any further change.
    ///
    /// True when a certification signature or a signed field carries an MDP
    /// transform with `/P 1`, or a signed field's `/Lock` has `/P 1`.
    pub fn is_locked(&self) -> bool {
        if let Some(cert) = self
            .catalog()
            .ok()
            .and_then(|cat| self.dict_entry(cat, b"Perms"))
            .and_then(|perms| perms.as_dict().ok())
            .and_then(|perms| self.dict_entry(perms, b"DocMDP"))
            .and_then(|sig| sig.as_dict().ok())
        {
            if self.reference_forbids_changes(cert) {
                return true;
            }
        }

        self.signed_fields().iter().any(|(field, sig)| {
            let lock_p1 = self
                .doc
                .get_dictionary(field.id)
                .ok()
                .and_then(|d| self.dict_entry(d, b"Lock"))
                .and_then(|lock| lock.as_dict().ok())
                .and_then(|lock| self.dict_entry(lock, b"P"))
                .and_then(|p| p.as_i64().ok())
                == Some(1);
            lock_p1 || self.reference_forbids_changes(sig)
        })
    }

    /// Whether a signature dictionary carries a DocMDP/FieldMDP `/P 1` transform.
    pub fn reference_forbids_changes(&self, sig: &Dictionary) -> bool {
        let Some(Object::Array(refs)) = self.dict_entry(sig, b"Reference") else {
            return false;
        };
        refs.iter()
            .filter_map(|r| self.resolve(r).as_dict().ok())
            .filter(|r| {
                matches!(
                    self.dict_entry(r, b"TransformMethod").and_then(|m| m.as_name().ok()),
                    Some(b"DocMDP") | Some(b"FieldMDP")
                )
            })
            .filter_map(|r| self.dict_entry(r, b"TransformParams"))
            .filter_map(|p| p.as_dict().ok())
            .any(|params| {
                self.dict_entry(params, b"P").and_then(|p| p.as_i64().ok()) == Some(1)
            })
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, or PDFDocEncoding as Latin-1).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}
