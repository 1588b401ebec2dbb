//! Incremental update writer.
//!
//! An incremental update (PDF spec Section 7.5.6) appends new and replaced
//! objects, a cross-reference section covering only those objects, and a
//! trailer whose `/Prev` points at the previous cross-reference section. The
//! earlier bytes of the file are never touched.
//!
//! ```text
//! <objects>
//! xref
//! 12 3
//! 0000004711 00000 n\r
//! ...
//! trailer
//! << /Size 15 /Root 1 0 R /Prev 4096 >>
//! startxref
//! 5210
//! %%EOF
//! ```

use super::object_serializer::{hex_string, wrap_indirect, ObjectSerializer};
use lopdf::{Dictionary, Object, ObjectId};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Readers locate `%%EOF` by scanning a trailing window of the file; a
/// revision shorter than this is padded so only its own marker is found.
const MIN_REVISION_LEN: usize = 600;

/// Trailer entries carried over from the previous revision.
#[derive(Debug, Clone)]
pub struct TrailerInfo {
    /// `/Root` reference
    pub root: ObjectId,
    /// `/Info` reference, if any
    pub info: Option<ObjectId>,
    /// First element of `/ID`, if the document has one
    pub id: Option<Vec<u8>>,
    /// Offset of the previous cross-reference section
    pub prev_xref: usize,
    /// `/Size` of the previous revision
    pub prev_size: u32,
}

impl TrailerInfo {
    /// Read the carried-over entries from a parsed trailer.
    pub fn from_trailer(trailer: &Dictionary, prev_xref: usize, prev_size: u32) -> Option<Self> {
        let root = trailer.get(b"Root").and_then(Object::as_reference).ok()?;
        let info = trailer.get(b"Info").and_then(Object::as_reference).ok();
        let id = trailer
            .get(b"ID")
            .and_then(Object::as_array)
            .ok()
            .and_then(|ids| ids.first())
            .and_then(|first| first.as_str().ok())
            .map(|bytes| bytes.to_vec());
        Some(Self {
            root,
            info,
            id,
            prev_xref,
            prev_size,
        })
    }
}

/// A serialized revision ready to be appended.
#[derive(Debug, Clone)]
pub struct AssembledRevision {
    /// Revision bytes, to be appended after the previous revision
    pub bytes: Vec<u8>,
    /// Offset of every written object, relative to the start of `bytes`
    pub offsets: BTreeMap<ObjectId, usize>,
    /// Absolute offset of this revision's cross-reference section
    pub xref_offset: usize,
}

/// Collects the objects of one incremental update.
#[derive(Debug)]
pub struct RevisionWriter {
    next_id: u32,
    objects: BTreeMap<ObjectId, Vec<u8>>,
    serializer: ObjectSerializer,
}

impl RevisionWriter {
    /// Start a revision for a document whose highest object number is `max_id`.
    pub fn new(max_id: u32) -> Self {
        Self {
            next_id: max_id + 1,
            objects: BTreeMap::new(),
            serializer: ObjectSerializer::compact(),
        }
    }

    /// Reserve a fresh object id.
    pub fn allocate(&mut self) -> ObjectId {
        let id = (self.next_id, 0);
        self.next_id += 1;
        id
    }

    /// Add a new object and return its id.
    pub fn add_object(&mut self, obj: impl Into<Object>) -> ObjectId {
        let id = self.allocate();
        self.set_object(id, &obj.into());
        id
    }

    /// Write an object under `id`, replacing an older version if it exists.
    pub fn set_object(&mut self, id: ObjectId, obj: &Object) {
        let body = self.serializer.serialize(obj);
        self.objects.insert(id, body);
    }

    /// Write pre-serialized object syntax under `id`.
    pub fn set_raw(&mut self, id: ObjectId, body: Vec<u8>) {
        self.objects.insert(id, body);
    }

    /// Number of objects written so far.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Assemble the revision.
    ///
    /// `previous` is the complete document the revision will be appended to;
    /// it provides the base offset and the file identifier seed.
    pub fn finish(self, previous: &[u8], trailer: &TrailerInfo) -> AssembledRevision {
        let base = previous.len();
        let mut buf = Vec::new();
        if !matches!(previous.last(), Some(b'\n') | Some(b'\r')) {
            buf.push(b'\n');
        }

        let mut offsets = BTreeMap::new();
        for (id, body) in &self.objects {
            offsets.insert(*id, buf.len());
            buf.extend_from_slice(&wrap_indirect(*id, body));
        }

        if buf.len() < MIN_REVISION_LEN {
            buf.push(b'%');
            buf.resize(MIN_REVISION_LEN, b' ');
            buf.push(b'\n');
        }

        let xref_offset = base + buf.len();
        buf.extend_from_slice(b"xref\n");
        for run in contiguous_runs(&offsets) {
            buf.extend_from_slice(format!("{} {}\n", run[0].0 .0, run.len()).as_bytes());
            for (id, offset) in run {
                buf.extend_from_slice(format!("{:010} {:05} n\r\n", base + offset, id.1).as_bytes());
            }
        }

        let size = self.next_id.max(trailer.prev_size);
        let mut trailer_dict = Dictionary::new();
        trailer_dict.set("Size", Object::Integer(size as i64));
        trailer_dict.set("Root", Object::Reference(trailer.root));
        if let Some(info) = trailer.info {
            trailer_dict.set("Info", Object::Reference(info));
        }
        trailer_dict.set("Prev", Object::Integer(trailer.prev_xref as i64));
        let trailer_body = self.serializer.serialize(&Object::Dictionary(trailer_dict));

        // /ID is written by hand so both halves stay hex strings
        let first_id = trailer
            .id
            .clone()
            .unwrap_or_else(|| Sha256::digest(previous)[..16].to_vec());
        let mut hasher = Sha256::new();
        hasher.update(&first_id);
        hasher.update(xref_offset.to_le_bytes());
        hasher.update(&buf);
        let digest = hasher.finalize();
        let second_id = &digest[..16];

        buf.extend_from_slice(b"trailer\n");
        // trailer_body ends in ">>"; splice /ID in front of it
        let split = trailer_body.len().saturating_sub(2);
        buf.extend_from_slice(&trailer_body[..split]);
        buf.extend_from_slice(
            format!("/ID [{} {}] >>", hex_string(&first_id), hex_string(second_id)).as_bytes(),
        );
        buf.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());

        log::debug!(
            "Assembled revision: {} objects, {} bytes, xref at {}",
            offsets.len(),
            buf.len(),
            xref_offset
        );

        AssembledRevision {
            bytes: buf,
            offsets,
            xref_offset,
        }
    }
}

fn contiguous_runs(offsets: &BTreeMap<ObjectId, usize>) -> Vec<Vec<(ObjectId, usize)>> {
    let mut runs: Vec<Vec<(ObjectId, usize)>> = Vec::new();
    for (id, offset) in offsets {
        match runs.last_mut() {
            Some(run) if run.last().map(|(last, _)| last.0 + 1) == Some(id.0) => {
                run.push((*id, *offset));
            },
            _ => runs.push(vec![(*id, *offset)]),
        }
    }
    runs
}
