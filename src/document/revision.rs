//! Append-only revision chain.

use super::view::DocumentView;
use crate::error::Result;

/// One appended incremental update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    bytes: Vec<u8>,
}

impl Revision {
    /// Wrap the finished bytes of an incremental update.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Revision bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the revision is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The original document followed by appended revisions.
///
/// Earlier bytes are never modified; the only mutation is
/// [`append_revision`](Self::append_revision).
#[derive(Debug, Clone)]
pub struct RevisionChain {
    base: Vec<u8>,
    revisions: Vec<Revision>,
    len: usize,
}

impl RevisionChain {
    /// Start a chain from a copy of the input document.
    pub fn new(base: &[u8]) -> Self {
        Self {
            base: base.to_vec(),
            revisions: Vec::new(),
            len: base.len(),
        }
    }

    /// Append a revision to the end of the chain.
    pub fn append_revision(&mut self, revision: Revision) {
        self.len += revision.len();
        self.revisions.push(revision);
    }

    /// Concatenate the base and every revision.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        out.extend_from_slice(&self.base);
        for revision in &self.revisions {
            out.extend_from_slice(revision.bytes());
        }
        out
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the chain holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of appended revisions (the base is not counted).
    pub fn revision_count(&self) -> usize {
        self.revisions.len()
    }

    /// Parse the current state of the chain.
    pub fn view(&self) -> Result<DocumentView> {
        DocumentView::parse(&self.serialize())
    }
}
