//! Read and append access to the document being signed.
//!
//! [`RevisionChain`] owns the bytes: the untouched input plus every revision
//! appended so far. [`DocumentView`] is a parsed, read-only snapshot of the
//! chain used to look up pages, fields and trailer entries when the next
//! revision is prepared.

mod revision;
mod view;

pub use revision::{Revision, RevisionChain};
pub use view::{decode_text_string, AcroFormRef, DocumentView, FieldInfo};
