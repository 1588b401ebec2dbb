//! PDF writing primitives.
//!
//! Everything the engine appends to a document goes through this module:
//! - [`ObjectSerializer`] turns `lopdf` objects into PDF syntax;
//! - [`ContentStreamBuilder`] builds stamp and page content;
//! - [`font_manager`] provides metrics and font resources;
//! - [`RevisionWriter`] assembles one incremental update.

pub mod content_stream;
pub mod font_manager;
pub mod incremental;
pub mod object_serializer;

pub use content_stream::{flate_encode, ContentStreamBuilder, ContentStreamOp};
pub use font_manager::{EmbeddedFont, FontRegistry, StampFont, StandardFont};
pub use incremental::{AssembledRevision, RevisionWriter, TrailerInfo};
pub use object_serializer::ObjectSerializer;
