//! Content-to-document transformation: markup stripping, chunking, and field derivation.

pub mod chunking;
mod document;
pub mod sanitize;

pub use chunking::{DEFAULT_CHUNK_WORD_THRESHOLD, TextChunk, chunk_text};
pub use document::{CONTENT_ID_FIELD, Document, DocumentTransformer, TransformSettings, type_label};
