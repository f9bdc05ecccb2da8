//! docqa-text
//!
//! BM25 lexical retrieval over a document's chunks, backed by an in-RAM
//! tantivy index. See `index::LexicalIndex`.
pub mod tantivy_utils;
pub mod index;

pub use index::LexicalIndex;
