//! docqa-vector
//!
//! Flat in-memory semantic index: one embedding per chunk, exhaustive
//! cosine-similarity search.

pub mod index;
pub mod similarity;

pub use index::SemanticIndex;
pub use similarity::cosine_similarity;
