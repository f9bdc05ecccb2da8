//! docqa-core
//!
//! Domain types, configuration, error taxonomy and the pure text stages
//! (normalization and chunking) shared by every other docqa crate.

pub mod chunker;
pub mod config;
pub mod error;
pub mod normalize;
pub mod retry;
pub mod session;
pub mod traits;
pub mod types;

pub use chunker::Chunker;
pub use config::{Config, Settings};
pub use error::{ConfigError, EmbeddingError, Error, ExtractionError, GenerationError, Result};
pub use session::{Conversation, Role, Turn};
pub use types::{Chunk, Document, DocumentId, PageText, RetrievalResult, ScoredChunk, SearchHit, SourceKind};
