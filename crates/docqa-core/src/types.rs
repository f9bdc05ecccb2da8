//! Domain types passed between the extraction, indexing and answering stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable document identity: hex BLAKE3 digest of the source bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, enough to tell documents apart in logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text of one PDF page; `number` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// An extracted document. Pages that produced no text are not present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub source: String,
    pub pages: Vec<PageText>,
}

impl Document {
    /// Page texts joined by a newline, in page order.
    pub fn raw_text(&self) -> String {
        self.pages.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(|p| p.text.is_empty())
    }
}

/// A slice of a document's normalized text that is independently indexed.
///
/// - `index`: position in the chunk sequence (also the chunk's identity inside an index)
/// - `start`/`end`: byte offsets into the normalized text
/// - `document`: the owning document, by id only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub content: String,
    pub start: usize,
    pub end: usize,
    pub document: DocumentId,
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Vector,
    Hybrid,
}

/// The minimal surface returned by all retrievers.
///
/// `chunk` matches `Chunk::index`. `score` is engine-specific but
/// higher is always better. `source` labels the origin engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: usize,
    pub score: f32,
    pub source: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Ranked passages for one query, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub passages: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Resolve hits against the chunk table they were produced from.
    /// Hits pointing outside the table are dropped.
    pub fn from_hits(hits: &[SearchHit], chunks: &[Chunk]) -> Self {
        let passages = hits
            .iter()
            .filter_map(|h| chunks.get(h.chunk).map(|c| ScoredChunk { chunk: c.clone(), score: h.score }))
            .collect();
        Self { passages }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn top_score(&self) -> Option<f32> {
        self.passages.first().map(|p| p.score)
    }

    /// Passage contents in ranked order joined by `separator`.
    pub fn context(&self, separator: &str) -> String {
        self.passages.iter().map(|p| p.chunk.content.as_str()).collect::<Vec<_>>().join(separator)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredChunk> {
        self.passages.iter()
    }
}
