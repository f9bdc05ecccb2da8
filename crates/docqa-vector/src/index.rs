use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, info};

use docqa_core::retry::RetryPolicy;
use docqa_core::traits::{Embedder, Retriever};
use docqa_core::types::{Chunk, SearchHit, SourceKind};
use docqa_core::{EmbeddingError, Result};

use crate::similarity::cosine_similarity;

/// Immutable `chunk index → embedding` table searched exhaustively.
pub struct SemanticIndex {
    embedder: Arc<dyn Embedder>,
    vectors: Vec<Vec<f32>>,
    retry: RetryPolicy,
}

impl SemanticIndex {
    /// Embed every chunk in batches of `batch_size`. Any failed batch fails
    /// the build; build-time calls are not retried.
    pub fn build(chunks: &[Chunk], embedder: Arc<dyn Embedder>, batch_size: usize, retry: RetryPolicy) -> std::result::Result<Self, EmbeddingError> {
        let dim = embedder.dim();
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = embedder.embed_batch(&texts)?;
            if embeddings.len() != texts.len() {
                return Err(EmbeddingError::Count { expected: texts.len(), actual: embeddings.len() });
            }
            for e in &embeddings {
                if e.len() != dim { return Err(EmbeddingError::Dimension { expected: dim, actual: e.len() }); }
            }
            vectors.extend(embeddings);
            debug!(embedded = vectors.len(), total = chunks.len(), "embedding batch");
        }
        info!(chunks = vectors.len(), embedder = embedder.id(), "semantic index built");
        Ok(Self { embedder, vectors, retry })
    }

    pub fn len(&self) -> usize { self.vectors.len() }

    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }

    /// Rank all chunks against an already embedded query.
    pub fn search_vec(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self.vectors.iter().enumerate()
            .map(|(chunk, v)| SearchHit { chunk, score: cosine_similarity(query, v), source: SourceKind::Vector })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then(a.chunk.cmp(&b.chunk)));
        hits.truncate(k);
        hits
    }
}

impl Retriever for SemanticIndex {
    /// Top `k` chunks by cosine similarity to the embedded query; ties by chunk order.
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 || self.is_empty() { return Ok(Vec::new()); }
        let q = self.retry.run("query embedding", || self.embedder.embed_query(query), EmbeddingError::is_transient)?;
        if q.len() != self.embedder.dim() {
            return Err(EmbeddingError::Dimension { expected: self.embedder.dim(), actual: q.len() }.into());
        }
        let hits = self.search_vec(&q, k);
        debug!(hits = hits.len(), k, "semantic search");
        Ok(hits)
    }
}
