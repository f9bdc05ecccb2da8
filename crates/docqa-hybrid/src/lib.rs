//! docqa-hybrid
//!
//! Combines a lexical and a semantic retriever into one ranked list.

pub mod fusion;

use std::panic;
use std::thread;

use tracing::debug;

use docqa_core::config::RetrievalSettings;
use docqa_core::traits::Retriever;
use docqa_core::types::SearchHit;
use docqa_core::Result;

pub use fusion::{fuse, RRF_C};

pub struct HybridRetriever<L, S> where L: Retriever, S: Retriever {
    lexical: L,
    semantic: S,
    settings: RetrievalSettings,
}

impl<L, S> HybridRetriever<L, S> where L: Retriever, S: Retriever {
    pub fn new(lexical: L, semantic: S, settings: RetrievalSettings) -> Self { Self { lexical, semantic, settings } }

    /// Run both builders concurrently; the retriever exists only if both succeed.
    pub fn build<FL, FS>(build_lexical: FL, build_semantic: FS, settings: RetrievalSettings) -> Result<Self>
    where
        L: Send,
        S: Send,
        FL: FnOnce() -> Result<L> + Send,
        FS: FnOnce() -> Result<S> + Send,
    {
        let (lexical, semantic) = thread::scope(|s| {
            let semantic = s.spawn(build_semantic);
            let lexical = build_lexical();
            (lexical, semantic.join().unwrap_or_else(|e| panic::resume_unwind(e)))
        });
        Ok(Self::new(lexical?, semantic?, settings))
    }

    /// Query both retrievers in parallel and fuse their top-K lists, truncated to `limit` if set.
    pub fn retrieve(&self, query: &str) -> Result<Vec<SearchHit>> {
        let (lk, sk) = (self.settings.lexical_k, self.settings.semantic_k);
        let (lexical, semantic) = thread::scope(|s| {
            let semantic = s.spawn(|| self.semantic.search(query, sk));
            let lexical = self.lexical.search(query, lk);
            (lexical, semantic.join().unwrap_or_else(|e| panic::resume_unwind(e)))
        });
        let (lexical, semantic) = (lexical?, semantic?);
        let [wl, ws] = self.settings.weights;
        let mut fused = fuse(&[(lexical.as_slice(), wl), (semantic.as_slice(), ws)], self.settings.fusion, self.settings.rrf_c);
        if let Some(limit) = self.settings.limit { fused.truncate(limit); }
        debug!(lexical = lexical.len(), semantic = semantic.len(), fused = fused.len(), "hybrid retrieval");
        Ok(fused)
    }
}

impl<L, S> Retriever for HybridRetriever<L, S> where L: Retriever, S: Retriever {
    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let mut hits = self.retrieve(query)?;
        hits.truncate(k);
        Ok(hits)
    }
}
