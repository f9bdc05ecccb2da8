use crate::error::{EmbeddingError, GenerationError};
use crate::types::SearchHit;

/// Turns text into fixed-dimension vectors.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut out = self.embed_batch(&[text.to_string()])?;
        match out.len() {
            1 => Ok(out.remove(0)),
            actual => Err(EmbeddingError::Count { expected: 1, actual }),
        }
    }
}

/// A ranked lookup over an immutable chunk set.
pub trait Retriever: Send + Sync {
    fn search(&self, query: &str, k: usize) -> crate::Result<Vec<SearchHit>>;
}

/// Lazy, finite, non-restartable answer fragments. Dropping it cancels generation.
pub type FragmentStream = Box<dyn Iterator<Item = Result<String, GenerationError>> + Send>;

/// Produces an answer for a fully rendered prompt.
pub trait Synthesizer: Send + Sync {
    fn stream(&self, prompt: &str) -> Result<FragmentStream, GenerationError>;

    fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        self.stream(prompt)?.collect()
    }
}
