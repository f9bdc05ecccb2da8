//! docqa-embed
//!
//! Embedding providers behind `docqa_core::traits::Embedder`:
//! - `HashEmbedder`: offline feature hashing, used by tests and as the default
//! - `LocalEmbedder`: BGE-M3 via candle from a local model directory
//! - `HuggingFaceEmbedder`: Hugging Face Inference API

pub mod device;
pub mod hash;
pub mod local;
pub mod pool;
pub mod remote;
pub mod tokenize;

use std::sync::Arc;

use tracing::info;

use docqa_core::config::{expand_path, EmbeddingProvider, EmbeddingSettings};
use docqa_core::traits::Embedder;
use docqa_core::{ConfigError, Result};

pub use hash::HashEmbedder;
pub use local::LocalEmbedder;
pub use pool::masked_mean_l2;
pub use remote::HuggingFaceEmbedder;

/// Construct the configured provider. `credential` is the already resolved
/// secret; only the `huggingface` provider needs one.
pub fn build_embedder(settings: &EmbeddingSettings, credential: Option<String>) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::Hash => Arc::new(HashEmbedder::new(settings.dimension)),
        EmbeddingProvider::Local => {
            let dir = settings.model_dir.as_deref().ok_or_else(|| ConfigError::Invalid("embedding.model_dir is required for the local provider".to_string()))?;
            Arc::new(LocalEmbedder::load(&expand_path(dir), settings.max_len)?)
        }
        EmbeddingProvider::HuggingFace => {
            let token = credential.ok_or_else(|| ConfigError::MissingCredential("embedding.credential".to_string()))?;
            Arc::new(HuggingFaceEmbedder::new(&settings.model, settings.endpoint.as_deref(), token, settings.dimension)?)
        }
    };
    info!(embedder = embedder.id(), dim = embedder.dim(), "embedder ready");
    Ok(embedder)
}

/// Whether `build_embedder` needs a credential for these settings.
pub fn needs_credential(settings: &EmbeddingSettings) -> bool {
    settings.provider == EmbeddingProvider::HuggingFace
}
