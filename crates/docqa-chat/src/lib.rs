//! docqa-chat
//!
//! Answer synthesis over the hybrid retriever: prompt rendering, the
//! streaming generation provider, and the `Assistant` that owns the index
//! generation of the currently loaded document.

pub mod assistant;
pub mod prompt;
pub mod provider;

pub use assistant::{Answer, AnswerStream, Assistant, IndexGeneration};
pub use prompt::PromptBuilder;
pub use provider::OpenAiCompatible;
