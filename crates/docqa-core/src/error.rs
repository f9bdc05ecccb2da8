use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a readable PDF: {0}")]
    Parse(String),

    #[error("PDF is encrypted and cannot be read without a password")]
    Encrypted,

    #[error("No extractable text in {0}")]
    NoText(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("Invalid fusion weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    Transport(String),

    #[error("Embedding provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode embedding response: {0}")]
    Decode(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Embedder returned {actual} vectors for {expected} inputs")]
    Count { expected: usize, actual: usize },

    #[error("Embedding model error: {0}")]
    Model(String),
}

impl EmbeddingError {
    /// Network failures, rate limits and server errors may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Transport(String),

    #[error("Generation provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode generation event: {0}")]
    Decode(String),

    #[error("Generation stream interrupted: {0}")]
    Stream(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Index operation failed: {0}")]
    Index(String),

    #[error("No document loaded")]
    NoDocument,
}

pub type Result<T> = std::result::Result<T, Error>;
