//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `docqa.toml` + `docqa.<env>.toml`
//! + `DOCQA_*` env vars (nested keys separated by `__`, e.g.
//! `DOCQA_CHUNKING__SIZE=256`). Credentials are described by a
//! [`CredentialSource`] and resolved once by the caller.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_TEMPLATE: &str = "\
User: You are an AI Assistant that follows instructions extremely well.
Please be truthful and give direct answers. Please tell 'I don't know' if user query is not in CONTEXT

Keep in mind, you will lose the job, if you answer out of CONTEXT questions

CONTEXT: {context}
Query: {question}

Remember only return AI answer
Assistant:
";

pub const DEFAULT_REFUSAL: &str = "I don't know";

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load from the working directory using `DOCQA_ENV` (default `dev`).
    pub fn load() -> Result<Self, ConfigError> {
        let env_name = env::var("DOCQA_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(dir.join("docqa.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("docqa.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("docqa.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("docqa.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("DOCQA_").split("__"));
        Ok(Self { figment })
    }

    /// Extract and validate the full settings tree.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let settings: Settings = self.figment.extract().map_err(|e| ConfigError::Load(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub extraction: ExtractionSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate()?;
        self.retrieval.validate()?;
        self.extraction.validate()?;
        self.embedding.validate()?;
        self.generation.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk length in characters.
    pub size: usize,
    /// Characters shared by consecutive chunks.
    pub overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { size: 512, overlap: 64 }
    }
}

impl ChunkingSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 || self.overlap >= self.size {
            return Err(ConfigError::InvalidChunking { size: self.size, overlap: self.overlap });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    /// `weight / (c + rank)`, ranks shared by tied scores.
    ReciprocalRank,
    /// Scores rescaled to `[0, 1]` over each retriever's returned set.
    MinMax,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub lexical_k: usize,
    pub semantic_k: usize,
    /// `[lexical, semantic]`.
    pub weights: [f32; 2],
    pub fusion: FusionStrategy,
    pub rrf_c: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { lexical_k: 2, semantic_k: 2, weights: [0.5, 0.5], fusion: FusionStrategy::ReciprocalRank, rrf_c: 60.0, limit: None }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::InvalidWeights(format!("weights must be finite and non-negative, got {:?}", self.weights)));
        }
        if self.weights.iter().sum::<f32>() <= 0.0 {
            return Err(ConfigError::InvalidWeights("at least one weight must be positive".to_string()));
        }
        if self.lexical_k == 0 && self.semantic_k == 0 {
            return Err(ConfigError::Invalid("lexical_k and semantic_k cannot both be 0".to_string()));
        }
        if !self.rrf_c.is_finite() || self.rrf_c <= 0.0 {
            return Err(ConfigError::Invalid(format!("rrf_c must be positive, got {}", self.rrf_c)));
        }
        if self.limit == Some(0) {
            return Err(ConfigError::Invalid("limit must be at least 1 when set".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Horizontal gap (PDF units) above which two runs on a line get a space between them.
    pub x_tolerance: f32,
    /// Baseline distance (PDF units) within which runs share a line.
    pub y_tolerance: f32,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self { x_tolerance: 1.0, y_tolerance: 1.0 }
    }
}

impl ExtractionSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, v) in [("x_tolerance", self.x_tolerance), ("y_tolerance", self.y_tolerance)] {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::Invalid(format!("{name} must be a non-negative number, got {v}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingProvider {
    /// Offline feature hashing; deterministic, no model download.
    #[serde(rename = "hash")]
    Hash,
    /// BGE-M3 loaded from `model_dir` with candle.
    #[serde(rename = "local")]
    Local,
    /// Hugging Face Inference API feature extraction.
    #[serde(rename = "huggingface")]
    HuggingFace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { max_attempts: 3, initial_backoff_ms: 250 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model: String,
    /// Vector size of `hash`; expected response size of `huggingface`
    /// (1024 for UAE-Large-V1). `local` reads it from the model config.
    pub dimension: usize,
    pub batch_size: usize,
    pub max_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    pub credential: CredentialSource,
    pub retry: RetrySettings,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hash,
            model: "WhereIsAI/UAE-Large-V1".to_string(),
            dimension: 384,
            batch_size: 32,
            max_len: 256,
            model_dir: None,
            endpoint: None,
            credential: CredentialSource::env("HF_TOKEN"),
            retry: RetrySettings::default(),
        }
    }
}

impl EmbeddingSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 {
            return Err(ConfigError::Invalid("embedding.dimension must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("embedding.batch_size must be at least 1".to_string()));
        }
        if self.max_len == 0 {
            return Err(ConfigError::Invalid("embedding.max_len must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("embedding.retry.max_attempts must be at least 1".to_string()));
        }
        if self.provider == EmbeddingProvider::Local && self.model_dir.is_none() {
            return Err(ConfigError::Invalid("embedding.model_dir is required for the local provider".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model_id: String,
    pub endpoint: String,
    pub temperature: f32,
    pub credential: CredentialSource,
    pub context_separator: String,
    pub template: String,
    /// Answer used when nothing relevant was retrieved.
    pub refusal: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model_id: "llama3-70b-8192".to_string(),
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            temperature: 0.0,
            credential: CredentialSource::env("GROQ_API_KEY"),
            context_separator: "\n\n".to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            refusal: DEFAULT_REFUSAL.to_string(),
        }
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for placeholder in ["{context}", "{question}"] {
            if !self.template.contains(placeholder) {
                return Err(ConfigError::Invalid(format!("generation.template is missing the {placeholder} placeholder")));
            }
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ConfigError::Invalid(format!("generation.temperature must be non-negative, got {}", self.temperature)));
        }
        Ok(())
    }
}

/// Where a provider credential comes from. An inline value wins over `env`.
///
/// ```toml
/// [generation.credential]
/// env = "GROQ_API_KEY"   # or: inline = "gsk_..."
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
}

impl CredentialSource {
    pub fn env(key: impl Into<String>) -> Self {
        Self { inline: None, env: Some(key.into()) }
    }

    /// Resolve using the process environment for `env` sources.
    pub fn resolve(&self) -> Result<String, ConfigError> {
        self.resolve_with(|key| env::var(key).ok())
    }

    pub fn resolve_with<F>(&self, lookup: F) -> Result<String, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = self.inline.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            return Ok(v.to_string());
        }
        match self.env.as_deref() {
            Some(key) => lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingCredential(format!("environment variable {key} is not set"))),
            None => Err(ConfigError::MissingCredential("no inline value or env variable configured".to_string())),
        }
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSource")
            .field("inline", &self.inline.as_ref().map(|_| "<redacted>"))
            .field("env", &self.env)
            .finish()
    }
}

/// `~` and `${VAR}` expansion for configured paths such as `embedding.model_dir`.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_env = shellexpand::env(raw).unwrap_or(std::borrow::Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_env).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_pipeline() {
        let s = Settings::default();
        assert_eq!((s.chunking.size, s.chunking.overlap), (512, 64));
        assert_eq!((s.retrieval.lexical_k, s.retrieval.semantic_k), (2, 2));
        assert_eq!(s.retrieval.weights, [0.5, 0.5]);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let c = ChunkingSettings { size: 64, overlap: 64 };
        assert!(matches!(c.validate(), Err(ConfigError::InvalidChunking { size: 64, overlap: 64 })));
    }

    #[test]
    fn weights_must_be_usable() {
        let mut r = RetrievalSettings::default();
        r.weights = [0.0, 0.0];
        assert!(matches!(r.validate(), Err(ConfigError::InvalidWeights(_))));
        r.weights = [-1.0, 2.0];
        assert!(matches!(r.validate(), Err(ConfigError::InvalidWeights(_))));
        r.weights = [1.0, 0.0];
        assert!(r.validate().is_ok());
    }

    #[test]
    fn template_needs_both_placeholders() {
        let g = GenerationSettings { template: "CONTEXT: {context}".to_string(), ..GenerationSettings::default() };
        assert!(g.validate().is_err());
    }

    #[test]
    fn credential_resolution_uses_injected_lookup() {
        let env_src = CredentialSource::env("TOKEN");
        assert_eq!(env_src.resolve_with(|k| (k == "TOKEN").then(|| " abc ".to_string())).unwrap(), "abc");
        assert!(matches!(env_src.resolve_with(|_| None), Err(ConfigError::MissingCredential(_))));
        let both = CredentialSource { inline: Some("secret".to_string()), env: Some("TOKEN".to_string()) };
        assert_eq!(both.resolve_with(|_| Some("from-env".to_string())).unwrap(), "secret");
        assert!(!format!("{both:?}").contains("secret"));
        assert!(CredentialSource::default().resolve_with(|_| None).is_err());
    }

    #[test]
    fn plain_paths_pass_through_expansion() {
        assert_eq!(expand_path("/models/bge-m3"), PathBuf::from("/models/bge-m3"));
    }
}
