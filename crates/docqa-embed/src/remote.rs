use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use docqa_core::traits::Embedder;
use docqa_core::EmbeddingError;

pub const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/pipeline/feature-extraction";

#[derive(Serialize)]
struct FeatureRequest<'a> {
    inputs: &'a [String],
    options: RequestOptions,
}

#[derive(Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

/// Hugging Face Inference API feature extraction.
pub struct HuggingFaceEmbedder {
    client: Client,
    url: String,
    token: String,
    dim: usize,
    id: String,
}

impl HuggingFaceEmbedder {
    /// `endpoint` defaults to the public pipeline URL; the model is appended to it.
    pub fn new(model: &str, endpoint: Option<&str>, token: String, dim: usize) -> Result<Self, EmbeddingError> {
        let base = endpoint.unwrap_or(DEFAULT_ENDPOINT).trim_end_matches('/');
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(EmbeddingError::Transport(format!("endpoint must start with http:// or https://, got {base}")));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;
        Ok(Self { client, url: format!("{base}/{model}"), token, dim, id: format!("huggingface:{model}") })
    }
}

impl Embedder for HuggingFaceEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let response = self.client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&FeatureRequest { inputs: texts, options: RequestOptions { wait_for_model: true } })
            .send()
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingError::Status { status: status.as_u16(), body: response.text().unwrap_or_default() });
        }
        let body: Value = response.json().map_err(|e| EmbeddingError::Decode(e.to_string()))?;
        let vectors = parse_features(&body)?;
        debug!(batch = texts.len(), "remote embedding");
        Ok(vectors)
    }
}

/// Accepts one vector per input (`[[f32]]`) or token-level features
/// (`[[[f32]]]`), which are mean-pooled and L2-normalized.
pub fn parse_features(body: &Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let items = body.as_array().ok_or_else(|| EmbeddingError::Decode(format!("expected a JSON array, got {body}")))?;
    items.iter().map(|item| {
        let rows = item.as_array().ok_or_else(|| EmbeddingError::Decode("expected an array per input".to_string()))?;
        if rows.first().is_some_and(Value::is_array) {
            let tokens = rows.iter().map(numbers).collect::<Result<Vec<_>, _>>()?;
            Ok(mean_l2(&tokens))
        } else {
            numbers(item)
        }
    }).collect()
}

fn numbers(v: &Value) -> Result<Vec<f32>, EmbeddingError> {
    v.as_array()
        .ok_or_else(|| EmbeddingError::Decode("expected an array of numbers".to_string()))?
        .iter()
        .map(|x| x.as_f64().map(|f| f as f32).ok_or_else(|| EmbeddingError::Decode(format!("not a number: {x}"))))
        .collect()
}

fn mean_l2(tokens: &[Vec<f32>]) -> Vec<f32> {
    let dim = tokens.iter().map(Vec::len).max().unwrap_or(0);
    let mut mean = vec![0f32; dim];
    for t in tokens { for (m, x) in mean.iter_mut().zip(t) { *m += x; } }
    let n = tokens.len().max(1) as f32;
    for m in &mut mean { *m /= n; }
    let norm = mean.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-12);
    mean.iter().map(|x| x / norm).collect()
}
