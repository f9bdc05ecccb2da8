use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use docqa_core::retry::RetryPolicy;
use docqa_core::traits::{Embedder, Retriever};
use docqa_core::{Chunk, DocumentId, EmbeddingError, Error, SourceKind};
use docqa_embed::HashEmbedder;
use docqa_vector::SemanticIndex;

fn chunks(texts: &[&str]) -> Vec<Chunk> {
    let doc = DocumentId::from_bytes(b"semantic");
    texts.iter().enumerate().map(|(i, t)| Chunk { index: i, content: t.to_string(), start: 0, end: t.len(), document: doc.clone() }).collect()
}

const PETS: &[&str] = &[
    "Cats are small carnivorous mammals that purr.",
    "Dogs are loyal companions that bark.",
    "Fish live in water and breathe through gills.",
];

fn quick_retry() -> RetryPolicy { RetryPolicy { max_attempts: 3, initial_backoff: Duration::from_millis(1) } }

/// Wraps the hash embedder, recording batch sizes and failing scripted calls.
struct Scripted {
    inner: HashEmbedder,
    batches: Mutex<Vec<usize>>,
    failures: Mutex<Vec<EmbeddingError>>,
    calls: AtomicUsize,
    dim_override: Option<usize>,
}

impl Scripted {
    fn new(failures: Vec<EmbeddingError>) -> Self {
        Self { inner: HashEmbedder::new(256), batches: Mutex::new(Vec::new()), failures: Mutex::new(failures), calls: AtomicUsize::new(0), dim_override: None }
    }
}

impl Embedder for Scripted {
    fn id(&self) -> &str { "scripted" }
    fn dim(&self) -> usize { self.dim_override.unwrap_or(self.inner.dim()) }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(texts.len());
        if let Some(e) = self.failures.lock().unwrap().pop() { return Err(e); }
        self.inner.embed_batch(texts)
    }
}

#[test]
fn nearest_chunk_by_cosine() {
    let idx = SemanticIndex::build(&chunks(PETS), Arc::new(HashEmbedder::new(256)), 32, RetryPolicy::NONE).unwrap();
    let hits = idx.search("Do cats purr?", 2).unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].chunk, 0);
    assert_eq!(hits[0].source, SourceKind::Vector);
    assert!(hits[0].score > hits[1].score);
    assert!(idx.search("cats", 0).unwrap().is_empty());
}

#[test]
fn chunks_are_embedded_in_batches() {
    let embedder = Arc::new(Scripted::new(vec![]));
    let texts: Vec<String> = (0..7).map(|i| format!("chunk number {i}")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let idx = SemanticIndex::build(&chunks(&refs), embedder.clone(), 3, RetryPolicy::NONE).unwrap();
    assert_eq!(idx.len(), 7);
    assert_eq!(*embedder.batches.lock().unwrap(), vec![3, 3, 1]);
}

#[test]
fn failed_batch_fails_the_build_without_retry() {
    let embedder = Arc::new(Scripted::new(vec![EmbeddingError::Status { status: 503, body: "busy".into() }]));
    let err = SemanticIndex::build(&chunks(PETS), embedder.clone(), 32, quick_retry()).err().expect("build fails");
    assert!(matches!(err, EmbeddingError::Status { status: 503, .. }));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn wrong_dimension_is_rejected() {
    let mut scripted = Scripted::new(vec![]);
    scripted.dim_override = Some(32);
    let err = SemanticIndex::build(&chunks(PETS), Arc::new(scripted), 32, RetryPolicy::NONE).err().expect("dimension");
    assert!(matches!(err, EmbeddingError::Dimension { expected: 32, actual: 256 }));
}

#[test]
fn transient_query_failures_are_retried() {
    let embedder = Arc::new(Scripted::new(vec![]));
    let idx = SemanticIndex::build(&chunks(PETS), embedder.clone(), 32, quick_retry()).unwrap();
    embedder.failures.lock().unwrap().extend([
        EmbeddingError::Transport("reset".into()),
        EmbeddingError::Status { status: 429, body: "slow down".into() },
    ]);
    let before = embedder.calls.load(Ordering::SeqCst);
    let hits = idx.search("fish gills", 1).unwrap();
    assert_eq!(hits[0].chunk, 2);
    assert_eq!(embedder.calls.load(Ordering::SeqCst) - before, 3);
}

#[test]
fn permanent_query_failures_surface_immediately() {
    let embedder = Arc::new(Scripted::new(vec![]));
    let idx = SemanticIndex::build(&chunks(PETS), embedder.clone(), 32, quick_retry()).unwrap();
    embedder.failures.lock().unwrap().push(EmbeddingError::Status { status: 401, body: "bad token".into() });
    let before = embedder.calls.load(Ordering::SeqCst);
    let err = idx.search("fish", 1).unwrap_err();
    assert!(matches!(err, Error::Embedding(EmbeddingError::Status { status: 401, .. })));
    assert_eq!(embedder.calls.load(Ordering::SeqCst) - before, 1);
}

#[test]
fn empty_index_returns_nothing() {
    let idx = SemanticIndex::build(&[], Arc::new(HashEmbedder::new(8)), 32, RetryPolicy::NONE).unwrap();
    assert!(idx.is_empty());
    assert!(idx.search("anything", 3).unwrap().is_empty());
}
