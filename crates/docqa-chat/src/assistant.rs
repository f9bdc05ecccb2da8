use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use docqa_core::config::Settings;
use docqa_core::normalize::normalize;
use docqa_core::retry::RetryPolicy;
use docqa_core::traits::{Embedder, FragmentStream, Synthesizer};
use docqa_core::types::{Chunk, Document, RetrievalResult};
use docqa_core::{Chunker, Conversation, Error, ExtractionError, GenerationError, Result};
use docqa_hybrid::HybridRetriever;
use docqa_pdf::PdfExtractor;
use docqa_text::LexicalIndex;
use docqa_vector::SemanticIndex;

use crate::prompt::PromptBuilder;

/// Everything built from one PDF. Immutable; replaced as a whole.
pub struct IndexGeneration {
    pub document: Document,
    pub chunks: Arc<[Chunk]>,
    pub retriever: HybridRetriever<LexicalIndex, SemanticIndex>,
}

impl std::fmt::Debug for IndexGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexGeneration")
            .field("document", &self.document)
            .field("chunks", &self.chunks.len())
            .finish_non_exhaustive()
    }
}

impl IndexGeneration {
    pub fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        let hits = self.retriever.retrieve(question)?;
        Ok(RetrievalResult::from_hits(&hits, &self.chunks))
    }
}

/// A completed answer and the passages it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub passages: RetrievalResult,
}

/// Loads documents and answers questions about the current one.
pub struct Assistant {
    settings: Settings,
    extractor: PdfExtractor,
    chunker: Chunker,
    prompt: PromptBuilder,
    embedder: Arc<dyn Embedder>,
    synthesizer: Arc<dyn Synthesizer>,
    current: RwLock<Option<Arc<IndexGeneration>>>,
}

impl Assistant {
    pub fn new(settings: Settings, embedder: Arc<dyn Embedder>, synthesizer: Arc<dyn Synthesizer>) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            extractor: PdfExtractor::new(&settings.extraction),
            chunker: Chunker::from_settings(&settings.chunking)?,
            prompt: PromptBuilder::new(&settings.generation),
            settings,
            embedder,
            synthesizer,
            current: RwLock::new(None),
        })
    }

    /// The active generation, if a document has been loaded.
    pub fn generation(&self) -> Option<Arc<IndexGeneration>> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn load_pdf(&self, path: impl AsRef<Path>) -> Result<Arc<IndexGeneration>> {
        let document = self.extractor.extract_path(path)?;
        self.load_document(document)
    }

    pub fn load_bytes(&self, bytes: &[u8], source: &str) -> Result<Arc<IndexGeneration>> {
        let document = self.extractor.extract_bytes(bytes, source)?;
        self.load_document(document)
    }

    /// Normalize, chunk and index `document`, then make it the active one.
    /// On any failure the previous generation stays active.
    pub fn load_document(&self, document: Document) -> Result<Arc<IndexGeneration>> {
        let text = normalize(&document.raw_text());
        if text.is_empty() {
            warn!(source = %document.source, "document has no meaningful text");
            return Err(ExtractionError::NoText(document.source.clone()).into());
        }
        let chunks: Arc<[Chunk]> = self.chunker.split(&text, &document.id).into();
        info!(source = %document.source, pages = document.pages.len(), chars = text.chars().count(), chunks = chunks.len(), "document chunked");

        let embedding = &self.settings.embedding;
        let retriever = HybridRetriever::build(
            || LexicalIndex::build(&chunks),
            || Ok(SemanticIndex::build(&chunks, self.embedder.clone(), embedding.batch_size, RetryPolicy::from_settings(&embedding.retry))?),
            self.settings.retrieval.clone(),
        )?;

        let generation = Arc::new(IndexGeneration { document, chunks, retriever });
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(generation.clone());
        info!(id = generation.document.id.short(), "index generation swapped in");
        Ok(generation)
    }

    /// Ranked passages for `question` from the active generation.
    pub fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        self.generation().ok_or(Error::NoDocument)?.retrieve(question)
    }

    /// Passages for `question` and the prompt grounded on them; no prompt
    /// when nothing relevant was retrieved.
    fn ground(&self, question: &str) -> Result<(RetrievalResult, Option<String>)> {
        let passages = self.retrieve(question)?;
        debug!(passages = passages.len(), top = ?passages.top_score(), "retrieved");
        if passages.is_empty() {
            info!("nothing relevant retrieved, refusing");
            return Ok((passages, None));
        }
        let prompt = self.prompt.build(question, &passages);
        Ok((passages, Some(prompt)))
    }

    /// Answer `question` and record the exchange in `conversation` once complete.
    pub fn ask(&self, question: &str, conversation: &mut Conversation) -> Result<Answer> {
        let (passages, prompt) = self.ground(question)?;
        let text = match prompt {
            Some(prompt) => self.synthesizer.complete(&prompt)?,
            None => self.settings.generation.refusal.clone(),
        };
        conversation.record_exchange(question, text.clone());
        Ok(Answer { text, passages })
    }

    /// Stream the answer to `question`. Turns are appended to `conversation`
    /// only when the stream runs to completion; an error or dropping the
    /// stream early leaves it untouched.
    pub fn ask_stream<'c>(&self, question: &str, conversation: &'c mut Conversation) -> Result<AnswerStream<'c>> {
        let (passages, prompt) = self.ground(question)?;
        let fragments: FragmentStream = match prompt {
            Some(prompt) => self.synthesizer.stream(&prompt)?,
            None => Box::new(std::iter::once(Ok(self.settings.generation.refusal.clone()))),
        };
        Ok(AnswerStream { fragments, passages, question: question.to_string(), answer: String::new(), conversation, state: StreamState::Open })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState { Open, Completed, Failed }

/// Answer fragments for one question. Finite and not restartable.
pub struct AnswerStream<'c> {
    fragments: FragmentStream,
    passages: RetrievalResult,
    question: String,
    answer: String,
    conversation: &'c mut Conversation,
    state: StreamState,
}

impl AnswerStream<'_> {
    pub fn passages(&self) -> &RetrievalResult { &self.passages }

    /// Text received so far.
    pub fn partial(&self) -> &str { &self.answer }
}

impl Iterator for AnswerStream<'_> {
    type Item = std::result::Result<String, GenerationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != StreamState::Open { return None; }
        match self.fragments.next() {
            Some(Ok(fragment)) => {
                self.answer.push_str(&fragment);
                Some(Ok(fragment))
            }
            Some(Err(e)) => {
                self.state = StreamState::Failed;
                warn!(error = %e, "answer stream failed");
                Some(Err(e))
            }
            None => {
                self.state = StreamState::Completed;
                self.conversation.record_exchange(self.question.clone(), self.answer.clone());
                None
            }
        }
    }
}
