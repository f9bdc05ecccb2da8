use std::cmp::Ordering;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{doc, Index, IndexReader, ReloadPolicy, TantivyDocument, TantivyError, Term};
use tracing::{debug, info};

use docqa_core::traits::Retriever;
use docqa_core::types::{Chunk, SearchHit, SourceKind};
use docqa_core::{Error, Result};

use crate::tantivy_utils::{build_schema, register_tokenizer, terms, CHUNK_FIELD, TEXT_FIELD};

const WRITER_HEAP: usize = 50_000_000;

fn index_err(e: TantivyError) -> Error { Error::Index(e.to_string()) }

/// Immutable BM25 index over one chunk sequence.
pub struct LexicalIndex {
	reader: IndexReader,
	chunk_field: Field,
	text_field: Field,
	len: usize,
}

impl LexicalIndex {
	/// Index every chunk in order with a single writer thread, so document order is chunk order.
	pub fn build(chunks: &[Chunk]) -> Result<Self> {
		let schema = build_schema();
		let chunk_field = schema.get_field(CHUNK_FIELD).map_err(index_err)?;
		let text_field = schema.get_field(TEXT_FIELD).map_err(index_err)?;
		let index = Index::create_in_ram(schema);
		register_tokenizer(&index);

		let mut writer = index.writer_with_num_threads::<TantivyDocument>(1, WRITER_HEAP).map_err(index_err)?;
		for c in chunks {
			writer.add_document(doc!(chunk_field => c.index as u64, text_field => c.content.as_str())).map_err(index_err)?;
		}
		writer.commit().map_err(index_err)?;

		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().map_err(index_err)?;
		info!(chunks = chunks.len(), "lexical index built");
		Ok(Self { reader, chunk_field, text_field, len: chunks.len() })
	}

	pub fn len(&self) -> usize { self.len }

	pub fn is_empty(&self) -> bool { self.len == 0 }

	fn query(&self, text: &str) -> Option<BooleanQuery> {
		let clauses: Vec<(Occur, Box<dyn Query>)> = terms(text)
			.into_iter()
			.map(|t| (Occur::Should, Box::new(TermQuery::new(Term::from_field_text(self.text_field, &t), IndexRecordOption::WithFreqs)) as Box<dyn Query>))
			.collect();
		if clauses.is_empty() { None } else { Some(BooleanQuery::new(clauses)) }
	}
}

impl Retriever for LexicalIndex {
	/// Top `k` chunks by BM25; equal scores are ordered by chunk index.
	/// Chunks sharing no term with the query are not returned.
	fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		if k == 0 || self.is_empty() { return Ok(Vec::new()); }
		let Some(q) = self.query(query) else {
			debug!("query has no indexable terms");
			return Ok(Vec::new());
		};

		let searcher = self.reader.searcher();
		// Collect every match so ties at the cut-off are resolved by chunk order, not segment order.
		let top_docs = searcher.search(&q, &TopDocs::with_limit(self.len)).map_err(index_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr).map_err(index_err)?;
			let chunk = doc.get_first(self.chunk_field).and_then(|v| v.as_u64())
				.ok_or_else(|| Error::Index(format!("document {addr:?} has no chunk field")))?;
			hits.push(SearchHit { chunk: chunk as usize, score, source: SourceKind::Text });
		}
		hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then(a.chunk.cmp(&b.chunk)));
		hits.truncate(k);
		debug!(hits = hits.len(), k, "lexical search");
		Ok(hits)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use docqa_core::DocumentId;

	fn chunks(texts: &[&str]) -> Vec<Chunk> {
		let doc = DocumentId::from_bytes(b"t");
		texts.iter().enumerate().map(|(i, t)| Chunk { index: i, content: t.to_string(), start: 0, end: t.len(), document: doc.clone() }).collect()
	}

	#[test]
	fn empty_index_and_zero_k_return_nothing() {
		let empty = LexicalIndex::build(&[]).unwrap();
		assert!(empty.search("anything", 5).unwrap().is_empty());
		let idx = LexicalIndex::build(&chunks(&["cats purr"])).unwrap();
		assert!(idx.search("cats", 0).unwrap().is_empty());
	}

	#[test]
	fn punctuation_only_query_is_not_an_error() {
		let idx = LexicalIndex::build(&chunks(&["cats purr"])).unwrap();
		assert!(idx.search("\"(*:?", 3).unwrap().is_empty());
		assert!(idx.search("the of and", 3).unwrap().is_empty());
	}
}
