use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{Index, TantivyDocument, Term};
use tracing::debug;

use studyrag_core::traits::SearchCapability;
use studyrag_core::types::{ChunkMetadata, RawHit, SearchFilter};

use crate::tantivy_utils::{register_tokenizer, ChunkFields};

/// Lexical search over an indexed chunk corpus.
///
/// BM25 scores are mapped into 0.0–1.0 by dividing by the best score of the
/// query, so the top hit of every non-empty result reports 1.0.
#[derive(Clone)]
pub struct ChunkSearchEngine {
	index: Index,
	fields: ChunkFields,
}

impl ChunkSearchEngine {
	pub fn open(index_dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(index_dir)?;
		register_tokenizer(&index);
		let fields = ChunkFields::from_schema(&index.schema())?;
		Ok(Self { index, fields })
	}

	pub fn search_blocking(&self, query_text: &str, k: usize, filter: &SearchFilter) -> Result<Vec<RawHit>> {
		if k == 0 { return Ok(vec![]); }
		let reader = self.index.reader()?;
		let searcher = reader.searcher();
		let parser = QueryParser::for_index(&self.index, vec![self.fields.text]);
		// user text may contain query syntax; keep whatever parses
		let (text_query, errors) = parser.parse_query_lenient(query_text);
		if !errors.is_empty() { debug!(errors = errors.len(), "lenient query parse dropped terms"); }

		let query: Box<dyn Query> = match &filter.document_type {
			Some(doc_type) => {
				let type_query = TermQuery::new(Term::from_field_text(self.fields.document_type, doc_type), IndexRecordOption::Basic);
				Box::new(BooleanQuery::new(vec![(Occur::Must, Box::new(type_query) as Box<dyn Query>), (Occur::Must, text_query)]))
			}
			None => text_query,
		};

		let top_docs = searcher.search(&query, &TopDocs::with_limit(k))?;
		let best = top_docs.first().map(|(s, _)| *s).unwrap_or(0.0);
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let text = doc.get_first(self.fields.text).and_then(|v| v.as_str()).unwrap_or("").to_string();
			let metadata: ChunkMetadata = match doc.get_first(self.fields.metadata).and_then(|v| v.as_str()) {
				Some(raw) => serde_json::from_str(raw)?,
				None => continue,
			};
			let similarity = if best > 0.0 { (score / best).clamp(0.0, 1.0) } else { 0.0 };
			hits.push(RawHit { text, metadata, similarity });
		}
		Ok(hits)
	}
}

#[async_trait]
impl SearchCapability for ChunkSearchEngine {
	async fn search(&self, query: &str, k: usize, filter: &SearchFilter) -> Result<Vec<RawHit>> {
		let engine = self.clone();
		let query = query.to_string();
		let filter = filter.clone();
		tokio::task::spawn_blocking(move || engine.search_blocking(&query, k, &filter)).await?
	}
}
