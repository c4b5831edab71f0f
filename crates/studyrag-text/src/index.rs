use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tantivy::{doc, Index};
use tracing::info;

use studyrag_core::types::ChunkMetadata;

use crate::tantivy_utils::{build_schema, register_tokenizer, ChunkFields};

/// One pre-chunked unit of a document, as stored in the JSONL corpus files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
	pub id: String,
	pub text: String,
	pub metadata: ChunkMetadata,
}

pub struct ChunkIndexer {
	index: Index,
	fields: ChunkFields,
}

impl ChunkIndexer {
	/// Creates a fresh index, replacing anything already at `index_dir`.
	pub fn create(index_dir: &Path) -> Result<Self> {
		let schema = build_schema();
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, schema.clone())?;
		register_tokenizer(&index);
		let fields = ChunkFields::from_schema(&schema)?;
		Ok(Self { index, fields })
	}

	pub fn index_records(&self, records: &[ChunkRecord]) -> Result<usize> {
		let mut writer = self.index.writer(50_000_000)?;
		for r in records {
			let metadata = serde_json::to_string(&r.metadata)?;
			writer.add_document(doc!(
				self.fields.id => r.id.clone(),
				self.fields.text => r.text.clone(),
				self.fields.document_type => r.metadata.document_type.clone(),
				self.fields.metadata => metadata,
			))?;
		}
		writer.commit()?;
		info!(count = records.len(), "indexed chunk records");
		Ok(records.len())
	}
}

pub fn read_jsonl(path: &Path) -> Result<Vec<ChunkRecord>> {
	let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
	content
		.lines()
		.enumerate()
		.filter(|(_, line)| !line.trim().is_empty())
		.map(|(n, line)| serde_json::from_str(line).with_context(|| format!("{}:{}: invalid chunk record", path.display(), n + 1)))
		.collect()
}

/// A single `.jsonl` file, or every `.jsonl` under a directory (sorted by path).
pub fn collect_jsonl(root: &Path) -> Result<Vec<ChunkRecord>> {
	if root.is_file() { return read_jsonl(root); }
	let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
		.into_iter()
		.filter_map(|e| e.ok())
		.filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "jsonl"))
		.map(|e| e.path().to_path_buf())
		.collect();
	files.sort();
	let mut records = Vec::new();
	for f in &files { records.extend(read_jsonl(f)?); }
	Ok(records)
}
