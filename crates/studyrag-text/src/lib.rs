//! studyrag-text
//!
//! Tantivy-backed `SearchCapability` over pre-chunked JSONL corpora. See
//! `index` for building an index and `search` for querying it.
pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::{collect_jsonl, read_jsonl, ChunkIndexer, ChunkRecord};
pub use search::ChunkSearchEngine;
