//! studyrag-retrieval
//!
//! Access-controlled, intent-weighted ranking of search hits and the context
//! block rendered from them. `DocumentRetriever` ties both to a
//! `SearchCapability`.
pub mod context;
pub mod retriever;
pub mod scorer;

pub use context::{BuiltContext, ContextBuilder};
pub use retriever::{preview, DocumentRetriever, RetrievalOutcome};
pub use scorer::{priority_boost, RetrievalScorer, DEFAULT_SIMILARITY_THRESHOLD};
