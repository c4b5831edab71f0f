use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use studyrag_core::config::RetrievalProfiles;
use studyrag_core::error::Error;
use studyrag_core::traits::SearchCapability;
use studyrag_core::types::{ChunkMetadata, Intent, RawHit, SearchFilter};
use studyrag_retrieval::{DocumentRetriever, RetrievalScorer, DEFAULT_SIMILARITY_THRESHOLD};

#[derive(Default)]
struct FakeSearch {
    hits: Vec<RawHit>,
    calls: Mutex<Vec<(String, usize, SearchFilter)>>,
}

#[async_trait]
impl SearchCapability for FakeSearch {
    async fn search(&self, query: &str, k: usize, filter: &SearchFilter) -> anyhow::Result<Vec<RawHit>> {
        self.calls.lock().unwrap().push((query.to_string(), k, filter.clone()));
        Ok(self
            .hits
            .iter()
            .filter(|h| filter.document_type.as_deref().map_or(true, |t| t == h.metadata.document_type))
            .take(k)
            .cloned()
            .collect())
    }
}

struct DownSearch;

#[async_trait]
impl SearchCapability for DownSearch {
    async fn search(&self, _query: &str, _k: usize, _filter: &SearchFilter) -> anyhow::Result<Vec<RawHit>> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

fn retriever(search: Arc<dyn SearchCapability>) -> DocumentRetriever {
    let scorer = RetrievalScorer::new(Arc::new(RetrievalProfiles::default()), DEFAULT_SIMILARITY_THRESHOLD);
    DocumentRetriever::new(search, scorer, 2)
}

fn corpus() -> Vec<RawHit> {
    vec![
        RawHit::new("Photosynthesis converts light.", ChunkMetadata::new(10, "notes", 1), 0.82),
        RawHit::new("Award 2 marks for chlorophyll.", ChunkMetadata::new(11, "marking_scheme", 1), 0.74),
        RawHit::new("Someone else's notes.", ChunkMetadata::new(12, "notes", 2), 0.95),
        RawHit::new("Shared past paper.", ChunkMetadata::new(13, "question_paper", 2).public(), 0.71),
    ]
}

#[tokio::test]
async fn retrieve_overfetches_enhances_and_builds_context() {
    let search = Arc::new(FakeSearch { hits: corpus(), ..FakeSearch::default() });
    let outcome = retriever(search.clone()).retrieve("What is photosynthesis?", Intent::DoubtClarification, 1, None).await;

    let calls = search.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "What is photosynthesis? explanation concept definition");
    assert_eq!(calls[0].1, 16, "default doubt limit 8 doubled");

    assert!(!outcome.degraded);
    let ids: Vec<u64> = outcome.documents.iter().map(|d| d.document_id).collect();
    assert_eq!(ids, vec![10, 11, 13]);
    assert!((outcome.documents[0].similarity_score - 0.82).abs() < 1e-6, "reported score is raw similarity");
    assert!(outcome.context.contains("--- NOTES ---"));
    assert!(!outcome.context.contains("Someone else's"));
    assert_eq!(outcome.document_types.len(), 3);
    assert_eq!(outcome.retrieval_query, calls[0].0);
}

#[tokio::test]
async fn caller_limit_overrides_profile_default() {
    let search = Arc::new(FakeSearch { hits: corpus(), ..FakeSearch::default() });
    let outcome = retriever(search.clone()).retrieve("photosynthesis", Intent::AnswerGeneration, 1, Some(1)).await;
    assert_eq!(outcome.documents.len(), 1);
    assert_eq!(search.calls.lock().unwrap()[0].1, 2);
}

#[tokio::test]
async fn search_failure_degrades_to_empty_outcome() {
    let outcome = retriever(Arc::new(DownSearch)).retrieve("anything", Intent::AnswerGeneration, 1, None).await;
    assert!(outcome.degraded);
    assert!(outcome.documents.is_empty());
    assert_eq!(outcome.context, "");
    assert!(outcome.document_types.is_empty());
}

#[tokio::test]
async fn try_retrieve_surfaces_retrieval_unavailable() {
    let err = retriever(Arc::new(DownSearch))
        .try_retrieve("anything", Intent::AnswerGeneration, 1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RetrievalUnavailable(_)));
}

#[tokio::test]
async fn per_type_retrieval_filters_access_and_keeps_type_order() {
    let search = Arc::new(FakeSearch { hits: corpus(), ..FakeSearch::default() });
    let types = vec!["question_paper".to_string(), "notes".to_string()];
    let docs = retriever(search.clone())
        .retrieve_by_document_types("plants", &types, 1, 5)
        .await
        .expect("per-type retrieval");
    let ids: Vec<u64> = docs.iter().map(|d| d.document_id).collect();
    assert_eq!(ids, vec![13, 10]);

    let calls = search.calls.lock().unwrap();
    assert_eq!(calls[0].2, SearchFilter::document_type("question_paper"));
    assert_eq!(calls[1].2, SearchFilter::document_type("notes"));
}
