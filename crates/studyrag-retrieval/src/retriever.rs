use std::collections::BTreeSet;
use std::sync::Arc;

use studyrag_core::error::{Error, Result};
use studyrag_core::traits::SearchCapability;
use studyrag_core::types::{Intent, RetrievedDocument, ScoredHit, SearchFilter, UserId};
use tracing::{info, warn};

use crate::context::ContextBuilder;
use crate::scorer::RetrievalScorer;

/// Everything one retrieval pass produced. `degraded` marks a pass where the
/// search capability failed and the empty result stands in for real hits.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    pub scored: Vec<ScoredHit>,
    pub documents: Vec<RetrievedDocument>,
    pub context: String,
    pub document_types: BTreeSet<String>,
    pub retrieval_query: String,
    pub degraded: bool,
}

pub struct DocumentRetriever {
    search: Arc<dyn SearchCapability>,
    scorer: RetrievalScorer,
    overfetch_factor: usize,
}

impl DocumentRetriever {
    pub fn new(search: Arc<dyn SearchCapability>, scorer: RetrievalScorer, overfetch_factor: usize) -> Self {
        Self { search, scorer, overfetch_factor: overfetch_factor.max(1) }
    }

    /// Appends intent keywords that pull the search toward useful chunk kinds.
    pub fn enhance_query(query: &str, intent: Intent) -> String {
        let suffix = match intent {
            Intent::AnswerGeneration => "answer solution explanation",
            Intent::AnswerEvaluation => "marking scheme grading criteria",
            Intent::DoubtClarification => "explanation concept definition",
            Intent::QuestionGeneration => "questions examples problems",
            Intent::ExamPaperGeneration => "questions topics syllabus",
        };
        format!("{query} {suffix}").trim().to_string()
    }

    /// Best-effort retrieval: a failing search is logged and yields an empty,
    /// `degraded` outcome so the run can continue without context.
    pub async fn retrieve(&self, query: &str, intent: Intent, user_id: UserId, limit: Option<usize>) -> RetrievalOutcome {
        match self.try_retrieve(query, intent, user_id, limit).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, intent = %intent, "document retrieval failed, continuing with empty document set");
                RetrievalOutcome {
                    retrieval_query: Self::enhance_query(query, intent),
                    degraded: true,
                    ..RetrievalOutcome::default()
                }
            }
        }
    }

    /// Like `retrieve`, but surfaces `RetrievalUnavailable` instead of degrading.
    pub async fn try_retrieve(&self, query: &str, intent: Intent, user_id: UserId, limit: Option<usize>) -> Result<RetrievalOutcome> {
        let retrieval_query = Self::enhance_query(query, intent);
        let limit = limit.unwrap_or_else(|| self.scorer.profiles().default_limit(intent));
        info!(
            intent = %intent,
            limit,
            threshold = self.scorer.threshold(),
            query = %preview(query, 100),
            "retrieving documents"
        );

        let raw = self
            .search
            .search(&retrieval_query, limit * self.overfetch_factor, &SearchFilter::default())
            .await
            .map_err(|e| Error::retrieval_unavailable(&e))?;

        let scored = self.scorer.score(raw, intent, user_id, limit);
        let documents: Vec<RetrievedDocument> = scored.iter().map(RetrievedDocument::from).collect();
        let built = ContextBuilder::build(&scored);

        info!(
            documents = documents.len(),
            types = ?built.document_types,
            context_len = built.text.len(),
            "retrieved documents"
        );
        Ok(RetrievalOutcome {
            scored,
            documents,
            context: built.text,
            document_types: built.document_types,
            retrieval_query,
            degraded: false,
        })
    }

    /// One filtered search per type, concatenated in the order given. Results
    /// are access-filtered but not thresholded or boosted.
    pub async fn retrieve_by_document_types(
        &self,
        query: &str,
        document_types: &[String],
        user_id: UserId,
        per_type: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        let mut all = Vec::new();
        for doc_type in document_types {
            let hits = self
                .search
                .search(query, per_type, &SearchFilter::document_type(doc_type.clone()))
                .await
                .map_err(|e| Error::retrieval_unavailable(&e))?;
            all.extend(
                hits.into_iter()
                    .filter(|h| h.metadata.is_visible_to(user_id))
                    .take(per_type)
                    .map(|hit| RetrievedDocument::from(&ScoredHit { score: hit.similarity, hit })),
            );
        }
        Ok(all)
    }
}

/// First `max_chars` characters of `text`, for log lines.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_char_safe() {
        assert_eq!(preview("héllo wörld", 4), "héll...");
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn enhancement_appends_intent_keywords() {
        assert_eq!(
            DocumentRetriever::enhance_query("grade my answer", Intent::AnswerEvaluation),
            "grade my answer marking scheme grading criteria"
        );
        assert_eq!(DocumentRetriever::enhance_query("", Intent::DoubtClarification), "explanation concept definition");
    }
}
