use std::collections::BTreeSet;

use serde::Serialize;
use studyrag_core::types::{Intent, RetrievedDocument};
use studyrag_retrieval::RetrievalOutcome;

use crate::router::Stage;
use crate::tasks::{AnswerBasis, AnswerSource, Evaluation, QuestionSet};

/// Result of the task stage. Serialized flat into the success envelope, so
/// each variant's field names are the envelope keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskOutput {
    Answer { answer: String, basis: AnswerBasis },
    Evaluation { evaluation: Evaluation },
    DoubtAnswer { response: String, source_type: AnswerSource, has_relevant_notes: bool },
    Questions { questions: QuestionSet },
}

/// Working state of one run. Owned by the run; never shared.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub intent: Option<Intent>,
    pub retrieved_documents: Vec<RetrievedDocument>,
    pub context: String,
    pub document_types_available: BTreeSet<String>,
    nodes_visited: Vec<&'static str>,
    pub task_output: Option<TaskOutput>,
    pub retrieval_query: Option<String>,
    pub retrieval_degraded: bool,
    pub processing_time_seconds: f64,
}

impl PipelineState {
    /// Records entry into `stage`. Only appends.
    pub fn enter(&mut self, stage: Stage) {
        if let Some(node) = stage.node_name() {
            self.nodes_visited.push(node);
        }
    }

    pub fn nodes_visited(&self) -> &[&'static str] {
        &self.nodes_visited
    }

    pub fn apply_retrieval(&mut self, outcome: RetrievalOutcome) {
        self.retrieved_documents = outcome.documents;
        self.context = outcome.context;
        self.document_types_available = outcome.document_types;
        self.retrieval_query = Some(outcome.retrieval_query);
        self.retrieval_degraded = outcome.degraded;
    }
}
