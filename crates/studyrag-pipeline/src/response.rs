use serde::Serialize;
use studyrag_core::error::{Error, ErrorKind};
use studyrag_core::types::{ConversationId, Intent, Query, UserId};

use crate::state::{PipelineState, TaskOutput};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMetadata {
    pub user_id: UserId,
    pub conversation_id: Option<ConversationId>,
    pub document_types_used: Vec<String>,
    pub num_documents_retrieved: usize,
    pub context_length: usize,
    pub retrieval_degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessEnvelope {
    pub intent: Intent,
    #[serde(flatten)]
    pub output: TaskOutput,
    pub processing_time: f64,
    pub nodes_visited: Vec<String>,
    pub metadata: ResponseMetadata,
}

impl SuccessEnvelope {
    pub(crate) fn from_state(query: &Query, intent: Intent, output: TaskOutput, state: &PipelineState) -> Self {
        Self {
            intent,
            output,
            processing_time: state.processing_time_seconds,
            nodes_visited: state.nodes_visited().iter().map(|n| (*n).to_string()).collect(),
            metadata: ResponseMetadata {
                user_id: query.user_id,
                conversation_id: query.conversation_id,
                document_types_used: state.document_types_available.iter().cloned().collect(),
                num_documents_retrieved: state.retrieved_documents.len(),
                context_length: state.context.len(),
                retrieval_degraded: state.retrieval_degraded,
            },
        }
    }

    /// Text a chat service stores as the assistant turn for this result.
    pub fn assistant_content(&self) -> String {
        match &self.output {
            TaskOutput::DoubtAnswer { response, .. } => response.clone(),
            TaskOutput::Answer { answer, .. } => answer.clone(),
            TaskOutput::Evaluation { evaluation } => format!("{}\n\n{}", evaluation.score_line(), evaluation.feedback),
            TaskOutput::Questions { questions } => questions.render(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEnvelope {
    pub error_kind: ErrorKind,
    pub message: String,
    pub processing_time: f64,
    pub user_id: UserId,
    pub query: String,
}

impl FailureEnvelope {
    pub(crate) fn new(query: &Query, error: &Error, processing_time: f64) -> Self {
        Self {
            error_kind: error.kind(),
            message: error.to_string(),
            processing_time,
            user_id: query.user_id,
            query: query.text.clone(),
        }
    }
}

/// Unified outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    Success(SuccessEnvelope),
    Failure(FailureEnvelope),
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success(_))
    }

    pub fn success(&self) -> Option<&SuccessEnvelope> {
        match self {
            PipelineResult::Success(s) => Some(s),
            PipelineResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureEnvelope> {
        match self {
            PipelineResult::Failure(f) => Some(f),
            PipelineResult::Success(_) => None,
        }
    }

    pub fn processing_time(&self) -> f64 {
        match self {
            PipelineResult::Success(s) => s.processing_time,
            PipelineResult::Failure(f) => f.processing_time,
        }
    }
}
