//! Task executors: one per routed task, each over a shared `Generator`.

mod answer;
mod doubt;
mod evaluation;
mod questions;

use std::collections::BTreeSet;

use async_trait::async_trait;
use studyrag_core::types::{Intent, Query, RetrievedDocument};

use crate::state::TaskOutput;

pub use answer::{AnswerBasis, AnswerGenerator};
pub use doubt::{has_relevant_notes, AnswerSource, DoubtResolver, MIN_RELEVANT_DOCUMENTS, RELEVANT_SIMILARITY};
pub use evaluation::{parse_evaluation, split_submission, AnswerEvaluator, Evaluation};
pub use questions::{
    detect_question_count, detect_question_type, parse_questions, GeneratedQuestion, QuestionGenerator, QuestionSet,
    QuestionType, DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT,
};

/// Read-only view of a run handed to a task executor.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    pub query: &'a Query,
    pub intent: Intent,
    pub documents: &'a [RetrievedDocument],
    pub context: &'a str,
    pub document_types: &'a BTreeSet<String>,
}

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, ctx: TaskContext<'_>) -> anyhow::Result<TaskOutput>;
}
