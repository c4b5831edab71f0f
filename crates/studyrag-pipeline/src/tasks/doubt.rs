use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use studyrag_core::traits::Generator;
use studyrag_core::types::{GenerationParams, RetrievedDocument};
use tracing::info;

use super::{TaskContext, TaskExecutor};
use crate::prompts;
use crate::state::TaskOutput;

/// Similarity a retrieved chunk needs to count towards relevance.
pub const RELEVANT_SIMILARITY: f32 = 0.7;
/// Chunks at or above `RELEVANT_SIMILARITY` needed to answer from notes.
pub const MIN_RELEVANT_DOCUMENTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Notes,
    GeneralKnowledge,
}

impl AnswerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Notes => "notes",
            AnswerSource::GeneralKnowledge => "general_knowledge",
        }
    }
}

/// Judged on the original similarity, not the boosted ranking score.
pub fn has_relevant_notes(documents: &[RetrievedDocument]) -> bool {
    documents.iter().filter(|d| d.similarity_score >= RELEVANT_SIMILARITY).count() >= MIN_RELEVANT_DOCUMENTS
}

pub struct DoubtResolver {
    generator: Arc<dyn Generator>,
    notes_params: GenerationParams,
    general_params: GenerationParams,
}

impl DoubtResolver {
    pub fn new(generator: Arc<dyn Generator>, notes_params: GenerationParams, general_params: GenerationParams) -> Self {
        Self { generator, notes_params, general_params }
    }

    fn frame(answer: &str, source: AnswerSource) -> String {
        let (header, footer) = match source {
            AnswerSource::Notes => (prompts::NOTES_HEADER, prompts::NOTES_FOOTER),
            AnswerSource::GeneralKnowledge => (prompts::GENERAL_HEADER, prompts::GENERAL_FOOTER),
        };
        format!("{header}{answer}{footer}")
    }
}

#[async_trait]
impl TaskExecutor for DoubtResolver {
    async fn execute(&self, ctx: TaskContext<'_>) -> anyhow::Result<TaskOutput> {
        let relevant = has_relevant_notes(ctx.documents);
        let query = ctx.query.text.as_str();
        let (source, answer) = if relevant {
            let prompt = prompts::doubt_from_notes(query, ctx.context);
            let answer = self.generator.generate(&prompt, prompts::DOUBT_NOTES_SYSTEM, self.notes_params).await?;
            (AnswerSource::Notes, answer)
        } else {
            let prompt = prompts::doubt_general(query);
            let answer = self.generator.generate(&prompt, prompts::DOUBT_GENERAL_SYSTEM, self.general_params).await?;
            (AnswerSource::GeneralKnowledge, answer)
        };
        info!(source = source.as_str(), answer_len = answer.len(), "doubt resolved");
        Ok(TaskOutput::DoubtAnswer {
            response: Self::frame(answer.trim(), source),
            source_type: source,
            has_relevant_notes: relevant,
        })
    }
}
