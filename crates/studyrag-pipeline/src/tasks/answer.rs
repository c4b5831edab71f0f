use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use studyrag_core::traits::Generator;
use studyrag_core::types::GenerationParams;
use tracing::info;

use super::{TaskContext, TaskExecutor};
use crate::prompts;
use crate::state::TaskOutput;

/// What an answer was written from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerBasis {
    MarkingScheme,
    Notes,
    GeneralKnowledge,
}

pub struct AnswerGenerator {
    generator: Arc<dyn Generator>,
    params: GenerationParams,
}

impl AnswerGenerator {
    pub fn new(generator: Arc<dyn Generator>, params: GenerationParams) -> Self {
        Self { generator, params }
    }

    pub fn basis(ctx: &TaskContext<'_>) -> AnswerBasis {
        if ctx.document_types.contains("marking_scheme") {
            AnswerBasis::MarkingScheme
        } else if !ctx.context.is_empty() {
            AnswerBasis::Notes
        } else {
            AnswerBasis::GeneralKnowledge
        }
    }
}

#[async_trait]
impl TaskExecutor for AnswerGenerator {
    async fn execute(&self, ctx: TaskContext<'_>) -> anyhow::Result<TaskOutput> {
        let basis = Self::basis(&ctx);
        let question = ctx.query.text.as_str();
        let prompt = match basis {
            AnswerBasis::MarkingScheme => prompts::answer_with_marking_scheme(question, ctx.context),
            AnswerBasis::Notes => prompts::answer_from_notes(question, ctx.context),
            AnswerBasis::GeneralKnowledge => prompts::answer_general(question),
        };
        let answer = self.generator.generate(&prompt, prompts::ANSWER_SYSTEM, self.params).await?;
        info!(basis = ?basis, answer_len = answer.len(), "answer generated");
        Ok(TaskOutput::Answer { answer: answer.trim().to_string(), basis })
    }
}
