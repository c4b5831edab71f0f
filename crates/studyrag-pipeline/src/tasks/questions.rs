use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use studyrag_core::traits::Generator;
use studyrag_core::types::GenerationParams;
use tracing::{info, warn};

use super::{TaskContext, TaskExecutor};
use crate::prompts;
use crate::state::TaskOutput;

pub const DEFAULT_QUESTION_COUNT: usize = 5;
pub const MAX_QUESTION_COUNT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    Short,
    Long,
    Numerical,
}

impl QuestionType {
    pub fn describe(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "multiple-choice",
            QuestionType::Short => "short answer",
            QuestionType::Long => "long answer",
            QuestionType::Numerical => "numerical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQuestion {
    pub number: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSet {
    pub question_type: QuestionType,
    pub requested: usize,
    pub items: Vec<GeneratedQuestion>,
}

impl QuestionSet {
    /// One `Q<n>. ...` block per question, blank-line separated.
    pub fn render(&self) -> String {
        self.items.iter().map(|q| format!("Q{}. {}", q.number, q.text)).collect::<Vec<_>>().join("\n\n")
    }
}

pub fn detect_question_type(query: &str) -> QuestionType {
    let q = query.to_lowercase();
    if q.contains("mcq") || q.contains("multiple choice") || q.contains("multiple-choice") {
        QuestionType::Mcq
    } else if q.contains("numerical") || q.contains("numeric") || q.contains("problem") {
        QuestionType::Numerical
    } else if q.contains("long") || q.contains("essay") {
        QuestionType::Long
    } else {
        QuestionType::Short
    }
}

/// First standalone number in the query, clamped to `1..=MAX_QUESTION_COUNT`.
pub fn detect_question_count(query: &str) -> usize {
    query
        .split(|c: char| !c.is_ascii_digit())
        .find(|token| !token.is_empty())
        .and_then(|token| token.parse::<usize>().ok())
        .map_or(DEFAULT_QUESTION_COUNT, |n| n.clamp(1, MAX_QUESTION_COUNT))
}

fn question_number(line: &str) -> Option<(usize, &str)> {
    let rest = line.strip_prefix('Q').or_else(|| line.strip_prefix('q'))?;
    let digits_end = rest.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let number = rest[..digits_end].parse().ok()?;
    let body = rest[digits_end..].strip_prefix(['.', ')', ':'])?;
    Some((number, body.trim_start_matches('*').trim()))
}

/// Splits model output into `Q<n>.` blocks. Lines before the first block
/// are dropped; lines after a header belong to that question.
pub fn parse_questions(raw: &str) -> Vec<GeneratedQuestion> {
    let mut items: Vec<GeneratedQuestion> = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim().trim_start_matches(['*', '#']).trim_start();
        if let Some((number, body)) = question_number(trimmed) {
            items.push(GeneratedQuestion { number, text: body.trim_end_matches('*').trim().to_string() });
        } else if let Some(current) = items.last_mut() {
            if !trimmed.is_empty() {
                if !current.text.is_empty() {
                    current.text.push('\n');
                }
                current.text.push_str(line.trim());
            }
        }
    }
    items
}

pub struct QuestionGenerator {
    generator: Arc<dyn Generator>,
    params: GenerationParams,
}

impl QuestionGenerator {
    pub fn new(generator: Arc<dyn Generator>, params: GenerationParams) -> Self {
        Self { generator, params }
    }
}

#[async_trait]
impl TaskExecutor for QuestionGenerator {
    async fn execute(&self, ctx: TaskContext<'_>) -> anyhow::Result<TaskOutput> {
        let question_type = detect_question_type(&ctx.query.text);
        let requested = detect_question_count(&ctx.query.text);
        let prompt = prompts::questions(question_type, requested, &ctx.query.text, ctx.context);
        let raw = self.generator.generate(&prompt, prompts::QUESTIONS_SYSTEM, self.params).await?;
        let items = parse_questions(&raw);
        if items.len() != requested {
            warn!(requested, parsed = items.len(), "question count differs from request");
        }
        info!(question_type = question_type.describe(), count = items.len(), "questions generated");
        Ok(TaskOutput::Questions { questions: QuestionSet { question_type, requested, items } })
    }
}
