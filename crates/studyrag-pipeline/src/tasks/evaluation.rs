use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use studyrag_core::traits::Generator;
use studyrag_core::types::GenerationParams;
use tracing::{info, warn};

use super::{TaskContext, TaskExecutor};
use crate::prompts;
use crate::state::TaskOutput;

/// Parsed examiner output. Marks are `None` when the model left them out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub total_marks: Option<f32>,
    pub obtained_marks: Option<f32>,
    pub percentage: Option<f32>,
    pub point_by_point: Vec<String>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub feedback: String,
    pub has_marking_scheme: bool,
}

impl Evaluation {
    /// `Score: 7/10` style line used when the evaluation is persisted.
    pub fn score_line(&self) -> String {
        format!("Score: {}/{}", marks(self.obtained_marks), marks(self.total_marks))
    }
}

fn marks(value: Option<f32>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Points,
    Strengths,
    Improvements,
}

fn leading_number(text: &str) -> Option<f32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}

fn list_item(line: &str) -> &str {
    let trimmed = line.trim_start_matches(['-', '*', '•']).trim_start();
    match trimmed.split_once(". ") {
        Some((n, rest)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => rest.trim(),
        _ => trimmed.trim(),
    }
}

/// Reads the `TOTAL_MARKS` / `OBTAINED_MARKS` / section layout requested by
/// the evaluation prompt. Anything unrecognised is ignored.
pub fn parse_evaluation(raw: &str, has_marking_scheme: bool) -> Evaluation {
    let mut total = None;
    let mut obtained = None;
    let mut points = Vec::new();
    let mut strengths = Vec::new();
    let mut improvements = Vec::new();
    let mut section = Section::None;

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let upper = line.trim_start_matches(['*', '#', ' ']).to_ascii_uppercase();
        if let Some(value) = upper.strip_prefix("TOTAL_MARKS:") {
            total = leading_number(value);
            section = Section::None;
        } else if let Some(value) = upper.strip_prefix("OBTAINED_MARKS:") {
            obtained = leading_number(value);
            section = Section::None;
        } else if upper.starts_with("POINT_BY_POINT") {
            section = Section::Points;
        } else if upper.starts_with("STRENGTHS") {
            section = Section::Strengths;
        } else if upper.starts_with("IMPROVEMENTS") {
            section = Section::Improvements;
        } else {
            let item = list_item(line);
            if item.is_empty() {
                continue;
            }
            match section {
                Section::Points => points.push(item.to_string()),
                Section::Strengths => strengths.push(item.to_string()),
                Section::Improvements => improvements.push(item.to_string()),
                Section::None => {}
            }
        }
    }

    let percentage = match (obtained, total) {
        (Some(o), Some(t)) if t > 0.0 => Some((o * 100.0 / t).clamp(0.0, 100.0)),
        _ => None,
    };
    Evaluation {
        total_marks: total,
        obtained_marks: obtained,
        percentage,
        point_by_point: points,
        strengths,
        improvements,
        feedback: raw.trim().to_string(),
        has_marking_scheme,
    }
}

/// Splits `"<question> Answer: <answer>"` into its parts. Without the
/// marker the whole text is taken as the answer.
pub fn split_submission(text: &str) -> (String, String) {
    let lower = text.to_ascii_lowercase();
    match lower.find("answer:") {
        Some(idx) => {
            let question = text[..idx].trim().trim_start_matches("Question:").trim_start_matches("question:").trim();
            let answer = text[idx + "answer:".len()..].trim();
            (question.to_string(), answer.to_string())
        }
        None => (String::new(), text.trim().to_string()),
    }
}

pub struct AnswerEvaluator {
    generator: Arc<dyn Generator>,
    params: GenerationParams,
}

impl AnswerEvaluator {
    pub fn new(generator: Arc<dyn Generator>, params: GenerationParams) -> Self {
        Self { generator, params }
    }
}

#[async_trait]
impl TaskExecutor for AnswerEvaluator {
    async fn execute(&self, ctx: TaskContext<'_>) -> anyhow::Result<TaskOutput> {
        let has_marking_scheme = ctx.document_types.contains("marking_scheme");
        if !has_marking_scheme {
            warn!("no marking scheme retrieved, evaluating against available material");
        }
        let (question, student_answer) = split_submission(&ctx.query.text);
        let reference = if ctx.context.is_empty() { "(none found)" } else { ctx.context };
        let prompt = prompts::evaluation(&question, reference, &student_answer, has_marking_scheme);
        let raw = self.generator.generate(&prompt, prompts::EVALUATION_SYSTEM, self.params).await?;
        let evaluation = parse_evaluation(&raw, has_marking_scheme);
        info!(
            obtained = ?evaluation.obtained_marks,
            total = ?evaluation.total_marks,
            "answer evaluated"
        );
        Ok(TaskOutput::Evaluation { evaluation })
    }
}
