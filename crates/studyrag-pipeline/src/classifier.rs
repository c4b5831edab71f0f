use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use studyrag_core::traits::{Generator, IntentClassifier};
use studyrag_core::types::{GenerationParams, Intent};
use tracing::debug;

use crate::prompts;

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: Option<f32>,
    pub reasoning: Option<String>,
}

fn field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let line = line.trim().trim_start_matches(['*', '-', ' ']);
    let (key, value) = line.split_once(':')?;
    key.trim_matches(['*', ' ']).eq_ignore_ascii_case(name).then(|| value.trim().trim_matches(['*', '"', '`', ' ']))
}

/// Reads the `INTENT:` / `CONFIDENCE:` / `REASONING:` reply format.
/// A missing or unknown intent is an error.
pub fn parse_classification(raw: &str) -> Result<Classification> {
    let mut intent = None;
    let mut confidence = None;
    let mut reasoning = None;
    for line in raw.lines() {
        if let Some(v) = field(line, "INTENT") {
            intent = Some(v.parse::<Intent>()?);
        } else if let Some(v) = field(line, "CONFIDENCE") {
            confidence = v.parse::<f32>().ok().map(|c| c.clamp(0.0, 1.0));
        } else if let Some(v) = field(line, "REASONING") {
            reasoning = Some(v.to_string()).filter(|r| !r.is_empty());
        }
    }
    let intent = intent.ok_or_else(|| anyhow!("classifier reply has no INTENT line"))?;
    Ok(Classification { intent, confidence, reasoning })
}

/// Classifies with one low-temperature generation call.
pub struct LlmIntentClassifier {
    generator: Arc<dyn Generator>,
    params: GenerationParams,
}

impl LlmIntentClassifier {
    pub fn new(generator: Arc<dyn Generator>, params: GenerationParams) -> Self {
        Self { generator, params }
    }

    pub async fn classify_detailed(&self, query: &str) -> Result<Classification> {
        let raw = self
            .generator
            .generate(&prompts::classification_user(query), &prompts::classification_system(), self.params)
            .await?;
        let parsed = parse_classification(&raw)?;
        debug!(intent = %parsed.intent, confidence = ?parsed.confidence, "query classified");
        Ok(parsed)
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, query: &str) -> Result<Intent> {
        Ok(self.classify_detailed(query).await?.intent)
    }
}
