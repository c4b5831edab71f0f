//! Domain types shared by the retrieval, pipeline and adapter crates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type UserId = u64;
pub type DocumentId = u64;
pub type ConversationId = u64;
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Visibility value that opens a chunk to every user.
pub const PUBLIC_VISIBILITY: &str = "public";

/// Classified purpose of a query. Produced once per query and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    AnswerGeneration,
    AnswerEvaluation,
    DoubtClarification,
    QuestionGeneration,
    ExamPaperGeneration,
}

impl Intent {
    pub const ALL: [Intent; 5] = [
        Intent::AnswerGeneration,
        Intent::AnswerEvaluation,
        Intent::DoubtClarification,
        Intent::QuestionGeneration,
        Intent::ExamPaperGeneration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::AnswerGeneration => "answer_generation",
            Intent::AnswerEvaluation => "answer_evaluation",
            Intent::DoubtClarification => "doubt_clarification",
            Intent::QuestionGeneration => "question_generation",
            Intent::ExamPaperGeneration => "exam_paper_generation",
        }
    }

    /// Upper-case tag used in classifier prompts (`ANSWER_GENERATION`).
    pub fn label(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Intent::ALL
            .into_iter()
            .find(|i| i.as_str() == normalized)
            .ok_or_else(|| Error::UnknownIntent(s.trim().to_string()))
    }
}

/// One incoming query. Owned by the orchestrator for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub user_id: UserId,
    pub text: String,
    pub conversation_id: Option<ConversationId>,
}

impl Query {
    pub fn new(user_id: UserId, text: impl Into<String>) -> Self {
        Self { user_id, text: text.into(), conversation_id: None }
    }

    pub fn in_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }
}

fn default_document_type() -> String {
    "other".to_string()
}

fn default_visibility() -> String {
    "private".to_string()
}

/// Metadata stored alongside every indexed chunk.
///
/// `owner_user_id` is optional because shared corpora may carry chunks with no
/// owner; such chunks are only reachable when `visibility` is `"public"`.
/// Any extra fields, of any JSON type, are kept in `extra` and passed through
/// untouched. Corpora that name the owner `user_id` are accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub document_id: DocumentId,
    #[serde(default = "default_document_type")]
    pub document_type: String,
    #[serde(default, alias = "user_id")]
    pub owner_user_id: Option<UserId>,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default, flatten)]
    pub extra: Meta,
}

impl ChunkMetadata {
    pub fn new(document_id: DocumentId, document_type: impl Into<String>, owner_user_id: UserId) -> Self {
        Self {
            document_id,
            document_type: document_type.into(),
            owner_user_id: Some(owner_user_id),
            visibility: default_visibility(),
            extra: Meta::new(),
        }
    }

    pub fn public(mut self) -> Self {
        self.visibility = PUBLIC_VISIBILITY.to_string();
        self
    }

    /// A chunk is visible to its owner, and to everyone when public.
    pub fn is_visible_to(&self, user_id: UserId) -> bool {
        self.owner_user_id == Some(user_id) || self.visibility == PUBLIC_VISIBILITY
    }
}

/// A candidate chunk returned by a search capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    pub text: String,
    pub metadata: ChunkMetadata,
    /// 0.0–1.0, higher is closer.
    pub similarity: f32,
}

impl RawHit {
    pub fn new(text: impl Into<String>, metadata: ChunkMetadata, similarity: f32) -> Self {
        Self { text: text.into(), metadata, similarity }
    }
}

/// A `RawHit` that survived access control and thresholding, with its
/// intent-boosted ranking score. `score >= hit.similarity` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHit {
    pub hit: RawHit,
    pub score: f32,
}

impl ScoredHit {
    pub fn similarity(&self) -> f32 {
        self.hit.similarity
    }

    pub fn document_type(&self) -> &str {
        &self.hit.metadata.document_type
    }

    pub fn boost(&self) -> f32 {
        self.score - self.hit.similarity
    }
}

/// Externally visible shape of a retrieved chunk. `similarity_score` is the
/// original similarity; ranking boosts never leak through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub document_id: DocumentId,
    pub document_type: String,
    pub chunk_text: String,
    pub similarity_score: f32,
    pub metadata: ChunkMetadata,
}

impl From<&ScoredHit> for RetrievedDocument {
    fn from(scored: &ScoredHit) -> Self {
        let hit = &scored.hit;
        Self {
            document_id: hit.metadata.document_id,
            document_type: hit.metadata.document_type.clone(),
            chunk_text: hit.text.clone(),
            similarity_score: hit.similarity,
            metadata: hit.metadata.clone(),
        }
    }
}

/// Optional narrowing applied by the search capability itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub document_type: Option<String>,
}

impl SearchFilter {
    pub fn document_type(document_type: impl Into<String>) -> Self {
        Self { document_type: Some(document_type.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A message handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub role: Role,
    pub content: String,
    pub intent: Option<Intent>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self { temperature, max_tokens }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self { temperature: 0.7, max_tokens: 1500 }
    }
}
