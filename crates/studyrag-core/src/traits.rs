//! Collaborator seams. Implementations must be safe to call concurrently;
//! the pipeline shares one instance of each across all in-flight queries.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::types::{
    ChatMessage, ConversationId, GenerationParams, Intent, NewMessage, RawHit, SearchFilter, UserId,
};

/// Finite, non-restartable sequence of generated text chunks.
pub type ChunkStream = BoxStream<'static, anyhow::Result<String>>;

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, query: &str) -> anyhow::Result<Intent>;
}

#[async_trait]
pub trait SearchCapability: Send + Sync {
    async fn search(&self, query: &str, k: usize, filter: &SearchFilter) -> anyhow::Result<Vec<RawHit>>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, system_prompt: &str, params: GenerationParams) -> anyhow::Result<String>;
}

#[async_trait]
pub trait StreamGenerator: Send + Sync {
    async fn stream_generate(&self, messages: &[ChatMessage], params: GenerationParams) -> anyhow::Result<ChunkStream>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_conversation(&self, user_id: UserId) -> anyhow::Result<ConversationId>;
    async fn save_message(&self, message: NewMessage) -> anyhow::Result<()>;
    /// Most recent messages of a conversation, newest first.
    async fn recent_messages(&self, conversation_id: ConversationId, limit: usize) -> anyhow::Result<Vec<ChatMessage>>;
}
