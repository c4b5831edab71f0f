use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use studyrag_core::error::Error;
use studyrag_core::traits::MessageStore;
use studyrag_core::types::{ChatMessage, ConversationId, Intent, NewMessage, Role, UserId};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub intent: Option<Intent>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<StoredMessage>,
}

#[derive(Default)]
struct Inner {
    next_conversation: ConversationId,
    next_message: u64,
    conversations: BTreeMap<ConversationId, Conversation>,
}

/// Process-local `MessageStore`. Message ids grow monotonically across all
/// conversations, so id order is insertion order.
#[derive(Default)]
pub struct InMemoryMessageStore {
    inner: RwLock<Inner>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn conversation(&self, id: ConversationId) -> Option<Conversation> {
        self.inner.read().await.conversations.get(&id).cloned()
    }

    pub async fn messages(&self, id: ConversationId) -> Vec<StoredMessage> {
        self.conversation(id).await.map(|c| c.messages).unwrap_or_default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create_conversation(&self, user_id: UserId) -> Result<ConversationId> {
        let mut inner = self.inner.write().await;
        inner.next_conversation += 1;
        let id = inner.next_conversation;
        inner.conversations.insert(id, Conversation { user_id, created_at: Utc::now(), messages: Vec::new() });
        Ok(id)
    }

    async fn save_message(&self, message: NewMessage) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.next_message += 1;
        let id = inner.next_message;
        let conversation = inner
            .conversations
            .get_mut(&message.conversation_id)
            .ok_or_else(|| Error::NotFound(format!("conversation {}", message.conversation_id)))?;
        conversation.messages.push(StoredMessage {
            id,
            role: message.role,
            content: message.content,
            intent: message.intent,
            metadata: message.metadata,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn recent_messages(&self, conversation_id: ConversationId, limit: usize) -> Result<Vec<ChatMessage>> {
        let inner = self.inner.read().await;
        let conversation = inner
            .conversations
            .get(&conversation_id)
            .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))?;
        Ok(conversation
            .messages
            .iter()
            .rev()
            .take(limit)
            .map(|m| ChatMessage::new(m.role, m.content.clone()))
            .collect())
    }
}
