//! Streaming doubt clarification: history + retrieval + chat generation,
//! forwarded chunk by chunk over a bounded channel.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde_json::json;
use studyrag_core::error::Error;
use studyrag_core::traits::{MessageStore, StreamGenerator};
use studyrag_core::types::{ChatMessage, ConversationId, GenerationParams, Intent, NewMessage, Query, Role};
use studyrag_retrieval::DocumentRetriever;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::prompts;
use crate::tasks::AnswerSource;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// System prompt and full message list for one chat generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    pub source: AnswerSource,
}

#[derive(Debug, Clone, Copy)]
pub struct StreamingSessionAssembler {
    history_limit: usize,
}

impl Default for StreamingSessionAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl StreamingSessionAssembler {
    pub fn new(history_limit: usize) -> Self {
        Self { history_limit }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// `history` is newest first, as the store returns it. At most
    /// `history_limit` of it is used; the newest entry is skipped when it is
    /// the query itself (already persisted by the caller).
    pub fn assemble(
        &self,
        history: &[ChatMessage],
        query: &str,
        context: &str,
        notes_system_prompt: &str,
        general_system_prompt: &str,
    ) -> AssembledPrompt {
        let (system_prompt, final_user, source) = if context.is_empty() {
            (general_system_prompt, query.to_string(), AnswerSource::GeneralKnowledge)
        } else {
            (notes_system_prompt, prompts::inject_context(context, query), AnswerSource::Notes)
        };

        let mut recent: Vec<&ChatMessage> = history.iter().take(self.history_limit).collect();
        if recent.first().is_some_and(|newest| newest.content == query) {
            recent.remove(0);
        }
        recent.reverse();

        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(recent.into_iter().cloned());
        messages.push(ChatMessage::user(final_user));
        AssembledPrompt { system_prompt: system_prompt.to_string(), messages, source }
    }
}

/// Event sent to the consumer of a streaming session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Status { message: String },
    Info { message: String },
    Chunk { content: String },
    Done { conversation_id: ConversationId },
    Error { message: String },
}

impl StreamEvent {
    fn status(message: &str) -> Self {
        StreamEvent::Status { message: message.to_string() }
    }

    /// Server-sent-events frame: `data: {json}\n\n`.
    pub fn to_sse(&self) -> serde_json::Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

#[derive(Debug)]
pub enum StreamOutcome {
    /// Stream ran to its end and the answer was saved.
    Completed { conversation_id: ConversationId, text: String },
    /// Receiver went away; the partial answer was dropped unsaved.
    Cancelled { conversation_id: Option<ConversationId> },
    Failed(Error),
}

enum Halt {
    Disconnected,
    Failed(Error),
}

impl From<Error> for Halt {
    fn from(e: Error) -> Self {
        Halt::Failed(e)
    }
}

fn store_failure(e: &anyhow::Error) -> Halt {
    Halt::Failed(Error::Operation(format!("message store: {e:#}")))
}

pub struct StreamingSession {
    retriever: Arc<DocumentRetriever>,
    store: Arc<dyn MessageStore>,
    generator: Arc<dyn StreamGenerator>,
    assembler: StreamingSessionAssembler,
    params: GenerationParams,
    channel_capacity: usize,
}

impl StreamingSession {
    pub fn new(
        retriever: Arc<DocumentRetriever>,
        store: Arc<dyn MessageStore>,
        generator: Arc<dyn StreamGenerator>,
        assembler: StreamingSessionAssembler,
        params: GenerationParams,
        channel_capacity: usize,
    ) -> Self {
        Self { retriever, store, generator, assembler, params, channel_capacity: channel_capacity.max(1) }
    }

    /// Spawns the session; events arrive on the returned receiver. Dropping
    /// the receiver cancels generation.
    pub fn start(self: Arc<Self>, query: Query) -> (mpsc::Receiver<StreamEvent>, JoinHandle<StreamOutcome>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let handle = tokio::spawn(async move { self.run(query, tx).await });
        (rx, handle)
    }

    pub async fn run(&self, query: Query, tx: mpsc::Sender<StreamEvent>) -> StreamOutcome {
        let mut conversation_id = query.conversation_id;
        match self.stream(&query, &tx, &mut conversation_id).await {
            Ok(outcome) => outcome,
            Err(Halt::Failed(e)) => {
                warn!(error = %e, "streaming session failed");
                // the consumer may already be gone; nothing else to tell it
                let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                StreamOutcome::Failed(e)
            }
            Err(Halt::Disconnected) => {
                info!(conversation_id = ?conversation_id, "stream consumer disconnected, discarding partial answer");
                StreamOutcome::Cancelled { conversation_id }
            }
        }
    }

    async fn send(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<(), Halt> {
        tx.send(event).await.map_err(|_| Halt::Disconnected)
    }

    async fn stream(
        &self,
        query: &Query,
        tx: &mpsc::Sender<StreamEvent>,
        conversation_id: &mut Option<ConversationId>,
    ) -> Result<StreamOutcome, Halt> {
        let conv = match *conversation_id {
            Some(id) => id,
            None => self.store.create_conversation(query.user_id).await.map_err(|e| store_failure(&e))?,
        };
        *conversation_id = Some(conv);

        // persisted first so history reads see it and the assembler can skip it
        let user_message = NewMessage {
            conversation_id: conv,
            role: Role::User,
            content: query.text.clone(),
            intent: Some(Intent::DoubtClarification),
            metadata: None,
        };
        self.store.save_message(user_message).await.map_err(|e| store_failure(&e))?;

        Self::send(tx, StreamEvent::status("Fetching history...")).await?;
        let history = self
            .store
            .recent_messages(conv, self.assembler.history_limit())
            .await
            .map_err(|e| store_failure(&e))?;

        Self::send(tx, StreamEvent::status("Searching knowledge base...")).await?;
        let outcome = self.retriever.retrieve(&query.text, Intent::DoubtClarification, query.user_id, None).await;
        let info = if outcome.context.is_empty() {
            "Using general knowledge".to_string()
        } else {
            format!("Found {} relevant notes", outcome.documents.len())
        };
        Self::send(tx, StreamEvent::Info { message: info }).await?;

        let assembled = self.assembler.assemble(
            &history,
            &query.text,
            &outcome.context,
            prompts::STREAM_NOTES_SYSTEM,
            prompts::STREAM_GENERAL_SYSTEM,
        );

        Self::send(tx, StreamEvent::status("Thinking...")).await?;
        let mut chunks = self
            .generator
            .stream_generate(&assembled.messages, self.params)
            .await
            .map_err(|e| Error::generation(&e))?;

        let mut full = String::new();
        loop {
            let next = tokio::select! {
                () = tx.closed() => return Err(Halt::Disconnected),
                next = chunks.next() => next,
            };
            match next {
                Some(Ok(chunk)) => {
                    full.push_str(&chunk);
                    Self::send(tx, StreamEvent::Chunk { content: chunk }).await?;
                }
                Some(Err(e)) => return Err(Error::generation(&e).into()),
                None => break,
            }
        }
        drop(chunks);

        let source = assembled.source;
        let assistant_message = NewMessage {
            conversation_id: conv,
            role: Role::Assistant,
            content: full.clone(),
            intent: Some(Intent::DoubtClarification),
            metadata: Some(json!({ "source": source.as_str(), "streamed": true })),
        };
        self.store.save_message(assistant_message).await.map_err(|e| store_failure(&e))?;
        info!(conversation_id = conv, answer_len = full.len(), source = source.as_str(), "streamed answer saved");

        // the answer is saved either way; a late disconnect only loses `done`
        let _ = tx.send(StreamEvent::Done { conversation_id: conv }).await;
        Ok(StreamOutcome::Completed { conversation_id: conv, text: full })
    }
}
