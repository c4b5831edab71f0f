#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use studyrag_core::config::Settings;
use studyrag_core::traits::{ChunkStream, Generator, IntentClassifier, SearchCapability, StreamGenerator};
use studyrag_core::types::{ChatMessage, ChunkMetadata, GenerationParams, Intent, RawHit, SearchFilter};
use studyrag_pipeline::Pipeline;

pub struct FixedClassifier(pub Intent);

#[async_trait]
impl IntentClassifier for FixedClassifier {
    async fn classify(&self, _query: &str) -> anyhow::Result<Intent> {
        Ok(self.0)
    }
}

pub struct FailingClassifier;

#[async_trait]
impl IntentClassifier for FailingClassifier {
    async fn classify(&self, _query: &str) -> anyhow::Result<Intent> {
        Err(anyhow::anyhow!("model unreachable"))
    }
}

#[derive(Default)]
pub struct FakeSearch {
    pub hits: Vec<RawHit>,
}

impl FakeSearch {
    pub fn with(hits: Vec<RawHit>) -> Arc<Self> {
        Arc::new(Self { hits })
    }
}

#[async_trait]
impl SearchCapability for FakeSearch {
    async fn search(&self, _query: &str, k: usize, filter: &SearchFilter) -> anyhow::Result<Vec<RawHit>> {
        Ok(self
            .hits
            .iter()
            .filter(|h| filter.document_type.as_deref().map_or(true, |t| t == h.metadata.document_type))
            .take(k)
            .cloned()
            .collect())
    }
}

pub struct DownSearch;

#[async_trait]
impl SearchCapability for DownSearch {
    async fn search(&self, _query: &str, _k: usize, _filter: &SearchFilter) -> anyhow::Result<Vec<RawHit>> {
        Err(anyhow::anyhow!("index offline"))
    }
}

#[derive(Debug, Clone)]
pub struct GenerateCall {
    pub prompt: String,
    pub system_prompt: String,
    pub params: GenerationParams,
}

pub struct ScriptedGenerator {
    reply: String,
    pub calls: Mutex<Vec<GenerateCall>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self { reply: reply.to_string(), calls: Mutex::new(Vec::new()) })
    }

    pub fn calls(&self) -> Vec<GenerateCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, system_prompt: &str, params: GenerationParams) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(GenerateCall {
            prompt: prompt.to_string(),
            system_prompt: system_prompt.to_string(),
            params,
        });
        Ok(self.reply.clone())
    }
}

pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &str, _system_prompt: &str, _params: GenerationParams) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("context window exceeded"))
    }
}

/// Streams the given chunks, then either ends or hangs forever.
pub struct ScriptedStream {
    pub chunks: Vec<String>,
    pub hang_after: bool,
    pub fail_after: bool,
    pub seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedStream {
    pub fn finishing(chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self::build(chunks, false, false))
    }

    pub fn hanging(chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self::build(chunks, true, false))
    }

    pub fn failing(chunks: &[&str]) -> Arc<Self> {
        Arc::new(Self::build(chunks, false, true))
    }

    fn build(chunks: &[&str], hang_after: bool, fail_after: bool) -> Self {
        Self {
            chunks: chunks.iter().map(|c| (*c).to_string()).collect(),
            hang_after,
            fail_after,
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl StreamGenerator for ScriptedStream {
    async fn stream_generate(&self, messages: &[ChatMessage], _params: GenerationParams) -> anyhow::Result<ChunkStream> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let head = stream::iter(self.chunks.clone().into_iter().map(Ok));
        let out: ChunkStream = if self.hang_after {
            head.chain(stream::pending()).boxed()
        } else if self.fail_after {
            head.chain(stream::iter(vec![Err(anyhow::anyhow!("stream reset"))])).boxed()
        } else {
            head.boxed()
        };
        Ok(out)
    }
}

pub fn notes(id: u64, owner: u64, similarity: f32, text: &str) -> RawHit {
    RawHit::new(text, ChunkMetadata::new(id, "notes", owner), similarity)
}

pub fn marking(id: u64, owner: u64, similarity: f32, text: &str) -> RawHit {
    RawHit::new(text, ChunkMetadata::new(id, "marking_scheme", owner), similarity)
}

pub fn pipeline(
    classifier: Arc<dyn IntentClassifier>,
    search: Arc<dyn SearchCapability>,
    generator: Arc<dyn Generator>,
) -> Pipeline {
    Pipeline::new(classifier, search, generator, Settings::default()).expect("default settings build a pipeline")
}
