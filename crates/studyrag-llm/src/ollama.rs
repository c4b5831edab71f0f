// Ollama HTTP adapter: one-shot generation over /api/generate and
// token streaming over /api/chat (newline-delimited JSON).

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use studyrag_core::config::LlmSettings;
use studyrag_core::traits::{ChunkStream, Generator, StreamGenerator};
use studyrag_core::types::{ChatMessage, GenerationParams};

pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// True when the configured model is present in the local model list.
    pub async fn model_available(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);
        let tags: TagsResponse = self.client.get(&url).send().await?.error_for_status()?.json().await?;
        Ok(tags.models.iter().any(|m| m.name == self.model || m.name.split(':').next() == Some(self.model.as_str())))
    }

    fn options(params: GenerationParams) -> serde_json::Value {
        json!({ "temperature": params.temperature, "num_predict": params.max_tokens })
    }
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<ChatLineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatLineMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, prompt: &str, system_prompt: &str, params: GenerationParams) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "system": system_prompt,
            "stream": false,
            "options": Self::options(params),
        });
        debug!(model = %self.model, prompt_len = prompt.len(), "ollama generate");
        let resp: GenerateResponse = self.client.post(&url).json(&body).send().await?.error_for_status()?.json().await?;
        if let Some(err) = resp.error {
            return Err(anyhow!("ollama error: {err}"));
        }
        Ok(resp.response)
    }
}

#[async_trait]
impl StreamGenerator for OllamaClient {
    async fn stream_generate(&self, messages: &[ChatMessage], params: GenerationParams) -> Result<ChunkStream> {
        let url = format!("{}/api/chat", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
            "options": Self::options(params),
        });
        info!(model = %self.model, messages = messages.len(), "ollama chat stream");
        let response = self.client.post(&url).json(&body).send().await?.error_for_status()?;
        let bytes = response.bytes_stream().map(|r| r.map(|b| b.to_vec()).map_err(anyhow::Error::from)).boxed();
        Ok(ndjson_chunks(bytes))
    }
}

struct NdjsonState {
    bytes: BoxStream<'static, Result<Vec<u8>>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    done: bool,
}

impl NdjsonState {
    /// Parses every complete line in the buffer. Partial lines (and partial
    /// UTF-8 sequences) stay buffered until the next read.
    fn take_lines(&mut self) -> Result<()> {
        while let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            self.push_line(&line)?;
        }
        Ok(())
    }

    fn push_line(&mut self, line: &[u8]) -> Result<()> {
        let line = line.trim_ascii();
        if line.is_empty() || self.done {
            return Ok(());
        }
        let parsed: ChatLine = serde_json::from_slice(line)
            .with_context(|| format!("invalid stream line: {}", String::from_utf8_lossy(line)))?;
        if let Some(err) = parsed.error {
            return Err(anyhow!("ollama error: {err}"));
        }
        if let Some(msg) = parsed.message {
            if !msg.content.is_empty() {
                self.pending.push_back(msg.content);
            }
        }
        if parsed.done {
            self.done = true;
        }
        Ok(())
    }

    /// End of bytes: a final unterminated line is still parsed, but the
    /// stream only counts as complete once `"done": true` was seen.
    fn finish(&mut self) -> Result<()> {
        let rest = std::mem::take(&mut self.buffer);
        self.push_line(&rest)?;
        if !self.done {
            return Err(anyhow!("stream ended before done"));
        }
        Ok(())
    }
}

/// Turns an NDJSON byte stream into content chunks, ending at `"done": true`.
/// Running out of bytes first is an error, after any chunks already parsed.
pub(crate) fn ndjson_chunks(bytes: BoxStream<'static, Result<Vec<u8>>>) -> ChunkStream {
    let state = NdjsonState { bytes, buffer: Vec::new(), pending: VecDeque::new(), done: false };
    stream::unfold(Some((state, None::<anyhow::Error>)), |state| async move {
        let (mut st, mut failure) = state?;
        loop {
            if let Some(chunk) = st.pending.pop_front() {
                return Some((Ok(chunk), Some((st, failure))));
            }
            if let Some(e) = failure.take() {
                return Some((Err(e), None));
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(b)) => {
                    st.buffer.extend_from_slice(&b);
                    if let Err(e) = st.take_lines() {
                        failure = Some(e);
                    }
                }
                Some(Err(e)) => failure = Some(e),
                None => {
                    if let Err(e) = st.finish() {
                        failure = Some(e);
                    }
                    st.done = true;
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes_of(parts: &[&str]) -> BoxStream<'static, Result<Vec<u8>>> {
        let owned: Vec<Result<Vec<u8>>> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(owned).boxed()
    }

    #[tokio::test]
    async fn lines_split_across_reads_are_reassembled() {
        let parts = [
            "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n{\"mess",
            "age\":{\"content\":\"lo\"},\"done\":false}\n",
            "{\"message\":{\"content\":\"\"},\"done\":true}\n",
        ];
        let chunks: Vec<String> = ndjson_chunks(bytes_of(&parts)).map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks, vec!["Hel".to_string(), "lo".to_string()]);
    }

    #[tokio::test]
    async fn content_after_done_is_ignored() {
        let done_first = ["{\"message\":{\"content\":\"a\"},\"done\":true}\n{\"message\":{\"content\":\"b\"}}\n"];
        let chunks: Vec<String> = ndjson_chunks(bytes_of(&done_first)).map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn unterminated_done_line_completes_the_stream() {
        let parts = ["{\"message\":{\"content\":\"tail\"},\"done\":true}"];
        let chunks: Vec<String> = ndjson_chunks(bytes_of(&parts)).map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks, vec!["tail".to_string()]);
    }

    #[tokio::test]
    async fn bytes_ending_before_done_are_an_error() {
        let parts = ["{\"message\":{\"content\":\"half an ans\"},\"done\":false}\n"];
        let items: Vec<Result<String>> = ndjson_chunks(bytes_of(&parts)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "half an ans");
        assert!(items[1].as_ref().unwrap_err().to_string().contains("ended before done"));
    }

    #[tokio::test]
    async fn multibyte_characters_split_across_reads_survive() {
        let line = "{\"message\":{\"content\":\"caf\u{e9}\"},\"done\":false}\n{\"done\":true}\n".as_bytes();
        let cut = line.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let owned: Vec<Result<Vec<u8>>> = vec![Ok(line[..cut].to_vec()), Ok(line[cut..].to_vec())];
        let chunks: Vec<String> = ndjson_chunks(stream::iter(owned).boxed()).map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks, vec!["caf\u{e9}".to_string()]);
    }

    #[tokio::test]
    async fn error_lines_end_the_stream_with_an_error() {
        let parts = ["{\"message\":{\"content\":\"x\"}}\n{\"error\":\"model not found\"}\n"];
        let items: Vec<Result<String>> = ndjson_chunks(bytes_of(&parts)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "x");
        assert!(items[1].as_ref().unwrap_err().to_string().contains("model not found"));
    }
}
