//! Ollama-backed `Generator` and `StreamGenerator`.
pub mod ollama;

pub use ollama::OllamaClient;
