//! studyrag-pipeline
//!
//! The query state machine (`IntentRouter`), its driver (`Pipeline`), the
//! task executors it dispatches to and the streaming doubt-clarification
//! session.
pub mod classifier;
pub mod memory_store;
pub mod orchestrator;
pub mod prompts;
pub mod response;
pub mod router;
pub mod state;
pub mod streaming;
pub mod tasks;

pub use classifier::{parse_classification, Classification, LlmIntentClassifier};
pub use memory_store::InMemoryMessageStore;
pub use orchestrator::{Pipeline, TaskExecutors, WorkflowInfo};
pub use response::{FailureEnvelope, PipelineResult, ResponseMetadata, SuccessEnvelope};
pub use router::{IntentRouter, Stage, Task};
pub use state::{PipelineState, TaskOutput};
pub use streaming::{AssembledPrompt, StreamEvent, StreamOutcome, StreamingSession, StreamingSessionAssembler};
