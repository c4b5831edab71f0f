use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::Serialize;
use studyrag_core::config::Settings;
use studyrag_core::error::{Error, Result};
use studyrag_core::traits::{Generator, IntentClassifier, MessageStore, SearchCapability, StreamGenerator};
use studyrag_core::types::{Intent, Query};
use studyrag_retrieval::{preview, DocumentRetriever, RetrievalScorer};
use tracing::{error, info};

use crate::response::{FailureEnvelope, PipelineResult, SuccessEnvelope};
use crate::router::{IntentRouter, Stage, Task, CLASSIFY_NODE, RETRIEVE_NODE};
use crate::state::PipelineState;
use crate::streaming::{StreamingSession, StreamingSessionAssembler};
use crate::tasks::{AnswerEvaluator, AnswerGenerator, DoubtResolver, QuestionGenerator, TaskContext, TaskExecutor};

/// Static description of the query graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowInfo {
    pub nodes: Vec<&'static str>,
    pub entry_point: &'static str,
    pub supported_intents: Vec<Intent>,
    pub unsupported_intents: Vec<Intent>,
}

/// One executor per task.
pub struct TaskExecutors {
    pub answer: Arc<dyn TaskExecutor>,
    pub evaluation: Arc<dyn TaskExecutor>,
    pub doubt: Arc<dyn TaskExecutor>,
    pub questions: Arc<dyn TaskExecutor>,
}

impl TaskExecutors {
    pub fn from_generator(generator: &Arc<dyn Generator>, settings: &Settings) -> Self {
        let g = &settings.generation;
        Self {
            answer: Arc::new(AnswerGenerator::new(generator.clone(), g.answer)),
            evaluation: Arc::new(AnswerEvaluator::new(generator.clone(), g.evaluation)),
            doubt: Arc::new(DoubtResolver::new(generator.clone(), g.doubt_notes, g.doubt_general)),
            questions: Arc::new(QuestionGenerator::new(generator.clone(), g.questions)),
        }
    }

    fn get(&self, task: Task) -> &dyn TaskExecutor {
        match task {
            Task::GenerateAnswer => self.answer.as_ref(),
            Task::EvaluateAnswer => self.evaluation.as_ref(),
            Task::ResolveDoubt => self.doubt.as_ref(),
            Task::GenerateQuestions => self.questions.as_ref(),
        }
    }
}

/// Drives queries through classify, retrieve and task execution.
///
/// Built once at startup and shared by `Arc`; `run` takes `&self` and keeps
/// all per-query state on its own stack.
pub struct Pipeline {
    classifier: Arc<dyn IntentClassifier>,
    retriever: Arc<DocumentRetriever>,
    router: IntentRouter,
    executors: TaskExecutors,
    settings: Settings,
}

impl Pipeline {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        search: Arc<dyn SearchCapability>,
        generator: Arc<dyn Generator>,
        settings: Settings,
    ) -> Result<Self> {
        let executors = TaskExecutors::from_generator(&generator, &settings);
        Self::with_executors(classifier, search, executors, settings)
    }

    pub fn with_executors(
        classifier: Arc<dyn IntentClassifier>,
        search: Arc<dyn SearchCapability>,
        executors: TaskExecutors,
        settings: Settings,
    ) -> Result<Self> {
        let profiles = Arc::new(settings.retrieval_profiles()?);
        let router = IntentRouter::new(&profiles)?;
        let scorer = RetrievalScorer::new(profiles, settings.retrieval.similarity_threshold);
        let retriever = Arc::new(DocumentRetriever::new(search, scorer, settings.retrieval.overfetch_factor));
        Ok(Self { classifier, retriever, router, executors, settings })
    }

    pub fn workflow_info(&self) -> WorkflowInfo {
        let mut nodes = vec![CLASSIFY_NODE, RETRIEVE_NODE];
        nodes.extend(Task::ALL.iter().map(Task::node_name));
        WorkflowInfo {
            nodes,
            entry_point: CLASSIFY_NODE,
            supported_intents: self.router.supported_intents(),
            unsupported_intents: self.router.unsupported_intents().to_vec(),
        }
    }

    /// Streaming doubt-clarification session sharing this pipeline's retriever.
    pub fn streaming_session(&self, store: Arc<dyn MessageStore>, generator: Arc<dyn StreamGenerator>) -> StreamingSession {
        StreamingSession::new(
            self.retriever.clone(),
            store,
            generator,
            StreamingSessionAssembler::new(self.settings.stream.history_limit),
            self.settings.generation.stream,
            self.settings.stream.channel_capacity,
        )
    }

    /// Never fails: stage errors and panics come back as a failure envelope.
    pub async fn run(&self, query: &Query) -> PipelineResult {
        let started = Instant::now();
        info!(user_id = query.user_id, query = %preview(&query.text, 100), "processing query");

        let mut state = PipelineState::default();
        let outcome = AssertUnwindSafe(self.drive(query, &mut state)).catch_unwind().await;
        state.processing_time_seconds = started.elapsed().as_secs_f64();

        let result = match outcome {
            Ok(Ok(())) => self.envelope(query, &state),
            Ok(Err(e)) => Err(e),
            Err(panic) => Err(Error::Internal(panic_message(panic.as_ref()))),
        };
        match result {
            Ok(success) => {
                info!(
                    intent = %success.intent,
                    nodes = ?success.nodes_visited,
                    elapsed = state.processing_time_seconds,
                    "query processed"
                );
                PipelineResult::Success(success)
            }
            Err(e) => {
                error!(kind = ?e.kind(), error = %e, nodes = ?state.nodes_visited(), "query failed");
                PipelineResult::Failure(FailureEnvelope::new(query, &e, state.processing_time_seconds))
            }
        }
    }

    fn envelope(&self, query: &Query, state: &PipelineState) -> Result<SuccessEnvelope> {
        match (state.intent, state.task_output.clone()) {
            (Some(intent), Some(output)) => Ok(SuccessEnvelope::from_state(query, intent, output, state)),
            _ => Err(Error::Internal("run ended without a task output".into())),
        }
    }

    async fn drive(&self, query: &Query, state: &mut PipelineState) -> Result<()> {
        let mut stage = Stage::Classify;
        loop {
            state.enter(stage);
            stage = match stage {
                Stage::Classify => {
                    let intent = self.classifier.classify(&query.text).await.map_err(|e| Error::classification(&e))?;
                    info!(intent = %intent, "intent classified");
                    state.intent = Some(intent);
                    self.router.after_classify(intent)
                }
                Stage::Retrieve(intent) => {
                    let outcome = self.retriever.retrieve(&query.text, intent, query.user_id, None).await;
                    state.apply_retrieval(outcome);
                    self.router.after_retrieve(intent)?
                }
                Stage::Execute(intent, task) => {
                    info!(task = %task, "executing task");
                    let ctx = TaskContext {
                        query,
                        intent,
                        documents: &state.retrieved_documents,
                        context: &state.context,
                        document_types: &state.document_types_available,
                    };
                    let output = self.executors.get(task).execute(ctx).await.map_err(|e| Error::generation(&e))?;
                    state.task_output = Some(output);
                    self.router.after_execute()
                }
                Stage::Done => return Ok(()),
            };
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("stage panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("stage panicked: {s}")
    } else {
        "stage panicked".to_string()
    }
}
