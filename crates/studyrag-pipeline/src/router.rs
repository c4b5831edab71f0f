use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use studyrag_core::config::RetrievalProfiles;
use studyrag_core::error::{Error, Result};
use studyrag_core::types::Intent;
use tracing::{info, warn};

pub const CLASSIFY_NODE: &str = "classify_intent";
pub const RETRIEVE_NODE: &str = "retrieve_documents";

/// Generation task a routed query ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    GenerateAnswer,
    EvaluateAnswer,
    ResolveDoubt,
    GenerateQuestions,
}

impl Task {
    pub const ALL: [Task; 4] = [Task::GenerateAnswer, Task::EvaluateAnswer, Task::ResolveDoubt, Task::GenerateQuestions];

    /// `None` means no executor exists for the intent.
    pub fn for_intent(intent: Intent) -> Option<Task> {
        match intent {
            Intent::AnswerGeneration => Some(Task::GenerateAnswer),
            Intent::AnswerEvaluation => Some(Task::EvaluateAnswer),
            Intent::DoubtClarification => Some(Task::ResolveDoubt),
            Intent::QuestionGeneration => Some(Task::GenerateQuestions),
            Intent::ExamPaperGeneration => None,
        }
    }

    pub fn node_name(&self) -> &'static str {
        match self {
            Task::GenerateAnswer => "generate_answer",
            Task::EvaluateAnswer => "evaluate_answer",
            Task::ResolveDoubt => "resolve_doubt",
            Task::GenerateQuestions => "generate_questions",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.node_name())
    }
}

/// Where a run currently is. Stages carry what the next handler needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    Retrieve(Intent),
    Execute(Intent, Task),
    Done,
}

impl Stage {
    /// Name appended to `nodes_visited` on entry. `Done` is not a node.
    pub fn node_name(&self) -> Option<&'static str> {
        match self {
            Stage::Classify => Some(CLASSIFY_NODE),
            Stage::Retrieve(_) => Some(RETRIEVE_NODE),
            Stage::Execute(_, task) => Some(task.node_name()),
            Stage::Done => None,
        }
    }
}

/// Transition table of the query state machine, fixed at construction.
#[derive(Debug, Clone)]
pub struct IntentRouter {
    bound: BTreeMap<Intent, Task>,
    unbound: Vec<Intent>,
}

impl IntentRouter {
    /// Fails when any intent lacks a retrieval profile. Intents without an
    /// executor are accepted and reported; queries for them end in
    /// `UnsupportedIntent` after retrieval.
    pub fn new(profiles: &RetrievalProfiles) -> Result<Self> {
        let missing: Vec<&str> = Intent::ALL.iter().filter(|i| !profiles.covers(**i)).map(Intent::as_str).collect();
        if !missing.is_empty() {
            return Err(Error::InvalidConfig(format!("no retrieval profile for: {}", missing.join(", "))));
        }

        let mut bound = BTreeMap::new();
        let mut unbound = Vec::new();
        for intent in Intent::ALL {
            match Task::for_intent(intent) {
                Some(task) => {
                    bound.insert(intent, task);
                }
                None => unbound.push(intent),
            }
        }
        if !unbound.is_empty() {
            let names: Vec<&str> = unbound.iter().map(Intent::as_str).collect();
            warn!(intents = ?names, "intents without a task executor will be rejected");
        }
        info!(bound = bound.len(), "intent router ready");
        Ok(Self { bound, unbound })
    }

    /// Every classified intent is retrieved for.
    pub fn after_classify(&self, intent: Intent) -> Stage {
        Stage::Retrieve(intent)
    }

    pub fn after_retrieve(&self, intent: Intent) -> Result<Stage> {
        self.bound
            .get(&intent)
            .map(|task| Stage::Execute(intent, *task))
            .ok_or(Error::UnsupportedIntent(intent))
    }

    pub fn after_execute(&self) -> Stage {
        Stage::Done
    }

    pub fn supported_intents(&self) -> Vec<Intent> {
        self.bound.keys().copied().collect()
    }

    pub fn unsupported_intents(&self) -> &[Intent] {
        &self.unbound
    }
}
