//! Renders scored chunks into the context block handed to generation prompts.
//!
//! Layout is consumed verbatim by prompt templates, so group order (first seen),
//! header text and chunk labels must stay stable.

use std::collections::BTreeSet;

use studyrag_core::types::ScoredHit;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltContext {
    pub text: String,
    pub document_types: BTreeSet<String>,
}

impl BuiltContext {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

pub struct ContextBuilder;

impl ContextBuilder {
    pub fn build(hits: &[ScoredHit]) -> BuiltContext {
        if hits.is_empty() {
            return BuiltContext::default();
        }

        let mut groups: Vec<(&str, Vec<&ScoredHit>)> = Vec::new();
        for hit in hits {
            let doc_type = hit.document_type();
            match groups.iter_mut().find(|(t, _)| *t == doc_type) {
                Some((_, members)) => members.push(hit),
                None => groups.push((doc_type, vec![hit])),
            }
        }

        let mut parts = Vec::with_capacity(groups.len() + hits.len());
        for (doc_type, members) in &groups {
            parts.push(type_header(doc_type));
            for (i, hit) in members.iter().enumerate() {
                parts.push(format!("[Chunk {} | Similarity: {:.2}]\n{}\n", i + 1, hit.similarity(), hit.hit.text));
            }
        }

        BuiltContext {
            text: parts.join("\n"),
            document_types: groups.iter().map(|(t, _)| t.to_string()).collect(),
        }
    }
}

fn type_header(doc_type: &str) -> String {
    format!("\n--- {} ---\n", doc_type.to_uppercase().replace('_', " "))
}
