use std::sync::Arc;

use studyrag_core::config::RetrievalProfiles;
use studyrag_core::types::{ChunkMetadata, Intent, RawHit};
use studyrag_retrieval::{priority_boost, ContextBuilder, RetrievalScorer, DEFAULT_SIMILARITY_THRESHOLD};

fn scorer() -> RetrievalScorer {
    RetrievalScorer::new(Arc::new(RetrievalProfiles::default()), DEFAULT_SIMILARITY_THRESHOLD)
}

fn hit(id: u64, doc_type: &str, owner: u64, similarity: f32) -> RawHit {
    RawHit::new(format!("chunk {id}"), ChunkMetadata::new(id, doc_type, owner), similarity)
}

#[test]
fn empty_input_yields_empty_output() {
    let out = scorer().score(vec![], Intent::AnswerGeneration, 1, 10);
    assert!(out.is_empty());
}

#[test]
fn evaluation_boosts_only_marking_scheme() {
    let hits = vec![hit(1, "marking_scheme", 1, 0.75), hit(2, "notes", 1, 0.8)];
    let out = scorer().score(hits, Intent::AnswerEvaluation, 1, 5);
    assert_eq!(out.len(), 2);

    let ms = out.iter().find(|s| s.document_type() == "marking_scheme").expect("marking scheme kept");
    let notes = out.iter().find(|s| s.document_type() == "notes").expect("notes kept");
    assert!(ms.score > ms.similarity());
    assert!((ms.score - 0.85).abs() < 1e-6);
    assert_eq!(notes.score, notes.similarity());
}

#[test]
fn doubt_ranks_notes_above_marking_scheme_at_equal_similarity() {
    let hits = vec![hit(1, "marking_scheme", 1, 0.9), hit(2, "notes", 1, 0.9)];
    let out = scorer().score(hits, Intent::DoubtClarification, 1, 8);
    assert_eq!(out[0].document_type(), "notes");
    assert!((out[0].boost() - 0.2).abs() < 1e-6);
    assert!((out[1].boost() - 0.1).abs() < 1e-6);
}

#[test]
fn private_hits_of_other_users_never_survive() {
    let hits = vec![
        hit(1, "notes", 2, 0.99),
        hit(2, "notes", 2, 0.95),
        RawHit::new("shared", ChunkMetadata::new(3, "notes", 2).public(), 0.9),
        hit(4, "notes", 1, 0.85),
    ];
    let out = scorer().score(hits, Intent::DoubtClarification, 1, 8);
    let ids: Vec<u64> = out.iter().map(|s| s.hit.metadata.document_id).collect();
    assert_eq!(ids, vec![3, 4]);
}

#[test]
fn threshold_applies_after_boost() {
    // 0.55 + 0.3 clears the bar, 0.55 on an unlisted type does not
    let hits = vec![hit(1, "marking_scheme", 1, 0.55), hit(2, "syllabus", 1, 0.55), hit(3, "notes", 1, 0.45)];
    let out = scorer().score(hits, Intent::AnswerGeneration, 1, 10);
    let ids: Vec<u64> = out.iter().map(|s| s.hit.metadata.document_id).collect();
    assert_eq!(ids, vec![1]);
}

#[test]
fn ties_keep_search_order_and_limit_caps() {
    let hits = (0..6).map(|i| hit(i, "notes", 1, 0.8)).collect();
    let out = scorer().score(hits, Intent::QuestionGeneration, 1, 4);
    let ids: Vec<u64> = out.iter().map(|s| s.hit.metadata.document_id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
}

#[test]
fn zero_limit_returns_nothing() {
    let out = scorer().score(vec![hit(1, "notes", 1, 0.99)], Intent::DoubtClarification, 1, 0);
    assert!(out.is_empty());
}

#[test]
fn boost_follows_list_position() {
    let priorities: Vec<String> = ["marking_scheme", "notes", "question_paper"].iter().map(|s| s.to_string()).collect();
    assert!((priority_boost(&priorities, "marking_scheme") - 0.3).abs() < 1e-6);
    assert!((priority_boost(&priorities, "notes") - 0.2).abs() < 1e-6);
    assert!((priority_boost(&priorities, "question_paper") - 0.1).abs() < 1e-6);
    assert_eq!(priority_boost(&priorities, "other"), 0.0);
    assert_eq!(priority_boost(&[], "notes"), 0.0);
}

#[test]
fn empty_corpus_builds_empty_context() {
    let out = scorer().score(vec![], Intent::DoubtClarification, 1, 8);
    let built = ContextBuilder::build(&out);
    assert_eq!(built.text, "");
    assert!(built.document_types.is_empty());
}
