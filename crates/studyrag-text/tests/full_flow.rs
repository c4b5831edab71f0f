use std::fs;

use studyrag_core::traits::SearchCapability;
use studyrag_core::types::{ChunkMetadata, SearchFilter};
use studyrag_text::{collect_jsonl, ChunkIndexer, ChunkRecord, ChunkSearchEngine};
use tempfile::TempDir;

fn records() -> Vec<ChunkRecord> {
    vec![
        ChunkRecord {
            id: "bio:0".into(),
            text: "Photosynthesis converts light energy into chemical energy in chloroplasts.".into(),
            metadata: ChunkMetadata::new(1, "notes", 7),
        },
        ChunkRecord {
            id: "bio:1".into(),
            text: "Award two marks for naming chlorophyll in photosynthesis answers.".into(),
            metadata: ChunkMetadata::new(2, "marking_scheme", 7),
        },
        ChunkRecord {
            id: "hist:0".into(),
            text: "The treaty ended the war in 1648.".into(),
            metadata: ChunkMetadata::new(3, "notes", 8).public(),
        },
    ]
}

#[tokio::test]
async fn index_and_search_round_trip() {
    let tmp = TempDir::new().unwrap();
    let index_dir = tmp.path().join("index");
    let indexer = ChunkIndexer::create(&index_dir).expect("indexer");
    assert_eq!(indexer.index_records(&records()).expect("index"), 3);

    let engine = ChunkSearchEngine::open(&index_dir).expect("engine");
    let hits = engine.search("photosynthesis chlorophyll", 10, &SearchFilter::default()).await.expect("search");
    assert_eq!(hits.len(), 2);
    assert!((hits[0].similarity - 1.0).abs() < 1e-6, "top hit normalizes to 1.0");
    assert!(hits[1].similarity <= hits[0].similarity);
    assert!(hits.iter().all(|h| h.metadata.owner_user_id == Some(7)));

    let filtered = engine
        .search("photosynthesis", 10, &SearchFilter::document_type("marking_scheme"))
        .await
        .expect("filtered search");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].metadata.document_id, 2);

    let public = engine.search("treaty", 10, &SearchFilter::default()).await.expect("search");
    assert_eq!(public[0].metadata.visibility, "public");
}

#[tokio::test]
async fn query_syntax_in_user_text_does_not_fail() {
    let tmp = TempDir::new().unwrap();
    let indexer = ChunkIndexer::create(tmp.path()).expect("indexer");
    indexer.index_records(&records()).expect("index");
    let engine = ChunkSearchEngine::open(tmp.path()).expect("engine");
    let hits = engine.search("what is (photosynthesis:", 5, &SearchFilter::default()).await;
    assert!(hits.is_ok());
    assert!(engine.search("photosynthesis", 0, &SearchFilter::default()).await.expect("k=0").is_empty());
}

#[test]
fn collects_jsonl_files_from_directory() {
    let tmp = TempDir::new().unwrap();
    let lines: Vec<String> = records().iter().map(|r| serde_json::to_string(r).unwrap()).collect();
    fs::create_dir_all(tmp.path().join("bio")).unwrap();
    fs::write(tmp.path().join("bio/a.jsonl"), format!("{}\n\n{}\n", lines[0], lines[1])).unwrap();
    fs::write(tmp.path().join("b.jsonl"), &lines[2]).unwrap();
    fs::write(tmp.path().join("ignored.txt"), "not a record").unwrap();

    let collected = collect_jsonl(tmp.path()).expect("collect");
    assert_eq!(collected.len(), 3);
    // sorted by path: b.jsonl before bio/a.jsonl
    assert_eq!(collected[0].id, "hist:0");

    let single = collect_jsonl(&tmp.path().join("b.jsonl")).expect("single file");
    assert_eq!(single, vec![records()[2].clone()]);
}

#[tokio::test]
async fn numeric_metadata_survives_indexing_and_search() {
    let tmp = TempDir::new().unwrap();
    let line = r#"{"id":"phys:3","text":"Refraction bends light at a boundary.","metadata":{"document_id":5,"document_type":"notes","user_id":7,"chunk_index":3,"page":2}}"#;
    let corpus = tmp.path().join("phys.jsonl");
    fs::write(&corpus, line).unwrap();
    let records = collect_jsonl(&corpus).expect("numeric extras parse");

    let index_dir = tmp.path().join("index");
    ChunkIndexer::create(&index_dir).unwrap().index_records(&records).unwrap();
    let engine = ChunkSearchEngine::open(&index_dir).unwrap();
    let hits = engine.search("refraction", 5, &SearchFilter::default()).await.expect("search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata.owner_user_id, Some(7));
    assert_eq!(hits[0].metadata.extra.get("chunk_index"), Some(&serde_json::json!(3)));
}
