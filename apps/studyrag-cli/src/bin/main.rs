use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use studyrag_core::config::{Config, Settings};
use studyrag_core::traits::SearchCapability;
use studyrag_core::types::{Query, RawHit, SearchFilter};
use studyrag_llm::OllamaClient;
use studyrag_pipeline::{InMemoryMessageStore, LlmIntentClassifier, Pipeline, StreamEvent, StreamOutcome};
use studyrag_text::{collect_jsonl, ChunkIndexer, ChunkSearchEngine};

const INDEX_BATCH: usize = 500;

#[derive(Parser)]
#[command(name = "studyrag")]
#[command(about = "Intent-routed study assistant over your notes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the search index from chunk records (a .jsonl file or a directory of them)
    Index {
        path: PathBuf,
    },

    /// Run one query through the pipeline and print the JSON envelope
    Ask {
        #[arg(long)]
        user: u64,
        #[arg(long)]
        conversation: Option<u64>,
        query: String,
    },

    /// Stream a doubt-clarification answer
    Stream {
        #[arg(long)]
        user: u64,
        query: String,
    },

    /// Print the query graph
    Info,
}

/// Stands in when no index has been built yet; retrieval degrades to empty.
struct MissingIndex(PathBuf);

#[async_trait]
impl SearchCapability for MissingIndex {
    async fn search(&self, _query: &str, _k: usize, _filter: &SearchFilter) -> Result<Vec<RawHit>> {
        bail!("no index at {} (run `studyrag index <path>` first)", self.0.display())
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn open_search(index_dir: &Path) -> Result<Arc<dyn SearchCapability>> {
    if index_dir.join("meta.json").exists() {
        Ok(Arc::new(ChunkSearchEngine::open(index_dir)?))
    } else {
        warn!(index = %index_dir.display(), "search index not found, answers will use general knowledge");
        Ok(Arc::new(MissingIndex(index_dir.to_path_buf())))
    }
}

fn build_pipeline(settings: &Settings, llm: &Arc<OllamaClient>) -> Result<Pipeline> {
    let search = open_search(&settings.data.index_path())?;
    let classifier = Arc::new(LlmIntentClassifier::new(llm.clone(), settings.generation.classification));
    Ok(Pipeline::new(classifier, search, llm.clone(), settings.clone())?)
}

fn index(path: &Path, index_dir: &Path) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("reading {}", path.display()));
    let records = collect_jsonl(path)?;
    spinner.finish_and_clear();
    if records.is_empty() {
        bail!("no chunk records found under {}", path.display());
    }

    let indexer = ChunkIndexer::create(index_dir)?;
    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} chunks").unwrap_or_else(|_| ProgressStyle::default_bar()));
    for batch in records.chunks(INDEX_BATCH) {
        indexer.index_records(batch)?;
        pb.inc(batch.len() as u64);
    }
    pb.finish();
    println!("Indexed {} chunks into {}", records.len(), index_dir.display());
    Ok(())
}

async fn stream(pipeline: &Pipeline, llm: Arc<OllamaClient>, query: Query) -> Result<()> {
    let session = Arc::new(pipeline.streaming_session(Arc::new(InMemoryMessageStore::new()), llm));
    let (mut rx, handle) = session.start(query);
    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::Status { message } | StreamEvent::Info { message } => eprintln!("[{message}]"),
            StreamEvent::Chunk { content } => {
                write!(stdout, "{content}")?;
                stdout.flush()?;
            }
            StreamEvent::Done { .. } => writeln!(stdout)?,
            StreamEvent::Error { message } => eprintln!("error: {message}"),
        }
    }
    match handle.await? {
        StreamOutcome::Failed(e) => Err(e.into()),
        _ => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    let settings = config.settings()?;

    match cli.command {
        Commands::Index { path } => index(&path, &settings.data.index_path())?,
        Commands::Ask { user, conversation, query } => {
            let llm = Arc::new(OllamaClient::new(&settings.llm)?);
            let pipeline = build_pipeline(&settings, &llm)?;
            let mut q = Query::new(user, query);
            if let Some(id) = conversation {
                q = q.in_conversation(id);
            }
            let result = pipeline.run(&q).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Stream { user, query } => {
            let llm = Arc::new(OllamaClient::new(&settings.llm)?);
            if !llm.model_available().await.unwrap_or(false) {
                warn!(model = llm.model(), "model not reported by the server; generation may fail");
            }
            let pipeline = build_pipeline(&settings, &llm)?;
            stream(&pipeline, llm, Query::new(user, query)).await?;
        }
        Commands::Info => {
            let llm = Arc::new(OllamaClient::new(&settings.llm)?);
            let pipeline = build_pipeline(&settings, &llm)?;
            info!(model = llm.model(), "workflow loaded");
            println!("{}", serde_json::to_string_pretty(&pipeline.workflow_info())?);
        }
    }
    Ok(())
}
