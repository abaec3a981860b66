//! EdgeLink CLI - Command-line interface
//!
//! Usage:
//!   edgelink add <text> [--source <name>] [--meta key=value]...
//!   edgelink add --file <path>
//!   edgelink ask <question> [--top-k <n>]
//!   edgelink update <id> <text> [--meta key=value]...
//!   edgelink delete <id>
//!   edgelink count

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use edgelink_core::{AppConfig, Metadata, SOURCE_KEY};
use edgelink_rag::{create_llm_client, normalize_top_k, AnswerOrchestrator};
use edgelink_vector::DocumentStore;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "edgelink")]
#[command(about = "Question answering over a managed document collection")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); falls back to EDGELINK_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a document to the collection
    Add {
        /// Document text
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        text: Option<String>,

        /// Read the document text from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Citation label (defaults to the file name with --file)
        #[arg(short, long)]
        source: Option<String>,

        /// Extra metadata as key=value
        #[arg(short, long = "meta", value_parser = parse_key_val)]
        metadata: Vec<(String, String)>,
    },
    /// Ask a question
    Ask {
        /// Question to ask
        question: String,

        /// Number of documents to retrieve
        #[arg(short = 'k', long, allow_negative_numbers = true)]
        top_k: Option<i64>,
    },
    /// Replace a document's text and merge metadata
    Update {
        id: String,
        text: String,

        #[arg(short, long = "meta", value_parser = parse_key_val)]
        metadata: Vec<(String, String)>,
    },
    /// Delete a document
    Delete { id: String },
    /// Print the number of stored documents
    Count,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid key=value: no `=` found in `{s}`"))?;
    if key.trim().is_empty() {
        return Err(format!("invalid key=value: empty key in `{s}`"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn to_metadata(pairs: Vec<(String, String)>) -> Option<Metadata> {
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.into_iter().collect())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config).context("failed to load configuration")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = Arc::new(DocumentStore::from_config(&config).await?);

    match cli.command {
        Commands::Add {
            text,
            file,
            source,
            metadata,
        } => {
            let (text, default_source) = match (text, file) {
                (Some(text), _) => (text, None),
                (None, Some(path)) => {
                    let text = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                    (text, name)
                }
                (None, None) => bail!("either <TEXT> or --file is required"),
            };

            let mut metadata = to_metadata(metadata).unwrap_or_default();
            if let Some(source) = source.or(default_source) {
                metadata.insert(SOURCE_KEY.to_string(), source);
            }

            let id = store.add(&text, Some(metadata)).await?;
            println!("{}", json!({ "document_id": id }));
        }
        Commands::Ask { question, top_k } => {
            let top_k = normalize_top_k(top_k, config.rag.default_top_k, config.rag.max_top_k);
            let orchestrator = AnswerOrchestrator::new(
                Arc::clone(&store),
                create_llm_client(&config.llm),
                config.rag.clone(),
            );

            let answer = orchestrator.generate_answer(&question, top_k).await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::Update { id, text, metadata } => {
            store.update(&id, &text, to_metadata(metadata)).await?;
            println!("{}", json!({ "document_id": id, "status": "updated" }));
        }
        Commands::Delete { id } => {
            store.delete(&id).await?;
            println!("{}", json!({ "document_id": id, "status": "deleted" }));
        }
        Commands::Count => {
            println!("{}", store.count().await?);
        }
    }

    Ok(())
}
