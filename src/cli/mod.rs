//! CLI module - command definitions and handlers

mod ask;
mod config_cmd;
mod ingest;
mod list;
mod remove;
mod search;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

pub use ask::AskArgs;
pub use config_cmd::ConfigArgs;
pub use ingest::IngestArgs;
pub use list::ListArgs;
pub use remove::RemoveArgs;
pub use search::SearchArgs;

use crate::config::Config;
use crate::embedding::{EmbeddingMode, EmbeddingProvider};
use crate::llm::{LlmProvider, LlmType};
use crate::segment::{NoBoundaryModel, Segmenter, WhitespaceTokenizer};
use crate::store::{JsonlDocumentStore, MemoryStore, QdrantStore, VectorIndex, VectorStore};

/// Gleaner - document ingestion and retrieval for RAG
#[derive(Parser)]
#[command(name = "gleaner")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest documents into the vector collection
    Ingest(IngestArgs),

    /// Search indexed passages
    Search(SearchArgs),

    /// Ask a question with a grounded streaming answer
    Ask(AskArgs),

    /// List ingested documents
    List(ListArgs),

    /// Remove a document from the index
    Remove(RemoveArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

impl Cli {
    /// Default log filter for the chosen verbosity; `RUST_LOG` overrides it
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "gleaner=debug,info"
        } else if self.quiet {
            "gleaner=error"
        } else {
            "gleaner=info,warn"
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Ingest(args) => ingest::run(args, self.quiet).await,
            Commands::Search(args) => search::run(args).await,
            Commands::Ask(args) => ask::run(args, self.quiet).await,
            Commands::List(args) => list::run(args).await,
            Commands::Remove(args) => remove::run(args).await,
            Commands::Config(args) => config_cmd::run(args).await,
        }
    }
}

/// Local data directory holding the document store
pub(crate) fn data_dir() -> PathBuf {
    PathBuf::from(".gleaner")
}

pub(crate) fn build_embedder(config: &Config) -> anyhow::Result<Arc<EmbeddingProvider>> {
    let mode = match config.embedding.provider.as_str() {
        "openai" => EmbeddingMode::OpenAI {
            api_key: config.embedding.api_key.clone(),
            base_url: config.embedding.base_url.clone(),
        },
        "ollama" => EmbeddingMode::Ollama {
            host: config.embedding.host.clone(),
        },
        "simulated" => EmbeddingMode::Simulated,
        #[cfg(feature = "local-inference")]
        "local" => EmbeddingMode::Local {
            model_path: config.embedding.model_path.clone(),
        },
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    };

    Ok(Arc::new(EmbeddingProvider::new(
        config.embedding.model.clone(),
        config.embedding.dimensions,
        mode,
    )?))
}

pub(crate) fn build_store(config: &Config) -> anyhow::Result<Arc<dyn VectorStore>> {
    match config.store.provider.as_str() {
        "qdrant" => {
            let url = config
                .store
                .url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("store.url required for the qdrant provider"))?;
            Ok(Arc::new(QdrantStore::new(url)))
        }
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => anyhow::bail!("Unknown store provider: {}", other),
    }
}

pub(crate) fn build_segmenter(config: &Config) -> anyhow::Result<Arc<Segmenter>> {
    #[cfg(feature = "local-inference")]
    if let Some(model_path) = &config.segmenter.model_path {
        let tokenizer = crate::segment::HfTokenizer::from_file(
            &std::path::Path::new(model_path).join("tokenizer.json"),
        )?;
        let model = crate::segment::BertBoundaryModel::new(model_path)?;
        return Ok(Arc::new(
            Segmenter::new(Arc::new(tokenizer), Arc::new(model), config.segmenter.max_length)
                .with_threshold(config.segmenter.boundary_threshold),
        ));
    }

    #[cfg(not(feature = "local-inference"))]
    if config.segmenter.model_path.is_some() {
        anyhow::bail!(
            "segmenter.model_path is set but this build lacks the local-inference feature"
        );
    }

    // Without a boundary model, segmentation falls back to blank-line blocks
    // plus small-paragraph merging.
    Ok(Arc::new(Segmenter::new(
        Arc::new(WhitespaceTokenizer),
        Arc::new(NoBoundaryModel),
        config.segmenter.max_length,
    )))
}

pub(crate) fn build_llm(config: &Config) -> anyhow::Result<Arc<LlmProvider>> {
    let llm_type = match config.llm.provider.as_str() {
        "ollama" => LlmType::Ollama {
            host: config.llm.host.clone(),
        },
        "openai" => LlmType::OpenAI {
            api_key: config.llm.api_key.clone(),
            base_url: config.llm.base_url.clone(),
        },
        "anthropic" => LlmType::Anthropic {
            api_key: config.llm.api_key.clone(),
            base_url: config.llm.base_url.clone(),
        },
        "simulated" => LlmType::Simulated,
        other => anyhow::bail!("Unknown LLM provider: {}", other),
    };

    Ok(Arc::new(LlmProvider::new(config.llm.model.clone(), llm_type)?))
}

pub(crate) fn open_documents() -> anyhow::Result<Arc<JsonlDocumentStore>> {
    Ok(Arc::new(JsonlDocumentStore::open(&data_dir())?))
}

/// Wire config into a ready vector index plus its document store
pub(crate) fn build_index(
    config: &Config,
) -> anyhow::Result<(Arc<VectorIndex>, Arc<JsonlDocumentStore>)> {
    let documents = open_documents()?;
    let index = VectorIndex::new(
        build_store(config)?,
        documents.clone(),
        build_embedder(config)?,
        build_segmenter(config)?,
        config.store.collection.clone(),
    );
    Ok((Arc::new(index), documents))
}

/// A token that trips on the first Ctrl-C
pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    cancel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag_raises_log_level() {
        let cli = Cli::parse_from(["gleaner", "--verbose", "list"]);
        assert_eq!(cli.log_filter(), "gleaner=debug,info");
    }

    #[test]
    fn test_quiet_flag_lowers_log_level() {
        let cli = Cli::parse_from(["gleaner", "--quiet", "list"]);
        assert_eq!(cli.log_filter(), "gleaner=error");
    }

    #[test]
    fn test_default_log_level() {
        let cli = Cli::parse_from(["gleaner", "list"]);
        assert_eq!(cli.log_filter(), "gleaner=info,warn");
    }
}
