//! Gleaner - boundary-aware RAG ingestion and retrieval pipeline
//!
//! A single-binary CLI that segments documents into semantically coherent
//! passages, indexes them as vectors, and answers questions with grounded
//! streaming generation.

mod cli;
mod config;
mod embedding;
mod http;
mod llm;
mod rag;
mod segment;
mod store;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; --verbose / --quiet set the default level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    cli.run().await
}
