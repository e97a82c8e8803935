//! Search command - query indexed passages

use clap::Args;
use tracing::info;

use crate::config::Config;

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Number of results to return
    #[arg(long, default_value = "5")]
    pub top_k: usize,

    /// Group hits into documents instead of raw passages
    #[arg(long)]
    pub documents: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

pub async fn run(args: SearchArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let (index, _documents) = super::build_index(&config)?;

    info!("Searching collection '{}'", config.store.collection);

    if args.documents {
        let results = index.search_documents(&args.query, args.top_k).await?;

        if args.format == "json" {
            let json: Vec<serde_json::Value> = results
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "document_id": r.document_id,
                        "title": r.title,
                        "best_score": r.best_score,
                        "relevant_passages": r.relevant_passages,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
            return Ok(());
        }

        println!("\nDocuments for '{}' ({} found):\n", args.query, results.len());
        for (i, result) in results.iter().enumerate() {
            println!("{}. {} (score: {:.4})", i + 1, result.title, result.best_score);
            for passage in &result.relevant_passages {
                println!("   {}", truncate_display(passage));
            }
            println!();
        }
        return Ok(());
    }

    let hits = index.search(&args.query, args.top_k).await?;

    if args.format == "json" {
        let json: Vec<serde_json::Value> = hits
            .iter()
            .map(|h| {
                serde_json::json!({
                    "document_id": h.document_id,
                    "title": h.title,
                    "passage_index": h.passage_index,
                    "score": h.score,
                    "text": h.passage_text,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("\nSearch results for '{}' (top {}):\n", args.query, hits.len());
    for (i, hit) in hits.iter().enumerate() {
        println!("{}. Score: {:.4}  [{} #{}]", i + 1, hit.score, hit.title, hit.passage_index);
        println!("   {}", truncate_display(&hit.passage_text));
        println!();
    }

    Ok(())
}

fn truncate_display(text: &str) -> String {
    const LIMIT: usize = 200;
    if text.chars().count() > LIMIT {
        let cut: String = text.chars().take(LIMIT).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}
