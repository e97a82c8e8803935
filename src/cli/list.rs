//! List command - show ingested documents

use clap::Args;

#[derive(Args)]
pub struct ListArgs {}

pub async fn run(_args: ListArgs) -> anyhow::Result<()> {
    let documents = super::open_documents()?;
    let entries = documents.list()?;

    if entries.is_empty() {
        println!("No documents ingested yet.");
        println!("\nGet started:");
        println!("  gleaner ingest ./documents");
        return Ok(());
    }

    println!("Ingested documents ({}):", entries.len());
    for (id, title) in &entries {
        println!("  {}  ({})", title, id);
    }

    Ok(())
}
