//! Remove command - delete a document from the index

use clap::Args;

use crate::config::Config;

#[derive(Args)]
pub struct RemoveArgs {
    /// Document id (as shown by 'gleaner list')
    pub document_id: String,
}

pub async fn run(args: RemoveArgs) -> anyhow::Result<()> {
    let config = Config::load();
    let (index, documents) = super::build_index(&config)?;

    index.delete_document(&args.document_id).await?;
    let existed = documents.remove(&args.document_id)?;

    if existed {
        println!("Removed document '{}'", args.document_id);
    } else {
        println!(
            "Document '{}' was not in the document store; vector points (if any) were removed",
            args.document_id
        );
    }

    Ok(())
}
