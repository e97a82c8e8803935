//! Ingest command - segment, embed, and index documents

use std::path::{Path, PathBuf};

use clap::Args;
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::Config;
use crate::store::{Document, DocumentRecord};

#[derive(Args)]
pub struct IngestArgs {
    /// Document files and/or directories
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Title override (only for a single file)
    #[arg(long)]
    pub title: Option<String>,

    /// File types to include (comma-separated, e.g., ".txt,.md")
    #[arg(long)]
    pub file_types: Option<String>,

    /// Include hidden files
    #[arg(long)]
    pub include_hidden: bool,
}

pub async fn run(args: IngestArgs, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load();
    let (index, documents) = super::build_index(&config)?;

    let file_types: Option<Vec<String>> = args
        .file_types
        .map(|ft| ft.split(',').map(|s| s.trim().to_string()).collect());

    let files = collect_files(&args.paths, file_types.as_deref(), args.include_hidden);
    if files.is_empty() {
        anyhow::bail!("No documents found to ingest");
    }
    if args.title.is_some() && files.len() > 1 {
        anyhow::bail!("--title only applies when ingesting a single file");
    }

    info!("Ingesting {} file(s)", files.len());

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("valid progress template")
                .progress_chars("#>-"),
        );
        bar
    };

    let cancel = super::cancel_on_ctrl_c();
    let mut total_passages = 0;
    let mut ingested = 0;

    for path in &files {
        if cancel.is_cancelled() {
            progress.abandon_with_message("Cancelled");
            break;
        }

        progress.set_message(path.display().to_string());

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                progress.inc(1);
                continue;
            }
        };

        let document = Document {
            id: path.display().to_string(),
            title: args
                .title
                .clone()
                .unwrap_or_else(|| title_for(path)),
            text,
        };

        // A re-ingested document replaces its old points before indexing.
        index.delete_document(&document.id).await?;
        let passages = index.add_document(&document, &cancel).await?;

        documents.add(&DocumentRecord {
            id: document.id.clone(),
            title: document.title.clone(),
            text: document.text.clone(),
        })?;

        total_passages += passages.len();
        ingested += 1;
        progress.inc(1);
    }

    progress.finish_and_clear();

    if !quiet {
        println!("Ingested {} document(s), {} passage(s)", ingested, total_passages);
    }

    Ok(())
}

fn title_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Collect ingestable files from paths, honoring gitignore rules
fn collect_files(
    paths: &[PathBuf],
    file_types: Option<&[String]>,
    include_hidden: bool,
) -> Vec<PathBuf> {
    let default_types = vec![
        ".txt", ".md", ".rst", ".html", ".json", ".yaml", ".yml", ".toml", ".csv",
    ];

    let allowed: Vec<&str> = file_types
        .map(|ft| ft.iter().map(|s| s.as_str()).collect())
        .unwrap_or(default_types);

    let allowed_ext = |path: &Path| {
        path.extension()
            .map(|ext| {
                let ext = format!(".{}", ext.to_string_lossy());
                allowed.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    };

    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            // Explicitly named files bypass the extension filter
            files.push(path.clone());
        } else if path.is_dir() {
            let walker = WalkBuilder::new(path)
                .hidden(!include_hidden)
                .git_ignore(true)
                .git_global(true)
                .build();

            for entry in walker.flatten() {
                let entry_path = entry.path();
                if entry_path.is_file() && allowed_ext(entry_path) {
                    files.push(entry_path.to_path_buf());
                }
            }
        }
    }

    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_files_filters_extensions() {
        let dir = std::env::temp_dir().join(format!("gleaner-ingest-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("a.md"), "text").unwrap();
        std::fs::write(dir.join("b.bin"), "binary").unwrap();

        let files = collect_files(&[dir.clone()], None, false);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.md"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_named_file_bypasses_filter() {
        let dir = std::env::temp_dir().join(format!("gleaner-ingest-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("notes.weird");
        std::fs::write(&file, "text").unwrap();

        let files = collect_files(&[file.clone()], None, false);
        assert_eq!(files, vec![file]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_title_from_stem() {
        assert_eq!(title_for(Path::new("docs/intro.md")), "intro");
    }
}
