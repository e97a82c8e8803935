//! Config command - manage Gleaner configuration

use clap::{Args, Subcommand};

use crate::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Initialize config file with defaults
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Show config file path
    Path,
}

pub async fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = Config::load();
            let path = Config::config_path();

            if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("Config file: {} (not found, using defaults)", path.display());
            }
            println!();
            println!("[embedding]");
            println!("provider = \"{}\"", config.embedding.provider);
            println!("model = \"{}\"", config.embedding.model);
            println!("dimensions = {}", config.embedding.dimensions);
            if let Some(host) = &config.embedding.host {
                println!("host = \"{}\"", host);
            }
            if let Some(base_url) = &config.embedding.base_url {
                println!("base_url = \"{}\"", base_url);
            }
            if config.embedding.api_key.is_some() {
                println!("api_key = \"***\"");
            }
            if let Some(model_path) = &config.embedding.model_path {
                println!("model_path = \"{}\"", model_path);
            }
            println!();
            println!("[store]");
            println!("provider = \"{}\"", config.store.provider);
            if let Some(url) = &config.store.url {
                println!("url = \"{}\"", url);
            }
            println!("collection = \"{}\"", config.store.collection);
            println!();
            println!("[llm]");
            println!("provider = \"{}\"", config.llm.provider);
            println!("model = \"{}\"", config.llm.model);
            println!();
            println!("[segmenter]");
            if let Some(model_path) = &config.segmenter.model_path {
                println!("model_path = \"{}\"", model_path);
            }
            println!("max_length = {}", config.segmenter.max_length);
            println!("boundary_threshold = {}", config.segmenter.boundary_threshold);
        }

        ConfigCommands::Init { force } => {
            let path = Config::config_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            if path.exists() && force {
                std::fs::remove_file(&path)?;
            }

            Config::create_example_if_missing()?;
            println!("Created config file at {}", path.display());
            println!();
            println!("Edit the file to pick your embedding, store, and LLM providers.");
            println!();
            println!("Common configurations:");
            println!();
            println!("  # Ollama (local)");
            println!("  [embedding]");
            println!("  provider = \"ollama\"");
            println!("  model = \"nomic-embed-text\"");
            println!("  dimensions = 768");
            println!();
            println!("  # OpenAI");
            println!("  [embedding]");
            println!("  provider = \"openai\"");
            println!("  model = \"text-embedding-3-small\"");
            println!("  dimensions = 1536");
            println!("  # api_key = \"sk-...\"  # or set OPENAI_API_KEY");
        }

        ConfigCommands::Path => {
            println!("{}", Config::config_path().display());
        }
    }

    Ok(())
}
