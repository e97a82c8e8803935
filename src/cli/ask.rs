//! Ask command - RAG question answering with streaming output

use std::io::Write;

use clap::Args;
use futures::StreamExt;

use crate::config::Config;
use crate::rag::RagOrchestrator;

#[derive(Args)]
pub struct AskArgs {
    /// Question to ask (omit for interactive mode)
    pub question: Option<String>,

    /// Interactive chat mode
    #[arg(short, long)]
    pub interactive: bool,

    /// Hide the source list after the answer
    #[arg(long)]
    pub no_sources: bool,
}

pub async fn run(args: AskArgs, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load();
    let (index, _documents) = super::build_index(&config)?;
    let llm = super::build_llm(&config)?;

    if !quiet {
        println!("Using {} with model {}", config.llm.provider, llm.model_name());
    }

    let rag = RagOrchestrator::new(index, llm);

    if args.interactive {
        run_interactive(&rag, args.no_sources).await
    } else {
        let question = args.question.ok_or_else(|| {
            anyhow::anyhow!("Question required in non-interactive mode. Use -i for interactive mode.")
        })?;
        ask_question(&rag, &question, args.no_sources).await
    }
}

/// Stream one answer to stdout; Ctrl-C stops the stream, keeping what was
/// already printed
async fn ask_question(rag: &RagOrchestrator, question: &str, no_sources: bool) -> anyhow::Result<()> {
    let cancel = super::cancel_on_ctrl_c();
    let answer = rag.answer(question, &cancel).await?;

    let mut stdout = std::io::stdout();
    let mut stream = answer.stream;
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        print!("{}", fragment);
        stdout.flush()?;
    }
    println!();

    if !no_sources && !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            println!("  {} (score: {:.4})", source.title, source.score);
        }
    }

    Ok(())
}

async fn run_interactive(rag: &RagOrchestrator, no_sources: bool) -> anyhow::Result<()> {
    use std::io::{self, BufRead};

    println!("\nInteractive mode. Type 'quit' or 'exit' to leave.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("You: ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            println!("Goodbye!");
            break;
        }

        println!();
        if let Err(e) = ask_question(rag, input, no_sources).await {
            eprintln!("Error: {}", e);
        }
        println!();
    }

    Ok(())
}
