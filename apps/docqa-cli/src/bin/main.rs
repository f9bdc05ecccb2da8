use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use docqa_chat::{Assistant, OpenAiCompatible};
use docqa_core::config::{Config, Settings};
use docqa_core::normalize::normalize;
use docqa_core::{Chunker, Conversation, RetrievalResult};
use docqa_embed::{build_embedder, needs_credential};
use docqa_pdf::PdfExtractor;

#[derive(Parser)]
#[command(name = "docqa", about = "Ask questions about a PDF", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one question and exit
    Ask {
        pdf: PathBuf,
        /// Question words, joined with spaces
        #[arg(required = true)]
        question: Vec<String>,
        /// Print the retrieved passages to stderr
        #[arg(long)]
        sources: bool,
    },

    /// Ask questions interactively until an empty line or "exit"
    Chat {
        pdf: PathBuf,
        /// Print the retrieved passages to stderr
        #[arg(long)]
        sources: bool,
    },

    /// Show extraction and chunking results without indexing
    Inspect {
        pdf: PathBuf,
        /// Print every chunk
        #[arg(long)]
        chunks: bool,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();
}

fn spinner(msg: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Resolve credentials and build the assistant, then index `pdf`.
fn load_assistant(settings: Settings, pdf: &Path) -> anyhow::Result<Assistant> {
    let hf_token = if needs_credential(&settings.embedding) {
        Some(settings.embedding.credential.resolve().context("embedding credential")?)
    } else { None };
    let groq_key = settings.generation.credential.resolve().context("generation credential")?;

    let embedder = build_embedder(&settings.embedding, hf_token)?;
    let synthesizer = Arc::new(OpenAiCompatible::new(&settings.generation, groq_key)?);
    let assistant = Assistant::new(settings, embedder, synthesizer)?;

    let pb = spinner(&format!("Indexing {}", pdf.display()))?;
    let loaded = assistant.load_pdf(pdf);
    pb.finish_and_clear();
    let generation = match loaded {
        Ok(g) => g,
        Err(docqa_core::Error::Extraction(docqa_core::ExtractionError::NoText(_))) => bail!("Failed to extract text from the PDF."),
        Err(e) => return Err(e.into()),
    };
    eprintln!("✅ {} ready: {} pages, {} chunks", generation.document.source, generation.document.pages.len(), generation.chunks.len());
    Ok(assistant)
}

fn print_sources(passages: &RetrievalResult) {
    for (i, p) in passages.iter().enumerate() {
        let preview: String = p.chunk.content.chars().take(120).collect();
        eprintln!("  [{}] chunk {} score {:.4}: {}", i + 1, p.chunk.index, p.score, preview.replace('\n', " "));
    }
}

/// Print fragments to stdout as they arrive.
fn stream_answer(assistant: &Assistant, question: &str, conversation: &mut Conversation, sources: bool) -> anyhow::Result<()> {
    let mut stream = assistant.ask_stream(question, conversation)?;
    if sources { print_sources(stream.passages()); }
    let mut out = io::stdout().lock();
    for fragment in &mut stream {
        write!(out, "{}", fragment?)?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    match cli.command {
        Command::Ask { pdf, question, sources } => {
            let question = question.join(" ");
            info!(pdf = %pdf.display(), "ask");
            let assistant = load_assistant(settings, &pdf)?;
            let mut conversation = Conversation::new();
            stream_answer(&assistant, &question, &mut conversation, sources)?;
        }
        Command::Chat { pdf, sources } => {
            info!(pdf = %pdf.display(), "chat");
            let assistant = load_assistant(settings, &pdf)?;
            let mut conversation = Conversation::new();
            eprintln!("💬 Ask about the document (empty line or \"exit\" to quit)");
            let stdin = io::stdin();
            loop {
                eprint!("> ");
                io::stderr().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 { break; }
                let question = line.trim();
                if question.is_empty() || question == "exit" || question == "quit" { break; }
                if let Err(e) = stream_answer(&assistant, question, &mut conversation, sources) {
                    eprintln!("\n⚠️  {e:#}");
                }
            }
            info!(turns = conversation.len(), "chat finished");
        }
        Command::Inspect { pdf, chunks: show_chunks } => {
            let document = PdfExtractor::new(&settings.extraction).extract_path(&pdf)?;
            let text = normalize(&document.raw_text());
            let chunker = Chunker::from_settings(&settings.chunking)?;
            let chunks = chunker.split(&text, &document.id);
            println!("source:   {}", document.source);
            println!("id:       {}", document.id);
            println!("pages:    {}", document.pages.iter().map(|p| p.number.to_string()).collect::<Vec<_>>().join(","));
            println!("chars:    {} raw, {} normalized", document.raw_text().chars().count(), text.chars().count());
            println!("chunks:   {} (size {}, overlap {})", chunks.len(), chunker.size(), chunker.overlap());
            if show_chunks {
                for c in &chunks { println!("\n--- chunk {} [{}..{}] ---\n{}", c.index, c.start, c.end, c.content); }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_collects_question_words_and_flags() {
        let cli = Cli::try_parse_from(["docqa", "ask", "pets.pdf", "What", "are", "dogs?", "--sources"]).unwrap();
        match cli.command {
            Command::Ask { pdf, question, sources } => {
                assert_eq!(pdf, PathBuf::from("pets.pdf"));
                assert_eq!(question.join(" "), "What are dogs?");
                assert!(sources);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn ask_requires_a_question() {
        assert!(Cli::try_parse_from(["docqa", "ask", "pets.pdf"]).is_err());
        assert!(Cli::try_parse_from(["docqa", "summarize", "pets.pdf"]).is_err());
    }
}
