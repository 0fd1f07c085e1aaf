use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use textbook_rag::config::{load_dotenv, IngestSettings};
use textbook_rag::{ask_question, get_chain, Ingestor};

/// Answer Math 1050 questions from an indexed textbook
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index a textbook (PDF or text) into the vector store
    Ingest {
        /// Path to the document to process
        file_path: PathBuf,
    },
    /// Ask a question; without one, read questions from stdin until `exit`
    Ask {
        /// Question text; words are joined with spaces
        question: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    env_logger::init();

    let args = Args::parse();

    let outcome = match args.command {
        Command::Ingest { file_path } => ingest(file_path).await,
        Command::Ask { question } if question.is_empty() => run_query_loop().await,
        Command::Ask { question } => ask(&question.join(" ")).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn ingest(file_path: PathBuf) -> Result<()> {
    let settings = IngestSettings::from_env()?;
    let ingestor = Ingestor::from_settings(&settings).context("Failed to initialize ingestion")?;

    let report = ingestor
        .ingest_file(&file_path)
        .await
        .with_context(|| format!("Failed to ingest {}", file_path.display()))?;

    info!(
        "{} pages, {} chunks, {} passages written",
        report.pages, report.chunks, report.passages
    );
    println!("Done! The textbook is in the database.");
    Ok(())
}

async fn ask(question: &str) -> Result<()> {
    println!("\nAI Professor is thinking...");
    let answer = ask_question(question).await?;
    println!("{}", answer);
    Ok(())
}

/// Answer questions one at a time; nothing carries over between questions
async fn run_query_loop() -> Result<()> {
    // Fail on configuration before prompting for anything
    get_chain().await?;
    println!("Ready to answer Math 1050 questions. Type 'exit' to quit.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut buffer = String::new();

    loop {
        print!("\nYour question: ");
        stdout.flush()?;

        buffer.clear();
        if stdin.read_line(&mut buffer)? == 0 {
            break;
        }

        let question = buffer.trim();

        if question.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        if let Err(e) = ask(question).await {
            println!("Error: {:#}", e);
        }
    }

    Ok(())
}
