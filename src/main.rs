//! # Interview Harness CLI (`ivh`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ivh ingest <file>` | Chunk, embed, and index a text file |
//! | `ivh search "<query>"` | Rank content sources against a query |
//! | `ivh question <job>` | Generate one interview question |
//! | `ivh evaluate` | Evaluate an answer to a question |
//!
//! ```bash
//! ivh ingest resume.txt --collection content --group-key resume_kim
//! ivh question "backend engineer" --mode technical
//! ivh evaluate --question "..." --answer "..." --years 3 \
//!     --job "backend engineer" --mode behavioral
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use interview_harness::config::{load_config, Config};
use interview_harness::embedding::{ContentSpace, HttpEmbedder, QuestionSpace, SpaceEmbedder};
use interview_harness::generate::{ChatModel, StructuredGenerationClient};
use interview_harness::pipeline::{
    chunk_text, EvaluationOutcome, InterviewMode, Pipeline, QuestionOutcome,
};
use interview_harness::store::HttpStore;

/// Interview Harness — hybrid retrieval and structured generation for
/// interview practice.
#[derive(Parser)]
#[command(
    name = "ivh",
    about = "Interview Harness — hybrid retrieval and structured generation for interview practice",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ivh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed, and index a text file.
    Ingest {
        /// Text file to ingest (already extracted; no PDF parsing).
        file: PathBuf,
        /// Target collection: content, technical, or behavioral.
        #[arg(long, default_value = "content")]
        collection: String,
        /// Group key (source identifier) for all chunks of this file.
        #[arg(long)]
        group_key: String,
        /// Publication date (YYYY-MM-DD) for dated collections.
        #[arg(long)]
        date: Option<String>,
        /// Chunk size in characters.
        #[arg(long, default_value_t = 180)]
        chunk_size: usize,
        /// Overlap between consecutive chunks, in characters.
        #[arg(long, default_value_t = 10)]
        overlap: usize,
    },
    /// Rank content sources against a query, one line per source.
    Search {
        query: String,
        #[arg(long, default_value_t = 5000)]
        top_k: usize,
    },
    /// Generate one interview question for a job role.
    Question {
        job: String,
        #[arg(long, default_value = "technical")]
        mode: String,
    },
    /// Evaluate an answer to an interview question.
    Evaluate {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
        #[arg(long)]
        years: String,
        #[arg(long)]
        job: String,
        #[arg(long, default_value = "technical")]
        mode: String,
    },
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let store = Arc::new(HttpStore::new(&config.store)?);
    let content_embedder = SpaceEmbedder::<ContentSpace>::new(Arc::new(HttpEmbedder::new(
        &config.embedding.content,
    )?));
    let question_embedder = SpaceEmbedder::<QuestionSpace>::new(Arc::new(HttpEmbedder::new(
        &config.embedding.question,
    )?));
    let generator = StructuredGenerationClient::new(
        Arc::new(ChatModel::new(&config.generation)?),
        config.generation.max_retries,
        Duration::from_secs(config.generation.retry_delay_secs),
    );

    Ok(Pipeline::new(
        store,
        content_embedder,
        question_embedder,
        generator,
        config.store.clone(),
        config.retrieval.clone(),
        config.generation.num_questions,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let pipeline = build_pipeline(&config)?;

    match cli.command {
        Commands::Ingest {
            file,
            collection,
            group_key,
            date,
            chunk_size,
            overlap,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let date = date
                .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
                .transpose()
                .context("--date must be YYYY-MM-DD")?;

            let chunks = chunk_text(&group_key, &text, date, chunk_size, overlap);
            let written = match collection.as_str() {
                "content" => pipeline.ingest_content(&chunks).await?,
                "technical" => {
                    pipeline
                        .ingest_questions(InterviewMode::Technical, &chunks)
                        .await?
                }
                "behavioral" => {
                    pipeline
                        .ingest_questions(InterviewMode::Behavioral, &chunks)
                        .await?
                }
                other => anyhow::bail!(
                    "Unknown collection: '{}'. Use content, technical, or behavioral.",
                    other
                ),
            };
            println!("ingested {} of {} chunks", written, chunks.len());
        }
        Commands::Search { query, top_k } => {
            let entries = pipeline.search_sources(&query, top_k).await?;
            if entries.is_empty() {
                println!("No documents found.");
            }
            for entry in entries {
                println!("{:.4}  {}", entry.score, entry.group_key);
            }
        }
        Commands::Question { job, mode } => {
            let mode = InterviewMode::from_str(&mode)?;
            match pipeline.create_question(&job, mode).await? {
                QuestionOutcome::Question(question) => println!("{}", question),
                QuestionOutcome::NoContext => println!("No documents found."),
            }
        }
        Commands::Evaluate {
            question,
            answer,
            years,
            job,
            mode,
        } => {
            let mode = InterviewMode::from_str(&mode)?;
            match pipeline
                .evaluate_answer(&question, &answer, &years, &job, mode)
                .await?
            {
                EvaluationOutcome::Evaluated(evaluation) => {
                    println!("{}", serde_json::to_string_pretty(&evaluation)?);
                }
                EvaluationOutcome::NoContext => println!("No documents found."),
            }
        }
    }

    Ok(())
}
