use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use localrag_core::{
    append_to_history, list_documents, load_dotenv, Answerer, ChunkStream, ChunkingConfig,
    DefaultAssistant, EmbeddingBackend, LopdfExtractor, Message, QdrantStore, Settings,
    VectorStoreAdapter,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod ui;

/// Exit status when `ingest` finds no PDFs to process.
const NOTHING_TO_DO: u8 = 3;

#[derive(Parser)]
#[command(name = "localrag", version, about = "Ask questions about a folder of PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Chunk, embed and store every PDF in the data directory.
    Ingest {
        /// Folder holding the PDFs. Defaults to LOCALRAG_DATA_DIR.
        data_dir: Option<PathBuf>,
    },
    /// Ask a single question, or start an interactive session when none is given.
    Query {
        question: Option<String>,
        /// Only retrieve chunks from this file name.
        #[arg(long)]
        source: Option<String>,
    },
    /// Run the HTTP question-answering service.
    ServeApi {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Run the browser chat UI against a running service.
    ServeUi {
        #[arg(long, env = "LOCALRAG_API_URL", default_value = "http://localhost:8000")]
        api_url: String,
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value_t = 8501)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    load_dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "localrag boot"
    );

    match cli.command {
        Command::Ingest { data_dir } => {
            let settings = Settings::from_env()?;
            let settings = match data_dir {
                Some(dir) => settings.with_data_dir(dir),
                None => settings,
            };
            settings.log_summary();
            ingest(&settings, &mut std::io::stdout()).await
        }
        Command::Query { question, source } => {
            let settings = Settings::from_env()?;
            settings.log_summary();
            let assistant = DefaultAssistant::from_settings(&settings)?;
            match question {
                Some(question) => {
                    let answer = assistant.answer(&question, &[], source.as_deref()).await?;
                    println!("{answer}");
                }
                None => interactive(&assistant, source.as_deref()).await?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::ServeApi { host, port } => {
            let settings = Settings::from_env()?;
            settings.log_summary();
            api::serve(&settings, &host, port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::ServeUi {
            api_url,
            host,
            port,
        } => {
            ui::serve(&api_url, &host, port).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Store every PDF in `settings.data_dir`, writing a progress report to `out`.
async fn ingest(settings: &Settings, out: &mut impl Write) -> anyhow::Result<ExitCode> {
    let files = list_documents(&settings.data_dir);
    if files.is_empty() {
        writeln!(out, "No PDF files found in {}", settings.data_dir.display())?;
        return Ok(ExitCode::from(NOTHING_TO_DO));
    }
    writeln!(out, "Found {} PDF file(s) in {}", files.len(), settings.data_dir.display())?;

    let config = ChunkingConfig::from_settings(settings)?;
    let index = QdrantStore::new(&settings.qdrant_url, &settings.qdrant_collection_name)
        .with_api_key(settings.qdrant_api_key.clone());
    let adapter = VectorStoreAdapter::new(index, EmbeddingBackend::from_settings(settings))
        .with_batch_size(settings.embedding_batch_size);

    let report = adapter
        .ingest(ChunkStream::from_files(files, config, LopdfExtractor))
        .await?;

    writeln!(
        out,
        "Stored {} chunk(s) in collection '{}'",
        report.stored, settings.qdrant_collection_name
    )?;
    for skipped in &report.skipped_files {
        writeln!(out, "Skipped {skipped}")?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Read questions from stdin until an empty line, `exit` or `quit`. Failed
/// answers are reported and the session continues.
async fn interactive(assistant: &DefaultAssistant, source: Option<&str>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut history: Vec<Message> = Vec::new();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if ends_session(question) {
            break;
        }

        match assistant.answer(question, &history, source).await {
            Ok(answer) => {
                println!("{answer}\n");
                append_to_history(&mut history, question, &answer);
            }
            Err(error) => eprintln!("error: {error}\n"),
        }
    }
    Ok(())
}

/// An empty line, `exit` or `quit` ends an interactive session.
fn ends_session(input: &str) -> bool {
    matches!(input.trim(), "" | "exit" | "quit")
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
