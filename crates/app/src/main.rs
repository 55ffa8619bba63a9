use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use doc_qa_core::{
    ChatProvider, EmbeddingProvider, HashEmbedder, IngestionOptions, OllamaProvider,
    OpenAiProvider, QaEngine, QaOptions,
};
use doc_qa_core::providers::{DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_URL};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Embedding/chat backend. `hash` embeds offline with the
    /// deterministic hashing embedder and still chats via Ollama.
    #[arg(long, value_enum, default_value_t = Backend::Ollama)]
    provider: Backend,

    /// Directory holding the persisted index and chunk metadata.
    #[arg(long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Ollama base URL
    #[arg(long, default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// OpenAI-compatible base URL (API key from OPENAI_API_KEY)
    #[arg(long, default_value = DEFAULT_OPENAI_URL)]
    openai_url: String,

    /// Embedding model id. Must match between ingest and ask; that is
    /// not validated, so changing it requires a rebuild.
    #[arg(long, default_value = "nomic-embed-text")]
    embedding_model: String,

    /// Chat model id
    #[arg(long, default_value = "llama3.2:1b")]
    chat_model: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Ollama,
    Openai,
    Hash,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a document folder and (re)build the index.
    Ingest {
        /// Folder scanned recursively for .txt, .md, .pdf, .docx files.
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long, default_value = "500")]
        chunk_size: usize,
        #[arg(long, default_value = "50")]
        chunk_overlap: usize,
    },
    /// Ask a question against the built index.
    Ask {
        #[arg(long)]
        question: String,
        /// Number of chunks to retrieve.
        #[arg(long, default_value = "3")]
        top_k: usize,
        /// Suppress the source list under the answer.
        #[arg(long, default_value_t = false)]
        hide_sources: bool,
    },
    /// Report index presence and backend availability.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let top_k = match &cli.command {
        Command::Ask { top_k, .. } => *top_k,
        _ => 3,
    };

    let qa_options = QaOptions {
        storage_dir: cli.storage_dir.clone(),
        embedding_model: cli.embedding_model.clone(),
        chat_model: cli.chat_model.clone(),
        top_k,
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "doc-qa boot"
    );

    match cli.provider {
        Backend::Ollama => {
            let engine = QaEngine::new(
                OllamaProvider::new(&cli.ollama_url),
                OllamaProvider::new(&cli.ollama_url),
                qa_options,
            );
            run(engine, cli.command, Some(&cli.ollama_url)).await
        }
        Backend::Openai => {
            let engine = QaEngine::new(
                OpenAiProvider::from_env(&cli.openai_url)?,
                OpenAiProvider::from_env(&cli.openai_url)?,
                qa_options,
            );
            run(engine, cli.command, None).await
        }
        Backend::Hash => {
            let engine = QaEngine::new(
                HashEmbedder::default(),
                OllamaProvider::new(&cli.ollama_url),
                qa_options,
            );
            run(engine, cli.command, Some(&cli.ollama_url)).await
        }
    }
}

async fn run<E, C>(
    engine: QaEngine<E, C>,
    command: Command,
    ollama_url: Option<&str>,
) -> anyhow::Result<()>
where
    E: EmbeddingProvider + Sync,
    C: ChatProvider + Sync,
{
    match command {
        Command::Ingest {
            data_dir,
            chunk_size,
            chunk_overlap,
        } => {
            let options = IngestionOptions {
                chunk_size,
                chunk_overlap,
                embedding_model: engine.options().embedding_model.clone(),
            };

            info!(data_dir = %data_dir.display(), "building index");
            let stats = engine.build_index(&data_dir, &options).await?;

            if !stats.skipped.is_empty() {
                warn!(skipped = stats.skipped.len(), "some files could not be read");
                for skipped in &stats.skipped {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped file");
                }
            }

            println!(
                "indexed {} chunks from {} files (dim {}, model {}) at {}",
                stats.chunks,
                stats.files,
                stats.dim,
                stats.embedding_model,
                stats.ingested_at.to_rfc3339()
            );
        }
        Command::Ask {
            question,
            hide_sources,
            ..
        } => {
            let (answer, sources) = engine.answer(&question).await?;
            println!("{answer}");

            if !hide_sources && !sources.is_empty() {
                println!();
                for hit in &sources {
                    println!("[{}] score={:.4}", hit.source, hit.score);
                }
            }
        }
        Command::Status => {
            if engine.index_built() {
                println!(
                    "index: ready ({})",
                    engine.options().storage_dir.display()
                );
            } else {
                println!(
                    "index: not built yet; run `doc-qa ingest --data-dir <folder>`"
                );
            }

            if let Some(url) = ollama_url {
                match OllamaProvider::new(url).health().await {
                    Ok(models) => {
                        println!("ollama: up, {} models available", models.len());
                        for model in models {
                            println!("  {model}");
                        }
                    }
                    Err(error) => println!("ollama: unavailable ({error})"),
                }
            }
        }
    }

    Ok(())
}
