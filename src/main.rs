use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coderepo_rag::indexer::{CodeChunker, ContentNormalizer};
use coderepo_rag::source::LocalDirectorySource;
use coderepo_rag::{Config, RagClient, build_context};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Index a code repository and query it from the command line
#[derive(Parser)]
#[command(
    name = "coderepo-rag",
    about,
    version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ", built ",
        env!("BUILD_TIMESTAMP"),
        ", backends: ",
        env!("SEMANTIC_BACKENDS"),
        ")"
    )
)]
struct Cli {
    /// Path to a TOML config file (defaults to the platform config path)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh a local directory and print the context for a query
    Query {
        /// Repository directory
        #[arg(long)]
        repo: PathBuf,

        /// Free-text query
        text: String,

        /// Number of chunks to return (defaults to the configured value)
        #[arg(long)]
        max_results: Option<usize>,
    },

    /// Print the chunks of a single file
    Chunk {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::from_file(path)?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => Config::new()?,
    };

    match cli.command {
        Commands::Query {
            repo,
            text,
            max_results,
        } => {
            let max_results = max_results.unwrap_or(config.retrieval.max_results);
            let source = LocalDirectorySource::from_config(&config.source)?;
            let client = RagClient::with_config(config).await?;

            let repository = repo.to_string_lossy().to_string();
            let response = client.refresh_from_source(&repository, &source).await?;
            tracing::info!(
                "Indexed {} of {} files into {} chunks",
                response.files_indexed,
                response.files_received,
                response.chunks_created
            );

            let chunks = client.retrieve(&text, Some(&repository), max_results).await;
            println!("{}", build_context(&chunks));
        }
        Commands::Chunk { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let path = file.to_string_lossy().to_string();

            let normalized = ContentNormalizer::new().normalize(&path, &content)?;
            let chunker = CodeChunker::from_config(&config.chunking);
            for chunk in chunker.chunk_file("local", &path, &normalized) {
                println!("=== chunk {} ({} bytes) ===", chunk.chunk_index, chunk.content.len());
                println!("{}", chunk.content);
            }
        }
    }

    Ok(())
}
