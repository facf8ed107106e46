//! Core library client for coderepo-rag
//!
//! [`RagClient`] is the single entry point for both orchestrators: refreshing
//! a repository's chunks and retrieving chunks for a query. The store behind
//! it is picked once at construction time; callers never see which mode is
//! active except through [`RagClient::statistics`].

mod refresh;
mod refresh_lock;

use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::indexer::{CodeChunker, ContentNormalizer};
use crate::types::{Chunk, SearchResult, StatisticsResponse};
use crate::vector_db::{ChunkStore, DualModeStore, LexicalIndex, SemanticBackend};
use refresh_lock::RefreshLocks;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "qdrant-backend")]
use crate::vector_db::QdrantSemanticStore;
use crate::embedding::{FastEmbedManager, HashingEmbedder};
use crate::vector_db::EmbeddedVectorStore;
use anyhow::Context;

/// Returned by [`build_context`] for an empty chunk list
pub const NO_RELEVANT_CODE: &str = "No relevant code found for your query.";

/// Main client for the ingestion and retrieval pipeline
///
/// # Example
///
/// ```no_run
/// use coderepo_rag::{Config, RagClient};
/// use std::collections::BTreeMap;
///
/// #[tokio::main]
/// async fn main() -> coderepo_rag::Result<()> {
///     let client = RagClient::with_config(Config::default()).await?;
///
///     let mut files = BTreeMap::new();
///     files.insert("src/Auth.java".to_string(), "class Auth { void login() {} }".to_string());
///     client.refresh("https://github.com/acme/shop", files).await?;
///
///     let chunks = client.retrieve("login", Some("https://github.com/acme/shop"), 5).await;
///     println!("{}", coderepo_rag::build_context(&chunks));
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RagClient {
    pub(crate) store: Arc<dyn ChunkStore>,
    pub(crate) normalizer: ContentNormalizer,
    pub(crate) chunker: Arc<CodeChunker>,
    pub(crate) config: Arc<Config>,
    refresh_locks: Arc<RefreshLocks>,
}

impl RagClient {
    /// Create a client from the default config file and environment
    pub async fn new() -> Result<Self> {
        let config = Config::new()?;
        Self::with_config(config).await
    }

    /// Create a client, connecting the configured semantic backend if any
    ///
    /// A backend that cannot be created or initialized is logged and the
    /// client runs lexical-only for its whole lifetime.
    pub async fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing RAG client");
        tracing::debug!("Semantic backend: {}", config.semantic.backend);
        tracing::debug!(
            "Chunk size: {}, overlap: {}",
            config.chunking.chunk_size,
            config.chunking.overlap
        );

        let backend = match build_backend(&config).await {
            Ok(backend) => backend,
            Err(e) => {
                tracing::warn!(
                    "Semantic backend '{}' unavailable, using lexical index only: {}",
                    config.semantic.backend,
                    e
                );
                None
            }
        };

        Ok(match backend {
            Some(backend) => Self::with_backend(config, backend).await,
            None => Self::lexical_only(config),
        })
    }

    /// Lexical-only client
    pub fn lexical_only(config: Config) -> Self {
        Self::with_store(config, Arc::new(LexicalIndex::new()))
    }

    /// Client over a caller-provided semantic backend
    ///
    /// Initialization failures and timeouts degrade to lexical-only.
    pub async fn with_backend(config: Config, backend: Arc<dyn SemanticBackend>) -> Self {
        let timeout = Duration::from_secs(config.semantic.timeout_secs);

        match tokio::time::timeout(timeout, backend.initialize()).await {
            Ok(Ok(())) => {
                tracing::info!("Using semantic backend: {}", backend.name());
                let store = DualModeStore::new(
                    backend,
                    Arc::new(LexicalIndex::new()),
                    timeout,
                    config.semantic.candidate_multiplier,
                );
                Self::with_store(config, Arc::new(store))
            }
            Ok(Err(e)) => {
                let err = IndexError::InitializationFailed(format!("{}: {:#}", backend.name(), e));
                tracing::warn!("{}, using lexical index only", err);
                Self::lexical_only(config)
            }
            Err(_) => {
                tracing::warn!(
                    "Semantic backend {} did not initialize: {}",
                    backend.name(),
                    IndexError::Timeout(config.semantic.timeout_secs)
                );
                Self::lexical_only(config)
            }
        }
    }

    /// Client over any [`ChunkStore`]
    pub fn with_store(config: Config, store: Arc<dyn ChunkStore>) -> Self {
        let chunker = Arc::new(CodeChunker::from_config(&config.chunking));
        Self {
            store,
            normalizer: ContentNormalizer::new(),
            chunker,
            config: Arc::new(config),
            refresh_locks: Arc::new(RefreshLocks::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn chunker(&self) -> &CodeChunker {
        &self.chunker
    }

    /// Ranked chunks for a query; never fails
    ///
    /// With a repository scope the store is asked for `2 * max_results`
    /// unscoped results, which are then narrowed to the repository. This keeps
    /// in-scope matches that rank below out-of-scope ones in a global top-K.
    pub async fn search(
        &self,
        query: &str,
        repository: Option<&str>,
        max_results: usize,
    ) -> Vec<SearchResult> {
        if query.trim().is_empty() || max_results == 0 {
            return Vec::new();
        }

        let results = match repository {
            None => self.store.search(query, None, max_results).await,
            Some(url) => self
                .store
                .search(query, None, max_results.saturating_mul(2))
                .await
                .map(|results| {
                    results
                        .into_iter()
                        .filter(|r| r.chunk.repository_url == url)
                        .take(max_results)
                        .collect()
                }),
        };

        match results {
            Ok(results) => {
                tracing::debug!("Query {:?} returned {} results", query, results.len());
                results
            }
            Err(e) => {
                tracing::warn!("Search failed for {:?}: {:#}", query, e);
                Vec::new()
            }
        }
    }

    /// Ranked chunks for a query, without scores
    pub async fn retrieve(
        &self,
        query: &str,
        repository: Option<&str>,
        max_results: usize,
    ) -> Vec<Chunk> {
        self.search(query, repository, max_results)
            .await
            .into_iter()
            .map(|r| r.chunk)
            .collect()
    }

    /// Remove every chunk of a repository; idempotent
    pub async fn delete_repository(&self, repository_url: &str) -> Result<()> {
        let _guard = self.refresh_locks.acquire(repository_url).await;
        self.store
            .delete_repository(repository_url)
            .await
            .map_err(|e| IndexError::DeleteFailed(format!("{:#}", e)))?;
        tracing::info!("Deleted repository {}", repository_url);
        Ok(())
    }

    pub async fn statistics(&self) -> Result<StatisticsResponse> {
        let repositories = self
            .store
            .repository_stats()
            .await
            .map_err(|e| IndexError::SearchFailed(format!("{:#}", e)))?;

        Ok(StatisticsResponse {
            total_repositories: repositories.len(),
            total_chunks: repositories.iter().map(|r| r.chunk_count).sum(),
            repositories,
            mode: self.store.mode(),
        })
    }
}

/// Build the configured semantic backend, `None` for lexical-only
async fn build_backend(config: &Config) -> anyhow::Result<Option<Arc<dyn SemanticBackend>>> {
    match config.semantic.backend.as_str() {
        "embedded" => {
            let provider = load_fastembed(&config.semantic.model_name).await?;
            Ok(Some(Arc::new(EmbeddedVectorStore::new(provider))))
        }
        "hashing" => {
            let provider = Arc::new(HashingEmbedder::default());
            Ok(Some(Arc::new(EmbeddedVectorStore::new(provider))))
        }
        #[cfg(feature = "qdrant-backend")]
        "qdrant" => {
            let provider = load_fastembed(&config.semantic.model_name).await?;
            let store = QdrantSemanticStore::with_url(
                &config.semantic.qdrant_url,
                &config.semantic.collection_name,
                provider,
            )?;
            Ok(Some(Arc::new(store)))
        }
        #[cfg(not(feature = "qdrant-backend"))]
        "qdrant" => Err(IndexError::BackendUnavailable(
            "built without the qdrant-backend feature".to_string(),
        )
        .into()),
        _ => Ok(None),
    }
}

/// Load a FastEmbed model off the runtime; the first load may download weights
async fn load_fastembed(model_name: &str) -> anyhow::Result<Arc<FastEmbedManager>> {
    let model_name = model_name.to_string();
    let manager = tokio::task::spawn_blocking(move || FastEmbedManager::from_model_name(&model_name))
        .await
        .context("Embedding model loading task panicked")??;
    Ok(Arc::new(manager))
}

/// Render chunks as one numbered text block
///
/// Returns [`NO_RELEVANT_CODE`] for an empty list.
pub fn build_context(chunks: &[Chunk]) -> String {
    if chunks.is_empty() {
        return NO_RELEVANT_CODE.to_string();
    }

    let mut context = String::from("Here are the relevant code snippets:\n\n");
    for (i, chunk) in chunks.iter().enumerate() {
        context.push_str(&format!("--- Code Snippet {} ---\n", i + 1));
        context.push_str(&format!("File: {}\n", chunk.file_path));
        context.push_str(&format!("Repository: {}\n", chunk.repository_url));
        context.push_str("Content:\n");
        context.push_str(&chunk.content);
        context.push_str("\n\n");
    }
    context
}
