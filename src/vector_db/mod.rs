// The lexical index is always present; semantic backends are optional
pub mod document;
pub mod dual;
pub mod embedded;
pub mod lexical;

// Qdrant is optional (requires external server)
#[cfg(feature = "qdrant-backend")]
pub mod qdrant_client;

pub use document::EnrichedDocument;
pub use dual::DualModeStore;
pub use embedded::EmbeddedVectorStore;
pub use lexical::LexicalIndex;
#[cfg(feature = "qdrant-backend")]
pub use qdrant_client::QdrantSemanticStore;

use crate::types::{Chunk, RepositoryStats, SearchResult};
use anyhow::Result;

/// A document returned by a semantic backend with its similarity
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: EnrichedDocument,
    pub score: f32,
}

/// Embedding-backed similarity search over enriched documents
///
/// Every method may fail; callers treat failures as a reason to fall back,
/// never as a reason to fail the operation.
#[async_trait::async_trait]
pub trait SemanticBackend: Send + Sync {
    /// Prepare collections/models; called once before the backend is used
    async fn initialize(&self) -> Result<()>;

    /// Embed and store documents, returning how many were stored
    async fn index(&self, documents: Vec<EnrichedDocument>) -> Result<usize>;

    /// Nearest documents to `query`, best first
    async fn search(
        &self,
        query: &str,
        limit: usize,
        repository: Option<&str>,
    ) -> Result<Vec<ScoredDocument>>;

    /// Drop every document of one repository
    async fn delete_repository(&self, repository_url: &str) -> Result<()>;

    /// Short backend name used in logs and statistics
    fn name(&self) -> &str;
}

/// Chunk storage seen by the refresh and retrieval orchestrators
#[async_trait::async_trait]
pub trait ChunkStore: Send + Sync {
    /// Index a batch of chunks; an empty batch is a no-op
    async fn add(&self, chunks: Vec<Chunk>) -> Result<usize>;

    /// Up to `max_results` chunks, most relevant first
    async fn search(
        &self,
        query: &str,
        repository: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Remove every chunk of a repository; idempotent
    async fn delete_repository(&self, repository_url: &str) -> Result<()>;

    /// Chunk counts per repository, ordered by repository
    async fn repository_stats(&self) -> Result<Vec<RepositoryStats>>;

    /// `lexical` or `semantic:<backend>`
    fn mode(&self) -> String;
}
