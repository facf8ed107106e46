use super::RagClient;
use crate::error::{IndexError, RagError, Result};
use crate::source::RepositorySource;
use crate::types::{FileMap, RefreshResponse};
use std::time::Instant;
use tokio::task::JoinHandle;

impl RagClient {
    /// Replace a repository's chunks with chunks built from `files`
    ///
    /// Runs delete, normalize, chunk, insert in that order. A file that fails
    /// to normalize aborts the refresh before anything is inserted, leaving
    /// the repository empty rather than half-indexed. Concurrent refreshes of
    /// the same repository run one after another.
    pub async fn refresh(&self, repository_url: &str, files: FileMap) -> Result<RefreshResponse> {
        let start = Instant::now();
        let _guard = self.refresh_locks.acquire(repository_url).await;

        tracing::info!(
            "Refreshing {} ({} files)",
            repository_url,
            files.len()
        );

        self.store
            .delete_repository(repository_url)
            .await
            .map_err(|e| IndexError::DeleteFailed(format!("{:#}", e)))?;

        let files_received = files.len();
        let normalizer = self.normalizer;
        let chunker = self.chunker.clone();
        let url = repository_url.to_string();

        let (files_indexed, chunks) = tokio::task::spawn_blocking(move || {
            let normalized = normalizer.normalize_files(&files)?;
            let chunks = chunker.chunk_files(&url, &normalized);
            Ok::<_, RagError>((normalized.len(), chunks))
        })
        .await
        .map_err(|e| RagError::other(format!("Refresh task failed: {}", e)))??;

        let chunks_created = if chunks.is_empty() {
            tracing::info!("No processable files in {}", repository_url);
            0
        } else {
            self.store
                .add(chunks)
                .await
                .map_err(|e| IndexError::StoreFailed(format!("{:#}", e)))?
        };

        let response = RefreshResponse {
            repository_url: repository_url.to_string(),
            files_received,
            files_indexed,
            chunks_created,
            duration_ms: start.elapsed().as_millis() as u64,
            refreshed_at: chrono::Utc::now().to_rfc3339(),
        };

        tracing::info!(
            "Refreshed {}: {} files, {} chunks in {}ms",
            repository_url,
            response.files_indexed,
            response.chunks_created,
            response.duration_ms
        );
        Ok(response)
    }

    /// Fire-and-forget refresh
    ///
    /// The outcome is only logged. The handle carries no result and exists so
    /// callers that care can wait for completion.
    pub fn refresh_in_background(&self, repository_url: &str, files: FileMap) -> JoinHandle<()> {
        let client = self.clone();
        let url = repository_url.to_string();

        tokio::spawn(async move {
            match client.refresh(&url, files).await {
                Ok(response) => tracing::info!(
                    "Background refresh of {} finished with {} chunks",
                    url,
                    response.chunks_created
                ),
                Err(e) => tracing::warn!("Background refresh of {} failed: {}", url, e),
            }
        })
    }

    /// Fetch a repository's files from `source`, then refresh it
    ///
    /// A fetch failure is returned unchanged and leaves the index untouched.
    pub async fn refresh_from_source(
        &self,
        repository_url: &str,
        source: &dyn RepositorySource,
    ) -> Result<RefreshResponse> {
        let files = source.fetch_files(repository_url).await?;
        self.refresh(repository_url, files).await
    }
}
