//! Semantic-first store that silently degrades to the lexical index
//!
//! The lexical index always receives every chunk and every delete, so it is
//! both the fallback and the authority on which chunks are live. Semantic
//! failures and timeouts are logged and answered from the lexical index.
//! A repository whose chunks the backend failed to store is served lexically
//! until it is deleted, since the backend cannot find it.

use super::{ChunkStore, EnrichedDocument, LexicalIndex, ScoredDocument, SemanticBackend};
use crate::error::IndexError;
use crate::indexer::StructureTags;
use crate::query::{preprocess_query, smart_filter};
use crate::types::{Chunk, RepositoryStats, SearchResult};
use anyhow::Result;
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Documents per semantic `index` call; each call gets its own deadline
const INDEX_BATCH_SIZE: usize = 64;

pub struct DualModeStore {
    semantic: Arc<dyn SemanticBackend>,
    lexical: Arc<LexicalIndex>,
    timeout: Duration,
    candidate_multiplier: usize,
    lexical_only: RwLock<HashSet<String>>,
}

impl DualModeStore {
    pub fn new(
        semantic: Arc<dyn SemanticBackend>,
        lexical: Arc<LexicalIndex>,
        timeout: Duration,
        candidate_multiplier: usize,
    ) -> Self {
        Self {
            semantic,
            lexical,
            timeout,
            candidate_multiplier: candidate_multiplier.max(1),
            lexical_only: RwLock::new(HashSet::new()),
        }
    }

    pub fn lexical(&self) -> &Arc<LexicalIndex> {
        &self.lexical
    }

    /// Run a backend call under the configured deadline
    async fn guarded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(IndexError::Timeout(self.timeout.as_secs()).into()),
        }
    }

    async fn semantic_search(
        &self,
        query: &str,
        repository: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<SearchResult>> {
        let processed = preprocess_query(query);
        let limit = max_results.saturating_mul(self.candidate_multiplier);

        let candidates = self
            .guarded(self.semantic.search(&processed, limit, repository))
            .await?;

        let live: Vec<SearchResult> = candidates
            .into_iter()
            .filter(|c| repository.is_none_or(|url| c.document.repository_url() == url))
            .filter_map(|c| self.live_result(c))
            .collect();

        // Filter on the raw query: stop-word removal must not hide intent
        let results = smart_filter(query, live, |r: &SearchResult| {
            StructureTags::detect(&r.chunk.file_path, &r.chunk.content)
        });

        Ok(results.into_iter().take(max_results).collect())
    }

    /// Whether a search over `repository` must skip the semantic backend
    ///
    /// An unscoped search is answered lexically while any repository is
    /// missing from the backend, so that repository stays visible.
    fn serves_lexically(&self, repository: Option<&str>) -> bool {
        let lexical_only = self
            .lexical_only
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match repository {
            Some(url) => lexical_only.contains(url),
            None => !lexical_only.is_empty(),
        }
    }

    fn mark_lexical_only(&self, repositories: BTreeSet<String>) {
        self.lexical_only
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(repositories);
    }

    /// Map a semantic hit back to its live lexical chunk
    ///
    /// Hits for chunks that were deleted or replaced since they were embedded
    /// are dropped.
    fn live_result(&self, candidate: ScoredDocument) -> Option<SearchResult> {
        let hit = &candidate.document.chunk;
        let live = self
            .lexical
            .get_chunk(&hit.repository_url, &hit.file_path, hit.chunk_index)?;
        if live.content != hit.content {
            return None;
        }
        Some(SearchResult {
            chunk: live,
            score: candidate.score,
        })
    }
}

#[async_trait::async_trait]
impl ChunkStore for DualModeStore {
    async fn add(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let documents: Vec<EnrichedDocument> = chunks
            .iter()
            .cloned()
            .map(EnrichedDocument::from_chunk)
            .collect();

        let mut stored = 0;
        for batch in documents.chunks(INDEX_BATCH_SIZE) {
            match self.guarded(self.semantic.index(batch.to_vec())).await {
                Ok(count) => stored += count,
                Err(e) => {
                    let repositories: BTreeSet<String> =
                        chunks.iter().map(|c| c.repository_url.clone()).collect();
                    tracing::warn!(
                        "Semantic indexing via {} failed, serving {:?} from the lexical index: {:#}",
                        self.semantic.name(),
                        repositories,
                        e
                    );
                    self.mark_lexical_only(repositories);
                    break;
                }
            }
        }
        tracing::debug!("{} stored {} documents", self.semantic.name(), stored);

        Ok(self.lexical.insert(chunks))
    }

    async fn search(
        &self,
        query: &str,
        repository: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        if self.serves_lexically(repository) {
            return Ok(self.lexical.search_chunks(query, repository, max_results));
        }

        match self.semantic_search(query, repository, max_results).await {
            Ok(results) if !results.is_empty() => Ok(results),
            Ok(_) => {
                tracing::debug!("No live semantic hits for {:?}, using lexical index", query);
                Ok(self.lexical.search_chunks(query, repository, max_results))
            }
            Err(e) => {
                tracing::warn!(
                    "Semantic search via {} failed, using lexical index: {:#}",
                    self.semantic.name(),
                    e
                );
                Ok(self.lexical.search_chunks(query, repository, max_results))
            }
        }
    }

    async fn delete_repository(&self, repository_url: &str) -> Result<()> {
        if let Err(e) = self
            .guarded(self.semantic.delete_repository(repository_url))
            .await
        {
            tracing::warn!(
                "Semantic delete via {} failed for {}: {:#}",
                self.semantic.name(),
                repository_url,
                e
            );
        }

        self.lexical.remove_repository(repository_url);
        self.lexical_only
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(repository_url);
        Ok(())
    }

    async fn repository_stats(&self) -> Result<Vec<RepositoryStats>> {
        Ok(self.lexical.stats())
    }

    fn mode(&self) -> String {
        format!("semantic:{}", self.semantic.name())
    }
}
