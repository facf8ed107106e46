//! In-process semantic backend: brute-force cosine similarity over vectors
//! produced by an [`EmbeddingProvider`]

use super::{EnrichedDocument, ScoredDocument, SemanticBackend};
use crate::embedding::{EmbeddingProvider, cosine_similarity};
use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Texts per `embed_batch` call
const EMBED_BATCH_SIZE: usize = 32;

struct StoredDocument {
    document: EnrichedDocument,
    vector: Vec<f32>,
}

pub struct EmbeddedVectorStore {
    provider: Arc<dyn EmbeddingProvider>,
    // Keyed by document id, so re-indexing a chunk replaces it
    documents: RwLock<BTreeMap<String, StoredDocument>>,
}

impl EmbeddedVectorStore {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the provider off the async runtime
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let provider = Arc::clone(&self.provider);
        let expected = texts.len();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut vectors = Vec::with_capacity(texts.len());
            for batch in texts.chunks(EMBED_BATCH_SIZE) {
                vectors.extend(provider.embed_batch(batch.to_vec())?);
            }
            Ok::<_, anyhow::Error>(vectors)
        })
        .await
        .context("Embedding task panicked")??;

        if vectors.len() != expected {
            bail!(
                "Embedding provider returned {} vectors for {} texts",
                vectors.len(),
                expected
            );
        }
        Ok(vectors)
    }
}

#[async_trait::async_trait]
impl SemanticBackend for EmbeddedVectorStore {
    async fn initialize(&self) -> Result<()> {
        tracing::info!(
            "Embedded vector store using model {} ({} dimensions)",
            self.provider.model_name(),
            self.provider.dimension()
        );
        Ok(())
    }

    async fn index(&self, documents: Vec<EnrichedDocument>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embed(texts).await?;
        let count = documents.len();

        let mut stored = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for (document, vector) in documents.into_iter().zip(vectors) {
            stored.insert(document.id.clone(), StoredDocument { document, vector });
        }

        tracing::debug!("Embedded {} documents", count);
        Ok(count)
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        repository: Option<&str>,
    ) -> Result<Vec<ScoredDocument>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embed(vec![query.to_string()])
            .await?
            .pop()
            .context("No embedding returned for query")?;

        let stored = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut scored: Vec<ScoredDocument> = stored
            .values()
            .filter(|s| repository.is_none_or(|url| s.document.repository_url() == url))
            .map(|s| ScoredDocument {
                score: cosine_similarity(&query_vector, &s.vector),
                document: s.document.clone(),
            })
            .filter(|s| s.score > 0.0)
            .collect();

        // BTreeMap order makes equal scores resolve by id
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn delete_repository(&self, repository_url: &str) -> Result<()> {
        let mut stored = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = stored.len();
        stored.retain(|_, s| s.document.repository_url() != repository_url);
        tracing::debug!(
            "Deleted {} embedded documents for {}",
            before - stored.len(),
            repository_url
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "embedded"
    }
}
