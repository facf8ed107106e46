use super::{EnrichedDocument, ScoredDocument, SemanticBackend};
use crate::embedding::EmbeddingProvider;
use crate::indexer::StructureTags;
use crate::types::Chunk;
use anyhow::{Context, Result};
use qdrant_client::qdrant::vectors_config::Config;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParams, VectorsConfig,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Semantic backend on an external Qdrant server
///
/// Documents are embedded locally and stored as points whose payload carries
/// the full chunk, so search results can be rebuilt without another lookup.
pub struct QdrantSemanticStore {
    client: Qdrant,
    provider: Arc<dyn EmbeddingProvider>,
    collection: String,
}

impl QdrantSemanticStore {
    /// Connect to a Qdrant server
    pub fn with_url(
        url: &str,
        collection: &str,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        tracing::info!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .build()
            .context("Failed to create Qdrant client")?;

        Ok(Self {
            client,
            provider,
            collection: collection.to_string(),
        })
    }

    /// Check if collection exists
    async fn collection_exists(&self) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .context("Failed to list collections")?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.collection))
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let provider = Arc::clone(&self.provider);
        tokio::task::spawn_blocking(move || provider.embed_batch(texts))
            .await
            .context("Embedding task panicked")?
    }
}

/// Stable numeric point id for a document id
fn point_id(document_id: &str) -> u64 {
    let digest = Sha256::digest(document_id.as_bytes());
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

fn to_payload(document: &EnrichedDocument) -> Result<Payload> {
    let payload: Payload = json!({
        "document_id": document.id,
        "repository_url": document.chunk.repository_url,
        "file_path": document.chunk.file_path,
        "chunk_index": document.chunk.chunk_index,
        "content": document.chunk.content,
        "text": document.text,
        "language": document.language,
        "is_controller": document.tags.controller,
        "is_service": document.tags.service,
        "is_repository": document.tags.repository,
        "is_test": document.tags.test,
        "metadata": document.chunk.metadata,
    })
    .try_into()
    .context("Failed to build point payload")?;
    Ok(payload)
}

fn payload_flag(
    payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>,
    key: &str,
) -> bool {
    payload.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn from_payload(
    payload: &std::collections::HashMap<String, qdrant_client::qdrant::Value>,
) -> Option<EnrichedDocument> {
    let chunk = Chunk::new(
        payload.get("content")?.as_str()?.to_string(),
        payload.get("file_path")?.as_str()?.to_string(),
        payload.get("repository_url")?.as_str()?.to_string(),
        payload.get("chunk_index")?.as_integer()? as usize,
    );

    Some(EnrichedDocument {
        id: payload.get("document_id")?.as_str()?.to_string(),
        text: payload.get("text")?.as_str()?.to_string(),
        tags: StructureTags {
            controller: payload_flag(payload, "is_controller"),
            service: payload_flag(payload, "is_service"),
            repository: payload_flag(payload, "is_repository"),
            test: payload_flag(payload, "is_test"),
        },
        language: payload
            .get("language")
            .and_then(|v| v.as_str().map(String::from)),
        chunk,
    })
}

#[async_trait::async_trait]
impl SemanticBackend for QdrantSemanticStore {
    async fn initialize(&self) -> Result<()> {
        if self.collection_exists().await? {
            tracing::info!("Collection '{}' already exists", self.collection);
            return Ok(());
        }

        let dimension = self.provider.dimension();
        tracing::info!(
            "Creating collection '{}' with dimension {}",
            self.collection,
            dimension
        );

        self.client
            .create_collection(CreateCollectionBuilder::new(&self.collection).vectors_config(
                VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: dimension as u64,
                        distance: Distance::Cosine.into(),
                        ..Default::default()
                    })),
                },
            ))
            .await
            .context("Failed to create collection")?;

        Ok(())
    }

    async fn index(&self, documents: Vec<EnrichedDocument>) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        let count = documents.len();
        tracing::debug!("Storing {} documents in Qdrant", count);

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        let vectors = self.embed(texts).await?;

        let points = documents
            .iter()
            .zip(vectors)
            .map(|(document, vector)| {
                Ok(PointStruct::new(
                    point_id(&document.id),
                    vector,
                    to_payload(document)?,
                ))
            })
            .collect::<Result<Vec<PointStruct>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points))
            .await
            .context("Failed to upsert points")?;

        Ok(count)
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        repository: Option<&str>,
    ) -> Result<Vec<ScoredDocument>> {
        let query_vector = self
            .embed(vec![query.to_string()])
            .await?
            .pop()
            .context("No embedding returned for query")?;

        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, query_vector, limit as u64)
                .with_payload(true);

        if let Some(url) = repository {
            search_builder = search_builder.filter(Filter::must([Condition::matches(
                "repository_url",
                url.to_string(),
            )]));
        }

        let search_result = self
            .client
            .search_points(search_builder)
            .await
            .context("Failed to search points")?;

        Ok(search_result
            .result
            .into_iter()
            .filter_map(|point| {
                let document = from_payload(&point.payload)?;
                Some(ScoredDocument {
                    document,
                    score: point.score,
                })
            })
            .collect())
    }

    async fn delete_repository(&self, repository_url: &str) -> Result<()> {
        tracing::debug!("Deleting Qdrant points for repository: {}", repository_url);

        let filter = Filter::must([Condition::matches(
            "repository_url",
            repository_url.to_string(),
        )]);

        self.client
            .delete_points(DeletePointsBuilder::new(&self.collection).points(filter))
            .await
            .context("Failed to delete points")?;

        Ok(())
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
