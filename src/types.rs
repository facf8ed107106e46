use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open key-value annotations attached to a chunk when it is created
pub type ChunkMetadata = BTreeMap<String, serde_json::Value>;

/// Raw or normalized files of one repository, keyed by path
pub type FileMap = BTreeMap<String, String>;

/// The atomic retrievable unit
///
/// Chunks are never mutated once they have been indexed; a refresh deletes
/// the whole repository and inserts fresh chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Normalized source text, never blank
    pub content: String,
    /// Path of the source file within its repository
    pub file_path: String,
    /// Owning repository identifier
    pub repository_url: String,
    /// Zero-based position among the chunks of the same file
    pub chunk_index: usize,
    /// Extension, language, sizes
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn new(
        content: impl Into<String>,
        file_path: impl Into<String>,
        repository_url: impl Into<String>,
        chunk_index: usize,
    ) -> Self {
        Self {
            content: content.into(),
            file_path: file_path.into(),
            repository_url: repository_url.into(),
            chunk_index,
            metadata: ChunkMetadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Stable identifier of this chunk: `repository::path#index`
    pub fn id(&self) -> String {
        format!(
            "{}::{}#{}",
            self.repository_url, self.file_path, self.chunk_index
        )
    }

    /// Look up a string-valued metadata entry
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}

/// A chunk plus its relevance to one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Higher is more relevant; only comparable within a single query
    pub score: f32,
}

/// Outcome of a completed refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub repository_url: String,
    /// Raw files handed to the refresh
    pub files_received: usize,
    /// Files that survived normalization (non-binary, non-empty)
    pub files_indexed: usize,
    /// Chunks inserted into the index
    pub chunks_created: usize,
    /// Time taken in milliseconds
    pub duration_ms: u64,
    /// RFC 3339 completion timestamp
    pub refreshed_at: String,
}

/// Chunk count for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub repository_url: String,
    pub chunk_count: usize,
}

/// Statistics about the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsResponse {
    pub total_repositories: usize,
    pub total_chunks: usize,
    pub repositories: Vec<RepositoryStats>,
    /// `lexical` or `semantic:<backend>`
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id() {
        let chunk = Chunk::new("fn a() {}", "src/lib.rs", "https://github.com/o/r", 3);
        assert_eq!(chunk.id(), "https://github.com/o/r::src/lib.rs#3");
    }

    #[test]
    fn test_chunk_metadata_lookup() {
        let mut metadata = ChunkMetadata::new();
        metadata.insert("file_extension".to_string(), "rs".into());
        metadata.insert("chunk_size".to_string(), 9.into());
        let chunk = Chunk::new("fn a() {}", "src/lib.rs", "repo", 0).with_metadata(metadata);

        assert_eq!(chunk.metadata_str("file_extension"), Some("rs"));
        assert_eq!(chunk.metadata_str("chunk_size"), None);
        assert_eq!(chunk.metadata_str("missing"), None);
    }

    #[test]
    fn test_chunk_serialization() {
        let chunk = Chunk::new("class Foo {}", "Foo.java", "repo", 0);
        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn test_chunk_deserialization_without_metadata() {
        let json = r#"{"content":"x","file_path":"a.py","repository_url":"r","chunk_index":1}"#;
        let chunk: Chunk = serde_json::from_str(json).unwrap();
        assert!(chunk.metadata.is_empty());
        assert_eq!(chunk.chunk_index, 1);
    }
}
