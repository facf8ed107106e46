/// Configuration system for coderepo-rag
///
/// Supports loading from multiple sources with priority:
/// Environment variables > Config file > Defaults
use crate::error::{ConfigError, RagError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Semantic backends understood by [`SemanticConfig::backend`]
pub const SEMANTIC_BACKENDS: &[&str] = &["none", "embedded", "hashing", "qdrant"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Semantic backend configuration
    #[serde(default)]
    pub semantic: SemanticConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Repository source configuration
    #[serde(default)]
    pub source: SourceConfig,
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Target chunk size in UTF-8 bytes; chunks never exceed twice this
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Bytes shared between consecutive fixed-size windows
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

/// Semantic backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// "none" (lexical only), "embedded" (FastEmbed), "hashing" (feature
    /// hashing, no model download) or "qdrant"
    #[serde(default = "default_semantic_backend")]
    pub backend: String,

    /// Embedding model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Qdrant server URL
    #[serde(default = "default_qdrant_url")]
    pub qdrant_url: String,

    /// Collection name for vector storage
    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    /// Deadline for a single semantic backend call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Candidates requested from the backend per wanted result, before filtering
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Default result limit
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

/// Repository source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Maximum file size to fetch (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Glob patterns skipped by the local directory source
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

// Default value functions
fn default_chunk_size() -> usize {
    1000
}

fn default_overlap() -> usize {
    100
}

fn default_semantic_backend() -> String {
    #[cfg(feature = "qdrant-backend")]
    return "qdrant".to_string();
    #[cfg(not(feature = "qdrant-backend"))]
    return "none".to_string();
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_collection_name() -> String {
    "code_chunks".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_candidate_multiplier() -> usize {
    3
}

fn default_max_results() -> usize {
    5
}

fn default_max_file_size() -> usize {
    1_048_576 // 1 MB
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/dist/**".to_string(),
        "**/build/**".to_string(),
    ]
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            backend: default_semantic_backend(),
            model_name: default_model_name(),
            qdrant_url: default_qdrant_url(),
            collection_name: default_collection_name(),
            timeout_secs: default_timeout_secs(),
            candidate_multiplier: default_candidate_multiplier(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunking.chunk_size == 0 {
            return Err(invalid("chunking.chunk_size", "must be greater than 0"));
        }

        if self.chunking.overlap >= self.chunking.chunk_size {
            return Err(invalid(
                "chunking.overlap",
                &format!(
                    "must be smaller than chunk_size ({}), got {}",
                    self.chunking.chunk_size, self.chunking.overlap
                ),
            ));
        }

        if !SEMANTIC_BACKENDS.contains(&self.semantic.backend.as_str()) {
            return Err(invalid(
                "semantic.backend",
                &format!(
                    "must be one of {:?}, got '{}'",
                    SEMANTIC_BACKENDS, self.semantic.backend
                ),
            ));
        }

        if self.semantic.timeout_secs == 0 {
            return Err(invalid("semantic.timeout_secs", "must be greater than 0"));
        }

        if self.semantic.candidate_multiplier == 0 {
            return Err(invalid(
                "semantic.candidate_multiplier",
                "must be greater than 0",
            ));
        }

        if self.retrieval.max_results == 0 {
            return Err(invalid("retrieval.max_results", "must be greater than 0"));
        }

        if self.source.max_file_size == 0 {
            return Err(invalid("source.max_file_size", "must be greater than 0"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(size) = std::env::var("CODEREPO_RAG_CHUNK_SIZE")
            && let Ok(size) = size.parse()
        {
            self.chunking.chunk_size = size;
        }

        if let Ok(overlap) = std::env::var("CODEREPO_RAG_OVERLAP")
            && let Ok(overlap) = overlap.parse()
        {
            self.chunking.overlap = overlap;
        }

        if let Ok(backend) = std::env::var("CODEREPO_RAG_SEMANTIC_BACKEND") {
            self.semantic.backend = backend;
        }

        if let Ok(model) = std::env::var("CODEREPO_RAG_MODEL") {
            self.semantic.model_name = model;
        }

        if let Ok(url) = std::env::var("CODEREPO_RAG_QDRANT_URL") {
            self.semantic.qdrant_url = url;
        }

        if let Ok(max) = std::env::var("CODEREPO_RAG_MAX_RESULTS")
            && let Ok(max) = max.parse()
        {
            self.retrieval.max_results = max;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, RagError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Whether a semantic backend has been requested at all
    pub fn semantic_enabled(&self) -> bool {
        self.semantic.backend != "none"
    }
}

fn invalid(key: &str, reason: &str) -> RagError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests;
