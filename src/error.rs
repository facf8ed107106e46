/// Centralized error types for coderepo-rag using thiserror
///
/// Fetch and parse errors are fatal to a refresh. Index errors never reach
/// callers of the store: they are logged and the lexical path takes over.
use thiserror::Error;

/// Main error type for the RAG pipeline
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised by a repository source while fetching raw files
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Invalid repository identifier: {0}")]
    InvalidRepository(String),

    #[error("Failed to walk repository: {0}")]
    WalkFailed(String),
}

/// A single file could not be normalized
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to parse file '{file}': {reason}")]
    Failed { file: String, reason: String },

    #[error("Invalid file path: '{0}'")]
    InvalidPath(String),
}

impl ParseError {
    /// Path of the offending file
    pub fn file(&self) -> &str {
        match self {
            ParseError::Failed { file, .. } => file,
            ParseError::InvalidPath(file) => file,
        }
    }
}

/// Errors from a semantic backend
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Semantic backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Failed to initialize semantic backend: {0}")]
    InitializationFailed(String),

    #[error("Failed to store documents: {0}")]
    StoreFailed(String),

    #[error("Failed to search documents: {0}")]
    SearchFailed(String),

    #[error("Failed to delete documents: {0}")]
    DeleteFailed(String),

    #[error("Semantic backend call timed out after {0} seconds")]
    Timeout(u64),
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Result alias used by the public API
pub type Result<T> = std::result::Result<T, RagError>;

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Other(format!("{:#}", err))
    }
}

impl RagError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        RagError::Other(msg.into())
    }

    /// Fetch and parse failures abort a refresh; nothing else does
    pub fn is_fatal_to_refresh(&self) -> bool {
        matches!(self, RagError::Fetch(_) | RagError::Parse(_))
    }
}
