//! # coderepo-rag - Code Repository Ingestion and Retrieval
//!
//! Ingests the source files of code repositories, splits them into
//! retrievable chunks, indexes them, and answers free-text queries with the
//! most relevant chunks.
//!
//! ## Overview
//!
//! The index runs in one of two modes, chosen once when the client is built:
//!
//! - **Semantic**: an embedding backend (FastEmbed in-process, or Qdrant)
//!   ranks chunks by vector similarity, with a lexical index kept alongside.
//! - **Lexical**: an in-process keyword-overlap index.
//!
//! Any failure of the semantic backend on a single call silently degrades to
//! the lexical index for that call. Callers only ever see ranked chunks.
//!
//! ## Architecture
//!
//! ```text
//! files ──► ContentNormalizer ──► CodeChunker ──► ChunkStore
//!                                                  │
//!                              ┌───────────────────┴──────────┐
//!                              │ DualModeStore                │
//!                              │  SemanticBackend (optional)  │
//!                              │  LexicalIndex (always)       │
//!                              └──────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`client`]: `RagClient` with the refresh and retrieval orchestrators
//! - [`indexer`]: content normalization, language detection, chunking
//! - [`vector_db`]: lexical index, semantic backends, dual-mode store
//! - [`query`]: query preprocessing and structural filtering
//! - [`embedding`]: embedding providers
//! - [`source`]: repository sources (local directories, in-memory)
//! - [`chat`]: answers composed from retrieved chunks
//! - [`config`]: configuration with environment variable overrides
//! - [`types`]: chunk and response types
//! - [`error`]: error types and result aliases
//! - [`paths`]: platform paths
//!
//! ## Usage Example
//!
//! ```no_run
//! use coderepo_rag::{Config, RagClient, build_context};
//! use coderepo_rag::source::LocalDirectorySource;
//!
//! #[tokio::main]
//! async fn main() -> coderepo_rag::Result<()> {
//!     let client = RagClient::with_config(Config::default()).await?;
//!     let source = LocalDirectorySource::default();
//!
//!     client.refresh_from_source("/path/to/repo", &source).await?;
//!     let chunks = client.retrieve("user login", Some("/path/to/repo"), 5).await;
//!     println!("{}", build_context(&chunks));
//!     Ok(())
//! }
//! ```

/// Question answering over retrieved code
pub mod chat;

/// Refresh and retrieval orchestration
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding providers (FastEmbed, feature hashing)
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Content normalization and code chunking
pub mod indexer;

/// Platform-specific paths
pub mod paths;

/// Query preprocessing and smart filtering
pub mod query;

/// Repository sources
pub mod source;

/// Chunk and response types
pub mod types;

/// Lexical index, semantic backends and the dual-mode store
pub mod vector_db;

pub use chat::{ChatService, CompletionBackend};
pub use client::{NO_RELEVANT_CODE, RagClient, build_context};
pub use config::Config;
pub use error::{RagError, Result};
pub use types::{Chunk, FileMap, RefreshResponse, SearchResult, StatisticsResponse};
