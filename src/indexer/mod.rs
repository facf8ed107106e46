//! Content normalization and chunking
//!
//! Turns raw repository files into bounded, boundary-aligned chunks. Everything
//! here is pure and deterministic: the same input always yields the same
//! chunks in the same order.

mod chunker;
pub mod language;
mod normalizer;
pub mod structure;

pub use chunker::{ChunkStrategy, CodeChunker, fixed_windows};
pub use language::{SyntaxFamily, detect_language, file_extension};
pub use normalizer::{ContentNormalizer, FILE_HEADER_PREFIX, IMPORT_PREFIX, is_binary};
pub use structure::StructureTags;
