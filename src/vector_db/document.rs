use crate::indexer::structure::{StructureTags, extract_annotations, extract_type_names};
use crate::indexer::{detect_language, file_extension};
use crate::types::Chunk;
use serde::{Deserialize, Serialize};

/// Cap on how many annotations/type names go into the header
const MAX_HEADER_NAMES: usize = 8;

/// A chunk prepared for a semantic backend
///
/// `text` is what gets embedded: a structural header followed by the chunk
/// content. Tags and language travel as metadata and are not embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedDocument {
    /// Same as the source chunk's id
    pub id: String,
    pub text: String,
    pub tags: StructureTags,
    pub language: Option<String>,
    pub chunk: Chunk,
}

impl EnrichedDocument {
    pub fn from_chunk(chunk: Chunk) -> Self {
        let tags = StructureTags::detect(&chunk.file_path, &chunk.content);
        let language = detect_language(file_extension(&chunk.file_path)).map(str::to_string);
        let text = format!(
            "{}{}",
            enrichment_header(&chunk.file_path, &chunk.content),
            chunk.content
        );

        Self {
            id: chunk.id(),
            text,
            tags,
            language,
            chunk,
        }
    }

    pub fn repository_url(&self) -> &str {
        &self.chunk.repository_url
    }
}

/// Header lines naming the file and the structure found in `content`
pub fn enrichment_header(file_path: &str, content: &str) -> String {
    let mut header = format!("// File: {}\n", file_path);

    let annotations = extract_annotations(content);
    if !annotations.is_empty() {
        let shown: Vec<&str> = annotations.iter().take(MAX_HEADER_NAMES).map(String::as_str).collect();
        header.push_str(&format!("// Annotations: {}\n", shown.join(", ")));
    }

    let types = extract_type_names(content);
    if !types.is_empty() {
        let shown: Vec<&str> = types.iter().take(MAX_HEADER_NAMES).map(String::as_str).collect();
        header.push_str(&format!("// Types: {}\n", shown.join(", ")));
    }

    header
}
