use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use crate::paths::PlatformPaths;
use anyhow::{Context, Result, anyhow};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// Models selectable by name in configuration: (name, model, dimension)
const KNOWN_MODELS: &[(&str, EmbeddingModel, usize)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("all-MiniLM-L12-v2", EmbeddingModel::AllMiniLML12V2, 384),
    ("bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
];

/// FastEmbed-based local embedding provider
///
/// `TextEmbedding::embed` needs `&mut self`, so the model sits behind a mutex
/// and concurrent batches are serialized.
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    model_name: &'static str,
    dimension: usize,
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self> {
        Self::from_model_name("all-MiniLM-L6-v2")
    }

    /// Create a manager for a model named in configuration
    pub fn from_model_name(name: &str) -> Result<Self> {
        let (model_name, model, dimension) = resolve_model(name)?;

        tracing::info!("Initializing FastEmbed model: {}", model_name);

        let options = InitOptions::new(model)
            .with_cache_dir(PlatformPaths::default_model_cache_dir())
            .with_show_download_progress(true);

        let embedding_model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitializationFailed(e.to_string()))
            .context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            model_name,
            dimension,
        })
    }
}

fn resolve_model(name: &str) -> Result<(&'static str, EmbeddingModel, usize)> {
    KNOWN_MODELS
        .iter()
        .find(|(known, _, _)| known.eq_ignore_ascii_case(name))
        .map(|(known, model, dimension)| (*known, model.clone(), *dimension))
        .ok_or_else(|| anyhow!(EmbeddingError::UnknownModel(name.to_string())))
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;
        let embeddings = model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::GenerationFailed(e.to_string()))?;

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        self.model_name
    }
}
