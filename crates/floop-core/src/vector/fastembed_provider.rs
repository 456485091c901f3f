//! Local `fastembed` inference backing the `EmbeddingProvider` capability,
//! grounded in the teacher's `embeddings/local.rs` model-init pattern.

use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::{EngineError, Result, StoreError};

use super::{document_prefixed, query_prefixed, EmbeddingProvider, MODEL_NAME};
use crate::config::VectorConfig;

pub struct FastEmbedProvider {
    model: Mutex<TextEmbedding>,
    config: VectorConfig,
}

impl FastEmbedProvider {
    pub fn try_new(config: VectorConfig) -> std::result::Result<Self, String> {
        let cache_dir = cache_dir();
        let _ = std::fs::create_dir_all(&cache_dir);
        let options = InitOptions::new(EmbeddingModel::NomicEmbedTextV15).with_cache_dir(cache_dir);
        let model = TextEmbedding::try_new(options).map_err(|e| e.to_string())?;
        Ok(Self {
            model: Mutex::new(model),
            config,
        })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| StoreError::BackendError("embedding model lock poisoned".to_string()))?;
        let mut out = model
            .embed(vec![text], None)
            .map_err(|e| StoreError::BackendError(format!("embedding failed: {e}")))?;
        out.pop().ok_or_else(|| StoreError::BackendError("empty embedding result".to_string()))
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed_document(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(&document_prefixed(&self.config, text))
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_one(&query_prefixed(&self.config, text))
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}

fn cache_dir() -> std::path::PathBuf {
    if let Ok(path) = std::env::var("FASTEMBED_CACHE_PATH") {
        return path.into();
    }
    directories::ProjectDirs::from("com", "floop", "core")
        .map(|p| p.cache_dir().join("fastembed"))
        .unwrap_or_else(|| std::path::PathBuf::from(".fastembed_cache"))
}

/// Convert a model-unavailable init failure into the advisory engine error
/// the rest of the system degrades on (spec §7 `EmbedUnavailable`).
pub fn unavailable(reason: String) -> EngineError {
    EngineError::EmbedUnavailable(reason)
}
