//! Vector search: brute-force cosine top-K over behavior embeddings,
//! union-ed with unembedded behaviors so migration-in-progress never
//! silently drops anything (spec §4.6). Advisory only — nothing in the
//! engine depends on this for correctness.

#[cfg(feature = "embeddings")]
mod fastembed_provider;

#[cfg(feature = "embeddings")]
pub use fastembed_provider::FastEmbedProvider;

use crate::config::VectorConfig;
use crate::error::Result;
use crate::store::GraphStore;

pub const MODEL_NAME: &str = "nomic-embed-text-v1.5";

/// Capability for embedding text into vectors. Implementations are
/// best-effort: a provider that can't embed (model unavailable) should
/// surface `EngineError::EmbedUnavailable` at the call site, not panic.
pub trait EmbeddingProvider: Send + Sync {
    fn embed_document(&self, text: &str) -> Result<Vec<f32>>;
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
    fn model_name(&self) -> &str;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[derive(Debug, Clone)]
pub struct VectorHit {
    pub behavior_id: String,
    pub similarity: f32,
    /// `true` when this behavior has no embedding yet and is included by
    /// the union-with-unembedded rule rather than by similarity ranking.
    pub unembedded: bool,
}

/// Top-K cosine search over the full embedding set for `model`, unioned with
/// every behavior lacking an embedding under that model (spec §4.6).
pub fn search(store: &dyn GraphStore, query_vector: &[f32], config: &VectorConfig, model: &str) -> Result<Vec<VectorHit>> {
    let embeddings = store.get_all_embeddings(model)?;
    let mut scored: Vec<VectorHit> = embeddings
        .into_iter()
        .map(|(id, vec)| VectorHit {
            similarity: cosine_similarity(query_vector, &vec),
            behavior_id: id,
            unembedded: false,
        })
        .collect();
    scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(config.top_k);

    for id in store.get_behavior_ids_without_embeddings(model)? {
        scored.push(VectorHit {
            behavior_id: id,
            similarity: 0.0,
            unembedded: true,
        });
    }

    Ok(scored)
}

/// Embed every behavior lacking an embedding under `provider`'s model,
/// best-effort: one failure doesn't abort the rest (spec §4.6 "backfill").
pub fn backfill(store: &dyn GraphStore, provider: &dyn EmbeddingProvider) -> Result<usize> {
    let missing = store.get_behavior_ids_without_embeddings(provider.model_name())?;
    let mut embedded = 0;
    for id in missing {
        let Ok(behavior) = store.get_node(&id) else { continue };
        let text = canonical_text(&behavior.content.canonical);
        match provider.embed_document(&text) {
            Ok(vec) => {
                if store.store_embedding(&id, &vec, provider.model_name()).is_ok() {
                    embedded += 1;
                }
            }
            Err(e) => {
                tracing::warn!("embedding backfill failed for {id}: {e}");
            }
        }
    }
    Ok(embedded)
}

fn canonical_text(canonical: &str) -> String {
    canonical.to_string()
}

pub fn document_prefixed(config: &VectorConfig, text: &str) -> String {
    format!("{}{}", config.document_prefix, text)
}

pub fn query_prefixed(config: &VectorConfig, text: &str) -> String {
    format!("{}{}", config.query_prefix, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.1, 0.4, 0.2, 0.9];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }
}
