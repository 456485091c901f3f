//! Tunable configuration for every component. YAML loading is a host-tool
//! concern (out of scope); this is the typed object that concern would
//! populate. Defaults match the values spec'd for each component.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadingConfig {
    pub max_steps: u32,
    pub decay_factor: f64,
    pub spread_factor: f64,
    pub min_activation: f64,
    pub temporal_decay_rate: f64,
    pub inhibition: InhibitionConfig,
    pub affinity: AffinityConfig,
}

impl Default for SpreadingConfig {
    fn default() -> Self {
        Self {
            max_steps: 3,
            decay_factor: 0.5,
            spread_factor: 0.8,
            min_activation: 0.01,
            temporal_decay_rate: 0.01,
            inhibition: InhibitionConfig::default(),
            affinity: AffinityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InhibitionConfig {
    pub enabled: bool,
    pub strength: f64,
    pub breadth: usize,
}

impl Default for InhibitionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: 0.3,
            breadth: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityConfig {
    pub enabled: bool,
    pub min_jaccard: f64,
    pub max_weight: f64,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_jaccard: 0.3,
            max_weight: 0.4,
        }
    }
}

/// The seed-activation lookup table, keyed by specificity (0, 1, 2, 3+).
/// Marked an Open Question in the design notes; treated as configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedActivationTable {
    pub specificity_0: f64,
    pub specificity_1: f64,
    pub specificity_2: f64,
    pub specificity_3_plus: f64,
}

impl Default for SeedActivationTable {
    fn default() -> Self {
        Self {
            specificity_0: 0.6,
            specificity_1: 0.75,
            specificity_2: 0.85,
            specificity_3_plus: 0.95,
        }
    }
}

impl SeedActivationTable {
    pub fn lookup(&self, specificity: usize) -> f64 {
        match specificity {
            0 => self.specificity_0,
            1 => self.specificity_1,
            2 => self.specificity_2,
            _ => self.specificity_3_plus,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub damping_factor: f64,
    pub tolerance: f64,
    pub max_iterations: u32,
    /// Blend weight for seed activation reweighting; a tiebreaker, not a dominator.
    pub pagerank_blend: f64,
    pub debounce_window_ms: u64,
    /// ACT-R base-level activation decay exponent.
    pub actr_decay: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            tolerance: 1e-6,
            max_iterations: 100,
            pagerank_blend: 0.15,
            debounce_window_ms: 2000,
            actr_decay: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HebbianConfig {
    pub activation_threshold: f64,
    pub learning_rate: f64,
    pub creation_window_secs: i64,
    pub creation_gate: u32,
    pub min_weight: f64,
}

impl Default for HebbianConfig {
    fn default() -> Self {
        Self {
            activation_threshold: 0.1,
            learning_rate: 0.05,
            creation_window_secs: 3600,
            creation_gate: 3,
            min_weight: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    pub top_k: usize,
    pub document_prefix: String,
    pub query_prefix: String,
    pub query_cache_capacity: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            top_k: 50,
            document_prefix: "search_document: ".to_string(),
            query_prefix: "search_query: ".to_string(),
            query_cache_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    pub initial_confidence: f64,
    pub dedup_candidate_threshold: f64,
    pub auto_merge_threshold: f64,
    pub auto_accept_threshold: f64,
    pub auto_merge_enabled: bool,
    pub max_content_len: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            initial_confidence: 0.7,
            dedup_candidate_threshold: 0.9,
            auto_merge_threshold: 0.9,
            auto_accept_threshold: 0.8,
            auto_merge_enabled: true,
            max_content_len: 4000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieringConfig {
    pub full_share: f64,
    pub summary_share: f64,
    pub overhead_share: f64,
    pub summary_truncate_chars: usize,
}

impl Default for TieringConfig {
    fn default() -> Self {
        Self {
            full_share: 0.6,
            summary_share: 0.3,
            overhead_share: 0.1,
            summary_truncate_chars: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub max_reinjections: u32,
    pub backoff_base_secs: i64,
    pub violation_min_total: u32,
    pub violation_max_positive_rate: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_reinjections: 3,
            backoff_base_secs: 600,
            violation_min_total: 3,
            violation_max_positive_rate: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub max_background_workers: usize,
    pub rate_limit_rate_per_sec: u32,
    pub rate_limit_burst: u32,
    pub backup_retention: usize,
    pub llm_deadline_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_background_workers: 5,
            rate_limit_rate_per_sec: 10,
            rate_limit_burst: 20,
            backup_retention: 10,
            llm_deadline_secs: 5,
        }
    }
}

/// Top-level configuration, overlaid with environment variables at process start.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FloopConfig {
    pub seed_activation: SeedActivationTable,
    pub spreading: SpreadingConfig,
    pub ranking: RankingConfig,
    pub hebbian: HebbianConfig,
    pub vector: VectorConfig,
    pub learning: LearningConfig,
    pub tiering: TieringConfig,
    pub session: SessionConfig,
    pub runtime: RuntimeConfig,
}

impl FloopConfig {
    /// Overlay environment variables onto defaults, matching the teacher's
    /// arg-overlay pattern in `main.rs`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("FLOOP_AUTO_MERGE") {
            cfg.learning.auto_merge_enabled = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = std::env::var("FLOOP_SIMILARITY_THRESHOLD") {
            if let Ok(f) = v.parse::<f64>() {
                cfg.learning.auto_merge_threshold = f;
            }
        }
        cfg
    }
}
