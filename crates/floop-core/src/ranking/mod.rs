//! PageRank over the edge graph plus ACT-R base-level activation (spec §4.4).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RankingConfig;
use crate::model::{Edge, EdgeKind};

/// PageRank, excluding virtual feature-affinity edges, damping 0.85 default,
/// converging on tolerance or max iterations.
pub fn pagerank(node_ids: &[String], edges: &[Edge], config: &RankingConfig) -> HashMap<String, f64> {
    let n = node_ids.len();
    if n == 0 {
        return HashMap::new();
    }

    let index: HashMap<&str, usize> = node_ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
    let mut out_edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut out_degree = vec![0usize; n];

    for e in edges {
        if e.kind.is_virtual() {
            continue;
        }
        if let (Some(&s), Some(&t)) = (index.get(e.source.as_str()), index.get(e.target.as_str())) {
            out_edges[s].push(t);
            out_degree[s] += 1;
        }
    }

    let mut rank = vec![1.0 / n as f64; n];
    let d = config.damping_factor;

    for _ in 0..config.max_iterations {
        let base = (1.0 - d) / n as f64;
        let dangling_mass: f64 = (0..n).filter(|&i| out_degree[i] == 0).map(|i| rank[i]).sum();
        let mut next = vec![base + d * dangling_mass / n as f64; n];

        for (src, targets) in out_edges.iter().enumerate() {
            if targets.is_empty() {
                continue;
            }
            let share = d * rank[src] / targets.len() as f64;
            for &t in targets {
                next[t] += share;
            }
        }

        let diff: f64 = next.iter().zip(rank.iter()).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if diff < config.tolerance {
            break;
        }
    }

    node_ids.iter().cloned().zip(rank).collect()
}

/// Blend PageRank into seed activations: `a' = (1-λ)a + λ*pagerank`, a
/// tiebreaker per spec §4.4, never dominant at the default λ=0.15.
pub fn blend_pagerank(activation: f64, pagerank_score: f64, lambda: f64) -> f64 {
    (1.0 - lambda) * activation + lambda * pagerank_score
}

/// ACT-R base-level activation `ln(Σ t_k^{-d})` from access-event ages in
/// seconds (spec §4.4). Returns `f64::NEG_INFINITY` for no history, matching
/// the natural log of zero history (caller should treat that as "never
/// activated" rather than a real score).
pub fn base_level_activation(event_ages_secs: &[f64], decay: f64) -> f64 {
    let sum: f64 = event_ages_secs
        .iter()
        .filter(|&&t| t > 0.0)
        .map(|t| t.powf(-decay))
        .sum();
    if sum <= 0.0 {
        f64::NEG_INFINITY
    } else {
        sum.ln()
    }
}

/// Debounced PageRank cache: coalesces a burst of refresh requests into a
/// single delayed recompute (spec §4.4, §4.10 "Debounce").
pub struct PageRankCache {
    scores: Mutex<HashMap<String, f64>>,
    last_trigger: Mutex<Option<Instant>>,
    window: Duration,
}

impl PageRankCache {
    pub fn new(window: Duration) -> Self {
        Self {
            scores: Mutex::new(HashMap::new()),
            last_trigger: Mutex::new(None),
            window,
        }
    }

    pub fn get(&self, id: &str) -> f64 {
        self.scores.lock().unwrap_or_else(|e| e.into_inner()).get(id).copied().unwrap_or(0.0)
    }

    pub fn replace(&self, scores: HashMap<String, f64>) {
        *self.scores.lock().unwrap_or_else(|e| e.into_inner()) = scores;
    }

    /// Record a trigger; returns `true` if the debounce window has elapsed
    /// since the last trigger and a refresh should actually run now.
    pub fn should_refresh_now(&self) -> bool {
        let mut last = self.last_trigger.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let ready = match *last {
            Some(t) => now.duration_since(t) >= self.window,
            None => true,
        };
        *last = Some(now);
        ready
    }
}

pub fn edge_count_by_kind(edges: &[Edge], kind: EdgeKind) -> usize {
    edges.iter().filter(|e| e.kind == kind).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagerank_sums_roughly_to_one() {
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let edges = vec![
            Edge::new("a", "b", EdgeKind::SimilarTo, 0.9),
            Edge::new("b", "c", EdgeKind::SimilarTo, 0.9),
            Edge::new("c", "a", EdgeKind::SimilarTo, 0.9),
        ];
        let scores = pagerank(&ids, &edges, &RankingConfig::default());
        let total: f64 = scores.values().sum();
        assert!((total - 1.0).abs() < 1e-3);
    }

    #[test]
    fn base_level_activation_no_history_is_neg_infinity() {
        assert_eq!(base_level_activation(&[], 0.5), f64::NEG_INFINITY);
    }
}
