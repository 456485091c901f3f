//! Hebbian learner: Oja's rule for existing edges, gated creation for new
//! co-activated pairs, sub-threshold pruning (spec §4.5).

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::config::HebbianConfig;
use crate::error::Result;
use crate::model::{Edge, EdgeKind};
use crate::store::GraphStore;

/// Canonically order a pair so `(i, j)` and `(j, i)` produce the same key.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}

/// Oja's self-normalizing update: `w' = w + eta*(ai*aj - ai^2*w)`, clipped to (0,1].
pub fn oja_update(weight: f64, a_i: f64, a_j: f64, eta: f64) -> f64 {
    let delta = eta * (a_i * a_j - a_i * a_i * weight);
    (weight + delta).clamp(f64::MIN_POSITIVE, 1.0)
}

/// Tracks co-occurrence recordings in-memory until they're gated into an
/// edge. The store-backed path (`GraphStore::record_co_activation` /
/// `get_co_activations`) is the persistent implementation referenced by
/// spec §4.5 "two implementations (in-memory and persistent)"; this type is
/// the lightweight in-memory one, useful for tests or a store without the
/// capability wired up.
#[derive(Default)]
pub struct InMemoryCoActivationTracker {
    events: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl InMemoryCoActivationTracker {
    pub fn record(&self, key: &str, ts: DateTime<Utc>) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).entry(key.to_string()).or_default().push(ts);
    }

    pub fn count_since(&self, key: &str, since: DateTime<Utc>) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .map(|v| v.iter().filter(|t| **t >= since).count())
            .unwrap_or(0)
    }
}

/// From one spreading request's activations, extract pairs with both
/// activations above threshold where at least one member isn't a seed.
pub fn extract_pairs(
    activations: &HashMap<String, f64>,
    seed_ids: &HashSet<String>,
    threshold: f64,
) -> Vec<(String, String, f64, f64)> {
    let ids: Vec<&String> = activations.keys().filter(|id| activations[*id] >= threshold).collect();
    let mut pairs = Vec::new();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            let (a, b) = (ids[i], ids[j]);
            if seed_ids.contains(a) && seed_ids.contains(b) {
                continue;
            }
            pairs.push((a.clone(), b.clone(), activations[a], activations[b]));
        }
    }
    pairs
}

/// Process the extracted pairs against a store: Oja-update existing edges in
/// one batch transaction, gate-create new `co-activated` edges, then prune
/// sub-threshold co-activated edges (spec §4.5 steps 1-3).
pub fn process_pairs(store: &dyn GraphStore, pairs: &[(String, String, f64, f64)], config: &HebbianConfig) -> Result<()> {
    let now = Utc::now();
    let mut weight_updates: Vec<(String, f64)> = Vec::new();

    for (a, b, a_i, a_j) in pairs {
        let existing = find_edge_between(store, a, b)?;
        match existing {
            Some(edge) => {
                let w = oja_update(edge.weight, *a_i, *a_j, config.learning_rate);
                weight_updates.push((edge.id, w));
            }
            None => {
                let key = pair_key(a, b);
                store.record_co_activation(&key, now)?;
                let since = now - chrono::Duration::seconds(config.creation_window_secs);
                let count = store.get_co_activations(&key, since)?.len();
                if count >= config.creation_gate as usize {
                    let initial = oja_update(0.1, *a_i, *a_j, config.learning_rate);
                    let edge = Edge::new(a.clone(), b.clone(), EdgeKind::CoActivated, initial);
                    // Bypass add_edge's public-kind guard isn't needed: CoActivated
                    // is permitted there explicitly for internal learners.
                    let _ = store.add_edge(edge);
                }
            }
        }
    }

    if !weight_updates.is_empty() {
        store.batch_update_edge_weights(&weight_updates)?;
    }

    store.prune_weak_edges(EdgeKind::CoActivated, config.min_weight)?;
    Ok(())
}

fn find_edge_between(store: &dyn GraphStore, a: &str, b: &str) -> Result<Option<Edge>> {
    let out = store.get_edges(a, crate::model::Direction::Both, None)?;
    Ok(out.into_iter().find(|e| {
        (e.source == a && e.target == b) || (e.source == b && e.target == a)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oja_update_stays_in_range() {
        let w = oja_update(0.5, 0.9, 0.9, 0.05);
        assert!(w > 0.0 && w <= 1.0);
    }

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(pair_key("a", "b"), pair_key("b", "a"));
    }

    #[test]
    fn extract_pairs_skips_seed_only_pairs() {
        let mut activations = HashMap::new();
        activations.insert("a".to_string(), 0.5);
        activations.insert("b".to_string(), 0.5);
        let mut seeds = HashSet::new();
        seeds.insert("a".to_string());
        seeds.insert("b".to_string());
        let pairs = extract_pairs(&activations, &seeds, 0.1);
        assert!(pairs.is_empty());
    }
}
