//! Deterministic BFS spreading engine over the edge graph (spec §4.3).

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;

use crate::activation::Seed;
use crate::config::SpreadingConfig;
use crate::model::{Behavior, Edge, EdgeKind};

#[derive(Debug, Clone)]
pub struct SpreadResult {
    pub behavior_id: String,
    pub activation: f64,
    pub distance: usize,
    pub seed_source: Option<String>,
}

struct EdgeView<'a> {
    target: &'a str,
    kind: EdgeKind,
    weight: f64,
    last_activated: chrono::DateTime<Utc>,
}

/// Jaccard similarity of two tag sets.
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

/// Build each node's outbound edge list, optionally augmented with virtual
/// feature-affinity edges generated from tag overlap (spec §4.3).
fn build_outbound<'a>(
    edges: &'a [Edge],
    behaviors: &'a [Behavior],
    config: &SpreadingConfig,
) -> HashMap<&'a str, Vec<EdgeView<'a>>> {
    let mut out: HashMap<&str, Vec<EdgeView>> = HashMap::new();
    for e in edges {
        out.entry(e.source.as_str()).or_default().push(EdgeView {
            target: e.target.as_str(),
            kind: e.kind,
            weight: e.weight,
            last_activated: e.decay_anchor(),
        });
    }

    if config.affinity.enabled {
        let now = Utc::now();
        for a in behaviors {
            for b in behaviors {
                if a.id == b.id {
                    continue;
                }
                let j = jaccard(&a.content.tags, &b.content.tags);
                if j >= config.affinity.min_jaccard {
                    out.entry(a.id.as_str()).or_default().push(EdgeView {
                        target: b.id.as_str(),
                        kind: EdgeKind::FeatureAffinity,
                        weight: j * config.affinity.max_weight,
                        last_activated: now,
                    });
                }
            }
        }
    }

    out
}

/// Lateral inhibition: given final activations, protect the top `breadth`
/// winners and subtract `strength * (mean_winner - a_x)` (clipped at zero)
/// from everyone else (spec §4.3).
pub fn apply_inhibition(activations: &HashMap<String, f64>, strength: f64, breadth: usize) -> HashMap<String, f64> {
    let mut sorted: Vec<(&String, &f64)> = activations.iter().collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
    let winners: HashSet<&String> = sorted.iter().take(breadth).map(|(id, _)| *id).collect();
    if winners.is_empty() {
        return activations.clone();
    }
    let mean_winner: f64 =
        winners.iter().map(|id| activations[*id]).sum::<f64>() / winners.len() as f64;

    activations
        .iter()
        .map(|(id, a)| {
            if winners.contains(id) {
                (id.clone(), *a)
            } else {
                let reduced = (a - strength * (mean_winner - a).max(0.0)).max(0.0);
                (id.clone(), reduced)
            }
        })
        .collect()
}

/// BFS-bounded propagation from the seed set. Returns activations that
/// survived the `min_activation` floor, one result per reached behavior.
pub fn spread(seeds: &[Seed], edges: &[Edge], behaviors: &[Behavior], config: &SpreadingConfig) -> Vec<SpreadResult> {
    let outbound = build_outbound(edges, behaviors, config);
    let now = Utc::now();

    let mut activation: HashMap<String, f64> = HashMap::new();
    let mut distance: HashMap<String, usize> = HashMap::new();
    let mut seed_source: HashMap<String, String> = HashMap::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();

    for seed in seeds {
        activation.insert(seed.behavior_id.clone(), seed.activation);
        distance.insert(seed.behavior_id.clone(), 0);
        seed_source.insert(seed.behavior_id.clone(), seed.behavior_id.clone());
        queue.push_back((seed.behavior_id.clone(), 0));
    }

    while let Some((node_id, hop)) = queue.pop_front() {
        if visited.contains(&node_id) {
            continue;
        }
        visited.insert(node_id.clone());
        if hop >= config.max_steps as usize {
            continue;
        }
        let Some(a_v) = activation.get(&node_id).copied() else { continue };
        let Some(out) = outbound.get(node_id.as_str()) else { continue };

        for edge in out {
            let days = (now - edge.last_activated).num_seconds() as f64 / 86400.0;
            let temporal = (-config.temporal_decay_rate * days.max(0.0)).exp();
            let w_eff = edge.weight * temporal;
            let next_hop = hop + 1;
            let contribution = a_v * w_eff * config.spread_factor * config.decay_factor.powi(next_hop as i32);

            let entry = activation.entry(edge.target.to_string()).or_insert(0.0);
            if contribution > *entry {
                *entry = contribution;
            }
            distance
                .entry(edge.target.to_string())
                .and_modify(|d| *d = (*d).min(next_hop))
                .or_insert(next_hop);
            seed_source.entry(edge.target.to_string()).or_insert_with(|| {
                seed_source.get(&node_id).cloned().unwrap_or_else(|| node_id.clone())
            });

            if !visited.contains(edge.target) {
                queue.push_back((edge.target.to_string(), next_hop));
            }
        }
    }

    let activation = if config.inhibition.enabled {
        apply_inhibition(&activation, config.inhibition.strength, config.inhibition.breadth)
    } else {
        activation
    };

    activation
        .into_iter()
        .filter(|(_, a)| *a >= config.min_activation)
        .map(|(id, a)| SpreadResult {
            seed_source: seed_source.get(&id).cloned(),
            distance: *distance.get(&id).unwrap_or(&0),
            behavior_id: id,
            activation: a,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BehaviorKind, EdgeKind};

    #[test]
    fn spreads_one_hop_and_never_exceeds_seed() {
        let config = SpreadingConfig::default();
        let a = Behavior::new("a", BehaviorKind::Directive, "a");
        let b = Behavior::new("b", BehaviorKind::Directive, "b");
        let edge = Edge::new(a.id.clone(), b.id.clone(), EdgeKind::SimilarTo, 0.8);
        let seeds = vec![Seed {
            behavior_id: a.id.clone(),
            activation: 0.6,
            specificity: 0,
            priority: 0,
            confidence: 0.7,
        }];
        let results = spread(&seeds, &[edge], &[a.clone(), b.clone()], &config);
        let a_res = results.iter().find(|r| r.behavior_id == a.id).unwrap();
        let b_res = results.iter().find(|r| r.behavior_id == b.id);
        assert_eq!(a_res.distance, 0);
        if let Some(b_res) = b_res {
            assert!(b_res.activation <= a_res.activation);
            assert!(b_res.distance >= 1);
        }
    }

    #[test]
    fn below_min_activation_dropped() {
        let mut config = SpreadingConfig::default();
        config.min_activation = 0.99;
        let a = Behavior::new("a", BehaviorKind::Directive, "a");
        let seeds = vec![Seed {
            behavior_id: a.id.clone(),
            activation: 0.6,
            specificity: 0,
            priority: 0,
            confidence: 0.7,
        }];
        let results = spread(&seeds, &[], &[a], &config);
        assert!(results.is_empty());
    }
}
