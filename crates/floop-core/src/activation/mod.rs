//! Activation: context → evaluator → seeds → conflict resolution (spec §4.2).

use std::collections::HashSet;

use crate::config::SeedActivationTable;
use crate::model::{Behavior, ContextSnapshot};

/// Per-`when`-key classification against a context (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    Confirmed,
    Contradicted,
    Absent,
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub behavior_id: String,
    pub active: bool,
    pub confirmed: HashSet<String>,
    pub contradicted: HashSet<String>,
    pub specificity: usize,
    pub score: f64,
}

/// Evaluate a single behavior's `when` predicate against a context's flattened fields.
pub fn evaluate(behavior: &Behavior, context: &ContextSnapshot) -> MatchResult {
    let fields = context.as_fields();
    let mut confirmed = HashSet::new();
    let mut contradicted = HashSet::new();

    for (key, expected) in &behavior.when {
        match fields.get(key) {
            Some(actual) if actual == expected => {
                confirmed.insert(key.clone());
            }
            Some(_) => {
                contradicted.insert(key.clone());
            }
            None => {}
        }
    }

    let total = behavior.when.len();
    let score = if total == 0 { 0.0 } else { confirmed.len() as f64 / total as f64 };

    MatchResult {
        behavior_id: behavior.id.clone(),
        active: contradicted.is_empty(),
        specificity: confirmed.len(),
        confirmed,
        contradicted,
        score,
    }
}

pub fn evaluate_all<'a>(behaviors: &'a [Behavior], context: &ContextSnapshot) -> Vec<(&'a Behavior, MatchResult)> {
    behaviors.iter().map(|b| (b, evaluate(b, context))).collect()
}

#[derive(Debug, Clone)]
pub struct Seed {
    pub behavior_id: String,
    pub activation: f64,
    pub specificity: usize,
    pub priority: i32,
    pub confidence: f64,
}

/// Evaluate and pick active seeds, sorted by (specificity desc, priority desc).
pub fn seed_from_matches<'a>(
    matches: &[(&'a Behavior, MatchResult)],
    table: &SeedActivationTable,
) -> Vec<Seed> {
    let mut seeds: Vec<Seed> = matches
        .iter()
        .filter(|(_, m)| m.active)
        .map(|(b, m)| Seed {
            behavior_id: b.id.clone(),
            activation: table.lookup(m.specificity),
            specificity: m.specificity,
            priority: b.priority,
            confidence: b.confidence,
        })
        .collect();
    seeds.sort_by(|a, b| {
        b.specificity
            .cmp(&a.specificity)
            .then(b.priority.cmp(&a.priority))
    });
    seeds
}

/// Remove conflicting seeds via `overrides`/`conflicts`, preferring the
/// higher (specificity, priority, confidence) triple (spec §4.2, Open Question
/// resolved as this tie-break — spec §9).
pub fn resolve_conflicts(seeds: Vec<Seed>, behaviors: &[Behavior]) -> Vec<Seed> {
    use std::collections::HashMap;
    let by_id: HashMap<&str, &Behavior> = behaviors.iter().map(|b| (b.id.as_str(), b)).collect();
    let rank: HashMap<&str, (usize, i32, i64)> = seeds
        .iter()
        .map(|s| (s.behavior_id.as_str(), (s.specificity, s.priority, (s.confidence * 1e6) as i64)))
        .collect();

    let mut excluded: HashSet<String> = HashSet::new();
    for seed in &seeds {
        let Some(b) = by_id.get(seed.behavior_id.as_str()) else { continue };
        let my_rank = rank[seed.behavior_id.as_str()];
        for other in b.overrides.iter().chain(b.conflicts.iter()) {
            if let Some(&other_rank) = rank.get(other.as_str()) {
                if my_rank >= other_rank {
                    excluded.insert(other.clone());
                } else {
                    excluded.insert(seed.behavior_id.clone());
                }
            }
        }
    }

    seeds.into_iter().filter(|s| !excluded.contains(&s.behavior_id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BehaviorKind;
    use std::collections::HashMap;

    fn ctx(file: &str) -> ContextSnapshot {
        ContextSnapshot::build(crate::model::ContextBuildInput {
            file_path: Some(file.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn empty_when_always_matches_specificity_zero() {
        let b = Behavior::new("n", BehaviorKind::Directive, "x");
        let m = evaluate(&b, &ctx("main.go"));
        assert!(m.active);
        assert_eq!(m.specificity, 0);
    }

    #[test]
    fn contradiction_excludes() {
        let mut b = Behavior::new("n", BehaviorKind::Directive, "x");
        b.when.insert("task".to_string(), "debug".to_string());
        let mut fields = HashMap::new();
        fields.insert("task".to_string(), "refactor".to_string());
        let snapshot = ContextSnapshot::build(crate::model::ContextBuildInput {
            task: Some("refactor".to_string()),
            ..Default::default()
        });
        let m = evaluate(&b, &snapshot);
        assert!(!m.active);
    }

    #[test]
    fn language_match_is_confirmed() {
        let mut b = Behavior::new("n", BehaviorKind::Directive, "x");
        b.when.insert("language".to_string(), "go".to_string());
        let m = evaluate(&b, &ctx("main.go"));
        assert!(m.active);
        assert_eq!(m.specificity, 1);
    }
}
