//! Graph validation: self-references, dangling relations, relation cycles
//! (spec §3 Invariants, §4.11).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{Behavior, Edge, EdgeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationIssueKind {
    SelfReference,
    Dangling,
    Cycle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: ValidationIssueKind,
    pub detail: String,
    pub node_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.issues.len()
    }
}

/// Run all three checks over a fully-materialized node/edge set. Kept as a
/// free function so both the sqlite backend and in-memory tests can share it.
pub fn validate(nodes: &[Behavior], edges: &[Edge]) -> ValidationReport {
    let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut issues = Vec::new();

    for edge in edges {
        if edge.kind.is_virtual() {
            continue;
        }
        if edge.is_self_edge() {
            issues.push(ValidationIssue {
                kind: ValidationIssueKind::SelfReference,
                detail: format!("edge {} has source == target == {}", edge.id, edge.source),
                node_ids: vec![edge.source.clone()],
            });
        }
        if !known.contains(edge.source.as_str()) {
            issues.push(ValidationIssue {
                kind: ValidationIssueKind::Dangling,
                detail: format!("edge {} source {} is unknown", edge.id, edge.source),
                node_ids: vec![edge.source.clone()],
            });
        }
        if !known.contains(edge.target.as_str()) {
            issues.push(ValidationIssue {
                kind: ValidationIssueKind::Dangling,
                detail: format!("edge {} target {} is unknown", edge.id, edge.target),
                node_ids: vec![edge.target.clone()],
            });
        }
    }

    for node in nodes {
        for (label, set) in [
            ("requires", &node.requires),
            ("overrides", &node.overrides),
            ("conflicts", &node.conflicts),
        ] {
            for target in set {
                if target == &node.id {
                    issues.push(ValidationIssue {
                        kind: ValidationIssueKind::SelfReference,
                        detail: format!("behavior {} {} itself", node.id, label),
                        node_ids: vec![node.id.clone()],
                    });
                } else if !known.contains(target.as_str()) {
                    issues.push(ValidationIssue {
                        kind: ValidationIssueKind::Dangling,
                        detail: format!("behavior {} {} unknown id {}", node.id, label, target),
                        node_ids: vec![target.clone()],
                    });
                }
            }
        }
    }

    for cycle in find_relation_cycles(nodes, edges) {
        issues.push(ValidationIssue {
            kind: ValidationIssueKind::Cycle,
            detail: format!("cycle among {} behaviors in requires/overrides/conflicts", cycle.len()),
            node_ids: cycle,
        });
    }

    ValidationReport {
        valid: issues.is_empty(),
        issues,
    }
}

/// Strongly-connected components (Tarjan) over the directed subgraph formed
/// by `requires`/`overrides`/`conflicts` relation sets and relation-kind
/// edges. Components of size > 1 (or a node pointing to itself, already
/// reported as self-reference) are reported as cycles.
fn find_relation_cycles(nodes: &[Behavior], edges: &[Edge]) -> Vec<Vec<String>> {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for node in nodes {
        let out = adjacency.entry(node.id.clone()).or_default();
        for set in [&node.requires, &node.overrides, &node.conflicts] {
            for target in set {
                if target != &node.id {
                    out.push(target.clone());
                }
            }
        }
    }
    for edge in edges {
        if edge.kind.is_relation() && edge.source != edge.target {
            adjacency.entry(edge.source.clone()).or_default().push(edge.target.clone());
        }
    }

    let mut index = 0usize;
    let mut indices: HashMap<String, usize> = HashMap::new();
    let mut lowlink: HashMap<String, usize> = HashMap::new();
    let mut on_stack: HashSet<String> = HashSet::new();
    let mut stack: Vec<String> = Vec::new();
    let mut components: Vec<Vec<String>> = Vec::new();

    fn strongconnect(
        v: &str,
        adjacency: &HashMap<String, Vec<String>>,
        index: &mut usize,
        indices: &mut HashMap<String, usize>,
        lowlink: &mut HashMap<String, usize>,
        on_stack: &mut HashSet<String>,
        stack: &mut Vec<String>,
        components: &mut Vec<Vec<String>>,
    ) {
        indices.insert(v.to_string(), *index);
        lowlink.insert(v.to_string(), *index);
        *index += 1;
        stack.push(v.to_string());
        on_stack.insert(v.to_string());

        if let Some(neighbors) = adjacency.get(v) {
            for w in neighbors.clone() {
                if !indices.contains_key(&w) {
                    strongconnect(&w, adjacency, index, indices, lowlink, on_stack, stack, components);
                    let wl = lowlink[&w];
                    let vl = lowlink[v];
                    lowlink.insert(v.to_string(), vl.min(wl));
                } else if on_stack.contains(&w) {
                    let wi = indices[&w];
                    let vl = lowlink[v];
                    lowlink.insert(v.to_string(), vl.min(wi));
                }
            }
        }

        if lowlink[v] == indices[v] {
            let mut component = Vec::new();
            loop {
                let w = stack.pop().unwrap();
                on_stack.remove(&w);
                let is_v = w == v;
                component.push(w);
                if is_v {
                    break;
                }
            }
            if component.len() > 1 {
                components.push(component);
            }
        }
    }

    let ids: Vec<String> = adjacency.keys().cloned().collect();
    for v in ids {
        if !indices.contains_key(&v) {
            strongconnect(&v, &adjacency, &mut index, &mut indices, &mut lowlink, &mut on_stack, &mut stack, &mut components);
        }
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BehaviorKind;

    fn behavior(id: &str) -> Behavior {
        Behavior::new(id, BehaviorKind::Directive, "canonical")
    }

    #[test]
    fn clean_graph_is_valid() {
        let a = behavior("a");
        let b = behavior("b");
        let edge = Edge::new("a", "b", EdgeKind::SimilarTo, 0.5);
        let report = validate(&[a, b], &[edge]);
        assert!(report.valid);
    }

    #[test]
    fn self_edge_flagged() {
        let a = behavior("a");
        let edge = Edge::new("a", "a", EdgeKind::SimilarTo, 0.5);
        let report = validate(&[a], &[edge]);
        assert!(!report.valid);
        assert!(report.issues.iter().any(|i| i.kind == ValidationIssueKind::SelfReference));
    }

    #[test]
    fn dangling_target_flagged() {
        let a = behavior("a");
        let edge = Edge::new("a", "ghost", EdgeKind::SimilarTo, 0.5);
        let report = validate(&[a], &[edge]);
        assert!(report.issues.iter().any(|i| i.kind == ValidationIssueKind::Dangling));
    }

    #[test]
    fn relation_cycle_detected() {
        let mut a = behavior("a");
        let mut b = behavior("b");
        a.requires.insert("b".to_string());
        b.requires.insert("a".to_string());
        let report = validate(&[a, b], &[]);
        assert!(report.issues.iter().any(|i| i.kind == ValidationIssueKind::Cycle));
    }
}
