//! Learning loop: correction → candidate behavior → dedup → decision (spec §4.7).

mod correction_log;

pub use correction_log::{default_path_for as default_correction_log_path, CorrectionLog};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::LearningConfig;
use crate::model::{Behavior, BehaviorKind, Correction, CorrectionInput, ContextSnapshot, Edge, EdgeKind};

/// Strip control characters and cap length (spec §4.7 step 1).
pub fn sanitize_content(raw: &str, max_len: usize) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control() || *c == ' ').collect();
    let trimmed = cleaned.trim();
    if trimmed.chars().count() > max_len {
        trimmed.chars().take(max_len).collect()
    } else {
        trimmed.to_string()
    }
}

/// Scrub a file path to its basename, matching spec §4.7 step 1.
pub fn scrub_path_to_basename(path: &str) -> String {
    std::path::Path::new(path)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Cue-word inference of `kind` from the corrected text (spec §4.7 step 2).
pub fn infer_kind(right: &str) -> BehaviorKind {
    let lower = right.to_lowercase();
    if lower.contains("never") || lower.contains("must") || lower.contains("always") {
        BehaviorKind::Constraint
    } else if lower.contains("prefer") || lower.contains("avoid") {
        BehaviorKind::Preference
    } else if looks_stepwise(&lower) {
        BehaviorKind::Procedure
    } else {
        BehaviorKind::Directive
    }
}

fn looks_stepwise(lower: &str) -> bool {
    lower.contains("first,") || lower.contains("then,") || lower.contains("step 1") || lower.contains("1.")
}

/// Build a candidate behavior from a sanitized correction (spec §4.7 steps 1-2).
pub fn build_candidate(input: &CorrectionInput, config: &LearningConfig) -> Behavior {
    let canonical = sanitize_content(&input.right, config.max_content_len);
    let kind = infer_kind(&canonical);
    let mut behavior = Behavior::new(derive_name(&canonical), kind, canonical);
    behavior.confidence = config.initial_confidence;
    if let Some(task) = &input.task {
        behavior.when.insert("task".to_string(), task.clone());
    }
    behavior
}

fn derive_name(canonical: &str) -> String {
    canonical
        .split_whitespace()
        .take(6)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Token-Jaccard similarity, the rule-based fallback used when no
/// embeddings are available (spec §4.7 step 3, §5 timeout fallback).
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let ta: HashSet<String> = tokenize(a);
    let tb: HashSet<String> = tokenize(b);
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let inter = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

fn tokenize(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

/// `max(jaccard_of_tokens, cosine_of_embeddings_if_available)` (spec §4.7 step 3).
pub fn similarity(candidate_text: &str, existing_text: &str, embedding_cosine: Option<f64>) -> f64 {
    let jaccard = jaccard_similarity(candidate_text, existing_text);
    match embedding_cosine {
        Some(cos) => jaccard.max(cos),
        None => jaccard,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DedupDecision {
    /// sim >= auto_merge_threshold and auto-merge enabled.
    Merge { into_id: String, similarity: f64 },
    /// sim >= auto_accept_threshold.
    AutoAccept { similarity: f64 },
    /// otherwise: created but flagged for human review.
    RequiresReview { similarity: f64, reasons: Vec<String> },
}

/// A dedup candidate: an existing behavior and its similarity to the new one.
#[derive(Debug, Clone)]
pub struct DedupCandidate {
    pub behavior_id: String,
    pub similarity: f64,
}

/// Find candidates with similarity >= `dedup_candidate_threshold` (spec §4.7 step 3).
pub fn find_dedup_candidates(candidate_text: &str, existing: &[(&str, &str)], config: &LearningConfig) -> Vec<DedupCandidate> {
    existing
        .iter()
        .filter_map(|(id, text)| {
            let sim = similarity(candidate_text, text, None);
            (sim >= config.dedup_candidate_threshold).then_some(DedupCandidate {
                behavior_id: id.to_string(),
                similarity: sim,
            })
        })
        .collect()
}

/// Decide merge / auto-accept / requires-review from the best dedup candidate
/// (spec §4.7 step 4).
pub fn decide(best: Option<&DedupCandidate>, config: &LearningConfig) -> DedupDecision {
    match best {
        Some(c) if c.similarity >= config.auto_merge_threshold && config.auto_merge_enabled => DedupDecision::Merge {
            into_id: c.behavior_id.clone(),
            similarity: c.similarity,
        },
        Some(c) if c.similarity >= config.auto_accept_threshold => DedupDecision::AutoAccept { similarity: c.similarity },
        Some(c) => DedupDecision::RequiresReview {
            similarity: c.similarity,
            reasons: vec![format!(
                "similarity {:.2} to existing behavior {} below auto-accept threshold {:.2}",
                c.similarity, c.behavior_id, config.auto_accept_threshold
            )],
        },
        None => DedupDecision::RequiresReview {
            similarity: 0.0,
            reasons: vec!["no similar existing behavior found; confirm before accepting".to_string()],
        },
    }
}

/// Merge a candidate into an existing behavior: max confidence, union tags,
/// keep the older id, return a `learned-from` edge to append with weight 0.8
/// (spec §4.7 step 4).
pub fn merge_into(existing: &mut Behavior, candidate: &Behavior) -> Edge {
    existing.confidence = existing.confidence.max(candidate.confidence);
    existing.content.tags.extend(candidate.content.tags.iter().cloned());
    Edge::new(candidate.id.clone(), existing.id.clone(), EdgeKind::LearnedFrom, 0.8)
}

/// Build the `Correction` audit record for a learn request.
pub fn build_correction(input: &CorrectionInput, context: ContextSnapshot) -> Correction {
    Correction::new(context, input.wrong.clone(), input.right.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_words_drive_kind_inference() {
        assert_eq!(infer_kind("Never use println for logging"), BehaviorKind::Constraint);
        assert_eq!(infer_kind("Prefer structured logging"), BehaviorKind::Preference);
        assert_eq!(infer_kind("Use slog for output"), BehaviorKind::Directive);
    }

    #[test]
    fn sanitize_strips_control_chars_and_caps_length() {
        let raw = "hello\u{0007}world";
        assert_eq!(sanitize_content(raw, 100), "helloworld");
        let long = "a".repeat(50);
        assert_eq!(sanitize_content(&long, 10).chars().count(), 10);
    }

    #[test]
    fn identical_text_has_jaccard_one() {
        let sim = jaccard_similarity("use structured logging", "use structured logging");
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn decision_thresholds() {
        let config = LearningConfig::default();
        let candidate = DedupCandidate { behavior_id: "x".to_string(), similarity: 0.95 };
        assert!(matches!(decide(Some(&candidate), &config), DedupDecision::Merge { .. }));
    }
}
