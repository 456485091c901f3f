//! Tiering & assembly: pack active behaviors into a token budget, then
//! render the plan in one of three output formats (spec §4.8).

use serde::{Deserialize, Serialize};

use crate::config::TieringConfig;
use crate::model::{Behavior, BehaviorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Full,
    Summary,
    NameOnly,
    Omitted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedBehavior {
    pub behavior_id: String,
    pub tier: Tier,
    pub rendered_content: String,
    pub token_cost: usize,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InjectionPlan {
    pub full: Vec<PlannedBehavior>,
    pub summarized: Vec<PlannedBehavior>,
    pub name_only: Vec<PlannedBehavior>,
    pub omitted: Vec<PlannedBehavior>,
    pub token_budget: usize,
    pub total_tokens: usize,
}

/// Estimate tokens as `ceil(chars/4)`, the rule spec §4.8 specifies.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

fn full_render(b: &Behavior) -> String {
    let mut out = b.content.canonical.clone();
    if let Some(expanded) = &b.content.expanded {
        out.push_str("\n\n");
        out.push_str(expanded);
    }
    out
}

/// `content.summary` if present, else a rule-based truncation at ~60 chars
/// on a word boundary (spec §4.8).
fn summary_render(b: &Behavior, truncate_chars: usize) -> String {
    if let Some(summary) = &b.content.summary {
        return summary.clone();
    }
    let canonical = &b.content.canonical;
    if canonical.chars().count() <= truncate_chars {
        return canonical.clone();
    }
    let truncated: String = canonical.chars().take(truncate_chars).collect();
    match truncated.rfind(' ') {
        Some(idx) => format!("{}...", &truncated[..idx]),
        None => format!("{truncated}..."),
    }
}

fn name_only_render(b: &Behavior) -> String {
    let tags: String = b.content.tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" ");
    if tags.is_empty() {
        format!("`{}` [{}]", b.name, b.kind.as_str())
    } else {
        format!("`{}` [{}] {}", b.name, b.kind.as_str(), tags)
    }
}

/// Order candidates: constraints first, then (priority desc, confidence desc,
/// activation desc) (spec §4.8).
pub fn order_candidates(behaviors: &[(Behavior, f64)]) -> Vec<(Behavior, f64)> {
    let mut sorted = behaviors.to_vec();
    sorted.sort_by(|(a, a_act), (b, b_act)| {
        let a_constraint = a.kind == BehaviorKind::Constraint;
        let b_constraint = b.kind == BehaviorKind::Constraint;
        b_constraint
            .cmp(&a_constraint)
            .then(b.priority.cmp(&a.priority))
            .then(b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
            .then(b_act.partial_cmp(a_act).unwrap_or(std::cmp::Ordering::Equal))
    });
    sorted
}

/// Build an injection plan for `budget` tokens (spec §4.8). `behaviors` is
/// `(behavior, activation_score)` pairs, already filtered to active ones.
pub fn plan(behaviors: &[(Behavior, f64)], budget: usize, config: &TieringConfig) -> InjectionPlan {
    let ordered = order_candidates(behaviors);

    let full_budget = (budget as f64 * config.full_share) as usize;
    let summary_budget = (budget as f64 * config.summary_share) as usize;

    let mut plan = InjectionPlan {
        token_budget: budget,
        ..Default::default()
    };
    let mut full_used = 0usize;
    let mut summary_used = 0usize;

    for (behavior, score) in ordered {
        let is_constraint = behavior.kind == BehaviorKind::Constraint;
        let full_text = full_render(&behavior);
        let full_cost = estimate_tokens(&full_text);

        // Constraints are always assigned Full if they fit at all.
        if (is_constraint && full_cost <= budget) || full_used + full_cost <= full_budget {
            full_used += full_cost;
            plan.total_tokens += full_cost;
            plan.full.push(PlannedBehavior {
                behavior_id: behavior.id.clone(),
                tier: Tier::Full,
                rendered_content: full_text,
                token_cost: full_cost,
                score,
            });
            continue;
        }

        let summary_text = summary_render(&behavior, config.summary_truncate_chars);
        let summary_cost = estimate_tokens(&summary_text);
        if summary_used + summary_cost <= summary_budget {
            summary_used += summary_cost;
            plan.total_tokens += summary_cost;
            plan.summarized.push(PlannedBehavior {
                behavior_id: behavior.id.clone(),
                tier: Tier::Summary,
                rendered_content: summary_text,
                token_cost: summary_cost,
                score,
            });
            continue;
        }

        let name_text = name_only_render(&behavior);
        let name_cost = estimate_tokens(&name_text);
        let overhead_budget = budget.saturating_sub(full_used).saturating_sub(summary_used);
        if name_cost <= overhead_budget {
            plan.total_tokens += name_cost;
            plan.name_only.push(PlannedBehavior {
                behavior_id: behavior.id.clone(),
                tier: Tier::NameOnly,
                rendered_content: name_text,
                token_cost: name_cost,
                score,
            });
            continue;
        }

        plan.omitted.push(PlannedBehavior {
            behavior_id: behavior.id.clone(),
            tier: Tier::Omitted,
            rendered_content: String::new(),
            token_cost: 0,
            score,
        });
    }

    plan
}

fn section_title(kind: BehaviorKind) -> &'static str {
    match kind {
        BehaviorKind::Constraint => "Constraints",
        BehaviorKind::Directive => "Directives",
        BehaviorKind::Preference => "Preferences",
        BehaviorKind::Procedure => "Procedures",
        BehaviorKind::ForgottenBehavior => "Forgotten",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Markdown,
    Xml,
    Plain,
}

/// Render the plan with stable section ordering (Constraints, Directives,
/// Preferences, Procedures) plus trailer sections (spec §4.8).
pub fn render(plan: &InjectionPlan, behaviors_by_id: &std::collections::HashMap<String, Behavior>, format: RenderFormat) -> String {
    let mut out = String::new();
    let kinds = [
        BehaviorKind::Constraint,
        BehaviorKind::Directive,
        BehaviorKind::Preference,
        BehaviorKind::Procedure,
    ];

    for kind in kinds {
        let items: Vec<&PlannedBehavior> = plan
            .full
            .iter()
            .filter(|p| behaviors_by_id.get(&p.behavior_id).map(|b| b.kind) == Some(kind))
            .collect();
        if items.is_empty() {
            continue;
        }
        render_section(&mut out, section_title(kind), &items, format);
    }

    if !plan.summarized.is_empty() {
        let items: Vec<&PlannedBehavior> = plan.summarized.iter().collect();
        render_section(&mut out, "Quick reference", &items, format);
    }

    if !plan.name_only.is_empty() {
        let items: Vec<&PlannedBehavior> = plan.name_only.iter().collect();
        render_section(&mut out, "Also available", &items, format);
    }

    if !plan.omitted.is_empty() {
        out.push_str(&format!("\n({} behavior(s) omitted to fit the token budget)\n", plan.omitted.len()));
    }

    out
}

fn render_section(out: &mut String, title: &str, items: &[&PlannedBehavior], format: RenderFormat) {
    match format {
        RenderFormat::Markdown => {
            out.push_str(&format!("## {title}\n\n"));
            for item in items {
                out.push_str(&format!("- {}\n", item.rendered_content));
            }
            out.push('\n');
        }
        RenderFormat::Xml => {
            let tag = title.to_lowercase().replace(' ', "_");
            out.push_str(&format!("<{tag}>\n"));
            for item in items {
                out.push_str(&format!("  <item>{}</item>\n", item.rendered_content));
            }
            out.push_str(&format!("</{tag}>\n"));
        }
        RenderFormat::Plain => {
            out.push_str(&format!("{title}:\n"));
            for item in items {
                out.push_str(&format!("  {}\n", item.rendered_content));
            }
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Behavior;

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn constraints_always_fit_if_they_fit_at_all() {
        let mut b = Behavior::new("n", BehaviorKind::Constraint, "short constraint");
        b.priority = 0;
        let plan = plan(&[(b.clone(), 0.9)], 1000, &TieringConfig::default());
        assert_eq!(plan.full.len(), 1);
    }

    #[test]
    fn budget_shares_are_respected() {
        let config = TieringConfig::default();
        let mut behaviors = Vec::new();
        for i in 0..20 {
            let mut b = Behavior::new(format!("n{i}"), BehaviorKind::Directive, "x".repeat(200));
            b.priority = i;
            behaviors.push((b, 0.5));
        }
        let result = plan(&behaviors, 1000, &config);
        let full_tokens: usize = result.full.iter().map(|p| p.token_cost).sum();
        assert!(full_tokens as f64 <= 1000.0 * config.full_share + 1.0);
    }
}
