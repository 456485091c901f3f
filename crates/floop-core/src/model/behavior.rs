//! Behavior — the first-class entity of the graph (spec §3).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Constraint,
    Directive,
    Preference,
    Procedure,
    /// `forget` transitions a behavior's kind here rather than deleting the
    /// row, preserving the id for dedup memory (spec §3 lifecycles).
    ForgottenBehavior,
}

impl BehaviorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorKind::Constraint => "constraint",
            BehaviorKind::Directive => "directive",
            BehaviorKind::Preference => "preference",
            BehaviorKind::Procedure => "procedure",
            BehaviorKind::ForgottenBehavior => "forgotten-behavior",
        }
    }
}

impl std::str::FromStr for BehaviorKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constraint" => Ok(BehaviorKind::Constraint),
            "directive" => Ok(BehaviorKind::Directive),
            "preference" => Ok(BehaviorKind::Preference),
            "procedure" => Ok(BehaviorKind::Procedure),
            "forgotten-behavior" => Ok(BehaviorKind::ForgottenBehavior),
            other => Err(format!("unknown behavior kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Learned,
    Imported,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BehaviorContent {
    pub canonical: String,
    pub expanded: Option<String>,
    pub summary: Option<String>,
    pub structured: Option<serde_json::Map<String, serde_json::Value>>,
    pub tags: HashSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BehaviorStats {
    pub times_activated: u64,
    pub times_followed: u64,
    pub times_confirmed: u64,
    pub times_overridden: u64,
}

impl BehaviorStats {
    /// (followed + confirmed) / total feedback events seen, used by session
    /// reinforcement's "violation detected" check. `None` with zero total.
    pub fn positive_rate(&self) -> Option<f64> {
        let total = self.times_confirmed + self.times_overridden;
        if total == 0 {
            return None;
        }
        Some((self.times_followed as f64 + self.times_confirmed as f64) / total as f64)
    }

    pub fn total_feedback(&self) -> u64 {
        self.times_confirmed + self.times_overridden
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub source_type: SourceType,
    pub created_at: DateTime<Utc>,
    pub package: Option<String>,
    pub version: Option<String>,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            source_type: SourceType::Learned,
            created_at: Utc::now(),
            package: None,
            version: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Behavior {
    pub id: String,
    pub name: String,
    pub kind: BehaviorKind,
    pub content: BehaviorContent,
    /// field → required value; empty means "always matches".
    pub when: HashMap<String, String>,
    pub confidence: f64,
    pub priority: i32,
    pub stats: BehaviorStats,
    pub provenance: Provenance,
    pub requires: HashSet<String>,
    pub overrides: HashSet<String>,
    pub conflicts: HashSet<String>,
}

impl Behavior {
    pub fn new(name: impl Into<String>, kind: BehaviorKind, canonical: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            content: BehaviorContent {
                canonical: canonical.into(),
                ..Default::default()
            },
            when: HashMap::new(),
            confidence: 0.7,
            priority: 0,
            stats: BehaviorStats::default(),
            provenance: Provenance::default(),
            requires: HashSet::new(),
            overrides: HashSet::new(),
            conflicts: HashSet::new(),
        }
    }

    /// Invariant: requires and conflicts are disjoint sets (spec §8).
    pub fn relations_disjoint(&self) -> bool {
        self.requires.is_disjoint(&self.conflicts)
    }
}

/// Filter passed to `query_nodes`.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub kind: Option<BehaviorKind>,
    pub tag: Option<String>,
    pub ids: Option<Vec<String>>,
}
