//! Edge — directed, typed, weighted relation between behaviors (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    Requires,
    Overrides,
    Conflicts,
    SimilarTo,
    LearnedFrom,
    /// Created only by the Hebbian learner, never by the public `connect` op.
    CoActivated,
    /// Virtual: generated on demand from tag overlap, never persisted.
    FeatureAffinity,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Requires => "requires",
            EdgeKind::Overrides => "overrides",
            EdgeKind::Conflicts => "conflicts",
            EdgeKind::SimilarTo => "similar-to",
            EdgeKind::LearnedFrom => "learned-from",
            EdgeKind::CoActivated => "co-activated",
            EdgeKind::FeatureAffinity => "feature-affinity",
        }
    }

    /// Kinds the public `connect` operation may create directly.
    pub fn public_kinds() -> &'static [EdgeKind] {
        &[
            EdgeKind::Requires,
            EdgeKind::Overrides,
            EdgeKind::Conflicts,
            EdgeKind::SimilarTo,
            EdgeKind::LearnedFrom,
        ]
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, EdgeKind::Requires | EdgeKind::Overrides | EdgeKind::Conflicts)
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, EdgeKind::FeatureAffinity)
    }
}

impl std::str::FromStr for EdgeKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requires" => Ok(EdgeKind::Requires),
            "overrides" => Ok(EdgeKind::Overrides),
            "conflicts" => Ok(EdgeKind::Conflicts),
            "similar-to" => Ok(EdgeKind::SimilarTo),
            "learned-from" => Ok(EdgeKind::LearnedFrom),
            "co-activated" => Ok(EdgeKind::CoActivated),
            "feature-affinity" => Ok(EdgeKind::FeatureAffinity),
            other => Err(format!("unknown edge kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Out,
    In,
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    pub last_activated: Option<DateTime<Utc>>,
    pub metadata: Option<serde_json::Value>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind, weight: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            target: target.into(),
            kind,
            weight: weight.clamp(f64::MIN_POSITIVE, 1.0),
            created_at: Utc::now(),
            last_activated: None,
            metadata: None,
        }
    }

    /// The timestamp spreading/temporal-decay math anchors on: the last
    /// activation touch, or creation time if the edge has never been touched.
    pub fn decay_anchor(&self) -> DateTime<Utc> {
        self.last_activated.unwrap_or(self.created_at)
    }

    pub fn is_self_edge(&self) -> bool {
        self.source == self.target
    }
}
