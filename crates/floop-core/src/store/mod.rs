//! The graph store: `GraphStore` capability trait, the sqlite-backed
//! implementation, and `MultiStore`'s local/global composition (spec §4.1).

mod multi;
mod sqlite;
mod validate;

pub use multi::MultiStore;
pub use sqlite::{default_global_path, default_local_path, SqliteGraphStore};
pub use validate::{ValidationIssue, ValidationIssueKind, ValidationReport};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Behavior, Direction, Edge, EdgeKind, NodeFilter};

/// Project-local vs. user-home-global. The two scopes are independent
/// stores, never replicated (spec §1 Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    Global,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Global => "global",
        }
    }
}

/// The core persistence capability the engine is built on (spec §4.1,
/// §9 "interface polymorphism → capability set"). A single scope's store
/// implements this in full; `MultiStore` composes two of them.
pub trait GraphStore: Send + Sync {
    fn add_node(&self, behavior: Behavior) -> Result<Behavior>;
    fn get_node(&self, id: &str) -> Result<Behavior>;
    fn query_nodes(&self, filter: &NodeFilter) -> Result<Vec<Behavior>>;
    fn update_node(&self, behavior: &Behavior) -> Result<()>;
    fn update_confidence(&self, id: &str, confidence: f64) -> Result<()>;
    fn record_activation_hit(&self, id: &str) -> Result<()>;
    fn record_confirmed(&self, id: &str) -> Result<()>;
    fn record_overridden(&self, id: &str) -> Result<()>;
    /// Transitions `kind` to `forgotten-behavior` rather than deleting the
    /// row, preserving the id for dedup memory (spec §3 lifecycles).
    fn forget_node(&self, id: &str) -> Result<()>;

    fn add_edge(&self, edge: Edge) -> Result<Edge>;
    fn get_edge(&self, id: &str) -> Result<Edge>;
    fn get_edges(&self, node_id: &str, direction: Direction, kind: Option<EdgeKind>) -> Result<Vec<Edge>>;
    fn all_edges(&self) -> Result<Vec<Edge>>;
    fn batch_update_edge_weights(&self, updates: &[(String, f64)]) -> Result<()>;
    fn prune_weak_edges(&self, kind: EdgeKind, threshold: f64) -> Result<usize>;
    /// Stamp `last_activated = now` on edges whose source or target is in `ids`.
    fn touch_edges(&self, ids: &[String]) -> Result<()>;
    fn delete_edge(&self, id: &str) -> Result<()>;

    fn store_embedding(&self, id: &str, vector: &[f32], model: &str) -> Result<()>;
    fn get_embedding(&self, id: &str, model: &str) -> Result<Option<Vec<f32>>>;
    fn get_all_embeddings(&self, model: &str) -> Result<Vec<(String, Vec<f32>)>>;
    fn get_behavior_ids_without_embeddings(&self, model: &str) -> Result<Vec<String>>;
    fn delete_embedding(&self, id: &str) -> Result<()>;

    fn record_co_activation(&self, pair_key: &str, ts: DateTime<Utc>) -> Result<()>;
    fn get_co_activations(&self, pair_key: &str, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>>;

    fn validate_behavior_graph(&self) -> Result<ValidationReport>;

    fn mark_dirty(&self, id: &str);
    fn dirty_ids(&self) -> Vec<String>;
    fn sync(&self) -> Result<()>;
    fn close(&self) -> Result<()>;

    fn all_node_ids(&self) -> Result<Vec<String>>;
    fn node_count(&self) -> Result<usize>;
    fn edge_count(&self) -> Result<usize>;

    /// All nodes and edges, for backup (spec §4.12).
    fn export_all(&self) -> Result<(Vec<Behavior>, Vec<Edge>)>;
    /// Clear every node/edge in this scope (restore mode=replace).
    fn clear(&self) -> Result<()>;
}
