//! `MultiStore` — composes the local (project-scoped) and global
//! (user-home-scoped) stores. Reads union with local taking precedence on id
//! collisions; writes go to whichever scope the caller names (spec §4.1).

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Behavior, Direction, Edge, EdgeKind, NodeFilter};

use super::{GraphStore, Scope, ValidationReport};

pub struct MultiStore {
    pub local: Arc<dyn GraphStore>,
    pub global: Arc<dyn GraphStore>,
}

impl MultiStore {
    pub fn new(local: Arc<dyn GraphStore>, global: Arc<dyn GraphStore>) -> Self {
        Self { local, global }
    }

    pub fn scope(&self, scope: Scope) -> &Arc<dyn GraphStore> {
        match scope {
            Scope::Local => &self.local,
            Scope::Global => &self.global,
        }
    }

    /// Union of both scopes' behaviors; local wins on id collision.
    pub fn query_nodes_union(&self, filter: &NodeFilter) -> Result<Vec<Behavior>> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for b in self.local.query_nodes(filter)? {
            seen.insert(b.id.clone());
            out.push(b);
        }
        for b in self.global.query_nodes(filter)? {
            if seen.insert(b.id.clone()) {
                out.push(b);
            }
        }
        Ok(out)
    }

    /// Look a behavior up across both scopes, local first.
    pub fn get_node(&self, id: &str) -> Result<(Behavior, Scope)> {
        match self.local.get_node(id) {
            Ok(b) => Ok((b, Scope::Local)),
            Err(_) => self.global.get_node(id).map(|b| (b, Scope::Global)),
        }
    }

    pub fn all_edges_union(&self) -> Result<Vec<Edge>> {
        let mut out = self.local.all_edges()?;
        out.extend(self.global.all_edges()?);
        Ok(out)
    }

    pub fn get_edges_union(&self, node_id: &str, direction: Direction, kind: Option<EdgeKind>) -> Result<Vec<Edge>> {
        let mut out = self.local.get_edges(node_id, direction, kind)?;
        out.extend(self.global.get_edges(node_id, direction, kind)?);
        Ok(out)
    }

    pub fn validate_union(&self) -> Result<ValidationReport> {
        let (mut nodes, mut edges) = self.local.export_all()?;
        let (gn, ge) = self.global.export_all()?;
        let seen: std::collections::HashSet<String> = nodes.iter().map(|n| n.id.clone()).collect();
        nodes.extend(gn.into_iter().filter(|n| !seen.contains(&n.id)));
        edges.extend(ge);
        Ok(super::validate::validate(&nodes, &edges))
    }

    pub fn record_activation_hit(&self, id: &str, scope: Scope) -> Result<()> {
        self.scope(scope).record_activation_hit(id)
    }

    pub fn touch_edges(&self, ids: &[String]) -> Result<()> {
        self.local.touch_edges(ids)?;
        self.global.touch_edges(ids)?;
        Ok(())
    }

    pub fn record_co_activation(&self, scope: Scope, pair_key: &str, ts: DateTime<Utc>) -> Result<()> {
        self.scope(scope).record_co_activation(pair_key, ts)
    }

    pub fn sync_all(&self) -> Result<()> {
        self.local.sync()?;
        self.global.sync()?;
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        self.local.close()?;
        self.global.close()?;
        Ok(())
    }
}
