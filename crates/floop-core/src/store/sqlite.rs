//! Single-writer embedded relational backend for one scope (spec §3, §4.1).
//!
//! Follows the teacher's separate reader/writer connection shape
//! (`storage/sqlite.rs`): a `Mutex<Connection>` writer and a
//! `Mutex<Connection>` reader against the same file, WAL mode, so reads
//! don't block behind the writer's transaction.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::model::{
    Behavior, BehaviorContent, BehaviorKind, BehaviorStats, Direction, Edge, EdgeKind, NodeFilter,
    Provenance, SourceType,
};

use super::validate::{validate, ValidationReport};
use super::GraphStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    kind            TEXT NOT NULL,
    content_json    TEXT NOT NULL,
    when_json       TEXT NOT NULL,
    confidence      REAL NOT NULL,
    priority        INTEGER NOT NULL,
    stats_json      TEXT NOT NULL,
    provenance_json TEXT NOT NULL,
    requires_json   TEXT NOT NULL,
    overrides_json  TEXT NOT NULL,
    conflicts_json  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS edges (
    id              TEXT PRIMARY KEY,
    source          TEXT NOT NULL,
    target          TEXT NOT NULL,
    kind            TEXT NOT NULL,
    weight          REAL NOT NULL,
    created_at      TEXT NOT NULL,
    last_activated  TEXT,
    metadata_json   TEXT,
    UNIQUE(source, target, kind)
);
CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
CREATE TABLE IF NOT EXISTS embeddings (
    behavior_id TEXT NOT NULL,
    model_name  TEXT NOT NULL,
    vector      BLOB NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY(behavior_id, model_name)
);
CREATE TABLE IF NOT EXISTS co_activations (
    pair_key TEXT NOT NULL,
    ts       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_co_activations_pair ON co_activations(pair_key);
";

pub struct SqliteGraphStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    dirty: Mutex<HashSet<String>>,
}

impl SqliteGraphStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700));
            }
        }

        let writer = Connection::open(path)?;
        Self::configure(&writer)?;
        writer.execute_batch(SCHEMA)?;

        let reader = Connection::open(path)?;
        Self::configure(&reader)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
        }

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            dirty: Mutex::new(HashSet::new()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let writer = Connection::open_in_memory()?;
        writer.execute_batch(SCHEMA)?;
        let reader = Connection::open_in_memory()?;
        reader.execute_batch(SCHEMA)?;
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            dirty: Mutex::new(HashSet::new()),
        })
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn writer(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reader(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.reader.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn row_to_behavior(row: &rusqlite::Row) -> rusqlite::Result<Behavior> {
        let content_json: String = row.get("content_json")?;
        let when_json: String = row.get("when_json")?;
        let stats_json: String = row.get("stats_json")?;
        let provenance_json: String = row.get("provenance_json")?;
        let requires_json: String = row.get("requires_json")?;
        let overrides_json: String = row.get("overrides_json")?;
        let conflicts_json: String = row.get("conflicts_json")?;
        let kind_str: String = row.get("kind")?;

        let json_err = |e: serde_json::Error| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        };

        Ok(Behavior {
            id: row.get("id")?,
            name: row.get("name")?,
            kind: kind_str.parse::<BehaviorKind>().unwrap_or(BehaviorKind::Directive),
            content: serde_json::from_str::<BehaviorContent>(&content_json).map_err(json_err)?,
            when: serde_json::from_str(&when_json).map_err(json_err)?,
            confidence: row.get("confidence")?,
            priority: row.get("priority")?,
            stats: serde_json::from_str::<BehaviorStats>(&stats_json).map_err(json_err)?,
            provenance: serde_json::from_str::<Provenance>(&provenance_json).map_err(json_err)?,
            requires: serde_json::from_str(&requires_json).map_err(json_err)?,
            overrides: serde_json::from_str(&overrides_json).map_err(json_err)?,
            conflicts: serde_json::from_str(&conflicts_json).map_err(json_err)?,
        })
    }

    fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<Edge> {
        let kind_str: String = row.get("kind")?;
        let metadata_json: Option<String> = row.get("metadata_json")?;
        Ok(Edge {
            id: row.get("id")?,
            source: row.get("source")?,
            target: row.get("target")?,
            kind: kind_str.parse::<EdgeKind>().unwrap_or(EdgeKind::SimilarTo),
            weight: row.get("weight")?,
            created_at: row.get("created_at")?,
            last_activated: row.get("last_activated")?,
            metadata: metadata_json.and_then(|s| serde_json::from_str(&s).ok()),
        })
    }

    fn write_node(conn: &Connection, b: &Behavior) -> Result<()> {
        conn.execute(
            "INSERT INTO nodes (id, name, kind, content_json, when_json, confidence, priority,
                stats_json, provenance_json, requires_json, overrides_json, conflicts_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                name=excluded.name, kind=excluded.kind, content_json=excluded.content_json,
                when_json=excluded.when_json, confidence=excluded.confidence,
                priority=excluded.priority, stats_json=excluded.stats_json,
                provenance_json=excluded.provenance_json, requires_json=excluded.requires_json,
                overrides_json=excluded.overrides_json, conflicts_json=excluded.conflicts_json",
            params![
                b.id,
                b.name,
                b.kind.as_str(),
                serde_json::to_string(&b.content)?,
                serde_json::to_string(&b.when)?,
                b.confidence,
                b.priority,
                serde_json::to_string(&b.stats)?,
                serde_json::to_string(&b.provenance)?,
                serde_json::to_string(&b.requires)?,
                serde_json::to_string(&b.overrides)?,
                serde_json::to_string(&b.conflicts)?,
            ],
        )?;
        Ok(())
    }
}

impl GraphStore for SqliteGraphStore {
    fn add_node(&self, behavior: Behavior) -> Result<Behavior> {
        let conn = self.writer();
        Self::write_node(&conn, &behavior)?;
        drop(conn);
        self.mark_dirty(&behavior.id);
        Ok(behavior)
    }

    fn get_node(&self, id: &str) -> Result<Behavior> {
        let conn = self.reader();
        conn.query_row("SELECT * FROM nodes WHERE id = ?1", params![id], Self::row_to_behavior)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("behavior {id}")))
    }

    fn query_nodes(&self, filter: &NodeFilter) -> Result<Vec<Behavior>> {
        let conn = self.reader();
        let mut stmt = conn.prepare("SELECT * FROM nodes")?;
        let rows = stmt.query_map([], Self::row_to_behavior)?;
        let mut out = Vec::new();
        for row in rows {
            let b = row?;
            if let Some(kind) = filter.kind {
                if b.kind != kind {
                    continue;
                }
            }
            if let Some(tag) = &filter.tag {
                if !b.content.tags.contains(tag) {
                    continue;
                }
            }
            if let Some(ids) = &filter.ids {
                if !ids.contains(&b.id) {
                    continue;
                }
            }
            out.push(b);
        }
        Ok(out)
    }

    fn update_node(&self, behavior: &Behavior) -> Result<()> {
        let conn = self.writer();
        Self::write_node(&conn, behavior)?;
        drop(conn);
        self.mark_dirty(&behavior.id);
        Ok(())
    }

    fn update_confidence(&self, id: &str, confidence: f64) -> Result<()> {
        let conn = self.writer();
        let n = conn.execute(
            "UPDATE nodes SET confidence = ?1 WHERE id = ?2",
            params![confidence.clamp(0.0, 1.0), id],
        )?;
        drop(conn);
        if n == 0 {
            return Err(StoreError::NotFound(format!("behavior {id}")));
        }
        self.mark_dirty(id);
        Ok(())
    }

    fn record_activation_hit(&self, id: &str) -> Result<()> {
        let mut b = self.get_node(id)?;
        b.stats.times_activated += 1;
        self.update_node(&b)
    }

    fn record_confirmed(&self, id: &str) -> Result<()> {
        let mut b = self.get_node(id)?;
        b.stats.times_confirmed += 1;
        b.stats.times_followed += 1;
        self.update_node(&b)
    }

    fn record_overridden(&self, id: &str) -> Result<()> {
        let mut b = self.get_node(id)?;
        b.stats.times_overridden += 1;
        self.update_node(&b)
    }

    fn forget_node(&self, id: &str) -> Result<()> {
        let mut b = self.get_node(id)?;
        b.kind = BehaviorKind::ForgottenBehavior;
        self.update_node(&b)
    }

    fn add_edge(&self, edge: Edge) -> Result<Edge> {
        if !EdgeKind::public_kinds().contains(&edge.kind)
            && !matches!(edge.kind, EdgeKind::CoActivated)
        {
            return Err(StoreError::Conflict(format!("edge kind {:?} not creatable here", edge.kind)));
        }
        if edge.is_self_edge() {
            return Err(StoreError::Conflict("self-edges are rejected".to_string()));
        }
        if !(0.0 < edge.weight && edge.weight <= 1.0) {
            return Err(StoreError::Conflict("weight must be in (0,1]".to_string()));
        }
        let conn = self.writer();
        let existing: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM edges WHERE source=?1 AND target=?2 AND kind=?3",
                params![edge.source, edge.target, edge.kind.as_str()],
                |r| r.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StoreError::Conflict("duplicate edge".to_string()));
        }
        conn.execute(
            "INSERT INTO edges (id, source, target, kind, weight, created_at, last_activated, metadata_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                edge.id,
                edge.source,
                edge.target,
                edge.kind.as_str(),
                edge.weight,
                edge.created_at,
                edge.last_activated,
                edge.metadata.as_ref().map(|m| m.to_string()),
            ],
        )?;
        Ok(edge)
    }

    fn get_edge(&self, id: &str) -> Result<Edge> {
        let conn = self.reader();
        conn.query_row("SELECT * FROM edges WHERE id = ?1", params![id], Self::row_to_edge)
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("edge {id}")))
    }

    fn get_edges(&self, node_id: &str, direction: Direction, kind: Option<EdgeKind>) -> Result<Vec<Edge>> {
        let conn = self.reader();
        let sql = match direction {
            Direction::Out => "SELECT * FROM edges WHERE source = ?1",
            Direction::In => "SELECT * FROM edges WHERE target = ?1",
            Direction::Both => "SELECT * FROM edges WHERE source = ?1 OR target = ?1",
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params![node_id], Self::row_to_edge)?;
        let mut out = Vec::new();
        for row in rows {
            let e = row?;
            if kind.is_none_or(|k| k == e.kind) {
                out.push(e);
            }
        }
        Ok(out)
    }

    fn all_edges(&self) -> Result<Vec<Edge>> {
        let conn = self.reader();
        let mut stmt = conn.prepare("SELECT * FROM edges")?;
        let rows = stmt.query_map([], Self::row_to_edge)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn batch_update_edge_weights(&self, updates: &[(String, f64)]) -> Result<()> {
        let mut conn = self.writer();
        let tx = conn.transaction()?;
        for (id, weight) in updates {
            tx.execute(
                "UPDATE edges SET weight = ?1 WHERE id = ?2",
                params![weight.clamp(f64::MIN_POSITIVE, 1.0), id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn prune_weak_edges(&self, kind: EdgeKind, threshold: f64) -> Result<usize> {
        let conn = self.writer();
        let n = conn.execute(
            "DELETE FROM edges WHERE kind = ?1 AND weight < ?2",
            params![kind.as_str(), threshold],
        )?;
        Ok(n)
    }

    fn touch_edges(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.writer();
        let tx = conn.transaction()?;
        let now = Utc::now();
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "UPDATE edges SET last_activated = ?1 WHERE source IN ({placeholders}) OR target IN ({placeholders})"
        );
        let mut stmt_params: Vec<&dyn rusqlite::ToSql> = vec![&now];
        for id in ids {
            stmt_params.push(id);
        }
        for id in ids {
            stmt_params.push(id);
        }
        tx.execute(&sql, stmt_params.as_slice())?;
        tx.commit()?;
        Ok(())
    }

    fn delete_edge(&self, id: &str) -> Result<()> {
        let conn = self.writer();
        conn.execute("DELETE FROM edges WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn store_embedding(&self, id: &str, vector: &[f32], model: &str) -> Result<()> {
        let bytes: Vec<u8> = vector.iter().flat_map(|f| f.to_le_bytes()).collect();
        let conn = self.writer();
        conn.execute(
            "INSERT INTO embeddings (behavior_id, model_name, vector, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(behavior_id, model_name) DO UPDATE SET vector=excluded.vector, created_at=excluded.created_at",
            params![id, model, bytes, Utc::now()],
        )?;
        Ok(())
    }

    fn get_embedding(&self, id: &str, model: &str) -> Result<Option<Vec<f32>>> {
        let conn = self.reader();
        let bytes: Option<Vec<u8>> = conn
            .query_row(
                "SELECT vector FROM embeddings WHERE behavior_id = ?1 AND model_name = ?2",
                params![id, model],
                |r| r.get(0),
            )
            .optional()?;
        Ok(bytes.map(|b| bytes_to_f32(&b)))
    }

    fn get_all_embeddings(&self, model: &str) -> Result<Vec<(String, Vec<f32>)>> {
        let conn = self.reader();
        let mut stmt = conn.prepare("SELECT behavior_id, vector FROM embeddings WHERE model_name = ?1")?;
        let rows = stmt.query_map(params![model], |r| {
            let id: String = r.get(0)?;
            let bytes: Vec<u8> = r.get(1)?;
            Ok((id, bytes))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, bytes) = row?;
            out.push((id, bytes_to_f32(&bytes)));
        }
        Ok(out)
    }

    fn get_behavior_ids_without_embeddings(&self, model: &str) -> Result<Vec<String>> {
        let conn = self.reader();
        let mut stmt = conn.prepare(
            "SELECT id FROM nodes WHERE id NOT IN (SELECT behavior_id FROM embeddings WHERE model_name = ?1)",
        )?;
        let rows = stmt.query_map(params![model], |r| r.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn delete_embedding(&self, id: &str) -> Result<()> {
        let conn = self.writer();
        conn.execute("DELETE FROM embeddings WHERE behavior_id = ?1", params![id])?;
        Ok(())
    }

    fn record_co_activation(&self, pair_key: &str, ts: DateTime<Utc>) -> Result<()> {
        let conn = self.writer();
        conn.execute(
            "INSERT INTO co_activations (pair_key, ts) VALUES (?1, ?2)",
            params![pair_key, ts],
        )?;
        Ok(())
    }

    fn get_co_activations(&self, pair_key: &str, since: DateTime<Utc>) -> Result<Vec<DateTime<Utc>>> {
        let conn = self.reader();
        let mut stmt = conn.prepare("SELECT ts FROM co_activations WHERE pair_key = ?1 AND ts >= ?2")?;
        let rows = stmt.query_map(params![pair_key, since], |r| r.get::<_, DateTime<Utc>>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn validate_behavior_graph(&self) -> Result<ValidationReport> {
        let (nodes, edges) = self.export_all()?;
        Ok(validate(&nodes, &edges))
    }

    fn mark_dirty(&self, id: &str) {
        self.dirty.lock().unwrap_or_else(|e| e.into_inner()).insert(id.to_string());
    }

    fn dirty_ids(&self) -> Vec<String> {
        self.dirty.lock().unwrap_or_else(|e| e.into_inner()).iter().cloned().collect()
    }

    fn sync(&self) -> Result<()> {
        // Writes are already transactional per-operation; sync only needs to
        // flush the in-memory dirty bookkeeping the API surfaces.
        self.dirty.lock().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.sync()
    }

    fn all_node_ids(&self) -> Result<Vec<String>> {
        let conn = self.reader();
        let mut stmt = conn.prepare("SELECT id FROM nodes")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn node_count(&self) -> Result<usize> {
        let conn = self.reader();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    fn edge_count(&self) -> Result<usize> {
        let conn = self.reader();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    fn export_all(&self) -> Result<(Vec<Behavior>, Vec<Edge>)> {
        let conn = self.reader();
        let mut node_stmt = conn.prepare("SELECT * FROM nodes")?;
        let nodes = node_stmt
            .query_map([], Self::row_to_behavior)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut edge_stmt = conn.prepare("SELECT * FROM edges")?;
        let edges = edge_stmt
            .query_map([], Self::row_to_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((nodes, edges))
    }

    fn clear(&self) -> Result<()> {
        let conn = self.writer();
        conn.execute_batch(
            "DELETE FROM nodes; DELETE FROM edges; DELETE FROM embeddings; DELETE FROM co_activations;",
        )?;
        Ok(())
    }
}

fn bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Resolve `<project>/.floop/graph.db` or `~/.floop/graph.db` (spec §6).
pub fn default_local_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".floop").join("graph.db")
}

pub fn default_global_path() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| StoreError::BackendError("could not resolve home directory".to_string()))?;
    Ok(home.home_dir().join(".floop").join("graph.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Behavior, BehaviorKind};

    #[test]
    fn add_and_get_node_round_trips() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let b = Behavior::new("n1", BehaviorKind::Directive, "do the thing");
        let id = b.id.clone();
        store.add_node(b).unwrap();
        let back = store.get_node(&id).unwrap();
        assert_eq!(back.content.canonical, "do the thing");
    }

    #[test]
    fn self_edge_rejected() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let b = Behavior::new("n1", BehaviorKind::Directive, "x");
        let id = b.id.clone();
        store.add_node(b).unwrap();
        let edge = Edge::new(id.clone(), id, EdgeKind::SimilarTo, 0.5);
        assert!(store.add_edge(edge).is_err());
    }

    #[test]
    fn embedding_round_trips() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        store.store_embedding("b1", &[0.1, 0.2, 0.3], "model-a").unwrap();
        let v = store.get_embedding("b1", "model-a").unwrap().unwrap();
        assert!((v[1] - 0.2).abs() < 1e-6);
    }
}
