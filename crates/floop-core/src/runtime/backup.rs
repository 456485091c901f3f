//! Versioned backup/restore containers with retention (spec §4.12).

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::model::{Behavior, Edge};
use crate::store::GraphStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupVersion {
    V1,
    V2,
}

impl BackupVersion {
    pub fn as_u32(&self) -> u32 {
        match self {
            BackupVersion::V1 => 1,
            BackupVersion::V2 => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BackupContainer {
    version: u32,
    nodes: Vec<Behavior>,
    edges: Vec<Edge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    Merge,
    Replace,
}

impl std::str::FromStr for RestoreMode {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "merge" => Ok(RestoreMode::Merge),
            "replace" => Ok(RestoreMode::Replace),
            other => Err(format!("unknown restore mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BackupSummary {
    pub path: PathBuf,
    pub node_count: usize,
    pub edge_count: usize,
    pub version: u32,
    pub compressed: bool,
    pub size_bytes: u64,
}

/// Write all nodes then all edges into a versioned container at `path`
/// (v1 uncompressed JSON, v2 gzip; spec §4.12 — v2 is the default).
pub fn backup(store: &dyn GraphStore, path: &Path, version: BackupVersion) -> Result<BackupSummary> {
    let (nodes, edges) = store.export_all()?;
    let container = BackupContainer {
        version: version.as_u32(),
        nodes,
        edges,
    };
    let json = serde_json::to_vec(&container)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let compressed = version == BackupVersion::V2;
    if compressed {
        let file = std::fs::File::create(path)?;
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(&json)?;
        encoder.finish()?;
    } else {
        std::fs::write(path, &json)?;
    }

    let size_bytes = std::fs::metadata(path)?.len();

    Ok(BackupSummary {
        path: path.to_path_buf(),
        node_count: container.nodes.len(),
        edge_count: container.edges.len(),
        version: container.version,
        compressed,
        size_bytes,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreSummary {
    pub nodes_restored: usize,
    pub nodes_skipped: usize,
    pub edges_restored: usize,
    pub edges_skipped: usize,
}

/// Restore a backup container into `store`. `merge` skips existing ids;
/// `replace` clears the scope first (spec §4.12).
pub fn restore(store: &dyn GraphStore, path: &Path, mode: RestoreMode) -> Result<RestoreSummary> {
    let raw = std::fs::read(path)?;
    let json = decompress_if_gzip(&raw)?;
    let container: BackupContainer =
        serde_json::from_slice(&json).map_err(|e| StoreError::BackendError(format!("corrupt backup: {e}")))?;

    if mode == RestoreMode::Replace {
        store.clear()?;
    }

    let mut nodes_restored = 0;
    let mut nodes_skipped = 0;
    for node in container.nodes {
        if mode == RestoreMode::Merge && store.get_node(&node.id).is_ok() {
            nodes_skipped += 1;
            continue;
        }
        // One bad node (duplicate id in replace mode, corrupt field) must not
        // abort the rest of the restore, same as the edge loop below.
        if store.add_node(node).is_ok() {
            nodes_restored += 1;
        } else {
            nodes_skipped += 1;
        }
    }

    let mut edges_restored = 0;
    let mut edges_skipped = 0;
    for edge in container.edges {
        if mode == RestoreMode::Merge && store.get_edge(&edge.id).is_ok() {
            edges_skipped += 1;
            continue;
        }
        if store.add_edge(edge).is_ok() {
            edges_restored += 1;
        } else {
            edges_skipped += 1;
        }
    }

    Ok(RestoreSummary {
        nodes_restored,
        nodes_skipped,
        edges_restored,
        edges_skipped,
    })
}

fn decompress_if_gzip(raw: &[u8]) -> Result<Vec<u8>> {
    const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
    if raw.len() >= 2 && raw[0..2] == GZIP_MAGIC {
        let mut decoder = flate2::read::GzDecoder::new(raw);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| StoreError::BackendError(format!("corrupt gzip backup: {e}")))?;
        Ok(out)
    } else {
        Ok(raw.to_vec())
    }
}

/// Default backup file name: `floop-backup-<rfc3339>.json[.gz]` (spec §6).
pub fn default_backup_path(dir: &Path, version: BackupVersion) -> PathBuf {
    let stamp = Utc::now().to_rfc3339();
    let safe_stamp = stamp.replace(':', "-");
    let ext = if version == BackupVersion::V2 { "json.gz" } else { "json" };
    dir.join(format!("floop-backup-{safe_stamp}.{ext}"))
}

/// Keep the `n` most recent backups in `dir`, delete older ones (spec §4.12).
pub fn apply_retention(dir: &Path, keep: usize) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut entries: Vec<(PathBuf, std::time::SystemTime)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with("floop-backup-"))
                .unwrap_or(false)
        })
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            Some((e.path(), modified))
        })
        .collect();

    entries.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in entries.into_iter().skip(keep) {
        if std::fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Behavior, BehaviorKind};
    use crate::store::SqliteGraphStore;
    use tempfile::TempDir;

    #[test]
    fn backup_then_restore_replace_round_trips() {
        let store = SqliteGraphStore::open_in_memory().unwrap();
        let b = Behavior::new("n1", BehaviorKind::Directive, "x");
        store.add_node(b).unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("floop-backup-test.json.gz");
        let summary = backup(&store, &path, BackupVersion::V2).unwrap();
        assert_eq!(summary.node_count, 1);

        let fresh = SqliteGraphStore::open_in_memory().unwrap();
        let restored = restore(&fresh, &path, RestoreMode::Replace).unwrap();
        assert_eq!(restored.nodes_restored, 1);
        assert_eq!(fresh.node_count().unwrap(), 1);
    }

    #[test]
    fn retention_keeps_only_n_most_recent() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            std::fs::write(dir.path().join(format!("floop-backup-{i}.json")), "{}").unwrap();
        }
        let removed = apply_retention(dir.path(), 2).unwrap();
        assert_eq!(removed, 3);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }
}
