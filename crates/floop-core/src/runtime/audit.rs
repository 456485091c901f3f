//! Append-only JSONL audit log, one file per scope (spec §4.10).

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Param keys considered safe to log verbatim; everything else not in this
/// set but present is dropped, except a small set logged as `(set)`.
const SAFE_KEYS: &[&str] = &["file", "task", "tag", "kind", "weight", "format", "scope", "mode", "threshold"];
const SENSITIVE_KEYS: &[&str] = &["wrong", "right", "canonical", "content", "api_key", "token"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub tool: String,
    pub scope: String,
    pub duration_ms: u64,
    pub status: String,
    pub error: Option<String>,
    pub params: Value,
}

/// Sanitize a raw params object: safe keys pass through, sensitive keys
/// become `"(set)"`, unknown keys are dropped; `_param_count` always added.
pub fn sanitize_params(raw: &Value) -> Value {
    let mut out = serde_json::Map::new();
    let count = raw.as_object().map(|m| m.len()).unwrap_or(0);

    if let Some(obj) = raw.as_object() {
        let safe: HashSet<&str> = SAFE_KEYS.iter().copied().collect();
        let sensitive: HashSet<&str> = SENSITIVE_KEYS.iter().copied().collect();
        for (key, value) in obj {
            if safe.contains(key.as_str()) {
                out.insert(key.clone(), value.clone());
            } else if sensitive.contains(key.as_str()) {
                out.insert(key.clone(), Value::String("(set)".to_string()));
            }
        }
    }
    out.insert("_param_count".to_string(), Value::from(count));
    Value::Object(out)
}

pub struct AuditLog {
    path: Mutex<std::fs::File>,
}

impl AuditLog {
    /// Opens (creating if needed) `<project|~>/.floop/audit.jsonl` with
    /// `0600` file / `0700` directory permissions.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(Self { path: Mutex::new(file) })
    }

    pub fn append(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let line = serde_json::to_string(entry).unwrap_or_default();
        let mut file = self.path.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(file, "{line}")
    }

    pub fn log_invocation(
        &self,
        tool: &str,
        scope: &str,
        duration_ms: u64,
        status: &str,
        error: Option<String>,
        raw_params: &Value,
    ) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            tool: tool.to_string(),
            scope: scope.to_string(),
            duration_ms,
            status: status.to_string(),
            error,
            params: sanitize_params(raw_params),
        };
        if let Err(e) = self.append(&entry) {
            tracing::warn!("audit log write failed: {e}");
        }
    }
}

pub fn default_path_for(root: &Path) -> PathBuf {
    root.join(".floop").join("audit.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sensitive_keys_masked() {
        let raw = json!({"wrong": "secret text", "file": "main.go", "unknown": "dropped"});
        let out = sanitize_params(&raw);
        assert_eq!(out["wrong"], "(set)");
        assert_eq!(out["file"], "main.go");
        assert!(out.get("unknown").is_none());
        assert_eq!(out["_param_count"], 3);
    }
}
