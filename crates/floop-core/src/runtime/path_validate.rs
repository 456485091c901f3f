//! Backup/restore path validation against a configured allow-list (spec §4.10).
//!
//! Rejects null bytes, empty paths, and escapes via `..` or symlinks — a
//! path must resolve, after expanding symlinks on its nearest-existing
//! parent, to somewhere inside the allow-list.

use std::path::{Path, PathBuf};

use crate::error::RuntimeError;

/// `~/.floop/backups/` and `<project>/.floop/backups/` (spec §4.10).
pub fn default_allow_list(project_root: Option<&Path>) -> Vec<PathBuf> {
    let mut list = Vec::new();
    if let Some(root) = project_root {
        list.push(root.join(".floop").join("backups"));
    }
    if let Some(base) = directories::BaseDirs::new() {
        list.push(base.home_dir().join(".floop").join("backups"));
    }
    list
}

/// Resolve `candidate` and check it falls under one of `allow_list`'s
/// canonicalized roots.
pub fn validate_path(candidate: &str, allow_list: &[PathBuf]) -> Result<PathBuf, RuntimeError> {
    if candidate.is_empty() || candidate.contains('\0') {
        return Err(RuntimeError::PathRejected(PathBuf::from(candidate)));
    }

    let raw = PathBuf::from(candidate);
    let resolved = resolve_nearest_existing(&raw).ok_or_else(|| RuntimeError::PathRejected(raw.clone()))?;

    for root in allow_list {
        if let Ok(canonical_root) = root.canonicalize().or_else(|_| Ok::<_, std::io::Error>(root.clone())) {
            if resolved.starts_with(&canonical_root) {
                return Ok(resolved);
            }
        }
    }

    Err(RuntimeError::PathRejected(raw))
}

/// Canonicalize the nearest existing ancestor (expanding symlinks) and
/// rejoin the remaining, non-existent suffix — so a not-yet-created backup
/// file still resolves against its real parent directory.
fn resolve_nearest_existing(path: &Path) -> Option<PathBuf> {
    let mut existing_ancestor = path;
    let mut suffix: Vec<std::ffi::OsString> = Vec::new();

    loop {
        if existing_ancestor.exists() {
            break;
        }
        let file_name = existing_ancestor.file_name()?;
        suffix.push(file_name.to_os_string());
        match existing_ancestor.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => existing_ancestor = parent,
            _ => {
                existing_ancestor = Path::new(".");
                break;
            }
        }
    }

    let canonical_base = existing_ancestor.canonicalize().ok()?;
    let mut out = canonical_base;
    for part in suffix.into_iter().rev() {
        out.push(part);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_path_rejected() {
        assert!(validate_path("", &[]).is_err());
    }

    #[test]
    fn null_byte_rejected() {
        assert!(validate_path("foo\0bar", &[]).is_err());
    }

    #[test]
    fn path_outside_allow_list_rejected() {
        assert!(validate_path("/etc/passwd", &[PathBuf::from("/tmp/allowed")]).is_err());
    }

    #[test]
    fn path_inside_allow_list_accepted() {
        let dir = TempDir::new().unwrap();
        let backups = dir.path().join("backups");
        std::fs::create_dir_all(&backups).unwrap();
        let candidate = backups.join("floop-backup-123.json");
        let result = validate_path(candidate.to_str().unwrap(), &[backups]);
        assert!(result.is_ok());
    }
}
