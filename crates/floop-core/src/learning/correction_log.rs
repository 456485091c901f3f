//! Append-only JSONL correction log, `<project>/.floop/corrections.jsonl`
//! (spec §4.7, §6 external interfaces) — same shape as the audit log.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::model::Correction;

pub struct CorrectionLog {
    file: Mutex<std::fs::File>,
    path: PathBuf,
}

impl CorrectionLog {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn append(&self, correction: &Correction) -> std::io::Result<()> {
        let line = serde_json::to_string(correction).unwrap_or_default();
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(file, "{line}")
    }

    /// Read every recorded correction back in file order, skipping any line
    /// that fails to parse rather than aborting the whole read.
    pub fn read_all(&self) -> std::io::Result<Vec<Correction>> {
        let file = std::fs::File::open(&self.path)?;
        let reader = std::io::BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(c) = serde_json::from_str::<Correction>(&line) {
                out.push(c);
            }
        }
        Ok(out)
    }
}

pub fn default_path_for(root: &Path) -> PathBuf {
    root.join(".floop").join("corrections.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContextSnapshot;
    use tempfile::TempDir;

    #[test]
    fn append_then_read_all_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrections.jsonl");
        let log = CorrectionLog::open(&path).unwrap();
        let ctx = ContextSnapshot::build(crate::model::ContextBuildInput::default());
        let c = Correction::new(ctx, "used println".to_string(), "use slog".to_string());
        log.append(&c).unwrap();

        let back = log.read_all().unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].corrected_action, "use slog");
    }
}
